/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Streaming byte-for-byte transfers between URL-addressed endpoints.
//!
//! A transfer couples a parallel ranged downloader to a parallel multipart
//! uploader through a bounded in-memory channel. The download side produces an
//! ordered stream of [`DataChunk`](types::DataChunk)s from an HTTP or
//! S3-compatible source; the upload side consumes them and writes the bytes to
//! a local file or an S3-compatible destination, using a multipart upload for
//! large objects. Either side's first failure cancels the other and is the
//! error returned to the caller.
//!
//! # Examples
//!
//! Copy an object from S3 to a local file:
//!
//! ```no_run
//! # async fn example() -> Result<(), stream_transfer::error::Error> {
//! use stream_transfer::types::TransferOptions;
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let opts = TransferOptions::new();
//! stream_transfer::transfer(
//!     &cancel,
//!     "s3://s3.us-west-2.amazonaws.com/my-bucket/my-key",
//!     "file:///tmp/my-key",
//!     &opts,
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

pub(crate) const MEBIBYTE: u64 = 1024 * 1024;

/// Minimum part size accepted by S3 multipart uploads.
///
/// Doubles as the default part size for ranged downloads and as the threshold
/// below which an S3 destination is written with a single `PutObject`.
pub const MIN_MULTIPART_PART_SIZE_BYTES: u64 = 5 * MEBIBYTE;

/// Concurrent range reads per download.
pub(crate) const MAX_DOWNLOAD_WORKERS: usize = 3;

/// Concurrent part writes per upload.
pub(crate) const MAX_UPLOAD_WORKERS: usize = 5;

/// Read size used when streaming a buffered part file onto the data channel.
pub(crate) const PART_COPY_CHUNK_SIZE: usize = 3 * MEBIBYTE as usize;

/// Error types emitted by `stream-transfer`
pub mod error;

/// Common types used by `stream-transfer`
pub mod types;

/// Types and helpers for I/O
pub mod io;

/// Source and destination protocol back-ends
pub mod transport;

/// Transfer operations
pub mod operation;

pub(crate) mod uri;

pub use crate::operation::transfer::transfer;
