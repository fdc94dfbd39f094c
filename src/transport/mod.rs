/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::error::{Error, ErrorKind};
use crate::io::PartBody;
use crate::types::{FileInfo, TransferOptions};
use crate::MIN_MULTIPART_PART_SIZE_BYTES;

mod fs;
mod http;
mod s3;

pub use self::fs::LocalFileSender;
pub use self::http::HttpReceiver;
pub use self::s3::{S3MultipartSender, S3Receiver, S3SimpleSender};

/// Connection-oriented read capability over a transfer source.
///
/// Implementations own their internal state behind a lock and copy values out
/// before performing I/O, so `read_part` calls may run concurrently on
/// distinct ranges of the same receiver. Cancellation is honoured by the
/// engines dropping an in-flight call's future.
#[async_trait]
pub trait Receiver: Send + Sync {
    /// Probe the source size without transferring the body.
    ///
    /// Safe to call before [`open`](Receiver::open).
    async fn file_info(&self, uri: &str, opts: &TransferOptions) -> Result<FileInfo, Error>;

    /// Establish client state for the source. Callers should call once.
    async fn open(&self, uri: &str, opts: &TransferOptions) -> Result<(), Error>;

    /// Whether [`open`](Receiver::open) has completed successfully.
    fn is_open(&self) -> bool;

    /// Read one contiguous byte range from the source and write it
    /// sequentially to `sink`.
    ///
    /// The range is supplied through the `rangeStart`/`rangeEnd` (inclusive)
    /// options; back-ends that do not support ranges ignore them and deliver
    /// the entire body. Returns the part identifier when the back-end provides
    /// one.
    async fn read_part(
        &self,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        opts: &TransferOptions,
    ) -> Result<Option<String>, Error>;

    /// Release resources without completing. Terminal.
    async fn cancel(&self) -> Result<(), Error>;

    /// Release resources after a successful read. Terminal.
    async fn close(&self) -> Result<(), Error>;
}

/// Connection-oriented write capability over a transfer destination.
///
/// `write_part` calls may execute in parallel on distinct parts of the same
/// sender; the sender serialises its internal state (client, parts list,
/// upload id) behind a single lock.
#[async_trait]
pub trait Sender: Send + Sync {
    /// Parse the destination and establish client state. For multipart
    /// back-ends this initiates the upload session.
    async fn open(&self, uri: &str, opts: &TransferOptions) -> Result<(), Error>;

    /// Whether [`open`](Sender::open) has completed successfully.
    fn is_open(&self) -> bool;

    /// Write one part to the destination.
    ///
    /// `opts.partNumber` carries the 1-based part index; non-multipart
    /// back-ends ignore it and append the bytes directly. Returns the part
    /// identifier (e.g. an ETag) when the back-end provides one.
    async fn write_part(
        &self,
        body: PartBody,
        opts: &TransferOptions,
    ) -> Result<Option<String>, Error>;

    /// Abort the upload, discarding anything written so far. Terminal and
    /// mutually exclusive with [`close`](Sender::close).
    async fn cancel(&self) -> Result<(), Error>;

    /// Finalize the upload. For multipart back-ends this commits the recorded
    /// parts in ascending part-number order. Terminal.
    async fn close(&self) -> Result<(), Error>;
}

/// Receiver implementation for a source URL scheme.
pub fn receiver_for_scheme(scheme: &str) -> Result<Arc<dyn Receiver>, Error> {
    match scheme {
        "http" | "https" => Ok(Arc::new(HttpReceiver::new())),
        "s3" => Ok(Arc::new(S3Receiver::new())),
        other => Err(Error::new(
            ErrorKind::Config,
            format!("source scheme '{other}' is not supported"),
        )),
    }
}

/// Sender implementation for a destination URL scheme and probed source size.
pub fn sender_for_scheme(scheme: &str, size: u64) -> Result<Arc<dyn Sender>, Error> {
    match scheme {
        "file" => Ok(Arc::new(LocalFileSender::new())),
        "s3" if size >= MIN_MULTIPART_PART_SIZE_BYTES => Ok(Arc::new(S3MultipartSender::new())),
        "s3" => Ok(Arc::new(S3SimpleSender::new())),
        other => Err(Error::new(
            ErrorKind::Config,
            format!("destination scheme '{other}' is not supported"),
        )),
    }
}
