/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

mod multipart;
mod simple;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorKind};
use crate::transport::Sender;
use crate::types::{DataChunk, TransferOptions};
use crate::MIN_MULTIPART_PART_SIZE_BYTES;

/// Strategy used to consume the byte stream of one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Uploader {
    /// Every received chunk is written through the sender directly.
    Simple,
    /// Chunks are aggregated into part-sized files and written concurrently.
    Multipart,
}

impl Uploader {
    /// Strategy for a destination URL scheme and probed source size.
    pub fn for_scheme(scheme: &str, size: u64) -> Result<Self, Error> {
        match scheme {
            "file" => Ok(Uploader::Simple),
            "s3" if size >= MIN_MULTIPART_PART_SIZE_BYTES => Ok(Uploader::Multipart),
            "s3" => Ok(Uploader::Simple),
            other => Err(Error::new(
                ErrorKind::Config,
                format!("upload scheme '{other}' is not supported"),
            )),
        }
    }

    /// Consume `data_rx` and write the bytes to the destination through
    /// `sender`.
    ///
    /// On success the sender is `close`d (committing a multipart upload). Once
    /// the sender is open, any failure, including cancellation, `cancel`s it
    /// exactly once and the first error is returned with any cleanup failure
    /// appended.
    pub async fn upload(
        &self,
        cancel: CancellationToken,
        uri: &str,
        opts: &TransferOptions,
        data_rx: mpsc::Receiver<DataChunk>,
        sender: Arc<dyn Sender>,
    ) -> Result<(), Error> {
        match self {
            Uploader::Simple => simple::upload(cancel, uri, opts, data_rx, sender).await,
            Uploader::Multipart => multipart::upload(cancel, uri, opts, data_rx, sender).await,
        }
    }
}
