/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

mod ranged;
mod simple;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorKind};
use crate::transport::Receiver;
use crate::types::{DataChunk, TransferOptions};

/// Strategy used to produce the ordered byte stream for one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downloader {
    /// One full-body read through the receiver.
    Simple,
    /// Concurrent ranged reads reassembled into source order.
    Ranged,
}

impl Downloader {
    /// Strategy for a source URL scheme.
    pub fn for_scheme(scheme: &str) -> Result<Self, Error> {
        match scheme {
            "http" | "https" => Ok(Downloader::Simple),
            "s3" => Ok(Downloader::Ranged),
            other => Err(Error::new(
                ErrorKind::Config,
                format!("download scheme '{other}' is not supported"),
            )),
        }
    }

    /// Drive `receiver` to deliver the source bytes, in order, on `data_tx`.
    ///
    /// The engine owns the only sender handle of the data channel and closes
    /// it by dropping `data_tx` on every exit path. The first failure (worker,
    /// reassembly, or cancellation of `cancel`) wins and is returned; any
    /// buffered state is cleaned up before returning.
    pub async fn download(
        &self,
        cancel: CancellationToken,
        uri: &str,
        opts: &TransferOptions,
        data_tx: mpsc::Sender<DataChunk>,
        receiver: Arc<dyn Receiver>,
    ) -> Result<(), Error> {
        match self {
            Downloader::Simple => simple::download(cancel, uri, opts, data_tx, receiver).await,
            Downloader::Ranged => ranged::download(cancel, uri, opts, data_tx, receiver).await,
        }
    }
}
