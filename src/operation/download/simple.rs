/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorKind};
use crate::io::ChannelSink;
use crate::transport::Receiver;
use crate::types::{DataChunk, TransferOptions};

/// Single-stream download: one `read_part` call forwards every buffer it
/// receives onto the data channel with running byte accounting.
pub(super) async fn download(
    cancel: CancellationToken,
    uri: &str,
    opts: &TransferOptions,
    data_tx: mpsc::Sender<DataChunk>,
    receiver: Arc<dyn Receiver>,
) -> Result<(), Error> {
    let content_length = opts.content_length()?;

    tracing::debug!(content_length, "opening download connection");
    receiver.open(uri, opts).await?;

    let mut sink = ChannelSink::new(data_tx, content_length);
    let result = tokio::select! {
        _ = cancel.cancelled() => Err(Error::cancelled()),
        result = receiver.read_part(&mut sink, opts) => result.map(|_| ()),
    };
    match result {
        // consumer stopped first; its error is the one the supervisor reports
        Err(err) if sink.consumer_gone() => Err(Error::new(ErrorKind::Cancelled, err)),
        other => other,
    }
    // dropping the sink closes the data channel
}
