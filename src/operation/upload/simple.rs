/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorKind};
use crate::io::PartBody;
use crate::transport::Sender;
use crate::types::{DataChunk, TransferOptions};

/// Simple upload: every chunk received on the data channel becomes one
/// `write_part` call, in arrival order. Channel closure commits the upload,
/// provided the byte count matches the probed source size.
pub(super) async fn upload(
    cancel: CancellationToken,
    uri: &str,
    opts: &TransferOptions,
    mut data_rx: mpsc::Receiver<DataChunk>,
    sender: Arc<dyn Sender>,
) -> Result<(), Error> {
    tracing::debug!("opening upload connection");
    sender.open(uri, opts).await?;

    let mut received: u64 = 0;
    loop {
        let chunk = tokio::select! {
            chunk = data_rx.recv() => chunk,
            _ = cancel.cancelled() => {
                return Err(cancel_sender(sender.as_ref(), Error::cancelled()).await);
            }
        };
        let Some(chunk) = chunk else {
            break; // channel closed: no more data is coming
        };

        let len = chunk.data.len() as u64;
        let write = tokio::select! {
            result = sender.write_part(PartBody::from(chunk.data), opts) => result,
            _ = cancel.cancelled() => Err(Error::cancelled()),
        };
        if let Err(err) = write {
            return Err(cancel_sender(sender.as_ref(), err).await);
        }
        received += len;
        tracing::trace!(received, "wrote chunk");
    }

    // a closed channel is a clean end of stream only when every probed byte
    // arrived
    if let Ok(expected) = opts.content_length() {
        if received != expected {
            let err = Error::new(
                ErrorKind::Cancelled,
                format!("data stream ended after {received} of {expected} bytes"),
            );
            return Err(cancel_sender(sender.as_ref(), err).await);
        }
    }

    tracing::debug!(received, "closing upload connection");
    sender.close().await?;
    Ok(())
}

async fn cancel_sender(sender: &dyn Sender, err: Error) -> Error {
    match sender.cancel().await {
        Ok(()) => err,
        Err(cancel_err) => err.with_cleanup(cancel_err),
    }
}
