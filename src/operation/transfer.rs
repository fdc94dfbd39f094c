/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

use crate::error::{Error, ErrorKind};
use crate::operation::download::Downloader;
use crate::operation::upload::Uploader;
use crate::transport::{self, Receiver, Sender};
use crate::types::TransferOptions;

/// Stream the object addressed by `src_url` to `dst_url`.
///
/// The source scheme selects the download strategy and receiver; the
/// destination scheme and probed source size select the upload strategy and
/// sender. Both engines run in parallel, joined by a bounded data channel and
/// a shared cancellation scope derived from `cancel`: the first terminal error
/// on either side cancels the other and is the error returned. Cancelling
/// `cancel` aborts the transfer with [`ErrorKind::Cancelled`]; cancelling
/// after completion has no effect.
pub async fn transfer(
    cancel: &CancellationToken,
    src_url: &str,
    dst_url: &str,
    opts: &TransferOptions,
) -> Result<(), Error> {
    let src = Url::parse(src_url)
        .map_err(|err| Error::new(ErrorKind::Config, format!("invalid src url: {err}")))?;
    let dst = Url::parse(dst_url)
        .map_err(|err| Error::new(ErrorKind::Config, format!("invalid dst url: {err}")))?;

    let receiver = transport::receiver_for_scheme(src.scheme())?;
    let info = receiver.file_info(src_url, opts).await?;
    tracing::debug!(size = info.size, "probed source");

    let sender = transport::sender_for_scheme(dst.scheme(), info.size)?;
    let downloader = Downloader::for_scheme(src.scheme())?;
    let uploader = Uploader::for_scheme(dst.scheme(), info.size)?;

    let mut opts = opts.clone();
    opts.set_content_length(info.size);

    run(
        cancel, src_url, dst_url, &opts, downloader, uploader, receiver, sender,
    )
    .await
}

/// Wire the two engines together and supervise them to completion.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn run(
    cancel: &CancellationToken,
    src_url: &str,
    dst_url: &str,
    opts: &TransferOptions,
    downloader: Downloader,
    uploader: Uploader,
    receiver: Arc<dyn Receiver>,
    sender: Arc<dyn Sender>,
) -> Result<(), Error> {
    // one scope covers both engines; the first error cancels it
    let scope = cancel.child_token();
    // bounded at one chunk: the producer can never run ahead of the consumer
    // by more than a single chunk
    let (data_tx, data_rx) = mpsc::channel(1);
    let first_error = FirstError::new(scope.clone());

    let download_task = {
        let scope = scope.clone();
        let uri = src_url.to_string();
        let opts = opts.clone();
        let first_error = first_error.clone();
        tokio::spawn(
            async move {
                if let Err(err) = downloader
                    .download(scope, &uri, &opts, data_tx, receiver)
                    .await
                {
                    first_error.record(err);
                }
            }
            .instrument(tracing::debug_span!("download")),
        )
    };

    let upload_task = {
        let scope = scope.clone();
        let uri = dst_url.to_string();
        let opts = opts.clone();
        let first_error = first_error.clone();
        tokio::spawn(
            async move {
                if let Err(err) = uploader.upload(scope, &uri, &opts, data_rx, sender).await {
                    first_error.record(err);
                }
            }
            .instrument(tracing::debug_span!("upload")),
        )
    };

    // wait until transfer complete or error
    for task in [download_task, upload_task] {
        if let Err(join_err) = task.await {
            first_error.record(join_err.into());
        }
    }

    match first_error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Mutex-protected first-error cell shared by both engines.
///
/// Recording an error cancels the shared scope. The first error wins, with
/// one exception: a real fault replaces a recorded cancellation, so the error
/// that *caused* the cancellation is the one reported even if the cancelled
/// side observed its own shutdown first.
#[derive(Clone, Debug)]
struct FirstError {
    cell: Arc<Mutex<Option<Error>>>,
    scope: CancellationToken,
}

impl FirstError {
    fn new(scope: CancellationToken) -> Self {
        Self {
            cell: Arc::new(Mutex::new(None)),
            scope,
        }
    }

    fn record(&self, err: Error) {
        {
            let mut cell = self.cell.lock().expect("lock valid");
            let replace = match cell.as_ref() {
                None => true,
                Some(existing) => {
                    existing.kind() == &ErrorKind::Cancelled
                        && err.kind() != &ErrorKind::Cancelled
                }
            };
            if replace {
                *cell = Some(err);
            } else {
                tracing::debug!(error = %err, "subsequent error dropped");
            }
        }
        self.scope.cancel();
    }

    fn take(&self) -> Option<Error> {
        self.cell.lock().expect("lock valid").take()
    }
}
