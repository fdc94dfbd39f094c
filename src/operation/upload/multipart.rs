/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::{Error, ErrorKind};
use crate::io::PartBody;
use crate::transport::Sender;
use crate::types::{DataChunk, TransferOptions};
use crate::{MAX_UPLOAD_WORKERS, MIN_MULTIPART_PART_SIZE_BYTES};

/// Concurrent multipart upload.
///
/// A single-threaded aggregator groups incoming chunks into part-sized temp
/// files. Each full part (or the final short one) is handed to one of
/// [`MAX_UPLOAD_WORKERS`] workers, which writes it through the sender with its
/// 1-based part number and deletes the file. The first failure anywhere
/// cancels the shared scope, every worker is drained, and the sender is
/// `cancel`led; on success the sender is `close`d, which commits the parts in
/// part-number order.
pub(super) async fn upload(
    cancel: CancellationToken,
    uri: &str,
    opts: &TransferOptions,
    mut data_rx: mpsc::Receiver<DataChunk>,
    sender: Arc<dyn Sender>,
) -> Result<(), Error> {
    // dropping the TempDir removes the buffered parts on every exit path
    let tmp = tempfile::tempdir()?;

    tracing::debug!("opening upload connection");
    sender.open(uri, opts).await?;

    let semaphore = Arc::new(Semaphore::new(MAX_UPLOAD_WORKERS));
    let mut workers: JoinSet<Result<(), Error>> = JoinSet::new();

    let mut part_number: u32 = 1;
    let mut accumulated: u64 = 0;
    let mut received: u64 = 0;
    let mut current: Option<(fs::File, PathBuf)> = None;
    let mut last_chunk = false;
    let mut first_error: Option<Error> = None;

    while !last_chunk && first_error.is_none() {
        tokio::select! {
            maybe_chunk = data_rx.recv() => {
                let chunk = match maybe_chunk {
                    Some(chunk) => Some(chunk),
                    None => {
                        last_chunk = true; // channel closed and no data left
                        None
                    }
                };

                if let Some(chunk) = chunk {
                    if current.is_none() {
                        match part_file(tmp.path(), part_number).await {
                            Ok(file_and_path) => current = Some(file_and_path),
                            Err(err) => {
                                first_error = Some(err);
                                continue;
                            }
                        }
                    }
                    let (file, _) = current.as_mut().expect("part file set");
                    if !chunk.data.is_empty() {
                        if let Err(err) = file.write_all(&chunk.data).await {
                            first_error = Some(err.into());
                            continue;
                        }
                        accumulated += chunk.data.len() as u64;
                        received += chunk.data.len() as u64;
                    }
                }

                let part_ready = current.is_some()
                    && (accumulated >= MIN_MULTIPART_PART_SIZE_BYTES || last_chunk);
                if part_ready {
                    let (mut file, path) = current.take().expect("part file set");
                    if let Err(err) = file.flush().await {
                        first_error = Some(err.into());
                        continue;
                    }
                    drop(file);

                    let permit = tokio::select! {
                        permit = Arc::clone(&semaphore).acquire_owned() => {
                            permit.expect("semaphore open")
                        }
                        _ = cancel.cancelled() => {
                            first_error = Some(Error::cancelled());
                            continue;
                        }
                    };
                    spawn_part_write(
                        &mut workers,
                        permit,
                        cancel.clone(),
                        Arc::clone(&sender),
                        path,
                        accumulated,
                        part_number,
                        opts,
                    );
                    accumulated = 0;
                    part_number += 1;
                }
            }
            Some(join_result) = workers.join_next(), if !workers.is_empty() => {
                match flatten(join_result) {
                    Ok(()) => {}
                    Err(err) => {
                        // first part failure stops intake and the other side
                        cancel.cancel();
                        first_error = Some(err);
                    }
                }
            }
            _ = cancel.cancelled() => {
                first_error = Some(Error::cancelled());
            }
        }
    }

    // a closed channel is a clean end of stream only when every probed byte
    // arrived
    if first_error.is_none() {
        if let Ok(expected) = opts.content_length() {
            if received != expected {
                first_error = Some(Error::new(
                    ErrorKind::Cancelled,
                    format!("data stream ended after {received} of {expected} bytes"),
                ));
            }
        }
    }

    if first_error.is_some() {
        cancel.cancel();
    }

    // every worker must be observed before the terminal cancel/close
    tracing::debug!("waiting for in-flight part writes");
    while let Some(join_result) = workers.join_next().await {
        if let Err(err) = flatten(join_result) {
            first_error.get_or_insert(err);
        }
    }

    if let Some(err) = first_error {
        tracing::warn!("upload interrupted, cancelling");
        return Err(match sender.cancel().await {
            Ok(()) => err,
            Err(cancel_err) => err.with_cleanup(cancel_err),
        });
    }

    tracing::debug!(parts = part_number - 1, "closing upload connection");
    sender.close().await?;
    Ok(())
}

async fn part_file(dir: &Path, part_number: u32) -> Result<(fs::File, PathBuf), Error> {
    let path = dir.join(format!("{part_number}.part"));
    tracing::trace!(part = part_number, "creating part buffer file");
    let file = fs::File::create(&path).await?;
    Ok((file, path))
}

#[allow(clippy::too_many_arguments)]
fn spawn_part_write(
    workers: &mut JoinSet<Result<(), Error>>,
    permit: OwnedSemaphorePermit,
    cancel: CancellationToken,
    sender: Arc<dyn Sender>,
    path: PathBuf,
    len: u64,
    part_number: u32,
    opts: &TransferOptions,
) {
    let opts = opts.with_part_number(part_number);
    workers.spawn(
        async move {
            let _permit = permit;
            let body = PartBody::file(&path, len);
            let write = tokio::select! {
                result = sender.write_part(body, &opts) => result.map(|_| ()),
                _ = cancel.cancelled() => Err(Error::cancelled()),
            };
            write?;
            fs::remove_file(&path).await?;
            Ok(())
        }
        .instrument(tracing::debug_span!("upload-part", part = part_number)),
    );
}

fn flatten(join_result: Result<Result<(), Error>, tokio::task::JoinError>) -> Result<(), Error> {
    match join_result {
        Ok(result) => result,
        Err(join_err) => Err(join_err.into()),
    }
}
