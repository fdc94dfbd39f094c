/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::cmp;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::BytesMut;
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::{Error, ErrorKind};
use crate::transport::Receiver;
use crate::types::{DataChunk, TransferOptions};
use crate::{MAX_DOWNLOAD_WORKERS, MIN_MULTIPART_PART_SIZE_BYTES, PART_COPY_CHUNK_SIZE};

/// Concurrent ranged download.
///
/// Splits the source into `⌈contentLength / partSize⌉` ranges, reads up to
/// [`MAX_DOWNLOAD_WORKERS`] of them at a time into temp part files, and a
/// single reassembler streams the completed files onto the data channel
/// strictly in source order, deleting each file as it goes.
pub(super) async fn download(
    cancel: CancellationToken,
    uri: &str,
    opts: &TransferOptions,
    data_tx: mpsc::Sender<DataChunk>,
    receiver: Arc<dyn Receiver>,
) -> Result<(), Error> {
    let content_length = opts.content_length()?;
    if content_length == 0 {
        return Err(Error::new(
            ErrorKind::Config,
            "can't start ranged download: content length is zero",
        ));
    }
    let part_size = cmp::min(
        opts.part_size()?.unwrap_or(MIN_MULTIPART_PART_SIZE_BYTES),
        content_length,
    );
    if part_size == 0 {
        return Err(Error::new(
            ErrorKind::Config,
            "can't start ranged download: part size is zero",
        ));
    }
    let part_count = usize::try_from(content_length.div_ceil(part_size))
        .map_err(|_| Error::new(ErrorKind::Config, "part count overflows"))?;

    // buffer parts on disk so large transfers keep a small RAM footprint;
    // dropping the TempDir removes it on every exit path
    let tmp = tempfile::tempdir()?;

    tracing::debug!(part_count, part_size, "opening download connection");
    receiver.open(uri, opts).await?;

    let semaphore = Arc::new(Semaphore::new(MAX_DOWNLOAD_WORKERS));
    // capacity covers every possible completion, so worker sends can never
    // block after the reassembler stops reading
    let (comp_tx, mut comp_rx) = mpsc::channel::<Result<usize, Error>>(part_count);
    let mut workers: JoinSet<()> = JoinSet::new();

    for part_index in 0..part_count {
        let range_start = part_index as u64 * part_size;
        let range_end = cmp::min(range_start + part_size, content_length) - 1;
        let part_opts = opts.ranged(range_start, range_end, part_size);
        let path = part_path(tmp.path(), part_index);
        let receiver = Arc::clone(&receiver);
        let semaphore = Arc::clone(&semaphore);
        let comp_tx = comp_tx.clone();
        let cancel = cancel.clone();

        workers.spawn(
            async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };
                tracing::trace!(range_start, range_end, "range read started");
                let result = tokio::select! {
                    _ = cancel.cancelled() => Err(Error::cancelled()),
                    result = fetch_part(receiver.as_ref(), &path, &part_opts) => result,
                };
                // the reassembler may already be gone on the failure path
                let _ = comp_tx.send(result.map(|()| part_index)).await;
            }
            .instrument(tracing::debug_span!("download-part", part = part_index)),
        );
    }
    drop(comp_tx);

    // reassembler: map out-of-order completions onto the in-order channel
    let mut received = vec![false; part_count];
    let mut ptr = 0usize;
    let mut sent: u64 = 0;
    let mut first_error: Option<Error> = None;

    'reassemble: while ptr < part_count {
        let completion = tokio::select! {
            completion = comp_rx.recv() => completion,
            _ = cancel.cancelled() => {
                first_error = Some(Error::cancelled());
                break;
            }
        };
        match completion {
            None => {
                first_error = Some(Error::new(
                    ErrorKind::Internal,
                    "completion channel closed before all parts were received",
                ));
                break;
            }
            Some(Err(err)) => {
                first_error = Some(err);
                break;
            }
            Some(Ok(part_index)) => {
                if part_index >= part_count {
                    first_error = Some(Error::new(
                        ErrorKind::Internal,
                        format!("part {part_index} is out of range [0,{part_count})"),
                    ));
                    break;
                }
                received[part_index] = true;
                while ptr < part_count && received[ptr] {
                    let path = part_path(tmp.path(), ptr);
                    tracing::trace!(part = ptr, "sending part downstream");
                    match stream_part(&cancel, &path, sent, content_length, &data_tx).await {
                        Ok(streamed) => sent += streamed,
                        Err(err) => {
                            first_error = Some(err);
                            break 'reassemble;
                        }
                    }
                    if let Err(err) = fs::remove_file(&path).await {
                        first_error = Some(err.into());
                        break 'reassemble;
                    }
                    ptr += 1;
                }
            }
        }
    }

    // abort anything still in flight and wait for every worker to exit
    workers.shutdown().await;

    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
    // dropping data_tx closes the channel; dropping tmp removes the part files
}

fn part_path(dir: &Path, part_index: usize) -> PathBuf {
    dir.join(format!("{part_index}.part"))
}

/// Read one range through the receiver into a part file.
async fn fetch_part(
    receiver: &dyn Receiver,
    path: &Path,
    opts: &TransferOptions,
) -> Result<(), Error> {
    let mut file = fs::File::create(path).await?;
    receiver.read_part(&mut file, opts).await?;
    file.sync_all().await?;
    Ok(())
}

/// Stream one buffered part file onto the data channel in bounded reads.
async fn stream_part(
    cancel: &CancellationToken,
    path: &Path,
    sent_so_far: u64,
    total_bytes: u64,
    data_tx: &mpsc::Sender<DataChunk>,
) -> Result<u64, Error> {
    let mut file = fs::File::open(path).await?;
    let mut sent = sent_so_far;

    loop {
        let mut buf = BytesMut::with_capacity(PART_COPY_CHUNK_SIZE);
        let read = file.read_buf(&mut buf).await?;
        if read == 0 {
            break;
        }
        sent += read as u64;
        let chunk = DataChunk {
            data: buf.freeze(),
            bytes_so_far: sent,
            total_bytes,
        };
        tokio::select! {
            result = data_tx.send(chunk) => {
                result.map_err(|_| Error::new(ErrorKind::Cancelled, "data channel consumer is gone"))?;
            }
            _ = cancel.cancelled() => return Err(Error::cancelled()),
        }
    }

    Ok(sent - sent_so_far)
}
