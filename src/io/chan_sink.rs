/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::PollSender;

use crate::types::DataChunk;

/// [`AsyncWrite`] adapter that forwards every write onto the data channel as
/// one [`DataChunk`] with running byte accounting.
///
/// Dropping the sink releases the channel sender; a closed channel surfaces as
/// [`io::ErrorKind::BrokenPipe`].
#[derive(Debug)]
pub(crate) struct ChannelSink {
    tx: PollSender<DataChunk>,
    bytes_so_far: u64,
    total_bytes: u64,
}

impl ChannelSink {
    pub(crate) fn new(tx: mpsc::Sender<DataChunk>, total_bytes: u64) -> Self {
        Self {
            tx: PollSender::new(tx),
            bytes_so_far: 0,
            total_bytes,
        }
    }

    /// Whether the consuming side of the channel has gone away.
    pub(crate) fn consumer_gone(&self) -> bool {
        self.tx.is_closed()
    }
}

fn closed_channel() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "data channel closed")
}

impl AsyncWrite for ChannelSink {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        ready!(this.tx.poll_reserve(cx)).map_err(|_| closed_channel())?;

        this.bytes_so_far += buf.len() as u64;
        let chunk = DataChunk {
            data: Bytes::copy_from_slice(buf),
            bytes_so_far: this.bytes_so_far,
            total_bytes: this.total_bytes,
        };
        this.tx.send_item(chunk).map_err(|_| closed_channel())?;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
