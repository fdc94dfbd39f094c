/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::PathBuf;

use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{from_kind, Error, ErrorKind};

/// The bytes of one upload part.
///
/// Small parts travel in memory; parts buffered by the aggregator travel as a
/// temp-file path so that large transfers keep a small RAM footprint. Either
/// variant can be replayed from the start, which is what the S3 back-ends
/// require of a part payload.
#[derive(Debug, Clone)]
pub enum PartBody {
    /// In-memory part contents.
    Bytes(Bytes),
    /// Part contents buffered in a file.
    File {
        /// Location of the buffered part.
        path: PathBuf,
        /// Exact length of the part in bytes.
        len: u64,
    },
}

impl PartBody {
    /// Part payload backed by a buffered file of known length.
    pub fn file(path: impl Into<PathBuf>, len: u64) -> Self {
        PartBody::File {
            path: path.into(),
            len,
        }
    }

    /// Length of the part in bytes.
    pub fn len(&self) -> u64 {
        match self {
            PartBody::Bytes(data) => data.len() as u64,
            PartBody::File { len, .. } => *len,
        }
    }

    /// Whether the part carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into a streaming body for the S3 client.
    pub(crate) async fn into_byte_stream(self) -> Result<ByteStream, Error> {
        match self {
            PartBody::Bytes(data) => Ok(ByteStream::from(data)),
            PartBody::File { path, .. } => ByteStream::from_path(&path)
                .await
                .map_err(from_kind(ErrorKind::Io)),
        }
    }

    /// Copy the part sequentially into `writer`, returning the byte count.
    pub async fn copy_to<W>(self, writer: &mut W) -> Result<u64, Error>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        match self {
            PartBody::Bytes(data) => {
                writer.write_all(&data).await?;
                Ok(data.len() as u64)
            }
            PartBody::File { path, .. } => {
                let mut file = tokio::fs::File::open(&path).await?;
                let copied = tokio::io::copy(&mut file, writer).await?;
                Ok(copied)
            }
        }
    }
}

impl From<Bytes> for PartBody {
    fn from(value: Bytes) -> Self {
        PartBody::Bytes(value)
    }
}
