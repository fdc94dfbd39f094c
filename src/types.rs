/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use crate::error::{Error, ErrorKind};

/// Probed metadata for a transfer source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    /// Size of the source object in bytes.
    pub size: u64,
}

/// Unit of streaming between the download and upload engines.
///
/// The buffer is handed off: once a chunk is placed on the data channel the
/// producer must not touch it again. End of stream is signalled by closing the
/// channel, not by a marker chunk.
#[derive(Debug, Clone)]
pub struct DataChunk {
    /// The bytes for this chunk, in source order.
    pub data: Bytes,
    /// Running total of bytes delivered on the channel, this chunk included.
    pub bytes_so_far: u64,
    /// Total size of the source object.
    pub total_bytes: u64,
}

/// Bucket addressing style for S3-compatible URLs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BucketStyle {
    /// The bucket is the first path segment: `s3://<host>/<bucket>/<key>`
    #[default]
    PathStyle,

    /// The bucket is the leading host label: `s3://<bucket>.<host>/<key>`
    VirtualHostedStyle,
}

impl FromStr for BucketStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path-style" => Ok(BucketStyle::PathStyle),
            "virtual-hosted-style" => Ok(BucketStyle::VirtualHostedStyle),
            other => Err(Error::new(
                ErrorKind::Config,
                format!("unknown bucket name style '{other}'"),
            )),
        }
    }
}

impl fmt::Display for BucketStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketStyle::PathStyle => write!(f, "path-style"),
            BucketStyle::VirtualHostedStyle => write!(f, "virtual-hosted-style"),
        }
    }
}

/// Well-known [`TransferOptions`] keys.
pub mod keys {
    /// `path-style` (default) or `virtual-hosted-style`.
    pub const BUCKET_NAME_STYLE: &str = "bucketNameStyle";
    /// Decimal byte count of the source; set by the orchestrator from the probe.
    pub const CONTENT_LENGTH: &str = "contentLength";
    /// Decimal byte count; part size used by the ranged download.
    pub const PART_SIZE: &str = "partSize";
    /// Decimal, inclusive start offset for one ranged read.
    pub const RANGE_START: &str = "rangeStart";
    /// Decimal, inclusive end offset for one ranged read.
    pub const RANGE_END: &str = "rangeEnd";
    /// 1-based part index for a multipart upload.
    pub const PART_NUMBER: &str = "partNumber";
}

/// Per-transfer settings as a string key/value map.
///
/// Populated by the orchestrator and read-only to the engines. Typed accessors
/// fail with [`ErrorKind::Config`] when a required value is missing or does
/// not parse.
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    values: HashMap<String, String>,
}

impl TransferOptions {
    /// Create an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw string value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// The probed source size. Required.
    pub fn content_length(&self) -> Result<u64, Error> {
        self.required_u64(keys::CONTENT_LENGTH)
    }

    /// Record the probed source size.
    pub fn set_content_length(&mut self, size: u64) {
        self.set(keys::CONTENT_LENGTH, size.to_string());
    }

    /// Ranged-download part size, when configured.
    pub fn part_size(&self) -> Result<Option<u64>, Error> {
        self.optional_u64(keys::PART_SIZE)
    }

    /// Inclusive start offset for one ranged read. Required for ranged reads.
    pub fn range_start(&self) -> Result<u64, Error> {
        self.required_u64(keys::RANGE_START)
    }

    /// Inclusive end offset for one ranged read. Required for ranged reads.
    pub fn range_end(&self) -> Result<u64, Error> {
        self.required_u64(keys::RANGE_END)
    }

    /// 1-based part index for a multipart upload. Required for part writes.
    pub fn part_number(&self) -> Result<u32, Error> {
        let raw = self.required(keys::PART_NUMBER)?;
        let number: u32 = parse_value(keys::PART_NUMBER, raw)?;
        if number == 0 {
            return Err(Error::new(
                ErrorKind::Config,
                "'partNumber' is 1-based and must not be zero",
            ));
        }
        Ok(number)
    }

    /// Bucket addressing style, defaulting to path-style when unset.
    pub fn bucket_style(&self) -> Result<BucketStyle, Error> {
        match self.get(keys::BUCKET_NAME_STYLE) {
            None => Ok(BucketStyle::default()),
            Some(raw) => raw.parse(),
        }
    }

    /// Copy of these options with the range keys set for one part read.
    pub(crate) fn ranged(&self, start: u64, end_inclusive: u64, part_size: u64) -> Self {
        let mut opts = self.clone();
        opts.set(keys::RANGE_START, start.to_string());
        opts.set(keys::RANGE_END, end_inclusive.to_string());
        opts.set(keys::PART_SIZE, part_size.to_string());
        opts
    }

    /// Copy of these options addressing one upload part.
    pub(crate) fn with_part_number(&self, part_number: u32) -> Self {
        let mut opts = self.clone();
        opts.set(keys::PART_NUMBER, part_number.to_string());
        opts
    }

    fn required(&self, key: &str) -> Result<&str, Error> {
        self.get(key)
            .ok_or_else(|| Error::new(ErrorKind::Config, format!("missing '{key}' option")))
    }

    fn required_u64(&self, key: &str) -> Result<u64, Error> {
        parse_value(key, self.required(key)?)
    }

    fn optional_u64(&self, key: &str) -> Result<Option<u64>, Error> {
        self.get(key).map(|raw| parse_value(key, raw)).transpose()
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, Error>
where
    T::Err: fmt::Display,
{
    raw.parse().map_err(|err| {
        Error::new(
            ErrorKind::Config,
            format!("error reading '{key}' value '{raw}': {err}"),
        )
    })
}
