/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! URL handling shared by the protocol back-ends.

use std::path::PathBuf;

use url::Url;

use crate::error::{Error, ErrorKind};
use crate::types::BucketStyle;

fn config_err(msg: String) -> Error {
    Error::new(ErrorKind::Config, msg)
}

/// Resolve the bucket and key addressed by an S3-compatible URL.
///
/// Path-style places the bucket in the first path segment
/// (`s3://<host>/<bucket>/<key…>`); virtual-hosted-style places it in the
/// leading host label (`s3://<bucket>.<host>/<key…>`).
pub(crate) fn s3_bucket_and_key(uri: &str, style: BucketStyle) -> Result<(String, String), Error> {
    let parsed = Url::parse(uri)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| config_err(format!("'{uri}' has no host")))?;
    let path = parsed.path().trim_start_matches('/');

    let (bucket, key) = match style {
        BucketStyle::PathStyle => match path.split_once('/') {
            Some((bucket, key)) => (bucket, key),
            None => (path, ""),
        },
        BucketStyle::VirtualHostedStyle => {
            let (bucket, _) = host.split_once('.').ok_or_else(|| {
                config_err(format!(
                    "'{uri}' is not virtual-hosted-style: expected '<bucket>.<host>'"
                ))
            })?;
            (bucket, path)
        }
    };

    if bucket.is_empty() {
        return Err(config_err(format!("'{uri}' has an empty bucket name")));
    }
    if key.is_empty() {
        return Err(config_err(format!("'{uri}' has an empty object key")));
    }

    Ok((bucket.to_string(), key.to_string()))
}

/// Resolve a `file://` destination URL to a local filesystem path.
pub(crate) fn local_file_path(uri: &str) -> Result<PathBuf, Error> {
    let parsed = Url::parse(uri)?;
    if parsed.scheme() != "file" {
        return Err(config_err(format!("'{uri}' is not a file url")));
    }
    parsed
        .to_file_path()
        .map_err(|()| config_err(format!("'{uri}' does not name a local path")))
}
