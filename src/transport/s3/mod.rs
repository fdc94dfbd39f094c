/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! S3-compatible back-ends.
//!
//! Bucket and key are resolved from the URL (path-style by default, see
//! [`BucketStyle`](crate::types::BucketStyle)); credentials and region come
//! from the environment through the usual SDK configuration chain. Each
//! back-end also accepts an explicit client (`with_client`), which tests use
//! to substitute a mocked one.

mod receiver;
mod sender_multipart;
mod sender_simple;

pub use self::receiver::S3Receiver;
pub use self::sender_multipart::S3MultipartSender;
pub use self::sender_simple::S3SimpleSender;

use crate::error::Error;
use crate::types::TransferOptions;

pub(crate) async fn client_from_env() -> aws_sdk_s3::Client {
    let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    aws_sdk_s3::Client::new(&config)
}

/// Bucket and key for `uri` under the style configured in `opts`.
pub(crate) fn resolve(uri: &str, opts: &TransferOptions) -> Result<(String, String), Error> {
    let style = opts.bucket_style()?;
    crate::uri::s3_bucket_and_key(uri, style)
}
