/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{from_kind, Error, ErrorKind};
use crate::transport::s3::{client_from_env, resolve};
use crate::transport::Receiver;
use crate::types::{FileInfo, TransferOptions};

/// Receiver for `s3` sources.
///
/// Each [`read_part`](Receiver::read_part) call issues one `GetObject` with a
/// `Range: bytes=START-END` header and verifies the byte count delivered to
/// the sink against the content length reported for the range.
#[derive(Debug, Default)]
pub struct S3Receiver {
    client: Option<aws_sdk_s3::Client>,
    state: Mutex<Option<S3State>>,
}

#[derive(Debug, Clone)]
struct S3State {
    bucket: String,
    key: String,
    client: aws_sdk_s3::Client,
}

impl S3Receiver {
    /// Create a receiver whose client is built from the environment at
    /// [`open`](Receiver::open) time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a receiver that uses the given client.
    pub fn with_client(client: aws_sdk_s3::Client) -> Self {
        Self {
            client: Some(client),
            state: Mutex::new(None),
        }
    }

    async fn client(&self) -> aws_sdk_s3::Client {
        match &self.client {
            Some(client) => client.clone(),
            None => client_from_env().await,
        }
    }
}

#[async_trait]
impl Receiver for S3Receiver {
    async fn file_info(&self, uri: &str, opts: &TransferOptions) -> Result<FileInfo, Error> {
        let (bucket, key) = resolve(uri, opts)?;
        let client = self.client().await;

        let head = client
            .head_object()
            .bucket(&bucket)
            .key(&key)
            .send()
            .await
            .map_err(|err| {
                let err = err.into_service_error();
                if err.is_not_found() {
                    Error::new(ErrorKind::NotFound, err)
                } else {
                    Error::new(ErrorKind::Io, err)
                }
            })?;

        let size = head
            .content_length()
            .filter(|len| *len >= 0)
            .map(|len| len as u64)
            .ok_or_else(|| {
                Error::new(
                    ErrorKind::Io,
                    format!("'{uri}' did not report a content length"),
                )
            })?;

        Ok(FileInfo { size })
    }

    async fn open(&self, uri: &str, opts: &TransferOptions) -> Result<(), Error> {
        let (bucket, key) = resolve(uri, opts)?;
        let client = self.client().await;
        let mut state = self.state.lock().expect("lock valid");
        *state = Some(S3State {
            bucket,
            key,
            client,
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().expect("lock valid").is_some()
    }

    async fn read_part(
        &self,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        opts: &TransferOptions,
    ) -> Result<Option<String>, Error> {
        let range = format!("bytes={}-{}", opts.range_start()?, opts.range_end()?);
        let S3State {
            bucket,
            key,
            client,
        } = {
            let state = self.state.lock().expect("lock valid");
            state
                .as_ref()
                .ok_or_else(|| Error::new(ErrorKind::Internal, "receiver is not open"))?
                .clone()
        };

        tracing::debug!(%range, "object read");
        let out = client
            .get_object()
            .bucket(&bucket)
            .key(&key)
            .range(&range)
            .send()
            .await
            .map_err(|err| {
                let err = err.into_service_error();
                if err.is_no_such_key() {
                    Error::new(ErrorKind::NotFound, err)
                } else {
                    Error::new(ErrorKind::Io, err)
                }
            })?;

        let expected = out.content_length().filter(|len| *len >= 0);
        let etag = out.e_tag().map(str::to_string);
        let mut body = out.body;

        let mut written: u64 = 0;
        loop {
            match body.try_next().await.map_err(from_kind(ErrorKind::Io))? {
                None => break,
                // a successful ranged read may end with an empty frame rather
                // than an explicit end-of-stream; treat it the same way
                Some(data) if data.is_empty() => break,
                Some(data) => {
                    sink.write_all(&data).await?;
                    written += data.len() as u64;
                }
            }
        }
        sink.flush().await?;

        if let Some(expected) = expected {
            if written != expected as u64 {
                return Err(Error::new(
                    ErrorKind::Integrity,
                    format!(
                        "incomplete read for range '{range}': expected {expected} bytes but received {written}"
                    ),
                ));
            }
        }

        Ok(etag)
    }

    async fn cancel(&self) -> Result<(), Error> {
        let mut state = self.state.lock().expect("lock valid");
        *state = None;
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        let mut state = self.state.lock().expect("lock valid");
        *state = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::operation::get_object::GetObjectOutput;
    use aws_sdk_s3::operation::head_object::HeadObjectOutput;
    use aws_sdk_s3::Client;
    use aws_smithy_mocks::{mock, mock_client};
    use aws_smithy_types::byte_stream::ByteStream;

    const URI: &str = "s3://s3.us-west-2.amazonaws.com/test-bucket/test-key";

    #[tokio::test]
    async fn test_file_info_from_head() {
        let head_rule = mock!(Client::head_object)
            .match_requests(|r| {
                r.bucket() == Some("test-bucket") && r.key() == Some("test-key")
            })
            .then_output(|| HeadObjectOutput::builder().content_length(1000).build());
        let client = mock_client!(aws_sdk_s3, &[&head_rule]);

        let receiver = S3Receiver::with_client(client);
        let info = receiver
            .file_info(URI, &TransferOptions::new())
            .await
            .unwrap();
        assert_eq!(1000, info.size);
    }

    #[tokio::test]
    async fn test_file_info_not_found() {
        let head_rule = mock!(Client::head_object).then_error(|| {
            aws_sdk_s3::operation::head_object::HeadObjectError::NotFound(
                aws_sdk_s3::types::error::NotFound::builder().build(),
            )
        });
        let client = mock_client!(aws_sdk_s3, &[&head_rule]);

        let receiver = S3Receiver::with_client(client);
        let err = receiver
            .file_info(URI, &TransferOptions::new())
            .await
            .unwrap_err();
        assert_eq!(&ErrorKind::NotFound, err.kind());
    }

    #[tokio::test]
    async fn test_read_part_streams_range_to_sink() {
        let bytes = &[0xEFu8; 100];
        let get_rule = mock!(Client::get_object)
            .match_requests(|r| r.range() == Some("bytes=100-199"))
            .then_output(|| {
                GetObjectOutput::builder()
                    .content_length(100)
                    .e_tag("part-etag")
                    .body(ByteStream::from_static(bytes))
                    .build()
            });
        let client = mock_client!(aws_sdk_s3, &[&get_rule]);

        let receiver = S3Receiver::with_client(client);
        let opts = TransferOptions::new().ranged(100, 199, 100);
        receiver.open(URI, &opts).await.unwrap();
        assert!(receiver.is_open());

        let mut sink = Vec::new();
        let etag = receiver.read_part(&mut sink, &opts).await.unwrap();
        assert_eq!(Some("part-etag".to_string()), etag);
        assert_eq!(bytes.as_slice(), sink.as_slice());
    }

    #[tokio::test]
    async fn test_read_part_detects_short_body() {
        let bytes = &[0u8; 40];
        let get_rule = mock!(Client::get_object).then_output(|| {
            GetObjectOutput::builder()
                .content_length(100)
                .body(ByteStream::from_static(bytes))
                .build()
        });
        let client = mock_client!(aws_sdk_s3, &[&get_rule]);

        let receiver = S3Receiver::with_client(client);
        let opts = TransferOptions::new().ranged(0, 99, 100);
        receiver.open(URI, &opts).await.unwrap();

        let mut sink = Vec::new();
        let err = receiver.read_part(&mut sink, &opts).await.unwrap_err();
        assert_eq!(&ErrorKind::Integrity, err.kind());
    }

    #[tokio::test]
    async fn test_read_part_requires_range_options() {
        let get_rule =
            mock!(Client::get_object).then_output(|| GetObjectOutput::builder().build());
        let client = mock_client!(aws_sdk_s3, &[&get_rule]);
        let receiver = S3Receiver::with_client(client);
        let opts = TransferOptions::new();
        receiver.open(URI, &opts).await.unwrap();

        let mut sink = Vec::new();
        let err = receiver.read_part(&mut sink, &opts).await.unwrap_err();
        assert_eq!(&ErrorKind::Config, err.kind());
    }
}
