/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, ErrorKind};
use crate::io::PartBody;
use crate::transport::s3::{client_from_env, resolve};
use crate::transport::Sender;
use crate::types::TransferOptions;

/// Sender for `s3` destinations below the multipart threshold.
///
/// Writes the whole object with a single `PutObject`; the part number option
/// is ignored.
#[derive(Debug, Default)]
pub struct S3SimpleSender {
    client: Option<aws_sdk_s3::Client>,
    state: Mutex<Option<S3State>>,
}

#[derive(Debug, Clone)]
struct S3State {
    bucket: String,
    key: String,
    client: aws_sdk_s3::Client,
}

impl S3SimpleSender {
    /// Create a sender whose client is built from the environment at
    /// [`open`](Sender::open) time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sender that uses the given client.
    pub fn with_client(client: aws_sdk_s3::Client) -> Self {
        Self {
            client: Some(client),
            state: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Sender for S3SimpleSender {
    async fn open(&self, uri: &str, opts: &TransferOptions) -> Result<(), Error> {
        let (bucket, key) = resolve(uri, opts)?;
        let client = match &self.client {
            Some(client) => client.clone(),
            None => client_from_env().await,
        };
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

    async fn write_part(
        &self,
        body: PartBody,
        _opts: &TransferOptions,
    ) -> Result<Option<String>, Error> {
        let S3State {
            bucket,
            key,
            client,
        } = {
            let state = self.state.lock().expect("lock valid");
            state
                .as_ref()
                .ok_or_else(|| Error::new(ErrorKind::Internal, "sender is not open"))?
                .clone()
        };

        tracing::debug!(len = body.len(), "single object write");
        let body = body.into_byte_stream().await?;
        let out = client
            .put_object()
            .bucket(&bucket)
            .key(&key)
            .body(body)
            .send()
            .await
            .map_err(|err| Error::new(ErrorKind::Io, err.into_service_error()))?;

        Ok(out.e_tag().map(str::to_string))
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
