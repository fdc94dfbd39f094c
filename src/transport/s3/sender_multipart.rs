/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Mutex;

use async_trait::async_trait;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};

use crate::error::{Error, ErrorKind};
use crate::io::PartBody;
use crate::transport::s3::{client_from_env, resolve};
use crate::transport::Sender;
use crate::types::TransferOptions;

/// Sender for `s3` destinations at or above the multipart threshold.
///
/// [`open`](Sender::open) initiates the multipart upload and keeps the upload
/// id; each [`write_part`](Sender::write_part) issues an `UploadPart` and
/// records the `(partNumber, etag)` pair. [`close`](Sender::close) commits the
/// recorded parts sorted ascending by part number; [`cancel`](Sender::cancel)
/// aborts the remote upload. Close and cancel are terminal and mutually
/// exclusive.
#[derive(Debug, Default)]
pub struct S3MultipartSender {
    client: Option<aws_sdk_s3::Client>,
    state: Mutex<Option<MultipartState>>,
}

#[derive(Debug)]
struct MultipartState {
    bucket: String,
    key: String,
    upload_id: String,
    client: aws_sdk_s3::Client,
    parts: Vec<CompletedPart>,
}

impl S3MultipartSender {
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
impl Sender for S3MultipartSender {
    async fn open(&self, uri: &str, opts: &TransferOptions) -> Result<(), Error> {
        let (bucket, key) = resolve(uri, opts)?;
        let client = match &self.client {
            Some(client) => client.clone(),
            None => client_from_env().await,
        };

        let created = client
            .create_multipart_upload()
            .bucket(&bucket)
            .key(&key)
            .send()
            .await
            .map_err(|err| Error::new(ErrorKind::Io, err.into_service_error()))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| Error::new(ErrorKind::Io, "no upload id in CreateMultipartUpload"))?
            .to_string();
        tracing::debug!(upload_id, "multipart upload initiated");

        let mut state = self.state.lock().expect("lock valid");
        *state = Some(MultipartState {
            bucket,
            key,
            upload_id,
            client,
            parts: Vec::new(),
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().expect("lock valid").is_some()
    }

    async fn write_part(
        &self,
        body: PartBody,
        opts: &TransferOptions,
    ) -> Result<Option<String>, Error> {
        let part_number = opts.part_number()?;
        let (bucket, key, upload_id, client) = {
            let state = self.state.lock().expect("lock valid");
            let state = state
                .as_ref()
                .ok_or_else(|| Error::new(ErrorKind::Internal, "sender is not open"))?;
            (
                state.bucket.clone(),
                state.key.clone(),
                state.upload_id.clone(),
                state.client.clone(),
            )
        };

        tracing::debug!(part_number, len = body.len(), "part write");
        let body = body.into_byte_stream().await?;
        let out = client
            .upload_part()
            .bucket(&bucket)
            .key(&key)
            .upload_id(&upload_id)
            .part_number(part_number as i32)
            .body(body)
            .send()
            .await
            .map_err(|err| Error::new(ErrorKind::Io, err.into_service_error()))?;

        let etag = out.e_tag().map(str::to_string);
        let completed = CompletedPart::builder()
            .set_e_tag(etag.clone())
            .part_number(part_number as i32)
            .build();

        let mut state = self.state.lock().expect("lock valid");
        if let Some(state) = state.as_mut() {
            state.parts.push(completed);
        }

        Ok(etag)
    }

    async fn cancel(&self) -> Result<(), Error> {
        // terminal and idempotent: the first call takes the session
        let Some(state) = self.state.lock().expect("lock valid").take() else {
            return Ok(());
        };

        tracing::debug!(upload_id = state.upload_id, "aborting multipart upload");
        state
            .client
            .abort_multipart_upload()
            .bucket(&state.bucket)
            .key(&state.key)
            .upload_id(&state.upload_id)
            .send()
            .await
            .map_err(|err| Error::new(ErrorKind::Io, err.into_service_error()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        let Some(mut state) = self.state.lock().expect("lock valid").take() else {
            return Err(Error::new(
                ErrorKind::Internal,
                "close called on a sender that is not open",
            ));
        };

        // commit requires parts in ascending order regardless of completion order
        state.parts.sort_by_key(|part| part.part_number());

        tracing::debug!(
            upload_id = state.upload_id,
            parts = state.parts.len(),
            "completing multipart upload"
        );
        state
            .client
            .complete_multipart_upload()
            .bucket(&state.bucket)
            .key(&state.key)
            .upload_id(&state.upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(state.parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|err| Error::new(ErrorKind::Io, err.into_service_error()))?;
        Ok(())
    }
}
