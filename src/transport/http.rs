/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use reqwest::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{from_kind, Error, ErrorKind};
use crate::transport::Receiver;
use crate::types::{FileInfo, TransferOptions};

/// Receiver for `http`/`https` sources.
///
/// Delivers the entire body with a single GET per [`read_part`] call; the
/// range options are ignored. The source must report a content length for the
/// probe to succeed.
///
/// [`read_part`]: Receiver::read_part
#[derive(Debug, Default)]
pub struct HttpReceiver {
    state: Mutex<Option<HttpState>>,
}

#[derive(Debug, Clone)]
struct HttpState {
    uri: String,
    client: reqwest::Client,
}

impl HttpReceiver {
    /// Create an unopened HTTP receiver.
    pub fn new() -> Self {
        Self::default()
    }
}

fn content_length_of(response: &reqwest::Response) -> Result<Option<u64>, Error> {
    match response.headers().get(CONTENT_LENGTH) {
        None => Ok(None),
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|err| Error::new(ErrorKind::Io, err.to_string()))?;
            let length = raw
                .parse()
                .map_err(|_| Error::new(ErrorKind::Io, format!("bad content length '{raw}'")))?;
            Ok(Some(length))
        }
    }
}

#[async_trait]
impl Receiver for HttpReceiver {
    async fn file_info(&self, uri: &str, _opts: &TransferOptions) -> Result<FileInfo, Error> {
        let client = reqwest::Client::new();
        let response = client
            .head(uri)
            .send()
            .await
            .map_err(from_kind(ErrorKind::Io))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::new(ErrorKind::NotFound, format!("'{uri}' not found")));
        }
        if !response.status().is_success() {
            return Err(Error::new(
                ErrorKind::Io,
                format!("probe of '{uri}' failed with status {}", response.status()),
            ));
        }

        let size = content_length_of(&response)?.ok_or_else(|| {
            Error::new(
                ErrorKind::Config,
                format!("'{uri}' did not report a content length"),
            )
        })?;

        Ok(FileInfo { size })
    }

    async fn open(&self, uri: &str, _opts: &TransferOptions) -> Result<(), Error> {
        let mut state = self.state.lock().expect("lock valid");
        *state = Some(HttpState {
            uri: uri.to_string(),
            client: reqwest::Client::new(),
        });
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().expect("lock valid").is_some()
    }

    async fn read_part(
        &self,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        _opts: &TransferOptions,
    ) -> Result<Option<String>, Error> {
        let HttpState { uri, client } = {
            let state = self.state.lock().expect("lock valid");
            state
                .as_ref()
                .ok_or_else(|| Error::new(ErrorKind::Internal, "receiver is not open"))?
                .clone()
        };

        let response = client
            .get(&uri)
            .send()
            .await
            .map_err(from_kind(ErrorKind::Io))?;
        if !response.status().is_success() {
            return Err(Error::new(
                ErrorKind::Io,
                format!("GET '{uri}' failed with status {}", response.status()),
            ));
        }

        let reported = content_length_of(&response)?;

        let mut written: u64 = 0;
        let mut body = std::pin::pin!(response.bytes_stream());
        while let Some(data) = body.next().await {
            let data = data.map_err(from_kind(ErrorKind::Io))?;
            sink.write_all(&data).await?;
            written += data.len() as u64;
            tracing::trace!(written, "received data");
        }
        sink.flush().await?;

        if let Some(expected) = reported {
            if written != expected {
                return Err(Error::new(
                    ErrorKind::Integrity,
                    format!("incomplete read: expected {expected} bytes but received {written}"),
                ));
            }
        }

        Ok(None)
    }

    async fn cancel(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        let mut state = self.state.lock().expect("lock valid");
        *state = None;
        Ok(())
    }
}
