/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, ErrorKind};
use crate::io::PartBody;
use crate::transport::Sender;
use crate::types::TransferOptions;

/// Sender that writes the destination file at the exact path named by a
/// `file://` URL.
///
/// Parts are appended sequentially in the order they arrive, so this sender
/// pairs with the simple upload strategy. `cancel` unlinks the partial file so
/// that no artifact remains at the destination on failure.
#[derive(Debug, Default)]
pub struct LocalFileSender {
    state: tokio::sync::Mutex<Option<FsState>>,
    open: AtomicBool,
}

#[derive(Debug)]
struct FsState {
    file: File,
    path: PathBuf,
}

impl LocalFileSender {
    /// Create an unopened local-file sender.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Sender for LocalFileSender {
    async fn open(&self, uri: &str, _opts: &TransferOptions) -> Result<(), Error> {
        let path = crate::uri::local_file_path(uri)?;
        let file = File::create(&path).await?;
        *self.state.lock().await = Some(FsState { file, path });
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn write_part(
        &self,
        body: PartBody,
        _opts: &TransferOptions,
    ) -> Result<Option<String>, Error> {
        let mut state = self.state.lock().await;
        let state = state
            .as_mut()
            .ok_or_else(|| Error::new(ErrorKind::Internal, "sender is not open"))?;
        body.copy_to(&mut state.file).await?;
        Ok(None)
    }

    async fn cancel(&self) -> Result<(), Error> {
        self.open.store(false, Ordering::SeqCst);
        let taken = self.state.lock().await.take();
        if let Some(state) = taken {
            drop(state.file);
            match tokio::fs::remove_file(&state.path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        self.open.store(false, Ordering::SeqCst);
        let taken = self.state.lock().await.take();
        if let Some(mut state) = taken {
            state.file.flush().await?;
            state.file.sync_all().await?;
        }
        Ok(())
    }
}
