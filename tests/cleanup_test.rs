/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Temp-directory hygiene: whatever a transfer buffers on disk is gone by the
//! time the engines return, on success, failure and cancellation alike.
//!
//! This lives in its own test binary because it redirects the process temp
//! dir; the engines pick it up when they create their buffer directories.


use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use stream_transfer::operation::download::Downloader;
use stream_transfer::operation::upload::Uploader;
use stream_transfer::types::{keys, DataChunk, TransferOptions};

use test_utils::{MockReceiver, RecordingSender};

fn entries(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

#[tokio::test]
async fn test_no_temp_dirs_left_behind() {
    let scratch = tempfile::tempdir().unwrap();
    // single test in this binary, so redirecting the temp root is safe
    std::env::set_var("TMPDIR", scratch.path());

    let mut opts = TransferOptions::new();
    opts.set_content_length(1000);
    opts.set(keys::PART_SIZE, "100");

    // successful ranged download
    {
        let receiver = Arc::new(MockReceiver::serving(test_utils::patterned_body(1000)));
        let (data_tx, mut data_rx) = mpsc::channel(1);
        let drain = tokio::spawn(async move { while data_rx.recv().await.is_some() {} });
        Downloader::Ranged
            .download(
                CancellationToken::new(),
                "s3://host/bucket/key",
                &opts,
                data_tx,
                receiver,
            )
            .await
            .unwrap();
        drain.await.unwrap();
        assert!(entries(scratch.path()).is_empty(), "success leaves no dirs");
    }

    // cancelled ranged download
    {
        let receiver = Arc::new(MockReceiver {
            body: test_utils::patterned_body(1000),
            read_delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let cancel = CancellationToken::new();
        let (data_tx, _data_rx) = mpsc::channel(1);
        let cancel_after = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel_after.cancel();
        });
        let _ = Downloader::Ranged
            .download(cancel, "s3://host/bucket/key", &opts, data_tx, receiver)
            .await;
        assert!(
            entries(scratch.path()).is_empty(),
            "cancellation leaves no dirs"
        );
    }

    // failed multipart upload
    {
        let sender = Arc::new(RecordingSender {
            fail_part: Some(1),
            ..Default::default()
        });
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            let chunk = DataChunk {
                data: test_utils::patterned_body(256 * 1024),
                bytes_so_far: 256 * 1024,
                total_bytes: 256 * 1024,
            };
            let _ = tx.send(chunk).await;
        });
        let _ = Uploader::Multipart
            .upload(
                CancellationToken::new(),
                "s3://host/bucket/key",
                &TransferOptions::new(),
                rx,
                sender,
            )
            .await
            .unwrap_err();
        assert!(entries(scratch.path()).is_empty(), "failure leaves no dirs");
    }
}
