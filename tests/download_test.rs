/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */


use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use stream_transfer::error::ErrorKind;
use stream_transfer::operation::download::Downloader;
use stream_transfer::types::{keys, DataChunk, TransferOptions};

use test_utils::MockReceiver;

fn ranged_opts(content_length: u64, part_size: u64) -> TransferOptions {
    let mut opts = TransferOptions::new();
    opts.set_content_length(content_length);
    opts.set(keys::PART_SIZE, part_size.to_string());
    opts
}

async fn collect(mut data_rx: mpsc::Receiver<DataChunk>) -> Vec<DataChunk> {
    let mut chunks = Vec::new();
    while let Some(chunk) = data_rx.recv().await {
        chunks.push(chunk);
    }
    chunks
}

#[tokio::test]
async fn test_ranged_download_reassembles_in_order() {
    // workers finish in randomized order; delivery must stay in source order
    let body = test_utils::patterned_body(1000);
    let receiver = Arc::new(MockReceiver {
        body: body.clone(),
        max_read_delay_ms: 30,
        ..Default::default()
    });

    let (data_tx, data_rx) = mpsc::channel(1);
    let collector = tokio::spawn(collect(data_rx));

    Downloader::Ranged
        .download(
            CancellationToken::new(),
            "s3://host/bucket/key",
            &ranged_opts(1000, 100),
            data_tx,
            receiver.clone(),
        )
        .await
        .unwrap();

    let chunks = collector.await.unwrap();
    assert_eq!(10, chunks.len());
    assert_eq!(10, receiver.reads());

    let mut assembled = Vec::new();
    let mut last = 0u64;
    for chunk in &chunks {
        assert!(chunk.bytes_so_far > last, "bytes_so_far strictly increases");
        assert_eq!(1000, chunk.total_bytes);
        last = chunk.bytes_so_far;
        assembled.extend_from_slice(&chunk.data);
    }
    assert_eq!(1000, last);
    assert_eq!(body.as_ref(), assembled.as_slice());
}

#[tokio::test]
async fn test_part_count_and_final_part_size() {
    // 1000 bytes at partSize 300 -> parts of 300,300,300,100
    let body = test_utils::patterned_body(1000);
    let receiver = Arc::new(MockReceiver::serving(body.clone()));

    let (data_tx, data_rx) = mpsc::channel(1);
    let collector = tokio::spawn(collect(data_rx));

    Downloader::Ranged
        .download(
            CancellationToken::new(),
            "s3://host/bucket/key",
            &ranged_opts(1000, 300),
            data_tx,
            receiver.clone(),
        )
        .await
        .unwrap();

    let chunks = collector.await.unwrap();
    assert_eq!(4, receiver.reads());
    let sizes: Vec<usize> = chunks.iter().map(|c| c.data.len()).collect();
    assert_eq!(vec![300, 300, 300, 100], sizes);
}

#[tokio::test]
async fn test_part_size_defaults_to_content_length_for_small_sources() {
    let body = test_utils::patterned_body(1000);
    let receiver = Arc::new(MockReceiver::serving(body.clone()));

    let mut opts = TransferOptions::new();
    opts.set_content_length(1000);

    let (data_tx, data_rx) = mpsc::channel(1);
    let collector = tokio::spawn(collect(data_rx));

    Downloader::Ranged
        .download(
            CancellationToken::new(),
            "s3://host/bucket/key",
            &opts,
            data_tx,
            receiver.clone(),
        )
        .await
        .unwrap();

    let chunks = collector.await.unwrap();
    // one part: the default part size is clamped to the source size
    assert_eq!(1, receiver.reads());
    let assembled: Vec<u8> = chunks.iter().flat_map(|c| c.data.to_vec()).collect();
    assert_eq!(body.as_ref(), assembled.as_slice());
}

#[tokio::test]
async fn test_missing_content_length_refuses_to_start() {
    let receiver = Arc::new(MockReceiver::serving(vec![0u8; 10]));
    let (data_tx, mut data_rx) = mpsc::channel(1);

    let err = Downloader::Ranged
        .download(
            CancellationToken::new(),
            "s3://host/bucket/key",
            &TransferOptions::new(),
            data_tx,
            receiver.clone(),
        )
        .await
        .unwrap_err();

    assert_eq!(&ErrorKind::Config, err.kind());
    assert_eq!(0, receiver.reads());
    // the channel is closed without any data
    assert!(data_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_zero_content_length_refuses_to_start() {
    let receiver = Arc::new(MockReceiver::serving(Vec::<u8>::new()));
    let (data_tx, _data_rx) = mpsc::channel(1);

    let err = Downloader::Ranged
        .download(
            CancellationToken::new(),
            "s3://host/bucket/key",
            &ranged_opts(0, 100),
            data_tx,
            receiver,
        )
        .await
        .unwrap_err();

    assert_eq!(&ErrorKind::Config, err.kind());
}

#[tokio::test]
async fn test_open_error_propagates_and_closes_channel() {
    let receiver = Arc::new(MockReceiver {
        body: test_utils::patterned_body(1000),
        open_error: Some("open error"),
        ..Default::default()
    });
    let (data_tx, mut data_rx) = mpsc::channel(1);

    let err = Downloader::Ranged
        .download(
            CancellationToken::new(),
            "s3://host/bucket/key",
            &ranged_opts(1000, 100),
            data_tx,
            receiver,
        )
        .await
        .unwrap_err();

    assert_eq!(&ErrorKind::Io, err.kind());
    let source = std::error::Error::source(&err).expect("source set");
    assert!(source.to_string().contains("open error"));
    assert!(data_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_worker_failure_wins_and_stops_the_download() {
    // the read for range [500,600) fails; the engine must return that error
    let receiver = Arc::new(MockReceiver {
        body: test_utils::patterned_body(1000),
        fail_range_start: Some(500),
        max_read_delay_ms: 10,
        ..Default::default()
    });
    let (data_tx, data_rx) = mpsc::channel(1);
    let collector = tokio::spawn(collect(data_rx));

    let err = Downloader::Ranged
        .download(
            CancellationToken::new(),
            "s3://host/bucket/key",
            &ranged_opts(1000, 100),
            data_tx,
            receiver,
        )
        .await
        .unwrap_err();

    assert_eq!(&ErrorKind::Io, err.kind());
    let source = std::error::Error::source(&err).expect("source set");
    assert!(source.to_string().contains("range read failed"));

    // whatever was delivered before the failure is a strict in-order prefix
    let chunks = collector.await.unwrap();
    let mut expected_so_far = 0u64;
    for chunk in &chunks {
        expected_so_far += chunk.data.len() as u64;
        assert_eq!(expected_so_far, chunk.bytes_so_far);
    }
    assert!(expected_so_far <= 500);
}

#[tokio::test]
async fn test_cancellation_mid_flight_returns_promptly() {
    let receiver = Arc::new(MockReceiver {
        body: test_utils::patterned_body(1000),
        read_delay: Some(Duration::from_millis(200)),
        ..Default::default()
    });
    let cancel = CancellationToken::new();
    let (data_tx, data_rx) = mpsc::channel(1);
    let collector = tokio::spawn(collect(data_rx));

    let cancel_after = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel_after.cancel();
    });

    let started = Instant::now();
    let err = Downloader::Ranged
        .download(
            cancel,
            "s3://host/bucket/key",
            &ranged_opts(1000, 100),
            data_tx,
            receiver,
        )
        .await
        .unwrap_err();

    assert_eq!(&ErrorKind::Cancelled, err.kind());
    assert!(
        started.elapsed() < Duration::from_millis(150),
        "cancellation must not wait for in-flight reads"
    );
    let chunks = collector.await.unwrap();
    assert!(chunks.is_empty());
}
