/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! End-to-end transfers against an in-process HTTP origin.

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

use stream_transfer::error::ErrorKind;
use stream_transfer::types::TransferOptions;

/// Serve `body` at `/file.bin` on an ephemeral port.
async fn serve(body: Vec<u8>) -> SocketAddr {
    let app = Router::new().route("/file.bin", get(move || async move { body.clone() }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    addr
}

#[tokio::test]
async fn test_http_to_file_round_trip() {
    let body = vec![0xEFu8; 1000];
    let addr = serve(body.clone()).await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("file.bin");

    let cancel = CancellationToken::new();
    stream_transfer::transfer(
        &cancel,
        &format!("http://{addr}/file.bin"),
        &format!("file://{}", dest.display()),
        &TransferOptions::new(),
    )
    .await
    .unwrap();

    let written = std::fs::read(&dest).unwrap();
    assert_eq!(body, written);

    // cancelling a completed transfer is a no-op
    cancel.cancel();
    assert_eq!(body, std::fs::read(&dest).unwrap());
}

#[tokio::test]
async fn test_missing_source_is_not_found() {
    let addr = serve(vec![1, 2, 3]).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.bin");

    let err = stream_transfer::transfer(
        &CancellationToken::new(),
        &format!("http://{addr}/no-such-file.bin"),
        &format!("file://{}", dest.display()),
        &TransferOptions::new(),
    )
    .await
    .unwrap_err();

    assert_eq!(&ErrorKind::NotFound, err.kind());
    assert!(!dest.exists(), "no artifact is created for a failed probe");
}

#[tokio::test]
async fn test_unknown_source_scheme_is_config_error() {
    let err = stream_transfer::transfer(
        &CancellationToken::new(),
        "gopher://example.com/file.bin",
        "file:///tmp/out.bin",
        &TransferOptions::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(&ErrorKind::Config, err.kind());
}

#[tokio::test]
async fn test_unknown_destination_scheme_is_config_error() {
    let addr = serve(vec![0u8; 16]).await;

    let err = stream_transfer::transfer(
        &CancellationToken::new(),
        &format!("http://{addr}/file.bin"),
        "smb://example.com/out.bin",
        &TransferOptions::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(&ErrorKind::Config, err.kind());
}

#[tokio::test]
async fn test_malformed_urls_are_config_errors() {
    let err = stream_transfer::transfer(
        &CancellationToken::new(),
        "not a url at all",
        "file:///tmp/out.bin",
        &TransferOptions::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(&ErrorKind::Config, err.kind());
}

#[tokio::test]
async fn test_empty_source_creates_empty_destination() {
    let addr = serve(Vec::new()).await;
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("empty.bin");

    stream_transfer::transfer(
        &CancellationToken::new(),
        &format!("http://{addr}/file.bin"),
        &format!("file://{}", dest.display()),
        &TransferOptions::new(),
    )
    .await
    .unwrap();

    assert_eq!(0, std::fs::metadata(&dest).unwrap().len());
}
