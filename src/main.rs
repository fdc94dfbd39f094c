/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Thin CLI wrapper around [`stream_transfer::transfer`].

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use stream_transfer::error::ErrorKind;
use stream_transfer::types::{keys, TransferOptions};

#[derive(Parser, Debug)]
#[command(
    name = "stream-transfer",
    about = "Streaming byte-for-byte transfers between URL-addressed endpoints",
    version
)]
struct Cli {
    /// Source URL (http, https or s3 scheme)
    src: String,

    /// Destination URL (file or s3 scheme)
    dst: String,

    /// Bucket addressing style for s3 URLs: path-style or virtual-hosted-style
    #[arg(long)]
    bucket_name_style: Option<String>,

    /// Part size in bytes for ranged downloads
    #[arg(long)]
    part_size: Option<u64>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut opts = TransferOptions::new();
    if let Some(style) = cli.bucket_name_style {
        opts.set(keys::BUCKET_NAME_STYLE, style);
    }
    if let Some(part_size) = cli.part_size {
        opts.set(keys::PART_SIZE, part_size.to_string());
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling transfer");
                cancel.cancel();
            }
        });
    }

    tracing::info!(src = cli.src, dst = cli.dst, "starting transfer");
    match stream_transfer::transfer(&cancel, &cli.src, &cli.dst, &opts).await {
        Ok(()) => tracing::info!("transfer complete"),
        Err(err) => {
            eprintln!("transfer failed: {}", render(&err));
            std::process::exit(exit_code(err.kind()));
        }
    }
}

fn exit_code(kind: &ErrorKind) -> i32 {
    match kind {
        ErrorKind::Config => 1,
        ErrorKind::Cancelled => 130,
        _ => 2,
    }
}

/// Render the full cause chain, outermost first.
fn render(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
