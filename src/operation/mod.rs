/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// Download engine: drives a receiver to produce an ordered byte stream
pub mod download;

/// Upload engine: consumes the byte stream and drives a sender
pub mod upload;

/// Transfer orchestrator
pub mod transfer;
