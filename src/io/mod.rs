/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

mod chan_sink;
mod part_body;

// re-exports
pub(crate) use self::chan_sink::ChannelSink;
pub use self::part_body::PartBody;
