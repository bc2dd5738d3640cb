// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod echo;

pub use echo::{echo_reply, ws_handler, ECHO_PREFIX, GREETING};
