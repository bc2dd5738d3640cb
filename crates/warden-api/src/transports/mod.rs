// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// Transport adapters: HTTP routes and the echo WebSocket channel

pub mod http;
pub mod websocket;
