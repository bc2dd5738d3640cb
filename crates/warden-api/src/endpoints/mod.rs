// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// HTTP endpoint handlers

pub mod agent;
pub mod health;
