// SPDX-License-Identifier: AGPL-3.0-or-later

//! Trade Gateway - HTTP orchestration in front of a P2P trading engine
//!
//! This crate exposes a REST API over an externally-owned trading engine:
//! offer book, trade protocol state machine and deterministic wallet. The
//! engine owns all trading state; the gateway validates, orchestrates and
//! translates.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Wallet-password authentication and the bearer-token gate
//! - `bridge` - Adapts the engine's one-shot callbacks to awaitable results
//! - `engine` - Capability traits of the trading engine, plus the in-memory
//!   sandbox implementation
//! - `fees` - Fee and funding arithmetic
//! - `gateway` - Validated orchestration of engine operations

pub mod api;
pub mod auth;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod fees;
pub mod gateway;
pub mod models;
pub mod state;
