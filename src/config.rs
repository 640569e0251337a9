// SPDX-License-Identifier: AGPL-3.0-or-later

//! # Runtime Configuration Constants
//!
//! Environment variable names and default values. Configuration is read from
//! the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `WALLET_PASSWORD` | Seed the sandbox wallet with this password | unset |
//! | `SEED_BALANCE` | Seed the sandbox wallet balance, in satoshi | `0` |

/// Environment variable name for the server bind address.
pub const HOST_ENV: &str = "HOST";

/// Default server bind address.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Environment variable name for the server bind port.
pub const PORT_ENV: &str = "PORT";

/// Default server bind port.
pub const DEFAULT_PORT: u16 = 8080;

/// Environment variable name for the logging format (`json` or `pretty`).
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter when none is set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Environment variable name for the sandbox wallet password seed.
pub const WALLET_PASSWORD_ENV: &str = "WALLET_PASSWORD";

/// Environment variable name for the sandbox wallet balance seed.
pub const SEED_BALANCE_ENV: &str = "SEED_BALANCE";
