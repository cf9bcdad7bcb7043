//! # CLI Module
//!
//! Command-line access to the route index and the middleware.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! Load a document and list its servers and operations:
//!
//! ```bash
//! specguard routes --spec openapi.yaml
//! ```
//!
//! ### `check`
//!
//! Run a single request through the middleware:
//!
//! ```bash
//! specguard check --spec openapi.yaml -X POST --url /pets \
//!     -H 'Content-Type: application/json' --data '{"name": "Rex"}'
//! ```
//!
//! Prints `forwarded` and exits 0 when the request would reach the wrapped
//! handler; otherwise prints the status and message and exits 1.
//!
//! ## Logging
//!
//! Logs go to stderr. `RUST_LOG` takes precedence; `-v` lowers the default
//! level from `warn` to `debug`. The middleware endpoints follow the
//! `SPECGUARD_*` variables described in [`crate::config`].

mod commands;


pub use commands::{execute, init_logging, run_cli, Cli, Commands};
