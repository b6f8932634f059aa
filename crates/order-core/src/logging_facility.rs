//! Structured logging facility
//!
//! - single initialization point via `init(profile)`
//! - operation macros (`log_op_start!`, `log_op_end!`, `log_op_error!`) used
//!   by the boundary operations of [`Analysis`](crate::ops::Analysis)
//! - an in-memory capture layer for assertions in tests
//!
//! Lower layers (indices, the relation manager, the copy engine) only emit
//! `tracing::debug!` events.
//!
//! # Usage
//!
//! ```rust
//! use order_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
