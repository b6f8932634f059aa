//! Core types shared across order facilities
//!
//! This crate provides the canonical schema constants used by both the
//! error facility and the logging facility of `order-core`, so that every
//! structured event carries the same field keys and event names.

pub mod schema;
