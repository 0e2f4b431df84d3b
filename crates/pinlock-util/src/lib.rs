//! Shared utilities for pinlock.
//!
//! This crate provides cross-cutting concerns used by the other pinlock crates:
//! the unified error type, filesystem helpers for atomic lock-file promotion,
//! and terminal status lines and progress indicators.

pub mod errors;
pub mod fs;
pub mod progress;
