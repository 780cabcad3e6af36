//! core
//!
//! Core domain types shared by every layer of refq.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Oid, RefName, Namespace, UtcTimestamp
//! - [`cancel`] - Caller-supplied cancellation token
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Validation happens once, at construction
//! - No I/O: everything here is pure and deterministic

pub mod cancel;
pub mod types;
