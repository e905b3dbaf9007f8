//! Core building blocks for signing blob storage API requests.
//!
//! This crate carries the pieces shared by every service crate in the
//! workspace:
//!
//! - [`Error`] and [`Result`]: the error taxonomy for local, deterministic
//!   validation failures. Nothing in this workspace retries; bad input is
//!   surfaced to the caller immediately.
//! - [`SigningRequest`]: a canonicalization context built from
//!   [`http::request::Parts`], with helpers for the header/query shuffling
//!   that string-to-sign construction needs.
//! - [`hash`]: base64 and HMAC-SHA256 helpers.
//! - [`time`]: UTC timestamps in the formats signing contracts require.
//! - [`utils`]: secret redaction for `Debug` output.
//!
//! All types here are plain values: they hold no shared mutable state and may
//! be used freely from concurrent tasks.

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod error;
pub use error::{Error, ErrorKind, Result};

mod request;
pub use request::SigningRequest;
