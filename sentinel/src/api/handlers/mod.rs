//! HTTP request handlers.
//!
//! - [`costs`]: the cost report (JSON and CSV) and its CORS preflight
//!
//! Handlers return [`crate::errors::Result`]; failures become a 500 with an `{"error": ...}` body.

pub mod costs;
