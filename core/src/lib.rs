//! I/O-free client core for the player's available-files endpoint.
//!
//! # Overview
//! Builds the `GET /api/available-files` request, decodes the raw HTTP/1.1
//! response bytes, and renders the two-line report. The caller owns the
//! socket (host-does-IO pattern), so everything here is testable on byte
//! strings.
//!
//! # Design
//! - `AvailabilityClient` is stateless; it holds only the `ConnectionTarget`.
//! - `ResponseDecoder` is incremental so the caller can stop reading as soon
//!   as a full response has arrived, without re-decoding earlier reads.
//! - The response body is never interpreted.

pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::{AvailabilityClient, AVAILABLE_FILES_PATH};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, ResponseDecoder};
pub use types::{ConnectionTarget, DEFAULT_HOST, DEFAULT_PORT};
