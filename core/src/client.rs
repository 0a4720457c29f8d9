//! Request builder and report renderer for the player's availability endpoint.
//!
//! # Design
//! `AvailabilityClient` holds only the target and carries no state between
//! calls. The caller executes the round-trip between
//! `build_available_files` and `render_report`. The body is never parsed:
//! whatever the player returns is shown byte-for-byte.

use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::ConnectionTarget;

/// Path the player serves its file list on.
pub const AVAILABLE_FILES_PATH: &str = "/api/available-files";

const USER_AGENT: &str = concat!("query-core/", env!("CARGO_PKG_VERSION"));

/// Synchronous, stateless client for the player's availability endpoint.
#[derive(Debug, Clone)]
pub struct AvailabilityClient {
    target: ConnectionTarget,
}

impl AvailabilityClient {
    pub fn new(target: ConnectionTarget) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// GET with default headers only and no body.
    pub fn build_available_files(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: AVAILABLE_FILES_PATH.to_string(),
            headers: vec![
                ("Host".to_string(), self.target.host_header()),
                ("Accept-Encoding".to_string(), "identity".to_string()),
                ("User-Agent".to_string(), USER_AGENT.to_string()),
            ],
        }
    }

    /// The status line followed by the raw body, each terminated by a newline.
    pub fn render_report(&self, response: &HttpResponse) -> Vec<u8> {
        let mut out = format!(
            "Status: {} and reason: {}\n",
            response.status, response.reason
        )
        .into_bytes();
        out.extend_from_slice(&response.body);
        out.push(b'\n');
        out
    }
}
