//! Error types for the availability query core.
//!
//! # Design
//! Every variant describes a response the decoder refused to accept. The
//! core never touches a socket, so transport failures (refused connection,
//! DNS, resets) belong to the caller and are not represented here.

use std::fmt;

/// Errors returned by `ResponseDecoder` and `HttpResponse::parse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The peer closed the connection before sending a single byte.
    EmptyResponse,

    /// The peer closed the connection in the middle of the head or body.
    IncompleteResponse,

    /// The first line is not `HTTP/<version> <3-digit code> [reason]`.
    MalformedStatusLine(String),

    /// A header line has no `:` separator or is not valid text.
    MalformedHeader(String),

    /// `Content-Length` is not a number, or several disagree.
    InvalidContentLength(String),

    /// A chunk-size line of a chunked body is not valid hex.
    MalformedChunk(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::EmptyResponse => {
                write!(f, "remote end closed connection without response")
            }
            ApiError::IncompleteResponse => {
                write!(f, "remote end closed connection mid-response")
            }
            ApiError::MalformedStatusLine(line) => {
                write!(f, "malformed status line: {line:?}")
            }
            ApiError::MalformedHeader(line) => write!(f, "malformed header: {line:?}"),
            ApiError::InvalidContentLength(value) => {
                write!(f, "invalid content-length: {value:?}")
            }
            ApiError::MalformedChunk(line) => write!(f, "malformed chunk size: {line:?}"),
        }
    }
}

impl std::error::Error for ApiError {}
