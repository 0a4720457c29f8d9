//! Blocking TCP transport: one connection, one request, one response.
//!
//! No timeouts are set, so a silent peer blocks the read indefinitely. The
//! stream is owned by `execute` and closed when it returns, on every path.

use std::io::{ErrorKind, Read, Write};
use std::net::TcpStream;

use anyhow::{Context, Result};
use query_core::{ConnectionTarget, HttpRequest, HttpResponse, ResponseDecoder};

const READ_CHUNK: usize = 8 * 1024;

/// Send `request` to `target` and read until the core has a full response.
pub fn execute(target: &ConnectionTarget, request: &HttpRequest) -> Result<HttpResponse> {
    log::debug!("connecting to {}:{}", target.host, target.port);
    let mut stream = TcpStream::connect((target.host.as_str(), target.port))
        .with_context(|| format!("failed to connect to {}:{}", target.host, target.port))?;

    let wire = request.to_bytes();
    stream.write_all(&wire).context("failed to send request")?;
    log::debug!(
        "sent {} {} ({} bytes)",
        request.method.as_str(),
        request.path,
        wire.len()
    );

    let peer = || format!("bad response from {}:{}", target.host, target.port);
    let mut decoder = ResponseDecoder::new();
    let mut chunk = [0u8; READ_CHUNK];
    let response = loop {
        let n = match stream.read(&mut chunk) {
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err).context("failed to read response"),
        };
        if n == 0 {
            break decoder.finish().with_context(peer)?;
        }
        if let Some(response) = decoder.feed(&chunk[..n]).with_context(peer)? {
            break response;
        }
    };

    log::debug!(
        "received {} {} with {} body bytes, closing connection",
        response.status,
        response.reason,
        response.body.len()
    );
    Ok(response)
}
