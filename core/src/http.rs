//! HTTP/1.1 messages as plain data, plus their wire encoding.
//!
//! # Design
//! The core writes request bytes and reads response bytes but never owns a
//! socket. `ResponseDecoder` is fed whatever the caller read and keeps its
//! position between calls, so each byte is looked at once after the head.
//! Keep-alive servers that never close the connection are handled without a
//! `Connection: close` header because the decoder knows where the body ends.
//!
//! Status lines, headers, and chunk sizes are parsed by `httparse`, which
//! keeps the reason phrase exactly as sent and accepts bare `\n` line ends.

use crate::error::ApiError;

/// Upper bound on response header lines.
const MAX_HEADERS: usize = 64;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `AvailabilityClient::build_available_files`. `path` is the
/// origin-form request target; the authority travels in the `Host` header.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Serialise to HTTP/1.1 wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(self.method.as_str());
        out.push(' ');
        out.push_str(&self.path);
        out.push_str(" HTTP/1.1\r\n");
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        out.into_bytes()
    }
}

/// An HTTP response described as plain data.
///
/// `body` holds the payload after transfer decoding (de-chunking) but is
/// otherwise untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// First header value named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decode a response from a buffer holding everything received so far.
    ///
    /// Returns `Ok(None)` while more bytes are needed. `eof` says the peer
    /// has closed the connection. Callers reading from a socket should keep
    /// a `ResponseDecoder` instead of calling this after every read.
    pub fn parse(buf: &[u8], eof: bool) -> Result<Option<Self>, ApiError> {
        let mut decoder = ResponseDecoder::new();
        match decoder.feed(buf)? {
            Some(response) => Ok(Some(response)),
            None if eof => decoder.finish().map(Some),
            None => Ok(None),
        }
    }
}

/// Incremental response decoder.
///
/// `feed` returns the response as soon as it is complete; bytes after it are
/// ignored. When the peer closes first, `finish` completes a body delimited
/// by the close or reports what was missing. Interim `1xx` responses are
/// skipped.
#[derive(Debug, Default)]
pub struct ResponseDecoder {
    /// Received bytes not yet consumed.
    pending: Vec<u8>,
    received_any: bool,
    state: State,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Head,
    Body {
        head: Head,
        framing: Framing,
        body: Vec<u8>,
    },
    Done,
}

/// How the end of the body is found.
#[derive(Debug, PartialEq, Eq)]
enum Framing {
    Length(usize),
    Chunked(Chunk),
    UntilClose,
}

/// Position inside a chunked body.
#[derive(Debug, PartialEq, Eq)]
enum Chunk {
    Size,
    Data(u64),
    DataEnd,
    Trailers,
}

/// Outcome of one decoding step.
enum Step {
    Continue,
    NeedMore,
    Complete,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `data` and decode as far as it goes.
    pub fn feed(&mut self, data: &[u8]) -> Result<Option<HttpResponse>, ApiError> {
        if matches!(self.state, State::Done) {
            return Ok(None);
        }
        self.received_any |= !data.is_empty();
        self.pending.extend_from_slice(data);

        let mut pos = 0;
        let step = loop {
            match self.step(&mut pos) {
                Ok(Step::Continue) => continue,
                Ok(step) => break step,
                Err(err) => {
                    self.state = State::Done;
                    return Err(err);
                }
            }
        };
        self.pending.drain(..pos);

        match step {
            Step::Complete => Ok(self.take_response()),
            _ => Ok(None),
        }
    }

    /// The peer closed the connection.
    pub fn finish(&mut self) -> Result<HttpResponse, ApiError> {
        if matches!(self.state, State::Head) && !self.received_any {
            return Err(ApiError::EmptyResponse);
        }
        let delimited_by_close = matches!(
            self.state,
            State::Body {
                framing: Framing::UntilClose,
                ..
            }
        );
        if delimited_by_close {
            return self.take_response().ok_or(ApiError::IncompleteResponse);
        }
        Err(ApiError::IncompleteResponse)
    }

    fn step(&mut self, pos: &mut usize) -> Result<Step, ApiError> {
        let data = &self.pending[*pos..];
        let parsed = match &mut self.state {
            State::Done => return Ok(Step::Complete),
            State::Body { framing, body, .. } => return step_body(framing, data, body, pos),
            State::Head => parse_head(data)?,
        };

        let Some((len, head)) = parsed else {
            return Ok(Step::NeedMore);
        };
        *pos += len;
        if !head.is_interim() {
            let framing = head.framing()?;
            self.state = State::Body {
                head,
                framing,
                body: Vec::new(),
            };
        }
        Ok(Step::Continue)
    }

    fn take_response(&mut self) -> Option<HttpResponse> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Body { head, body, .. } => Some(HttpResponse {
                status: head.status,
                reason: head.reason,
                headers: head.headers,
                body,
            }),
            _ => None,
        }
    }
}

fn step_body(
    framing: &mut Framing,
    data: &[u8],
    body: &mut Vec<u8>,
    pos: &mut usize,
) -> Result<Step, ApiError> {
    match framing {
        Framing::Length(remaining) => {
            let take = (*remaining).min(data.len());
            body.extend_from_slice(&data[..take]);
            *pos += take;
            *remaining -= take;
            Ok(if *remaining == 0 {
                Step::Complete
            } else {
                Step::NeedMore
            })
        }
        Framing::UntilClose => {
            body.extend_from_slice(data);
            *pos += data.len();
            Ok(Step::NeedMore)
        }
        Framing::Chunked(chunk) => step_chunked(chunk, data, body, pos),
    }
}

fn step_chunked(
    chunk: &mut Chunk,
    data: &[u8],
    body: &mut Vec<u8>,
    pos: &mut usize,
) -> Result<Step, ApiError> {
    match chunk {
        Chunk::Size => match httparse::parse_chunk_size(data) {
            Ok(httparse::Status::Complete((len, size))) => {
                *pos += len;
                *chunk = if size == 0 {
                    Chunk::Trailers
                } else {
                    Chunk::Data(size)
                };
                Ok(Step::Continue)
            }
            Ok(httparse::Status::Partial) => Ok(Step::NeedMore),
            Err(_) => Err(ApiError::MalformedChunk(first_line(data))),
        },
        Chunk::Data(remaining) => {
            if data.is_empty() {
                return Ok(Step::NeedMore);
            }
            let take = usize::try_from(*remaining).map_or(data.len(), |r| r.min(data.len()));
            body.extend_from_slice(&data[..take]);
            *pos += take;
            *remaining -= take as u64;
            if *remaining == 0 {
                *chunk = Chunk::DataEnd;
            }
            Ok(Step::Continue)
        }
        Chunk::DataEnd => match data {
            [] | [b'\r'] => Ok(Step::NeedMore),
            [b'\r', b'\n', ..] => {
                *pos += 2;
                *chunk = Chunk::Size;
                Ok(Step::Continue)
            }
            [b'\n', ..] => {
                *pos += 1;
                *chunk = Chunk::Size;
                Ok(Step::Continue)
            }
            _ => Err(ApiError::MalformedChunk(first_line(data))),
        },
        // trailer fields are skipped up to the blank line
        Chunk::Trailers => {
            let Some(end) = data.iter().position(|&b| b == b'\n') else {
                return Ok(Step::NeedMore);
            };
            *pos += end + 1;
            let line = &data[..end];
            if line.is_empty() || line == b"\r" {
                Ok(Step::Complete)
            } else {
                Ok(Step::Continue)
            }
        }
    }
}

/// Status line and headers of one response.
#[derive(Debug)]
struct Head {
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
}

/// Parse one response head; `Ok(None)` until its blank line has arrived.
fn parse_head(data: &[u8]) -> Result<Option<(usize, Head)>, ApiError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);

    let len = match response.parse(data) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(httparse::Error::Version | httparse::Error::Status) => {
            return Err(ApiError::MalformedStatusLine(first_line(data)));
        }
        Err(err) => return Err(ApiError::MalformedHeader(err.to_string())),
    };

    let status = match response.code {
        Some(code) if code >= 100 => code,
        _ => return Err(ApiError::MalformedStatusLine(first_line(data))),
    };
    let head = Head {
        status,
        reason: response.reason.unwrap_or_default().to_string(),
        headers: response
            .headers
            .iter()
            .map(|h| {
                let value = String::from_utf8_lossy(h.value).trim().to_string();
                (h.name.to_string(), value)
            })
            .collect(),
    };
    Ok(Some((len, head)))
}

impl Head {
    /// `1xx` other than `101 Switching Protocols`; a final response follows.
    fn is_interim(&self) -> bool {
        (100..200).contains(&self.status) && self.status != 101
    }

    fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Statuses that never carry a body get an empty fixed-length one.
    fn framing(&self) -> Result<Framing, ApiError> {
        if self.status < 200 || self.status == 204 || self.status == 304 {
            return Ok(Framing::Length(0));
        }

        let chunked = self
            .values("transfer-encoding")
            .flat_map(|v| v.split(','))
            .last()
            .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
        if chunked {
            return Ok(Framing::Chunked(Chunk::Size));
        }

        let mut length = None;
        for value in self.values("content-length") {
            let parsed: usize = value
                .parse()
                .map_err(|_| ApiError::InvalidContentLength(value.to_string()))?;
            match length {
                Some(previous) if previous != parsed => {
                    return Err(ApiError::InvalidContentLength(value.to_string()));
                }
                _ => length = Some(parsed),
            }
        }

        Ok(length.map_or(Framing::UntilClose, Framing::Length))
    }
}

fn first_line(data: &[u8]) -> String {
    let end = data
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_complete(raw: &str) -> HttpResponse {
        HttpResponse::parse(raw.as_bytes(), true).unwrap().unwrap()
    }

    /// Feed `parts` one read at a time, then close.
    fn decode_reads(parts: &[&[u8]]) -> Result<HttpResponse, ApiError> {
        let mut decoder = ResponseDecoder::new();
        for part in parts {
            if let Some(response) = decoder.feed(part)? {
                return Ok(response);
            }
        }
        decoder.finish()
    }

    #[test]
    fn request_encodes_request_line_and_headers() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            path: "/api/available-files".to_string(),
            headers: vec![("Host".to_string(), "127.0.0.1:8080".to_string())],
        };
        assert_eq!(
            req.to_bytes(),
            b"GET /api/available-files HTTP/1.1\r\nHost: 127.0.0.1:8080\r\n\r\n".to_vec()
        );
    }

    #[test]
    fn content_length_body() {
        let resp = parse_complete("HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.body, b"hello");
        assert_eq!(resp.header("content-length"), Some("5"));
    }

    #[test]
    fn content_length_waits_for_full_body() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nhello";
        assert_eq!(HttpResponse::parse(raw, false), Ok(None));
        assert_eq!(HttpResponse::parse(raw, true), Err(ApiError::IncompleteResponse));
    }

    #[test]
    fn content_length_ignores_trailing_bytes() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nokEXTRA";
        let resp = HttpResponse::parse(raw, false).unwrap().unwrap();
        assert_eq!(resp.body, b"ok");
    }

    #[test]
    fn head_split_across_reads() {
        assert_eq!(HttpResponse::parse(b"HTTP/1.1 200 OK\r\nConte", false), Ok(None));
        assert_eq!(HttpResponse::parse(b"", false), Ok(None));
    }

    #[test]
    fn bare_lf_head_is_accepted() {
        let resp = parse_complete("HTTP/1.0 200 OK\nContent-Length: 2\n\n[]");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.body, b"[]");
    }

    #[test]
    fn crlf_split_between_reads() {
        let resp = decode_reads(&[
            b"HTTP/1.1 200 OK\r",
            b"\nContent-Length: 2\r\n\r",
            b"\n[",
            b"]",
        ])
        .unwrap();
        assert_eq!(resp.reason, "OK");
        assert_eq!(resp.body, b"[]");
    }

    #[test]
    fn chunk_terminator_split_between_reads() {
        let resp = decode_reads(&[
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nok\r",
            b"\n0\r",
            b"\n\r",
            b"\n",
        ])
        .unwrap();
        assert_eq!(resp.body, b"ok");
    }

    #[test]
    fn body_until_close_needs_eof() {
        let raw = b"HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nstreamed";
        assert_eq!(HttpResponse::parse(raw, false), Ok(None));
        let resp = HttpResponse::parse(raw, true).unwrap().unwrap();
        assert_eq!(resp.body, b"streamed");
    }

    #[test]
    fn body_until_close_accumulates_reads() {
        let resp = decode_reads(&[b"HTTP/1.0 200 OK\r\n\r\n[\"a", b".wav\"", b"]"]).unwrap();
        assert_eq!(resp.body, b"[\"a.wav\"]");
    }

    #[test]
    fn chunked_body_is_dechunked() {
        let resp = parse_complete(concat!(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n",
            "4;ext=1\r\n[\"a\"\r\n1\r\n]\r\n0\r\nX-Trailer: t\r\n\r\n",
        ));
        assert_eq!(resp.body, b"[\"a\"]");
    }

    #[test]
    fn chunked_body_waits_for_terminator() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nok\r\n0\r\n";
        assert_eq!(HttpResponse::parse(raw, false), Ok(None));
        assert_eq!(HttpResponse::parse(raw, true), Err(ApiError::IncompleteResponse));
    }

    #[test]
    fn chunked_bad_size_is_rejected() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n";
        assert!(matches!(
            HttpResponse::parse(raw, false),
            Err(ApiError::MalformedChunk(_))
        ));
    }

    #[test]
    fn chunk_data_longer_than_declared_is_rejected() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\nokay\r\n0\r\n\r\n";
        assert!(matches!(
            HttpResponse::parse(raw, false),
            Err(ApiError::MalformedChunk(_))
        ));
    }

    #[test]
    fn chunked_wins_over_content_length() {
        let resp = parse_complete(concat!(
            "HTTP/1.1 200 OK\r\nContent-Length: 100\r\nTransfer-Encoding: chunked\r\n\r\n",
            "2\r\nok\r\n0\r\n\r\n",
        ));
        assert_eq!(resp.body, b"ok");
    }

    #[test]
    fn large_chunked_body_in_small_reads() {
        let mut wire = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
        for _ in 0..2000 {
            wire.extend_from_slice(b"3e8\r\n");
            wire.extend_from_slice(&[b'x'; 1000]);
            wire.extend_from_slice(b"\r\n");
        }
        wire.extend_from_slice(b"0\r\n\r\n");

        let mut decoder = ResponseDecoder::new();
        let mut decoded = None;
        for read in wire.chunks(4096) {
            if let Some(response) = decoder.feed(read).unwrap() {
                decoded = Some(response);
            }
        }
        let response = decoded.expect("response completes on the last read");
        assert_eq!(response.body.len(), 2_000_000);
        assert!(decoder.pending.is_empty());
    }

    #[test]
    fn reason_phrase_is_verbatim() {
        let resp = parse_complete("HTTP/1.1 418 I'm a Teapot\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(resp.status, 418);
        assert_eq!(resp.reason, "I'm a Teapot");
    }

    #[test]
    fn missing_reason_is_empty() {
        let resp = parse_complete("HTTP/1.1 200\r\nContent-Length: 0\r\n\r\n");
        assert_eq!(resp.reason, "");
    }

    #[test]
    fn interim_continue_is_skipped() {
        let resp = parse_complete(
            "HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\n[]",
        );
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, b"[]");
    }

    #[test]
    fn no_content_has_empty_body() {
        let raw = b"HTTP/1.1 204 No Content\r\n\r\n";
        let resp = HttpResponse::parse(raw, false).unwrap().unwrap();
        assert_eq!(resp.status, 204);
        assert!(resp.body.is_empty());
    }

    #[test]
    fn empty_reply_on_close() {
        assert_eq!(HttpResponse::parse(b"", true), Err(ApiError::EmptyResponse));
    }

    #[test]
    fn malformed_status_lines() {
        let lines = [
            "garbage",
            "HTTP/1.1 20 OK",
            "HTTP/1.1 abc OK",
            "ICY 200 OK",
            "HTTP/1.1 099 Low",
        ];
        for line in lines {
            let raw = format!("{line}\r\n\r\n");
            assert!(
                matches!(
                    HttpResponse::parse(raw.as_bytes(), true),
                    Err(ApiError::MalformedStatusLine(_))
                ),
                "{line}"
            );
        }
    }

    #[test]
    fn header_without_colon_is_rejected() {
        let raw = b"HTTP/1.1 200 OK\r\nNoColonHere\r\n\r\n";
        assert!(matches!(
            HttpResponse::parse(raw, true),
            Err(ApiError::MalformedHeader(_))
        ));
    }

    #[test]
    fn conflicting_content_lengths_are_rejected() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nContent-Length: 3\r\n\r\nabc";
        assert!(matches!(
            HttpResponse::parse(raw, true),
            Err(ApiError::InvalidContentLength(_))
        ));
    }

    #[test]
    fn non_numeric_content_length_is_rejected() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: lots\r\n\r\n";
        assert!(matches!(
            HttpResponse::parse(raw, true),
            Err(ApiError::InvalidContentLength(_))
        ));
    }

    #[test]
    fn decoder_ignores_input_after_completion() {
        let mut decoder = ResponseDecoder::new();
        let first = decoder.feed(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n").unwrap();
        assert!(first.is_some());
        assert_eq!(decoder.feed(b"HTTP/1.1 500 Oops\r\n\r\n"), Ok(None));
    }
}
