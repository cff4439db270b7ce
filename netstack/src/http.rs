//! Static/proxy HTTP responder and the throttling state the worker thread
//! consults before producing each response.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::warn;

use mtp_proto::{CacheStorageCallback, PathResolverCallback};

use crate::error::NetstackError;

const LARGE_RESPONSE_THRESHOLD_BYTES: usize = 32 * 1024;
const DEFAULT_GLOBAL_LARGE_RESPONSE_GAP: Duration = Duration::from_millis(1278);
const PER_CONNECTION_MIN_GAP: Duration = Duration::from_secs(1);
const PROXY_TIMEOUT: Duration = Duration::from_secs(30);
const ALL_ZERO_UUID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub host: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub keep_alive: bool,
}

impl HttpResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let reason = match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            502 => "Bad Gateway",
            _ => "Unknown",
        };
        let connection = if self.keep_alive { "keep-alive" } else { "close" };
        let mut out = format!(
            "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nContent-Type: {}\r\nConnection: {}\r\n\r\n",
            self.status,
            reason,
            self.body.len(),
            self.content_type,
            connection,
        )
        .into_bytes();
        out.extend_from_slice(&self.body);
        out
    }

    pub fn is_large(&self) -> bool {
        self.body.len() >= LARGE_RESPONSE_THRESHOLD_BYTES
    }
}

/// Parses a complete HTTP/1.1 request (request line + headers + optional
/// Content-Length body) out of a buffer that already ends at the
/// CRLFCRLF header terminator plus however much body has arrived.
pub fn parse_request(buffer: &[u8]) -> Result<HttpRequest, NetstackError> {
    let header_end = find_header_end(buffer)
        .ok_or_else(|| NetstackError::Malformed("no CRLFCRLF in request buffer".into()))?;
    let head = std::str::from_utf8(&buffer[..header_end])
        .map_err(|e| NetstackError::Malformed(format!("non-UTF8 request head: {e}")))?;
    let mut lines = head.split("\r\n");
    let request_line = lines.next().ok_or_else(|| NetstackError::Malformed("empty request".into()))?;
    let mut parts = request_line.split(' ');
    let method = parts.next().ok_or_else(|| NetstackError::Malformed("missing method".into()))?.to_string();
    let path = parts.next().ok_or_else(|| NetstackError::Malformed("missing path".into()))?.to_string();

    let mut headers = Vec::new();
    let mut host = None;
    let mut content_length = 0usize;
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_string();
            let value = value.trim().to_string();
            if key.eq_ignore_ascii_case("host") {
                host = Some(value.clone());
            }
            if key.eq_ignore_ascii_case("content-length") {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((key, value));
        }
    }

    let body_start = header_end + 4;
    let body = buffer
        .get(body_start..body_start + content_length)
        .unwrap_or(&buffer[body_start.min(buffer.len())..])
        .to_vec();

    Ok(HttpRequest { method, path, host, headers, body })
}

fn find_header_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Whether a full request (headers plus, if declared, a complete body) is
/// present at the front of `buffer`.
pub fn request_is_complete(buffer: &[u8]) -> bool {
    match find_header_end(buffer) {
        None => false,
        Some(header_end) => match parse_request(&buffer[..header_end + 4]) {
            Ok(_) => {
                let content_length = content_length_of(buffer, header_end);
                buffer.len() >= header_end + 4 + content_length
            }
            Err(_) => false,
        },
    }
}

fn content_length_of(buffer: &[u8], header_end: usize) -> usize {
    std::str::from_utf8(&buffer[..header_end])
        .ok()
        .and_then(|head| {
            head.split("\r\n").find_map(|line| {
                let (key, value) = line.split_once(':')?;
                if key.trim().eq_ignore_ascii_case("content-length") {
                    value.trim().parse().ok()
                } else {
                    None
                }
            })
        })
        .unwrap_or(0)
}

/// A parsed `/v3.0/<locale>/music/artist/<uuid>/<kind>[?query]` path.
struct ArtistEndpoint {
    artist_uuid: String,
    endpoint_type: String,
    resource_id: Option<String>,
}

fn parse_artist_endpoint(path: &str) -> Option<ArtistEndpoint> {
    let path = path.split('?').next().unwrap_or(path);
    let mut segments = path.trim_start_matches('/').split('/');
    if segments.next()? != "v3.0" {
        return None;
    }
    let _locale = segments.next()?;
    if segments.next()? != "music" {
        return None;
    }
    if segments.next()? != "artist" {
        return None;
    }
    let artist_uuid = segments.next()?.to_string();
    let endpoint_type = segments.next()?.to_string();
    let resource_id = segments.next().map(str::to_string);
    Some(ArtistEndpoint { artist_uuid, endpoint_type, resource_id })
}

fn content_type_for_endpoint(endpoint_type: &str) -> &'static str {
    if endpoint_type == "biography" {
        "application/xml"
    } else {
        "image/jpeg"
    }
}

pub enum ResponderMode {
    Static { resolver: Arc<dyn PathResolverCallback> },
    Hybrid { upstream_base: String, resolver: Arc<dyn PathResolverCallback>, cache: Arc<dyn CacheStorageCallback> },
    Proxy { upstream_base: String },
    Test,
}

pub struct HttpResponder {
    mode: ResponderMode,
    proxy_hostnames: Vec<String>,
    client: reqwest::blocking::Client,
}

impl HttpResponder {
    pub fn new(mode: ResponderMode, proxy_hostnames: Vec<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(PROXY_TIMEOUT)
            .build()
            .expect("reqwest client with a fixed timeout always builds");
        Self { mode, proxy_hostnames, client }
    }

    pub fn handle(&self, request: &HttpRequest) -> HttpResponse {
        match &self.mode {
            ResponderMode::Test => self.serve_static_test_mode(request),
            ResponderMode::Static { resolver } => self.serve_static(resolver.as_ref(), request),
            ResponderMode::Hybrid { upstream_base, resolver, cache } => {
                self.serve_hybrid(upstream_base, resolver.as_ref(), cache.as_ref(), request)
            }
            ResponderMode::Proxy { upstream_base } => self.serve_proxy(upstream_base, request),
        }
    }

    fn serve_static_test_mode(&self, request: &HttpRequest) -> HttpResponse {
        let normalized_path = substitute_uuids_with_all_zero(&request.path);
        HttpResponse {
            status: 200,
            content_type: content_type_for(&normalized_path),
            body: Vec::new(),
            keep_alive: false,
        }
    }

    fn serve_static(&self, resolver: &dyn PathResolverCallback, request: &HttpRequest) -> HttpResponse {
        let Some(endpoint) = parse_artist_endpoint(&request.path) else {
            return HttpResponse { status: 404, content_type: "text/plain".into(), body: Vec::new(), keep_alive: false };
        };
        match resolver
            .resolve(&endpoint.artist_uuid, &endpoint.endpoint_type, endpoint.resource_id.as_deref())
            .and_then(|path| std::fs::read(path).ok())
        {
            Some(body) => HttpResponse {
                status: 200,
                content_type: content_type_for_endpoint(&endpoint.endpoint_type).to_string(),
                body,
                keep_alive: false,
            },
            None => HttpResponse { status: 404, content_type: "text/plain".into(), body: Vec::new(), keep_alive: false },
        }
    }

    /// Serves from the resolver when a file already exists; otherwise
    /// proxies upstream and, on success, hands the fetched bytes to the
    /// cache-storage callback so later requests are served statically.
    fn serve_hybrid(
        &self,
        upstream_base: &str,
        resolver: &dyn PathResolverCallback,
        cache: &dyn CacheStorageCallback,
        request: &HttpRequest,
    ) -> HttpResponse {
        let Some(endpoint) = parse_artist_endpoint(&request.path) else {
            return HttpResponse { status: 404, content_type: "text/plain".into(), body: Vec::new(), keep_alive: false };
        };
        if let Some(body) = resolver
            .resolve(&endpoint.artist_uuid, &endpoint.endpoint_type, endpoint.resource_id.as_deref())
            .and_then(|path| std::fs::read(path).ok())
        {
            return HttpResponse {
                status: 200,
                content_type: content_type_for_endpoint(&endpoint.endpoint_type).to_string(),
                body,
                keep_alive: false,
            };
        }

        let response = self.serve_proxy(upstream_base, request);
        if response.status == 200 {
            cache.store(
                &endpoint.artist_uuid,
                &endpoint.endpoint_type,
                endpoint.resource_id.as_deref(),
                &response.body,
                &response.content_type,
            );
        }
        response
    }

    fn serve_proxy(&self, upstream_base: &str, request: &HttpRequest) -> HttpResponse {
        let host_matches = request
            .host
            .as_deref()
            .map(|h| self.proxy_hostnames.iter().any(|known| known.eq_ignore_ascii_case(h)))
            .unwrap_or(false);
        if !host_matches {
            return HttpResponse { status: 404, content_type: "text/plain".into(), body: Vec::new(), keep_alive: false };
        }

        let url = format!("{}{}", upstream_base.trim_end_matches('/'), request.path);
        match self.client.get(&url).send() {
            Ok(upstream) => {
                let content_type = upstream
                    .headers()
                    .get("content-type")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("application/octet-stream")
                    .to_string();
                match upstream.bytes() {
                    Ok(body) => HttpResponse { status: 200, content_type, body: body.to_vec(), keep_alive: false },
                    Err(e) => {
                        warn!("upstream body read failed for {url}: {e}");
                        HttpResponse { status: 502, content_type: "text/plain".into(), body: Vec::new(), keep_alive: false }
                    }
                }
            }
            Err(e) => {
                warn!("upstream request failed for {url}: {e}");
                HttpResponse { status: 502, content_type: "text/plain".into(), body: Vec::new(), keep_alive: false }
            }
        }
    }
}

fn content_type_for(path: &str) -> String {
    if path.ends_with(".jpg") || path.ends_with(".jpeg") {
        "image/jpeg".into()
    } else if path.ends_with(".png") {
        "image/png".into()
    } else if path.ends_with(".xml") {
        "application/xml".into()
    } else {
        "application/octet-stream".into()
    }
}

fn substitute_uuids_with_all_zero(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut remaining = path;
    while let Some(pos) = remaining.find(|c: char| c.is_ascii_hexdigit()) {
        out.push_str(&remaining[..pos]);
        remaining = &remaining[pos..];
        let candidate_len = remaining
            .char_indices()
            .take_while(|(_, c)| c.is_ascii_hexdigit() || *c == '-')
            .count();
        let candidate = &remaining[..candidate_len];
        if is_uuid_shaped(candidate) {
            out.push_str(ALL_ZERO_UUID);
        } else {
            out.push_str(candidate);
        }
        remaining = &remaining[candidate_len..];
    }
    out.push_str(remaining);
    out
}

fn is_uuid_shaped(candidate: &str) -> bool {
    candidate.len() == 36 && candidate.as_bytes()[8] == b'-' && candidate.as_bytes()[13] == b'-'
}

/// Per-connection and global pacing gates the worker thread must clear
/// before producing the next response.
pub struct ThrottleState {
    global_large_response_gap: Duration,
    last_completion: Option<Instant>,
    last_large_response_start: Option<Instant>,
}

impl ThrottleState {
    pub fn new() -> Self {
        Self {
            global_large_response_gap: DEFAULT_GLOBAL_LARGE_RESPONSE_GAP,
            last_completion: None,
            last_large_response_start: None,
        }
    }

    pub fn with_global_gap(gap: Duration) -> Self {
        Self { global_large_response_gap: gap, ..Self::new() }
    }

    /// How long the caller must still wait before it may start producing
    /// the next response, given whether that response will be "large".
    pub fn wait_before_next(&self, will_be_large: bool, now: Instant) -> Duration {
        let per_connection_ready = self
            .last_completion
            .map(|t| PER_CONNECTION_MIN_GAP.saturating_sub(now.saturating_duration_since(t)))
            .unwrap_or(Duration::ZERO);
        let global_ready = if will_be_large {
            self.last_large_response_start
                .map(|t| self.global_large_response_gap.saturating_sub(now.saturating_duration_since(t)))
                .unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        };
        per_connection_ready.max(global_ready)
    }

    pub fn record_start(&mut self, will_be_large: bool, now: Instant) {
        if will_be_large {
            self.last_large_response_start = Some(now);
        }
    }

    pub fn record_completion(&mut self, now: Instant) {
        self.last_completion = Some(now);
    }
}

impl Default for ThrottleState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct FakeResolver {
        root: std::path::PathBuf,
    }

    impl PathResolverCallback for FakeResolver {
        fn resolve(&self, artist_uuid: &str, endpoint_type: &str, _resource_id: Option<&str>) -> Option<String> {
            let path = self.root.join(format!("{artist_uuid}-{endpoint_type}.dat"));
            path.to_str().map(str::to_string)
        }
    }

    #[test]
    fn static_mode_resolves_artist_endpoint_and_reads_file() {
        let dir = std::env::temp_dir().join(format!("netstack-http-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let artist_uuid = "11111111-2222-3333-4444-555555555555";
        let file_path = dir.join(format!("{artist_uuid}-biography.dat"));
        std::fs::File::create(&file_path).unwrap().write_all(b"<bio/>").unwrap();

        let resolver = Arc::new(FakeResolver { root: dir.clone() });
        let responder = HttpResponder::new(ResponderMode::Static { resolver }, vec![]);
        let request = HttpRequest {
            method: "GET".into(),
            path: format!("/v3.0/en-US/music/artist/{artist_uuid}/biography"),
            host: None,
            headers: vec![],
            body: vec![],
        };
        let response = responder.handle(&request);
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "application/xml");
        assert_eq!(response.body, b"<bio/>");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn static_mode_missing_file_is_404() {
        let resolver = Arc::new(FakeResolver { root: std::env::temp_dir().join("nonexistent-netstack-dir") });
        let responder = HttpResponder::new(ResponderMode::Static { resolver }, vec![]);
        let request = HttpRequest {
            method: "GET".into(),
            path: "/v3.0/en-US/music/artist/11111111-2222-3333-4444-555555555555/primaryImage".into(),
            host: None,
            headers: vec![],
            body: vec![],
        };
        let response = responder.handle(&request);
        assert_eq!(response.status, 404);
    }

    #[test]
    fn parses_request_line_host_and_body() {
        let raw = b"POST /api/upload HTTP/1.1\r\nHost: catalog.zune.net\r\nContent-Length: 5\r\n\r\nhello";
        let request = parse_request(raw).unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/api/upload");
        assert_eq!(request.host.as_deref(), Some("catalog.zune.net"));
        assert_eq!(request.body, b"hello");
    }

    #[test]
    fn incomplete_body_is_not_yet_complete() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc";
        assert!(!request_is_complete(raw));
    }

    #[test]
    fn headers_only_request_with_no_body_is_complete() {
        let raw = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        assert!(request_is_complete(raw));
    }

    #[test]
    fn test_mode_collapses_uuid_path_segment_to_all_zero() {
        let responder = HttpResponder::new(ResponderMode::Test, vec![]);
        let request = HttpRequest {
            method: "GET".into(),
            path: "/art/11111111-2222-3333-4444-555555555555/cover.jpg".into(),
            host: None,
            headers: vec![],
            body: vec![],
        };
        let response = responder.handle(&request);
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "image/jpeg");
    }

    #[test]
    fn throttle_blocks_large_responses_within_the_global_gap() {
        let mut throttle = ThrottleState::with_global_gap(Duration::from_millis(100));
        let t0 = Instant::now();
        throttle.record_start(true, t0);
        let wait = throttle.wait_before_next(true, t0 + Duration::from_millis(10));
        assert!(wait > Duration::ZERO);
        let wait = throttle.wait_before_next(true, t0 + Duration::from_millis(200));
        assert_eq!(wait, Duration::ZERO);
    }

    #[test]
    fn small_response_is_unaffected_by_the_large_response_gate() {
        let mut throttle = ThrottleState::with_global_gap(Duration::from_secs(5));
        let t0 = Instant::now();
        throttle.record_start(true, t0);
        let wait = throttle.wait_before_next(false, t0 + Duration::from_millis(1));
        assert_eq!(wait, Duration::ZERO);
    }

    #[test]
    fn response_to_bytes_includes_content_length_and_connection_header() {
        let response = HttpResponse {
            status: 200,
            content_type: "application/xml".into(),
            body: b"<x/>".to_vec(),
            keep_alive: false,
        };
        let bytes = response.to_bytes();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Content-Length: 4"));
        assert!(text.contains("Connection: close"));
        assert!(text.ends_with("<x/>"));
    }
}
