//! In-process HTTP fixture server for downloader and pipeline tests.
//!
//! Serves scripted responses over real TCP so the blocking HTTP client is
//! exercised end to end without touching the network. Supports the handful
//! of behaviors the pipeline cares about: HEAD vs GET, Content-Length,
//! Range/206 answers, redirects, early connection drops, and slow chunked
//! bodies.

#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Parsed request line plus the headers the fixtures care about.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    /// Start offset of a `Range: bytes=N-` header, if present.
    pub range_start: Option<u64>,
}

/// Scripted response.
pub struct Response {
    pub status: u16,
    pub reason: &'static str,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Advertise the full Content-Length but close the connection after
    /// sending only this many body bytes.
    pub truncate_after: Option<usize>,
    /// Send the body in chunks of the given size with a pause in between.
    pub chunked_delay: Option<(usize, Duration)>,
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            reason: "OK",
            headers: Vec::new(),
            body: body.into(),
            truncate_after: None,
            chunked_delay: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            reason: "Not Found",
            headers: Vec::new(),
            body: b"not found".to_vec(),
            truncate_after: None,
            chunked_delay: None,
        }
    }

    pub fn redirect(location: &str) -> Self {
        Self {
            status: 302,
            reason: "Found",
            headers: vec![("Location".to_string(), location.to_string())],
            body: Vec::new(),
            truncate_after: None,
            chunked_delay: None,
        }
    }

    /// A 206 answer serving `full_body[start..]`.
    pub fn partial(full_body: &[u8], start: u64) -> Self {
        let start = start as usize;
        let slice = full_body[start.min(full_body.len())..].to_vec();
        Self {
            status: 206,
            reason: "Partial Content",
            headers: vec![(
                "Content-Range".to_string(),
                format!("bytes {}-{}/{}", start, full_body.len() - 1, full_body.len()),
            )],
            body: slice,
            truncate_after: None,
            chunked_delay: None,
        }
    }

    pub fn with_accept_ranges(mut self) -> Self {
        self.headers
            .push(("Accept-Ranges".to_string(), "bytes".to_string()));
        self
    }

    pub fn truncated_after(mut self, bytes: usize) -> Self {
        self.truncate_after = Some(bytes);
        self
    }

    pub fn with_chunked_delay(mut self, chunk: usize, delay: Duration) -> Self {
        self.chunked_delay = Some((chunk, delay));
        self
    }
}

/// Scripted HTTP server bound to a loopback port.
pub struct TestServer {
    addr: SocketAddr,
    get_hits: Arc<AtomicUsize>,
    head_hits: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a server answering every request through `handler`.
    pub fn start<H>(handler: H) -> Self
    where
        H: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fixture server");
        let addr = listener.local_addr().expect("fixture server addr");

        let get_hits = Arc::new(AtomicUsize::new(0));
        let head_hits = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let handler = Arc::new(handler);
        let thread_gets = Arc::clone(&get_hits);
        let thread_heads = Arc::clone(&head_hits);
        let thread_shutdown = Arc::clone(&shutdown);

        let handle = thread::spawn(move || {
            for stream in listener.incoming() {
                if thread_shutdown.load(Ordering::SeqCst) {
                    break;
                }
                let Ok(stream) = stream else { continue };

                let handler = Arc::clone(&handler);
                let gets = Arc::clone(&thread_gets);
                let heads = Arc::clone(&thread_heads);
                thread::spawn(move || {
                    serve_connection(stream, handler.as_ref(), &gets, &heads);
                });
            }
        });

        Self {
            addr,
            get_hits,
            head_hits,
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of GET requests served so far.
    pub fn get_hits(&self) -> usize {
        self.get_hits.load(Ordering::SeqCst)
    }

    /// Number of HEAD requests served so far.
    pub fn head_hits(&self) -> usize {
        self.head_hits.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Unblock accept().
        TcpStream::connect(self.addr).ok();
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

fn serve_connection<H>(
    mut stream: TcpStream,
    handler: &H,
    get_hits: &AtomicUsize,
    head_hits: &AtomicUsize,
) where
    H: Fn(&Request) -> Response,
{
    let Ok(peer) = stream.try_clone() else { return };
    let mut reader = BufReader::new(peer);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() || request_line.trim().is_empty() {
        return;
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_ascii_uppercase();
    let path = parts.next().unwrap_or("/").to_string();

    let mut range_start = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).is_err() {
            return;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("range:") {
            if let Some(spec) = value.trim().strip_prefix("bytes=") {
                if let Some(start) = spec.split('-').next() {
                    range_start = start.trim().parse::<u64>().ok();
                }
            }
        }
    }

    match method.as_str() {
        "GET" => {
            get_hits.fetch_add(1, Ordering::SeqCst);
        }
        "HEAD" => {
            head_hits.fetch_add(1, Ordering::SeqCst);
        }
        _ => {}
    }

    let request = Request {
        method: method.clone(),
        path,
        range_start,
    };
    let response = handler(&request);

    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        response.reason,
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");

    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }

    if method != "HEAD" {
        let limit = response.truncate_after.unwrap_or(response.body.len());
        let body = &response.body[..limit.min(response.body.len())];

        if let Some((chunk_size, delay)) = response.chunked_delay {
            for chunk in body.chunks(chunk_size.max(1)) {
                if stream.write_all(chunk).is_err() {
                    return;
                }
                stream.flush().ok();
                thread::sleep(delay);
            }
        } else if stream.write_all(body).is_err() {
            return;
        }
    }

    stream.flush().ok();
}

/// Gzip magic followed by filler, detected as a gzip payload by sniffing.
pub fn gzip_payload(len: usize) -> Vec<u8> {
    let mut bytes = vec![0x1F, 0x8B, 0x08, 0x00];
    bytes.resize(len.max(4), 0x5A);
    bytes
}

/// 512-byte tar header with the "ustar" magic, plus filler content.
pub fn tar_payload(extra: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; 512];
    bytes[257..262].copy_from_slice(b"ustar");
    bytes.extend_from_slice(extra);
    bytes
}

/// Build a stored (uncompressed) ZIP archive from `(name, bytes)` entries.
///
/// Minimal but standards-correct: local headers, central directory, EOCD,
/// real CRC-32s, so external unzip tools accept it.
pub fn build_zip(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for (name, data) in entries {
        let offset = out.len() as u32;
        let crc = crc32(data);
        let name_bytes = name.as_bytes();

        // Local file header.
        out.extend_from_slice(&0x04034b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&0u16.to_le_bytes()); // method: stored
        out.extend_from_slice(&0u16.to_le_bytes()); // mod time
        out.extend_from_slice(&0u16.to_le_bytes()); // mod date
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes()); // compressed
        out.extend_from_slice(&(data.len() as u32).to_le_bytes()); // uncompressed
        out.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra len
        out.extend_from_slice(name_bytes);
        out.extend_from_slice(data);

        // Central directory entry.
        central.extend_from_slice(&0x02014b50u32.to_le_bytes());
        central.extend_from_slice(&20u16.to_le_bytes()); // version made by
        central.extend_from_slice(&20u16.to_le_bytes()); // version needed
        central.extend_from_slice(&0u16.to_le_bytes()); // flags
        central.extend_from_slice(&0u16.to_le_bytes()); // method
        central.extend_from_slice(&0u16.to_le_bytes()); // mod time
        central.extend_from_slice(&0u16.to_le_bytes()); // mod date
        central.extend_from_slice(&crc.to_le_bytes());
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(data.len() as u32).to_le_bytes());
        central.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
        central.extend_from_slice(&0u16.to_le_bytes()); // extra len
        central.extend_from_slice(&0u16.to_le_bytes()); // comment len
        central.extend_from_slice(&0u16.to_le_bytes()); // disk number
        central.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        central.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        central.extend_from_slice(&offset.to_le_bytes());
        central.extend_from_slice(name_bytes);
    }

    let central_offset = out.len() as u32;
    out.extend_from_slice(&central);

    // End of central directory.
    out.extend_from_slice(&0x06054b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // this disk
    out.extend_from_slice(&0u16.to_le_bytes()); // cd start disk
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(central.len() as u32).to_le_bytes());
    out.extend_from_slice(&central_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment len

    out
}

/// CRC-32 (IEEE), bitwise variant; fixture-sized inputs only.
fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}
