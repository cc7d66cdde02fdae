//! Testing utilities for the Cairn workspace
//!
//! Shared fixtures: artifact builders, an in-memory transport that counts
//! calls, and a loopback HTTP server for exercising the real fetcher.

#![allow(missing_docs)]

use cairn_artifact::{ArtifactRef, Digest, DigestAlgorithm, Origin};
use cairn_store::{FetchError, FetchSettings, Transport};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const TEST_ORIGIN: &str = "https://repo.example.org/maven2/";

pub fn test_origin() -> Origin {
    Origin::parse(TEST_ORIGIN).unwrap()
}

pub fn sha256(bytes: &[u8]) -> Digest {
    DigestAlgorithm::Sha256.compute(bytes)
}

/// `com.example:<name>:1.0` on [`TEST_ORIGIN`], without a digest
pub fn plain_ref(name: &str) -> ArtifactRef {
    ref_on(test_origin(), name, None)
}

/// `com.example:<name>:1.0` on [`TEST_ORIGIN`], expecting the SHA-256 of `content`
pub fn sample_ref(name: &str, content: &[u8]) -> ArtifactRef {
    ref_on(test_origin(), name, Some(sha256(content)))
}

pub fn ref_on(origin: Origin, name: &str, digest: Option<Digest>) -> ArtifactRef {
    let mut builder = ArtifactRef::builder()
        .origin(origin)
        .group("com.example")
        .name(name)
        .version("1.0");
    if let Some(digest) = digest {
        builder = builder.digest(digest);
    }
    builder.build().unwrap()
}

/// In-memory [`Transport`] keyed by cache path
#[derive(Debug, Default)]
pub struct StaticTransport {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_body(self, artifact: &ArtifactRef, body: impl Into<Vec<u8>>) -> Self {
        self.set_body(artifact, body);
        self
    }

    pub fn set_body(&self, artifact: &ArtifactRef, body: impl Into<Vec<u8>>) {
        self.bodies
            .lock()
            .insert(artifact.cache_path().to_string(), body.into());
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for StaticTransport {
    fn fetch(
        &self,
        artifact: &ArtifactRef,
        _settings: &FetchSettings,
    ) -> Result<Vec<u8>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.bodies
            .lock()
            .get(artifact.cache_path())
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: artifact.fetch_url().to_string(),
                status: 404,
            })
    }
}

/// A request seen by [`FixtureServer`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lowercased
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct ServerState {
    routes: Mutex<HashMap<String, (u16, Vec<u8>)>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Loopback HTTP/1.1 server answering from a fixed route table
///
/// Unknown paths get a 404. Every connection is closed after one response.
#[derive(Debug)]
pub struct FixtureServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FixtureServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let state = Arc::clone(&state);
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || {
                for stream in listener.incoming() {
                    if shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    let Ok(stream) = stream else { continue };
                    let state = Arc::clone(&state);
                    thread::spawn(move || {
                        let _ = handle_connection(stream, &state);
                    });
                }
            })
        };

        Self {
            addr,
            state,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Base URL, with trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn origin(&self) -> Origin {
        Origin::parse(&self.base_url()).unwrap()
    }

    pub fn origin_with_credentials(&self, username: &str, password: &str) -> Origin {
        Origin::builder()
            .url(self.base_url())
            .username(username)
            .password(password)
            .build()
            .unwrap()
    }

    /// Serve `body` with status 200 at the artifact's fetch path
    pub fn serve(&self, artifact: &ArtifactRef, body: impl Into<Vec<u8>>) {
        self.respond(artifact.fetch_url().path(), 200, body);
    }

    pub fn respond(&self, path: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.state
            .routes
            .lock()
            .insert(path.to_string(), (status, body.into()));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn hits(&self, artifact: &ArtifactRef) -> usize {
        let path = artifact.fetch_url().path().to_string();
        self.state
            .requests
            .lock()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }
}

impl Drop for FixtureServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Wake the accept loop so it can observe the flag.
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn handle_connection(stream: TcpStream, state: &ServerState) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let (status, body) = state
        .routes
        .lock()
        .get(&path)
        .cloned()
        .unwrap_or_else(|| (404, b"not found".to_vec()));

    state.requests.lock().push(RecordedRequest {
        method,
        path,
        headers,
    });

    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {status} {}\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        reason(status),
        body.len()
    )?;
    stream.write_all(&body)?;
    stream.flush()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
