//! Fake modules, a recording mail transport and a canned HTTP server for
//! unit tests.

use crate::error::ModuleError;
use crate::intel::IntelModule;
use crate::model::{Findings, ModuleKind, Query, QueryType};
use crate::notify::{Delivery, MailTransport, OutgoingMessage, TransportError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

enum Behavior {
    Ok(Findings),
    Fail(u16),
    Slow(Duration),
    Panic,
}

pub(crate) struct FakeModule {
    name: &'static str,
    kind: ModuleKind,
    supported: Vec<QueryType>,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

impl FakeModule {
    fn build(name: &'static str, kind: ModuleKind, behavior: Behavior) -> Self {
        Self {
            name,
            kind,
            supported: QueryType::ALL.to_vec(),
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ok(name: &'static str, findings: Findings) -> Self {
        Self::build(name, findings.kind(), Behavior::Ok(findings))
    }

    /// Fails every lookup with `<name> returned HTTP <status>`.
    pub fn failing(name: &'static str, kind: ModuleKind, status: u16) -> Self {
        Self::build(name, kind, Behavior::Fail(status))
    }

    pub fn slow(name: &'static str, kind: ModuleKind, delay: Duration) -> Self {
        Self::build(name, kind, Behavior::Slow(delay))
    }

    pub fn panicking(name: &'static str, kind: ModuleKind) -> Self {
        Self::build(name, kind, Behavior::Panic)
    }

    pub fn supporting(mut self, types: &[QueryType]) -> Self {
        self.supported = types.to_vec();
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Shared call counter, readable after the module moves into a registry.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl IntelModule for FakeModule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> ModuleKind {
        self.kind
    }

    fn supported_types(&self) -> &[QueryType] {
        &self.supported
    }

    async fn lookup(&self, _query: &Query) -> Result<Findings, ModuleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Ok(findings) => Ok(findings.clone()),
            Behavior::Fail(status) => Err(ModuleError::Status {
                source_name: self.name,
                status: *status,
            }),
            Behavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Findings::empty(self.kind))
            }
            Behavior::Panic => panic!("{} blew up", self.name),
        }
    }
}

#[derive(Clone)]
pub(crate) enum Reply {
    Accept(&'static str),
    Reject(u16, &'static str),
    Unreachable(&'static str),
}

/// Records every message and answers with a fixed reply.
pub(crate) struct RecordingTransport {
    reply: Reply,
    sent: Mutex<Vec<OutgoingMessage>>,
}

impl RecordingTransport {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<Delivery, TransportError> {
        self.sent.lock().unwrap().push(message.clone());
        match self.reply.clone() {
            Reply::Accept(id) => Ok(Delivery::Accepted {
                message_id: Some(id.to_string()),
            }),
            Reply::Reject(status, detail) => Ok(Delivery::Rejected {
                status,
                detail: detail.to_string(),
            }),
            Reply::Unreachable(reason) => Err(TransportError::Unreachable(reason.to_string())),
        }
    }
}

/// Local HTTP server answering each connection with the next canned reply.
///
/// The last reply repeats once the list runs out. Every response closes
/// its connection, so each client request is a fresh accept.
pub(crate) struct StubServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(replies: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requests);

        tokio::spawn(async move {
            let mut replies = replies.into_iter();
            let mut current = (500, "");
            while let Ok((mut stream, _)) = listener.accept().await {
                if let Some(next) = replies.next() {
                    current = next;
                }
                let request = read_request(&mut stream).await;
                log.lock().unwrap().push(request);

                let (status, body) = current;
                let response = format!(
                    "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self { base_url, requests }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Received requests: the request line, then the body if any.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

async fn read_request(stream: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let request_line = head.lines().next().unwrap_or_default().to_string();
    let body = String::from_utf8_lossy(&buf[body_start.min(buf.len())..]).into_owned();
    if body.is_empty() {
        request_line
    } else {
        format!("{}\n{}", request_line, body)
    }
}

/// HTTP client that ignores proxy environment variables, for `StubServer`.
pub(crate) fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
