//! Test doubles for the registry, the datastore and the operator, plus a
//! one-shot HTTP stub for the HTTP clients

#![allow(dead_code)]

use async_trait::async_trait;
use ftt_siren::db::{CompanyStore, MatchTarget, TargetFilter};
use ftt_siren::query::SireneQuery;
use ftt_siren::scorer::MatchCandidate;
use ftt_siren::services::RegistrySearch;
use ftt_siren::workflow::Confirm;
use ftt_siren::{MatchError, MatchResult};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Registry returning scripted responses in call order
///
/// Once the script is exhausted every search returns no results.
#[derive(Default)]
pub struct FakeRegistry {
    responses: Mutex<VecDeque<MatchResult<Vec<MatchCandidate>>>>,
    queries: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, candidates: Vec<MatchCandidate>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(candidates));
        self
    }

    pub fn fail(self, error: MatchError) -> Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl RegistrySearch for FakeRegistry {
    async fn search(&self, query: &SireneQuery) -> MatchResult<Vec<MatchCandidate>> {
        self.queries.lock().unwrap().push(query.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// In-memory company store recording every write
#[derive(Default)]
pub struct FakeStore {
    targets: Vec<MatchTarget>,
    writes: Mutex<Vec<(String, String, String)>>,
    fail_writes: bool,
}

impl FakeStore {
    pub fn new(targets: Vec<MatchTarget>) -> Self {
        Self {
            targets,
            ..Self::default()
        }
    }

    pub fn failing(targets: Vec<MatchTarget>) -> Self {
        Self {
            targets,
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<(String, String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompanyStore for FakeStore {
    async fn find_unmatched_targets(&self, filter: &TargetFilter) -> MatchResult<Vec<MatchTarget>> {
        let needle = filter.name_contains.as_ref().map(|n| n.to_lowercase());
        let mut targets: Vec<MatchTarget> = self
            .targets
            .iter()
            .filter(|t| filter.include_matched || !t.is_matched())
            .filter(|t| {
                needle
                    .as_ref()
                    .map(|n| t.name.to_lowercase().contains(n))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        targets.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(limit) = filter.limit {
            targets.truncate(limit);
        }
        Ok(targets)
    }

    async fn write_identifiers(
        &self,
        target_id: &str,
        registry_id: &str,
        establishment_id: &str,
    ) -> MatchResult<()> {
        self.writes.lock().unwrap().push((
            target_id.to_string(),
            registry_id.to_string(),
            establishment_id.to_string(),
        ));
        if self.fail_writes {
            return Err(MatchError::DatastoreWrite("permission denied".to_string()));
        }
        Ok(())
    }
}

/// Operator stub remembering the prompts it was shown
pub struct RecordingConfirm {
    answer: bool,
    messages: Mutex<Vec<String>>,
}

impl RecordingConfirm {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Confirm for RecordingConfirm {
    fn confirm(&self, message: &str) -> bool {
        self.messages.lock().unwrap().push(message.to_string());
        self.answer
    }
}

pub fn candidate(legal_name: &str, city: Option<&str>, hq: bool, siret: &str) -> MatchCandidate {
    MatchCandidate {
        legal_name: legal_name.to_string(),
        alias: None,
        city: city.map(str::to_string),
        is_headquarters: hq,
        registry_id: siret[..9].to_string(),
        establishment_id: siret.to_string(),
    }
}

/// Serve one canned HTTP response on a local port
///
/// Returns `http://127.0.0.1:<port>` and a receiver yielding the raw request
/// (head and body) the client sent.
pub async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];

        let head_end = loop {
            if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break request.len();
            }
            request.extend_from_slice(&buf[..n]);
        };

        let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while request.len() < head_end + content_length {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let _ = tx.send(String::from_utf8_lossy(&request).into_owned());

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    (format!("http://{}", addr), rx)
}
