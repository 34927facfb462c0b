//! Thread-backed pool of tree-sitter parsers
//!
//! Parsers are not `Send`, so each worker thread owns one and serves requests
//! from a shared channel. Callers await the answer on a oneshot channel, which
//! keeps the async runtime free while a file is being parsed.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

use pylon_core::AnalysisError;
use tokio::sync::oneshot;
use tree_sitter::Parser;

use crate::extractor::extract_specifiers;
use crate::languages::SourceLanguage;

/// One file to parse.
#[derive(Debug)]
pub struct ParseRequest {
    pub language: SourceLanguage,
    pub content: String,
    pub path: PathBuf,
}

type ParseResponse = Result<Vec<String>, AnalysisError>;

#[derive(Debug)]
struct WorkerRequest {
    request: ParseRequest,
    respond: oneshot::Sender<ParseResponse>,
}

/// Cloneable handle to the worker threads. Workers exit once every handle is dropped.
#[derive(Clone)]
pub struct ParserPool {
    sender: Sender<WorkerRequest>,
    workers: usize,
}

impl std::fmt::Debug for ParserPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserPool").field("workers", &self.workers).finish()
    }
}

impl ParserPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for id in 0..workers {
            let receiver = receiver.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("pylon-parser-{id}"))
                .spawn(move || worker_thread(id, receiver));
            if let Err(e) = spawned {
                tracing::error!("failed to spawn parser worker {id}: {e}");
            }
        }

        ParserPool { sender, workers }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Parse a file and return its raw import specifiers in document order.
    pub async fn parse(&self, request: ParseRequest) -> Result<Vec<String>, AnalysisError> {
        let (respond, response) = oneshot::channel();
        self.sender
            .send(WorkerRequest { request, respond })
            .map_err(|_| AnalysisError::WorkerUnavailable)?;
        response.await.map_err(|_| AnalysisError::WorkerUnavailable)?
    }
}

fn worker_thread(id: usize, receiver: Arc<Mutex<Receiver<WorkerRequest>>>) {
    tracing::debug!("parser worker {id} started");
    let mut parser = Parser::new();

    loop {
        let next = match receiver.lock() {
            Ok(guard) => guard.recv(),
            Err(_) => break,
        };
        let Ok(WorkerRequest { request, respond }) = next else {
            break;
        };

        let result = parse_one(&mut parser, &request);
        if respond.send(result).is_err() {
            tracing::debug!(path = %request.path.display(), "parse result dropped by caller");
        }
    }

    tracing::debug!("parser worker {id} shutting down");
}

fn parse_one(parser: &mut Parser, request: &ParseRequest) -> ParseResponse {
    parser
        .set_language(&request.language.grammar())
        .map_err(|e| AnalysisError::Parse(format!("cannot load {} grammar: {e}", request.language.name())))?;

    let tree = parser
        .parse(&request.content, None)
        .ok_or_else(|| AnalysisError::Parse("parser returned no tree".to_string()))?;

    Ok(extract_specifiers(&tree, request.content.as_bytes()))
}

/// A pool sized to the machine, at least two workers.
pub fn create_parser_pool() -> ParserPool {
    let workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);
    ParserPool::new(workers)
}
