//! Thread-safe parser pool for tree-sitter parsers
//!
//! Tree-sitter parsers are not Send + Sync, so each worker thread owns one
//! Python parser and requests arrive over a channel.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tree_sitter::{Language, Parser};

/// Grammar used by every worker.
pub fn python_language() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

/// A parsing request sent to the parser pool
#[derive(Debug)]
pub struct ParseRequest {
    pub content: String,
    pub path: PathBuf,
}

/// Result of a parsing operation
#[derive(Debug)]
pub struct ParseResult {
    pub tree: tree_sitter::Tree,
    pub path: PathBuf,
    pub content: String,
}

/// Internal message for the parser worker
#[derive(Debug)]
struct WorkerRequest {
    request: ParseRequest,
    response_sender: Sender<Result<ParseResult>>,
}

/// Thread-safe parser pool
#[derive(Clone)]
pub struct ParserPool {
    sender: Sender<WorkerRequest>,
}

impl ParserPool {
    /// Create a new parser pool with the specified number of worker threads
    pub fn new(num_workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<WorkerRequest>();
        let receiver = Arc::new(Mutex::new(receiver));

        for i in 0..num_workers.max(1) {
            let receiver = receiver.clone();
            std::thread::spawn(move || {
                Self::worker_thread(i, receiver);
            });
        }

        Self { sender }
    }

    fn worker_thread(worker_id: usize, receiver: Arc<Mutex<Receiver<WorkerRequest>>>) {
        tracing::debug!("Parser worker {} started", worker_id);

        let mut parser = Parser::new();
        if let Err(e) = parser.set_language(&python_language()) {
            tracing::error!("Parser worker {} cannot load the Python grammar: {}", worker_id, e);
            return;
        }

        loop {
            let next = match receiver.lock() {
                Ok(rx) => rx.recv(),
                Err(_) => break,
            };
            let WorkerRequest {
                request,
                response_sender,
            } = match next {
                Ok(req) => req,
                Err(_) => break,
            };

            let result = match parser.parse(&request.content, None) {
                Some(tree) => Ok(ParseResult {
                    tree,
                    path: request.path,
                    content: request.content,
                }),
                None => Err(anyhow::anyhow!(
                    "Failed to parse {}",
                    request.path.display()
                )),
            };

            if response_sender.send(result).is_err() {
                tracing::warn!("Failed to send parse result back to caller");
            }
        }

        tracing::debug!("Parser worker {} shutting down", worker_id);
    }

    fn submit(sender: &Sender<WorkerRequest>, request: ParseRequest) -> Result<ParseResult> {
        let (response_sender, response_receiver) = mpsc::channel();

        sender
            .send(WorkerRequest {
                request,
                response_sender,
            })
            .map_err(|_| anyhow::anyhow!("Parser pool is shut down"))?;

        response_receiver
            .recv()
            .map_err(|_| anyhow::anyhow!("Parser worker died"))?
    }

    /// Parse content synchronously using the parser pool
    /// Note: This blocks the current thread until parsing is complete
    pub fn parse_blocking(&self, request: ParseRequest) -> Result<ParseResult> {
        Self::submit(&self.sender, request)
    }

    /// Parse content asynchronously using the parser pool
    pub async fn parse(&self, request: ParseRequest) -> Result<ParseResult> {
        let sender = self.sender.clone();
        tokio::task::spawn_blocking(move || Self::submit(&sender, request))
            .await
            .map_err(|e| anyhow::anyhow!("Task join error: {}", e))?
    }
}

/// Convenience function to create a parser pool with default settings
pub fn create_parser_pool() -> ParserPool {
    // Use number of CPU cores as default worker count, but at least 2
    let num_workers = std::thread::available_parallelism()
        .map(|n| n.get().max(2))
        .unwrap_or(2);

    ParserPool::new(num_workers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_parse_python() {
        let pool = create_parser_pool();
        let content = r#"
def main():
    print("Hello, world!")
"#
        .to_string();

        let request = ParseRequest {
            content,
            path: PathBuf::from("test.py"),
        };

        let result = pool.parse(request).await.unwrap();
        assert_eq!(result.tree.root_node().kind(), "module");
        assert_eq!(result.path, PathBuf::from("test.py"));
    }

    #[test]
    fn test_parse_blocking_keeps_going_after_syntax_errors() {
        let pool = ParserPool::new(1);

        let broken = pool
            .parse_blocking(ParseRequest {
                content: "def broken(:\n".to_string(),
                path: PathBuf::from("broken.py"),
            })
            .unwrap();
        assert!(broken.tree.root_node().has_error());

        let fine = pool
            .parse_blocking(ParseRequest {
                content: "x = 1\n".to_string(),
                path: PathBuf::from("fine.py"),
            })
            .unwrap();
        assert!(!fine.tree.root_node().has_error());
    }
}
