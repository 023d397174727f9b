//! Chunked concurrent execution with a fixed inter-chunk pause.

use std::future::Future;
use std::time::Duration;

use futures::future::join_all;

/// Runs a batch of async lookups in fixed-size chunks.
///
/// Items within a chunk run concurrently; chunks run back to back with a
/// short pause between them so upstream rate limits are respected. Output
/// order always matches input order regardless of per-item latency.
///
/// Once started a batch runs to completion; there is no mid-batch
/// cancellation.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    chunk_size: usize,
    inter_chunk_delay: Duration,
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self {
            chunk_size: 5,
            inter_chunk_delay: Duration::from_millis(200),
        }
    }
}

impl BatchRunner {
    pub fn new(chunk_size: usize, inter_chunk_delay: Duration) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        Self {
            chunk_size,
            inter_chunk_delay,
        }
    }

    /// Apply `op` to every item, chunked. No pause after the final chunk.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, op: F) -> Vec<R>
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let mut remaining = items.into_iter();

        loop {
            let chunk: Vec<T> = remaining.by_ref().take(self.chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            results.extend(join_all(chunk.into_iter().map(&op)).await);
            if results.len() < total {
                tokio::time::sleep(self.inter_chunk_delay).await;
            }
        }

        results
    }
}
