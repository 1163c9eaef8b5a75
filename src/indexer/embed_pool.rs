//! Bounded fan-out of embedding calls
//!
//! Every text gets its own task; a semaphore caps how many run at once. Results land
//! in the slot matching the input position, `None` for anything that failed.

use crate::embedding::EmbeddingProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub(crate) async fn embed_all(
    provider: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
    max_concurrency: usize,
    timeout: Duration,
) -> Vec<Option<Vec<f32>>> {
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));

    let handles: Vec<_> = texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let provider = Arc::clone(&provider);
            let semaphore = Arc::clone(&semaphore);
            tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                match tokio::time::timeout(timeout, provider.embed(&text)).await {
                    Ok(Ok(embedding)) => Some(embedding),
                    Ok(Err(e)) => {
                        tracing::warn!("Failed to generate embedding {}: {:#}", index, e);
                        None
                    }
                    Err(_) => {
                        tracing::warn!(
                            "Embedding {} timed out after {} seconds",
                            index,
                            timeout.as_secs_f32()
                        );
                        None
                    }
                }
            })
        })
        .collect();

    let mut slots = vec![None; handles.len()];
    for (index, handle) in handles.into_iter().enumerate() {
        slots[index] = match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Embedding task {} panicked: {}", index, e);
                None
            }
        };
    }
    slots
}
