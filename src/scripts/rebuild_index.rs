//! Re-index the whole catalog into the full-text index.

use crate::{
    db::{BookQuery, CatalogStore},
    error::{ApiError, Result},
    services::FullTextSearch,
};
use log::{error, info, warn};
use std::future::Future;
use tokio::time::{sleep, Duration};

const BATCH_SIZE: usize = 100;
const MAX_RETRIES: u32 = 3;
const BASE_DELAY_MS: u64 = 500;

/// Outcome of a rebuild run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub books: usize,
    pub successful_batches: usize,
    pub failed_batches: usize,
}

/// Retry operation with exponential backoff
pub async fn retry_with_backoff<F, Fut, T>(
    operation: F,
    max_retries: u32,
    base_delay_ms: u64,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                attempt += 1;
                if attempt >= max_retries {
                    return Err(ApiError::ExternalServiceError(format!(
                        "Operation failed after {} attempts: {}",
                        max_retries, e
                    )));
                }
                let delay = base_delay_ms * 2u64.pow(attempt - 1);
                error!("Attempt {} failed, retrying in {}ms: {}", attempt, delay, e);
                sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}

/// Push every catalog book to the index in batches. A batch that still fails
/// after retries is counted and skipped.
pub async fn rebuild_index(
    store: &dyn CatalogStore,
    full_text: &FullTextSearch,
) -> Result<RebuildStats> {
    rebuild_with(store, full_text, BATCH_SIZE, BASE_DELAY_MS).await
}

async fn rebuild_with(
    store: &dyn CatalogStore,
    full_text: &FullTextSearch,
    batch_size: usize,
    base_delay_ms: u64,
) -> Result<RebuildStats> {
    let books = store.list_books(&BookQuery::all()).await?;
    let mut stats = RebuildStats {
        books: books.len(),
        ..RebuildStats::default()
    };

    if books.is_empty() {
        warn!("⚠️  Catalog is empty, nothing to index");
        return Ok(stats);
    }

    let total_batches = (books.len() + batch_size - 1) / batch_size;
    info!(
        "🔄 Indexing {} books in {} batches of {}",
        books.len(),
        total_batches,
        batch_size
    );

    for (batch_index, batch) in books.chunks(batch_size).enumerate() {
        let batch_num = batch_index + 1;

        match retry_with_backoff(move || full_text.index_books(batch), MAX_RETRIES, base_delay_ms)
            .await
        {
            Ok(()) => {
                info!(
                    "✅ Indexed batch {} of {} ({} books)",
                    batch_num,
                    total_batches,
                    batch.len()
                );
                stats.successful_batches += 1;
            }
            Err(e) => {
                error!("❌ Failed to index batch {} after retries: {}", batch_num, e);
                stats.failed_batches += 1;
            }
        }
    }

    info!("🎉 Indexing complete");
    info!("   📚 Books: {}", stats.books);
    info!("   ✅ Successful batches: {}", stats.successful_batches);
    info!("   ❌ Failed batches: {}", stats.failed_batches);

    if stats.failed_batches > 0 {
        warn!("⚠️  Some batches failed to index. Consider re-running for complete indexing.");
    }

    Ok(stats)
}
