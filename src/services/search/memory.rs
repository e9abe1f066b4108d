use super::{IndexedBook, SearchIndex, SearchQuery};
use crate::{
    error::{ApiError, Result},
    models::BookId,
};
use async_trait::async_trait;
use std::{collections::BTreeMap, sync::RwLock};
use tracing::debug;

/// In-process index that evaluates predicates directly over stored documents.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    documents: RwLock<BTreeMap<BookId, IndexedBook>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.documents.read().map_err(|_| poisoned())?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

fn poisoned() -> ApiError {
    ApiError::InternalError("search index lock poisoned".to_string())
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn query(&self, query: &SearchQuery) -> Result<Vec<BookId>> {
        let documents = self.documents.read().map_err(|_| poisoned())?;
        let ids: Vec<BookId> = documents
            .values()
            .filter(|doc| query.evaluate(&|field| doc.field(field).to_string()))
            .map(|doc| doc.id)
            .collect();
        debug!("Memory index matched {} of {} documents", ids.len(), documents.len());
        Ok(ids)
    }

    async fn upsert(&self, documents: &[IndexedBook]) -> Result<()> {
        let mut stored = self.documents.write().map_err(|_| poisoned())?;
        for doc in documents {
            stored.insert(doc.id, doc.clone());
        }
        Ok(())
    }

    async fn remove(&self, id: BookId) -> Result<()> {
        self.documents.write().map_err(|_| poisoned())?.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: BookId, title: &str) -> IndexedBook {
        IndexedBook {
            id,
            title: title.to_string(),
            isbn: String::new(),
            author: String::new(),
            genre: String::new(),
            summary: String::new(),
            bio: String::new(),
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_and_remove_drops() {
        let index = MemoryIndex::new();
        index.upsert(&[doc(1, "Dune"), doc(2, "Emma")]).await.unwrap();
        index.upsert(&[doc(1, "Children of Dune")]).await.unwrap();
        assert_eq!(index.len().unwrap(), 2);

        let ids = index.query(&SearchQuery::catalog_text("children")).await.unwrap();
        assert_eq!(ids, vec![1]);

        index.remove(1).await.unwrap();
        index.remove(42).await.unwrap();
        let ids = index.query(&SearchQuery::catalog_text("dune")).await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_poisoned_lock_is_an_error() {
        let index = std::sync::Arc::new(MemoryIndex::new());
        index.upsert(&[doc(1, "Dune")]).await.unwrap();

        let writer = index.clone();
        let crashed = std::thread::spawn(move || {
            let _guard = writer.documents.write().unwrap();
            panic!("writer crashed while holding the lock");
        })
        .join();
        assert!(crashed.is_err());

        assert!(matches!(index.len(), Err(ApiError::InternalError(_))));
        assert!(index.is_empty().is_err());
        assert!(index.query(&SearchQuery::catalog_text("dune")).await.is_err());
    }
}
