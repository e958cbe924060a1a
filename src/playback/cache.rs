use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Result;

/// Shared, immutable sentence list of one chapter.
pub type Sentences = Arc<[String]>;

/// Per-chapter sentence lists of the open book.
///
/// Entries are added lazily and never evicted while a book is open. A chapter
/// can also be loading in the background; [`load`](Self::load) picks up that
/// result instead of starting over. A chapter with no sentences is stored as
/// the single placeholder sentence.
pub struct SentenceCache {
    placeholder: String,
    ready: HashMap<usize, Sentences>,
    pending: HashMap<usize, JoinHandle<Result<Vec<String>>>>,
}

impl SentenceCache {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            ready: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn get(&self, chapter: usize) -> Option<&Sentences> {
        self.ready.get(&chapter)
    }

    pub fn sentence(&self, chapter: usize, index: usize) -> Option<&str> {
        self.ready.get(&chapter)?.get(index).map(String::as_str)
    }

    pub fn is_pending(&self, chapter: usize) -> bool {
        self.pending.contains_key(&chapter)
    }

    /// Number of chapters whose sentences are ready.
    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Start loading `chapter` on a background task unless it is already
    /// cached or loading.
    pub fn prefetch<F>(&mut self, chapter: usize, load: F)
    where
        F: Future<Output = Result<Vec<String>>> + Send + 'static,
    {
        if self.ready.contains_key(&chapter) || self.pending.contains_key(&chapter) {
            return;
        }
        debug!(chapter, "prefetching");
        self.pending.insert(chapter, tokio::spawn(load));
    }

    /// Sentences of `chapter`: cached, from a finished prefetch, or from
    /// `fresh`. A failed prefetch is discarded and `fresh` is used instead.
    pub async fn load<F>(&mut self, chapter: usize, fresh: F) -> Result<Sentences>
    where
        F: Future<Output = Result<Vec<String>>>,
    {
        if let Some(sentences) = self.ready.get(&chapter) {
            return Ok(Arc::clone(sentences));
        }

        if let Some(handle) = self.pending.remove(&chapter) {
            match handle.await {
                Ok(Ok(sentences)) => return Ok(self.insert(chapter, sentences)),
                Ok(Err(e)) => debug!(chapter, error = %e, "prefetch failed; loading again"),
                Err(e) => debug!(chapter, error = %e, "prefetch task died; loading again"),
            }
        }

        let sentences = fresh.await?;
        Ok(self.insert(chapter, sentences))
    }

    /// Drop every entry and abort background loads.
    pub fn clear(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
        self.ready.clear();
    }

    fn insert(&mut self, chapter: usize, sentences: Vec<String>) -> Sentences {
        let sentences: Sentences = if sentences.is_empty() {
            Arc::from(vec![self.placeholder.clone()])
        } else {
            sentences.into()
        };
        self.ready.insert(chapter, Arc::clone(&sentences));
        sentences
    }
}

impl Drop for SentenceCache {
    fn drop(&mut self) {
        for handle in self.pending.values() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::Error;

    fn sentences(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_load_caches() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut cache = SentenceCache::new("empty");

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let loaded = cache
                .load(0, async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(sentences(&["One.", "Two."]))
                })
                .await
                .unwrap();
            assert_eq!(&*loaded, &["One.".to_string(), "Two.".to_string()]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.sentence(0, 1), Some("Two."));
        assert_eq!(cache.sentence(0, 2), None);
    }

    #[tokio::test]
    async fn test_empty_chapter_gets_placeholder() {
        let mut cache = SentenceCache::new("Nothing here.");
        let loaded = cache.load(3, async { Ok(Vec::new()) }).await.unwrap();
        assert_eq!(&*loaded, &["Nothing here.".to_string()]);
    }

    #[tokio::test]
    async fn test_prefetch_result_is_used() {
        let mut cache = SentenceCache::new("empty");
        cache.prefetch(1, async { Ok(sentences(&["Prefetched."])) });
        assert!(cache.is_pending(1));

        let loaded = cache
            .load(1, async { Err(Error::chapter_load("x", "should not run")) })
            .await
            .unwrap();
        assert_eq!(&*loaded, &["Prefetched.".to_string()]);
        assert!(!cache.is_pending(1));
    }

    #[tokio::test]
    async fn test_failed_prefetch_falls_back_to_fresh_load() {
        let mut cache = SentenceCache::new("empty");
        cache.prefetch(1, async { Err(Error::chapter_load("x", "broken")) });

        let loaded = cache.load(1, async { Ok(sentences(&["Fresh."])) }).await.unwrap();
        assert_eq!(&*loaded, &["Fresh.".to_string()]);
    }

    #[tokio::test]
    async fn test_load_error_is_not_cached() {
        let mut cache = SentenceCache::new("empty");
        let err = cache.load(0, async { Err(Error::chapter_load("a.xhtml", "missing")) }).await;
        assert!(matches!(err, Err(Error::ChapterLoad { .. })));
        assert!(cache.get(0).is_none());
    }

    #[tokio::test]
    async fn test_clear() {
        let mut cache = SentenceCache::new("empty");
        cache.load(0, async { Ok(sentences(&["A."])) }).await.unwrap();
        cache.prefetch(1, async { Ok(sentences(&["B."])) });

        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.is_pending(1));
    }
}
