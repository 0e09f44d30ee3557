use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use knowroute::storage::{InMemoryDocumentStore, InMemoryPatternStore, StaticExternalSource};
use knowroute::{
    CacheConfig, CollaboratorError, DetailLevel, Document, DocumentStore, KnowledgeRouter, ResponseOrigin,
    RouterConfig,
};

/// Document store that counts searches and answers slowly enough for
/// concurrent callers to overlap.
struct SlowStore {
    inner: InMemoryDocumentStore,
    searches: AtomicUsize,
    delay: Duration,
}

impl SlowStore {
    fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryDocumentStore::with_documents([
                Document::new(
                    "tca-001",
                    "Reducers and effects",
                    "A reducer mutates state and returns an effect for asynchronous work.",
                    "tca",
                ),
                Document::new(
                    "tca-004",
                    "Scoping stores",
                    "Scope a store to a child reducer so features stay isolated.",
                    "tca",
                ),
            ]),
            searches: AtomicUsize::new(0),
            delay,
        }
    }

    fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for SlowStore {
    async fn search(&self, query: &str) -> Result<Vec<Document>, CollaboratorError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.search(query).await
    }

    async fn by_category(&self, category: &str) -> Result<Vec<Document>, CollaboratorError> {
        self.inner.by_category(category).await
    }

    async fn get(&self, id: &str) -> Result<Option<Document>, CollaboratorError> {
        self.inner.get(id).await
    }
}

fn setup(config: RouterConfig, delay: Duration) -> (Arc<KnowledgeRouter>, Arc<SlowStore>) {
    let store = Arc::new(SlowStore::new(delay));
    let router = KnowledgeRouter::builder(
        Arc::clone(&store) as Arc<dyn DocumentStore>,
        Arc::new(StaticExternalSource::new()),
        Arc::new(InMemoryPatternStore::new()),
    )
    .config(config)
    .build()
    .unwrap();
    (Arc::new(router), store)
}

const QUERY: &str = "What's the difference between a reducer and an effect?";

#[tokio::test]
async fn repeated_query_is_served_from_cache() {
    let (router, store) = setup(RouterConfig::default(), Duration::ZERO);

    let live = router.query(QUERY, DetailLevel::Pattern).await.unwrap();
    let first = router.query(QUERY, DetailLevel::Pattern).await.unwrap();
    let second = router.query(&QUERY.to_uppercase(), DetailLevel::Pattern).await.unwrap();

    assert_eq!(live.origin, ResponseOrigin::Live);
    assert!(live.cache_info.is_none());
    assert!(first.is_from_cache());
    assert_eq!(first.cache_info.as_ref().unwrap().hit_count, 2);
    assert_eq!(second.cache_info.as_ref().unwrap().hit_count, 3);
    assert_eq!(second.content, live.content);
    assert_eq!(store.searches(), 1);

    let stats = router.cache().stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.entries, 1);
}

#[tokio::test]
async fn detail_levels_are_cached_separately() {
    let (router, store) = setup(RouterConfig::default(), Duration::ZERO);

    router.query(QUERY, DetailLevel::Summary).await.unwrap();
    let pattern = router.query(QUERY, DetailLevel::Pattern).await.unwrap();

    assert_eq!(pattern.origin, ResponseOrigin::Live);
    assert_eq!(store.searches(), 2);
    assert_eq!(router.cache().len(), 2);
}

#[tokio::test]
async fn expired_entry_is_a_miss_and_removed() {
    let config = RouterConfig {
        cache: CacheConfig {
            ttl_secs: 60,
            ..CacheConfig::default()
        },
        ..RouterConfig::default()
    };
    let (router, _store) = setup(config, Duration::ZERO);
    router.query(QUERY, DetailLevel::Pattern).await.unwrap();

    let later = Utc::now() + chrono::Duration::seconds(61);
    assert!(router.cache().get_at(QUERY, DetailLevel::Pattern, later).is_none());
    assert!(router.cache().is_empty());
    assert_eq!(router.cache().stats().invalidations, 1);
}

#[tokio::test]
async fn low_confidence_entry_is_never_served() {
    let (router, _store) = setup(RouterConfig::default(), Duration::ZERO);
    let mut response = router.query(QUERY, DetailLevel::Pattern).await.unwrap();
    router.cache().clear();

    response.confidence = 0.2;
    assert!(router.cache().put(QUERY, DetailLevel::Pattern, response));
    assert_eq!(router.cache().len(), 1);

    assert!(router.cache().get(QUERY, DetailLevel::Pattern).is_none());
    assert!(router.cache().is_empty());
}

#[tokio::test]
async fn blank_query_never_touches_cache() {
    let (router, _store) = setup(RouterConfig::default(), Duration::ZERO);
    let response = router.query(QUERY, DetailLevel::Pattern).await.unwrap();

    assert!(!router.cache().put("   ", DetailLevel::Pattern, response));
    assert!(router.cache().get("", DetailLevel::Pattern).is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_identical_queries_compute_once() {
    let (router, store) = setup(RouterConfig::default(), Duration::from_millis(50));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = Arc::clone(&router);
        handles.push(tokio::spawn(async move {
            router.query(QUERY, DetailLevel::Pattern).await
        }));
    }

    let mut live = 0;
    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        if response.origin == ResponseOrigin::Live {
            live += 1;
        }
    }

    assert_eq!(live, 1);
    assert_eq!(store.searches(), 1);
    assert_eq!(router.stats().cache_hits, 7);
}

#[tokio::test]
async fn eviction_keeps_cache_bounded() {
    let config = RouterConfig {
        cache: CacheConfig {
            max_entries: 1,
            ..CacheConfig::default()
        },
        ..RouterConfig::default()
    };
    let (router, _store) = setup(config, Duration::ZERO);

    router.query(QUERY, DetailLevel::Pattern).await.unwrap();
    router
        .query("How do I scope a store to a child reducer?", DetailLevel::Pattern)
        .await
        .unwrap();

    let stats = router.cache().stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.evictions, 1);
}
