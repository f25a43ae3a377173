//! End-to-end lifecycle behaviour of the secret engine over the in-memory store.

use async_trait::async_trait;
use burnnote::{
    AcceleratorCache, BurnnoteError, CacheDispatcher, CacheError, ConfirmOutcome, ConsumeMode,
    DurableStore, EngineConfig, InMemorySecretStore, ManualClock, MemoryCache, Redelivery, Secret,
    SecretContent, SecretEngine, SecretId, SecretState,
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const FLUSH: Duration = Duration::from_secs(1);

fn immediate() -> EngineConfig {
    EngineConfig::default()
}

fn two_phase(redelivery: Redelivery) -> EngineConfig {
    EngineConfig { consume_mode: ConsumeMode::TwoPhase, redelivery, ..Default::default() }
}

/// Store whose every call fails, standing in for an unreachable database
struct UnavailableStore;

#[async_trait]
impl DurableStore for UnavailableStore {
    async fn insert(&self, _secret: &Secret) -> burnnote::Result<()> {
        Err(BurnnoteError::persistence("connection refused"))
    }

    async fn try_transition(
        &self,
        _id: &SecretId,
        _from: SecretState,
        _to: SecretState,
        _now: DateTime<Utc>,
    ) -> burnnote::Result<Option<Secret>> {
        Err(BurnnoteError::persistence("connection refused"))
    }

    async fn delete_expired_before(
        &self,
        _before: DateTime<Utc>,
        _limit: u32,
    ) -> burnnote::Result<u64> {
        Err(BurnnoteError::persistence("connection refused"))
    }
}

/// [`MemoryCache`] whose writes take a moment to land
struct LaggingCache {
    inner: MemoryCache,
}

#[async_trait]
impl AcceleratorCache for LaggingCache {
    async fn set(
        &self,
        id: &SecretId,
        content: &SecretContent,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.inner.set(id, content, ttl).await
    }

    async fn invalidate(&self, id: &SecretId) -> Result<(), CacheError> {
        self.inner.invalidate(id).await
    }
}

/// Cache that rejects everything but counts how often it was asked
#[derive(Default)]
struct BrokenCache {
    sets: AtomicUsize,
    invalidations: AtomicUsize,
}

#[async_trait]
impl AcceleratorCache for BrokenCache {
    async fn set(
        &self,
        _id: &SecretId,
        _content: &SecretContent,
        _ttl: Duration,
    ) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("cache offline".to_string()))
    }

    async fn invalidate(&self, _id: &SecretId) -> Result<(), CacheError> {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("cache offline".to_string()))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_consumes_deliver_exactly_once() {
    let engine =
        Arc::new(SecretEngine::new(Arc::new(InMemorySecretStore::new()), immediate()).unwrap());
    let id = engine.create("launch codes", None).await.unwrap();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let engine = engine.clone();
            let id = id.clone();
            tokio::spawn(async move { engine.consume(&id).await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let delivered: Vec<_> = results.iter().flatten().collect();
    assert_eq!(delivered.len(), 1);
    assert_eq!(*delivered[0], "launch codes");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_two_phase_consumes_deliver_exactly_once() {
    let engine = Arc::new(SecretEngine::new(
        Arc::new(InMemorySecretStore::new()),
        two_phase(Redelivery::Blocked),
    ).unwrap());
    let id = engine.create("launch codes", None).await.unwrap();

    let tasks: Vec<_> = (0..32)
        .map(|_| {
            let engine = engine.clone();
            let id = id.clone();
            tokio::spawn(async move { engine.consume(&id).await.unwrap().is_some() })
        })
        .collect();

    let delivered = futures::future::join_all(tasks)
        .await
        .into_iter()
        .filter(|joined| *joined.as_ref().unwrap())
        .count();

    assert_eq!(delivered, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn distinct_secrets_consumed_in_parallel_are_each_delivered_once() {
    let engine =
        Arc::new(SecretEngine::new(Arc::new(InMemorySecretStore::new()), immediate()).unwrap());

    let creates: Vec<_> = (0..16usize)
        .map(|n| {
            let engine = engine.clone();
            tokio::spawn(async move {
                (n, engine.create(&format!("secret-{}", n), None).await.unwrap())
            })
        })
        .collect();
    let ids: Vec<_> = futures::future::join_all(creates)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    // Two readers race for every secret
    let consumes: Vec<_> = ids
        .iter()
        .flat_map(|(n, id)| [(*n, id.clone()), (*n, id.clone())])
        .map(|(n, id)| {
            let engine = engine.clone();
            tokio::spawn(async move { (n, engine.consume(&id).await.unwrap()) })
        })
        .collect();

    let mut deliveries = vec![0usize; ids.len()];
    for joined in futures::future::join_all(consumes).await {
        let (n, content) = joined.unwrap();
        if let Some(content) = content {
            assert_eq!(content, format!("secret-{}", n).as_str());
            deliveries[n] += 1;
        }
    }
    assert!(deliveries.iter().all(|count| *count == 1), "deliveries: {:?}", deliveries);

    for (_, id) in &ids {
        assert!(engine.consume(id).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn expired_secret_is_never_delivered() {
    let store = Arc::new(InMemorySecretStore::new());
    let engine = SecretEngine::new(store.clone(), immediate()).unwrap();

    let id = engine.create("short lived", Some(Duration::from_millis(1))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(engine.consume(&id).await.unwrap().is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn expiry_boundary_counts_as_expired() {
    let clock = ManualClock::default();
    let engine = SecretEngine::new(Arc::new(InMemorySecretStore::new()), immediate())
        .unwrap()
        .with_clock(Arc::new(clock.clone()));

    let id = engine.create("boundary", Some(Duration::from_secs(30))).await.unwrap();
    clock.advance(Duration::from_secs(30));

    assert!(engine.consume(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn secret_is_readable_just_before_expiry() {
    let clock = ManualClock::default();
    let engine = SecretEngine::new(Arc::new(InMemorySecretStore::new()), immediate())
        .unwrap()
        .with_clock(Arc::new(clock.clone()));

    let id = engine.create("almost", Some(Duration::from_secs(30))).await.unwrap();
    clock.advance(Duration::from_secs(29));

    assert_eq!(engine.consume(&id).await.unwrap().unwrap(), "almost");
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let engine = SecretEngine::new(Arc::new(InMemorySecretStore::new()), immediate()).unwrap();

    assert!(engine.consume(&SecretId::generate()).await.unwrap().is_none());
    assert!(engine.consume(&SecretId::from_str_unchecked("garbage")).await.unwrap().is_none());
}

#[tokio::test]
async fn consumed_secret_is_not_resurrected_by_cache() {
    let cache = Arc::new(MemoryCache::new(100));
    let engine = SecretEngine::new(Arc::new(InMemorySecretStore::new()), immediate())
        .unwrap()
        .with_cache(CacheDispatcher::new(cache.clone()));

    let id = engine.create("one shot", None).await.unwrap();
    assert!(engine.shutdown(FLUSH).await);
    assert!(cache.contains(&id));

    assert_eq!(engine.consume(&id).await.unwrap().unwrap(), "one shot");
    assert!(engine.shutdown(FLUSH).await);
    assert!(!cache.contains(&id));

    // Repopulate the cache behind the engine's back
    cache.set(&id, &SecretContent::new("one shot"), Duration::from_secs(60)).await.unwrap();
    assert!(engine.consume(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn slow_cache_write_does_not_outlive_consume() {
    let cache = Arc::new(LaggingCache { inner: MemoryCache::new(100) });
    let engine = SecretEngine::new(Arc::new(InMemorySecretStore::new()), immediate())
        .unwrap()
        .with_cache(CacheDispatcher::new(cache.clone()));

    let id = engine.create("read me fast", None).await.unwrap();
    assert_eq!(engine.consume(&id).await.unwrap().unwrap(), "read me fast");

    assert!(engine.shutdown(FLUSH).await);
    assert!(!cache.inner.contains(&id));
}

#[tokio::test]
async fn confirm_is_idempotent() {
    let engine = SecretEngine::new(
        Arc::new(InMemorySecretStore::new()),
        two_phase(Redelivery::Blocked),
    ).unwrap();
    let id = engine.create("two phase", None).await.unwrap();

    assert_eq!(engine.consume(&id).await.unwrap().unwrap(), "two phase");
    assert_eq!(engine.confirm(&id).await.unwrap(), ConfirmOutcome::Confirmed);
    assert_eq!(engine.confirm(&id).await.unwrap(), ConfirmOutcome::Confirmed);
    assert!(engine.consume(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn confirm_unknown_or_undelivered_is_not_found() {
    let engine = SecretEngine::new(
        Arc::new(InMemorySecretStore::new()),
        two_phase(Redelivery::Blocked),
    ).unwrap();
    let id = engine.create("never read", None).await.unwrap();

    assert_eq!(engine.confirm(&SecretId::generate()).await.unwrap(), ConfirmOutcome::NotFound);
    assert_eq!(engine.confirm(&id).await.unwrap(), ConfirmOutcome::NotFound);

    // The failed confirm did not disturb the secret
    assert_eq!(engine.consume(&id).await.unwrap().unwrap(), "never read");
}

#[tokio::test]
async fn blocked_redelivery_serves_once() {
    let engine = SecretEngine::new(
        Arc::new(InMemorySecretStore::new()),
        two_phase(Redelivery::Blocked),
    ).unwrap();
    let id = engine.create("strict", None).await.unwrap();

    assert!(engine.consume(&id).await.unwrap().is_some());
    assert!(engine.consume(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn until_confirmed_redelivery_serves_until_confirm() {
    let engine = SecretEngine::new(
        Arc::new(InMemorySecretStore::new()),
        two_phase(Redelivery::UntilConfirmed),
    ).unwrap();
    let id = engine.create("tolerant", None).await.unwrap();

    for _ in 0..3 {
        assert_eq!(engine.consume(&id).await.unwrap().unwrap(), "tolerant");
    }

    assert_eq!(engine.confirm(&id).await.unwrap(), ConfirmOutcome::Confirmed);
    assert!(engine.consume(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn until_confirmed_redelivery_stops_at_expiry() {
    let clock = ManualClock::default();
    let engine = SecretEngine::new(
        Arc::new(InMemorySecretStore::new()),
        two_phase(Redelivery::UntilConfirmed),
    ).unwrap()
    .with_clock(Arc::new(clock.clone()));
    let id = engine.create("tolerant", Some(Duration::from_secs(60))).await.unwrap();

    assert!(engine.consume(&id).await.unwrap().is_some());
    clock.advance(Duration::from_secs(61));
    assert!(engine.consume(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn immediate_mode_confirm_is_not_found() {
    let engine = SecretEngine::new(Arc::new(InMemorySecretStore::new()), immediate()).unwrap();
    let id = engine.create("gone on read", None).await.unwrap();

    assert_eq!(engine.confirm(&id).await.unwrap(), ConfirmOutcome::NotFound);
    assert!(engine.consume(&id).await.unwrap().is_some());
    assert_eq!(engine.confirm(&id).await.unwrap(), ConfirmOutcome::NotFound);
}

#[tokio::test]
async fn store_failure_is_an_error_not_a_miss() {
    let cache = Arc::new(BrokenCache::default());
    let engine = SecretEngine::new(Arc::new(UnavailableStore), two_phase(Redelivery::Blocked))
        .unwrap()
        .with_cache(CacheDispatcher::new(cache.clone()));

    let create = engine.create("lost", None).await.unwrap_err();
    assert!(create.is_persistence());

    let consume = engine.consume(&SecretId::generate()).await.unwrap_err();
    assert!(consume.is_persistence());
    assert!(consume.is_retryable());

    let confirm = engine.confirm(&SecretId::generate()).await.unwrap_err();
    assert!(confirm.is_persistence());

    assert!(engine.sweep_expired().await.is_err());

    // A failed insert never reaches the cache
    assert!(engine.shutdown(FLUSH).await);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cache_failure_never_fails_the_caller() {
    let cache = Arc::new(BrokenCache::default());
    let engine = SecretEngine::new(Arc::new(InMemorySecretStore::new()), immediate())
        .unwrap()
        .with_cache(CacheDispatcher::new(cache.clone()));

    let id = engine.create("resilient", None).await.unwrap();
    assert_eq!(engine.consume(&id).await.unwrap().unwrap(), "resilient");

    assert!(engine.shutdown(FLUSH).await);
    assert_eq!(cache.sets.load(Ordering::SeqCst), 1);
    assert_eq!(cache.invalidations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn sweep_removes_only_expired_secrets() {
    let store = Arc::new(InMemorySecretStore::new());
    let clock = ManualClock::default();
    let engine = SecretEngine::new(store.clone(), two_phase(Redelivery::Blocked))
        .unwrap()
        .with_clock(Arc::new(clock.clone()))
        .with_sweep_batch_size(3);

    for _ in 0..7 {
        engine.create("stale", Some(Duration::from_secs(60))).await.unwrap();
    }
    // A delivered and a confirmed secret are swept by expiry as well
    let delivered = engine.create("delivered", Some(Duration::from_secs(60))).await.unwrap();
    engine.consume(&delivered).await.unwrap().unwrap();
    let confirmed = engine.create("confirmed", Some(Duration::from_secs(60))).await.unwrap();
    engine.consume(&confirmed).await.unwrap().unwrap();
    engine.confirm(&confirmed).await.unwrap();

    let live = engine.create("fresh", Some(Duration::from_secs(3600))).await.unwrap();

    clock.advance(Duration::from_secs(120));
    assert_eq!(engine.sweep_expired().await.unwrap(), 9);
    assert_eq!(store.len(), 1);
    assert_eq!(engine.sweep_expired().await.unwrap(), 0);

    assert_eq!(engine.consume(&live).await.unwrap().unwrap(), "fresh");
}
