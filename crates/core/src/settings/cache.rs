//! Single-flight settings cache.
//!
//! Each key owns a small state cell (`Idle -> Fetching -> Resolved`, or back
//! to `Idle` on failure) held in a `tokio::sync::watch` channel, so callers
//! await state changes instead of polling. Guarantees:
//!
//! - at most one backend fetch per key is in flight at any time;
//! - the first read of a key fetches once, concurrent readers share it;
//! - manual refreshes are debounced and coalesced into a single fetch;
//! - once the cache is closed (or dropped), late fetch results are discarded.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use travelbudget_shared::config::SettingsCacheConfig;

use super::error::SettingsError;
use super::types::{Setting, SettingValue};

/// Backend collaborator that looks up one setting by key.
///
/// `Ok(None)` means the key does not exist; the cache treats it like a
/// failed fetch.
pub trait SettingFetcher: Send + Sync + 'static {
    /// Fetch a setting by key.
    fn fetch_setting(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Setting>, SettingsError>> + Send;
}

/// Lifecycle phase of a cached key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    /// No fetch running and no value resolved.
    Idle,
    /// A fetch is in flight.
    Fetching,
    /// A value has been resolved.
    Resolved,
}

#[derive(Debug, Clone)]
struct SlotState {
    value: Option<SettingValue>,
    phase: FetchPhase,
    /// Highest refresh ticket whose fetch has completed.
    settled_ticket: u64,
}

struct Slot {
    state: watch::Sender<SlotState>,
    initial_fetch_requested: AtomicBool,
    next_ticket: AtomicU64,
    pending_refresh: Mutex<Option<JoinHandle<()>>>,
}

impl Slot {
    fn new() -> Self {
        let (state, _) = watch::channel(SlotState {
            value: None,
            phase: FetchPhase::Idle,
            settled_ticket: 0,
        });
        Self {
            state,
            initial_fetch_requested: AtomicBool::new(false),
            next_ticket: AtomicU64::new(0),
            pending_refresh: Mutex::new(None),
        }
    }

    fn value(&self) -> Option<SettingValue> {
        self.state.borrow().value.clone()
    }

    fn phase(&self) -> FetchPhase {
        self.state.borrow().phase
    }
}

struct CacheInner<F> {
    fetcher: F,
    slots: Mutex<HashMap<String, Arc<Slot>>>,
    liveness: CancellationToken,
    debounce: Duration,
}

/// Per-key memoizing cache for backend settings.
///
/// Fetches and debounce timers run as Tokio tasks, so the cache must be used
/// from within a Tokio runtime.
pub struct SettingValueCache<F: SettingFetcher> {
    inner: Arc<CacheInner<F>>,
}

impl<F: SettingFetcher> SettingValueCache<F> {
    /// Creates a cache with the given refresh debounce window.
    #[must_use]
    pub fn new(fetcher: F, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                fetcher,
                slots: Mutex::new(HashMap::new()),
                liveness: CancellationToken::new(),
                debounce,
            }),
        }
    }

    /// Creates a cache from configuration.
    #[must_use]
    pub fn with_config(fetcher: F, config: &SettingsCacheConfig) -> Self {
        Self::new(fetcher, Duration::from_millis(config.refresh_debounce_ms))
    }

    /// Returns the resolved value for `key`, or `default` if none resolved.
    ///
    /// The first read of a key starts its fetch; concurrent reads wait for
    /// that same fetch. Later reads never fetch again, use [`Self::refresh`].
    pub async fn read(&self, key: &str, default: SettingValue) -> SettingValue {
        self.inner.read(key).await.unwrap_or(default)
    }

    /// Requests a fresh value for `key` and waits for it.
    ///
    /// Requests inside the debounce window coalesce into one fetch that
    /// runs once the window has been quiet; every coalesced caller resolves
    /// with its result. Returns the resolved value, if any.
    pub async fn refresh(&self, key: &str) -> Option<SettingValue> {
        self.inner.refresh(key).await
    }

    /// Current value without fetching.
    #[must_use]
    pub fn peek(&self, key: &str, default: SettingValue) -> SettingValue {
        self.inner
            .existing_slot(key)
            .and_then(|slot| slot.value())
            .unwrap_or(default)
    }

    /// Whether a fetch for `key` is in flight.
    #[must_use]
    pub fn is_loading(&self, key: &str) -> bool {
        self.phase(key) == FetchPhase::Fetching
    }

    /// Current phase of `key`.
    #[must_use]
    pub fn phase(&self, key: &str) -> FetchPhase {
        self.inner
            .existing_slot(key)
            .map_or(FetchPhase::Idle, |slot| slot.phase())
    }

    /// Returns a handle bound to one key and starts its first fetch in the
    /// background.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn cached_setting(&self, key: &str, default: SettingValue) -> CachedSetting<F> {
        let slot = self.inner.slot(key);
        self.inner.request_initial_fetch(key, &slot);
        CachedSetting {
            inner: Arc::clone(&self.inner),
            key: key.to_string(),
            default,
        }
    }

    /// Tears the cache down. In-flight results are discarded on arrival and
    /// waiting callers return the current value.
    pub fn close(&self) {
        debug!("closing settings cache");
        self.inner.liveness.cancel();
    }

    /// Whether [`Self::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.liveness.is_cancelled()
    }
}

impl<F: SettingFetcher> Drop for SettingValueCache<F> {
    fn drop(&mut self) {
        self.inner.liveness.cancel();
    }
}

/// Handle for a single setting, with its fallback value.
pub struct CachedSetting<F: SettingFetcher> {
    inner: Arc<CacheInner<F>>,
    key: String,
    default: SettingValue,
}

impl<F: SettingFetcher> CachedSetting<F> {
    /// Setting key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current value, or the default until a fetch resolves.
    #[must_use]
    pub fn value(&self) -> SettingValue {
        self.inner
            .existing_slot(&self.key)
            .and_then(|slot| slot.value())
            .unwrap_or_else(|| self.default.clone())
    }

    /// Whether a fetch is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner
            .existing_slot(&self.key)
            .is_some_and(|slot| slot.phase() == FetchPhase::Fetching)
    }

    /// Waits for the pending fetch, if any, and returns the value.
    pub async fn load(&self) -> SettingValue {
        self.inner
            .read(&self.key)
            .await
            .unwrap_or_else(|| self.default.clone())
    }

    /// Debounced refresh; returns the value after the refresh settles.
    pub async fn refresh(&self) -> SettingValue {
        self.inner
            .refresh(&self.key)
            .await
            .unwrap_or_else(|| self.default.clone())
    }
}

impl<F: SettingFetcher> CacheInner<F> {
    fn slot(&self, key: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Slot::new())),
        )
    }

    fn existing_slot(&self, key: &str) -> Option<Arc<Slot>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).cloned()
    }

    fn request_initial_fetch(self: &Arc<Self>, key: &str, slot: &Arc<Slot>) {
        if !slot.initial_fetch_requested.swap(true, Ordering::AcqRel) {
            self.begin_fetch(key, slot, 0);
        }
    }

    async fn read(self: &Arc<Self>, key: &str) -> Option<SettingValue> {
        let slot = self.slot(key);
        self.request_initial_fetch(key, &slot);

        let mut rx = slot.state.subscribe();
        tokio::select! {
            () = self.liveness.cancelled() => {}
            _ = wait_until(&mut rx, |state| state.phase != FetchPhase::Fetching) => {}
        }
        slot.value()
    }

    async fn refresh(self: &Arc<Self>, key: &str) -> Option<SettingValue> {
        let slot = self.slot(key);
        slot.initial_fetch_requested.store(true, Ordering::Release);
        let ticket = slot.next_ticket.fetch_add(1, Ordering::AcqRel) + 1;
        self.schedule_refresh(key, &slot, ticket);

        let mut rx = slot.state.subscribe();
        tokio::select! {
            () = self.liveness.cancelled() => {}
            _ = wait_until(&mut rx, |state| state.settled_ticket >= ticket) => {}
        }
        slot.value()
    }

    /// Replaces the pending debounce timer for `key` with a new one.
    fn schedule_refresh(self: &Arc<Self>, key: &str, slot: &Arc<Slot>, ticket: u64) {
        let mut pending = slot
            .pending_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = pending.take() {
            timer.abort();
        }

        let inner = Arc::clone(self);
        let slot = Arc::clone(slot);
        let key = key.to_string();
        *pending = Some(tokio::spawn(async move {
            tokio::select! {
                () = inner.liveness.cancelled() => return,
                () = tokio::time::sleep(inner.debounce) => {}
            }

            let mut rx = slot.state.subscribe();
            // A fetch already in flight may predate this request; wait it out
            // and fetch again.
            while !inner.begin_fetch(&key, &slot, ticket) {
                if inner.liveness.is_cancelled() {
                    return;
                }
                tokio::select! {
                    () = inner.liveness.cancelled() => return,
                    settled = wait_until(&mut rx, |state| state.phase != FetchPhase::Fetching) => {
                        if !settled {
                            return;
                        }
                    }
                }
            }
        }));
    }

    /// Moves `key` to `Fetching` and spawns the fetch, unless one is already
    /// in flight or the cache is closed. Returns whether a fetch started.
    fn begin_fetch(self: &Arc<Self>, key: &str, slot: &Arc<Slot>, ticket: u64) -> bool {
        if self.liveness.is_cancelled() {
            return false;
        }

        let started = slot.state.send_if_modified(|state| {
            if state.phase == FetchPhase::Fetching {
                return false;
            }
            state.phase = FetchPhase::Fetching;
            true
        });
        if !started {
            return false;
        }

        debug!(key, ticket, "fetching setting");
        let inner = Arc::clone(self);
        let slot = Arc::clone(slot);
        let key = key.to_string();
        tokio::spawn(async move {
            let outcome = inner.fetcher.fetch_setting(&key).await;

            if inner.liveness.is_cancelled() {
                debug!(key = %key, "discarding setting fetched after cache was closed");
                return;
            }

            slot.state.send_modify(|state| {
                match outcome {
                    Ok(Some(setting)) => {
                        debug!(key = %key, "setting resolved");
                        state.value = Some(setting.value);
                    }
                    Ok(None) => {
                        warn!(key = %key, "setting not found, keeping previous value");
                    }
                    Err(err) => {
                        warn!(key = %key, error = %err, "setting fetch failed, keeping previous value");
                    }
                }
                state.phase = if state.value.is_some() {
                    FetchPhase::Resolved
                } else {
                    FetchPhase::Idle
                };
                state.settled_ticket = state.settled_ticket.max(ticket);
            });
        });
        true
    }
}

/// Waits until `predicate` holds. Returns false if the sender is gone.
async fn wait_until(
    rx: &mut watch::Receiver<SlotState>,
    predicate: impl FnMut(&SlotState) -> bool,
) -> bool {
    rx.wait_for(predicate).await.is_ok()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use rust_decimal_macros::dec;
    use tokio::time::{Instant, sleep};

    use super::*;

    const KEY: &str = "cost_per_km";
    const DEBOUNCE: Duration = Duration::from_millis(300);

    #[derive(Debug, Clone)]
    enum Response {
        Value(SettingValue),
        Missing,
        Fail,
    }

    struct FakeState {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
        response: Mutex<Response>,
    }

    #[derive(Clone)]
    struct FakeFetcher {
        state: Arc<FakeState>,
    }

    impl FakeFetcher {
        fn new(response: Response, delay: Duration) -> Self {
            Self {
                state: Arc::new(FakeState {
                    calls: AtomicUsize::new(0),
                    in_flight: AtomicUsize::new(0),
                    max_in_flight: AtomicUsize::new(0),
                    delay,
                    response: Mutex::new(response),
                }),
            }
        }

        fn returning(value: SettingValue) -> Self {
            Self::new(Response::Value(value), Duration::from_millis(50))
        }

        fn respond_with(&self, response: Response) {
            *self.state.response.lock().unwrap() = response;
        }

        fn calls(&self) -> usize {
            self.state.calls.load(Ordering::SeqCst)
        }

        fn max_in_flight(&self) -> usize {
            self.state.max_in_flight.load(Ordering::SeqCst)
        }
    }

    impl SettingFetcher for FakeFetcher {
        async fn fetch_setting(&self, key: &str) -> Result<Option<Setting>, SettingsError> {
            let state = &self.state;
            state.calls.fetch_add(1, Ordering::SeqCst);
            let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            state.max_in_flight.fetch_max(now, Ordering::SeqCst);

            sleep(state.delay).await;

            state.in_flight.fetch_sub(1, Ordering::SeqCst);
            let response = state.response.lock().unwrap().clone();
            match response {
                Response::Value(value) => Ok(Some(Setting {
                    key: key.to_string(),
                    value,
                    is_default: false,
                })),
                Response::Missing => Ok(None),
                Response::Fail => Err(SettingsError::Fetch {
                    key: key.to_string(),
                    message: "connection refused".into(),
                }),
            }
        }
    }

    fn fallback() -> SettingValue {
        SettingValue::Number(dec!(0.7))
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_reads_share_one_fetch() {
        let fetcher = FakeFetcher::returning(dec!(0.85).into());
        let cache = SettingValueCache::new(fetcher.clone(), DEBOUNCE);

        let (first, second) = tokio::join!(cache.read(KEY, fallback()), cache.read(KEY, fallback()));

        assert_eq!(first, SettingValue::Number(dec!(0.85)));
        assert_eq!(second, SettingValue::Number(dec!(0.85)));
        assert_eq!(fetcher.calls(), 1);

        let third = cache.read(KEY, fallback()).await;
        assert_eq!(third, SettingValue::Number(dec!(0.85)));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.phase(KEY), FetchPhase::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_cached_independently() {
        let fetcher = FakeFetcher::returning("shared".into());
        let cache = SettingValueCache::new(fetcher.clone(), DEBOUNCE);

        cache.read("a", fallback()).await;
        cache.read("b", fallback()).await;
        cache.read("a", fallback()).await;

        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_requests_are_debounced() {
        let fetcher = FakeFetcher::returning(dec!(0.85).into());
        let cache = Arc::new(SettingValueCache::new(fetcher.clone(), DEBOUNCE));
        let start = Instant::now();

        let mut waiters = Vec::new();
        for _ in 0..3 {
            let cache = Arc::clone(&cache);
            waiters.push(tokio::spawn(async move { cache.refresh(KEY).await }));
            sleep(Duration::from_millis(100)).await;
        }

        // Last request at t=200, so the timer fires at t=500.
        sleep(Duration::from_millis(190)).await;
        assert!(start.elapsed() < DEBOUNCE + Duration::from_millis(200));
        assert_eq!(fetcher.calls(), 0);

        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Some(dec!(0.85).into()));
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_keeps_default_without_retrying() {
        let fetcher = FakeFetcher::new(Response::Fail, Duration::from_millis(10));
        let cache = SettingValueCache::new(fetcher.clone(), DEBOUNCE);

        assert_eq!(cache.read(KEY, fallback()).await, fallback());
        assert_eq!(cache.phase(KEY), FetchPhase::Idle);
        assert!(!cache.is_loading(KEY));

        assert_eq!(cache.read(KEY, fallback()).await, fallback());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_setting_keeps_default() {
        let fetcher = FakeFetcher::new(Response::Missing, Duration::from_millis(10));
        let cache = SettingValueCache::new(fetcher.clone(), DEBOUNCE);

        assert_eq!(cache.read(KEY, fallback()).await, fallback());
        assert_eq!(cache.peek(KEY, fallback()), fallback());
        assert_eq!(cache.refresh(KEY).await, None);
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_replaces_value() {
        let fetcher = FakeFetcher::returning(dec!(0.85).into());
        let cache = SettingValueCache::new(fetcher.clone(), DEBOUNCE);
        cache.read(KEY, fallback()).await;

        fetcher.respond_with(Response::Value(dec!(0.9).into()));
        let refreshed = cache.refresh(KEY).await;

        assert_eq!(refreshed, Some(dec!(0.9).into()));
        assert_eq!(cache.peek(KEY, fallback()), dec!(0.9).into());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_previous_value() {
        let fetcher = FakeFetcher::returning(dec!(0.85).into());
        let cache = SettingValueCache::new(fetcher.clone(), DEBOUNCE);
        cache.read(KEY, fallback()).await;

        fetcher.respond_with(Response::Fail);
        let refreshed = cache.refresh(KEY).await;

        assert_eq!(refreshed, Some(dec!(0.85).into()));
        assert_eq!(cache.phase(KEY), FetchPhase::Resolved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_waits_for_in_flight_fetch() {
        let fetcher = FakeFetcher::new(
            Response::Value(dec!(0.85).into()),
            Duration::from_millis(500),
        );
        let cache = SettingValueCache::new(fetcher.clone(), DEBOUNCE);

        let (read, refreshed) = tokio::join!(cache.read(KEY, fallback()), cache.refresh(KEY));

        assert_eq!(read, dec!(0.85).into());
        assert_eq!(refreshed, Some(dec!(0.85).into()));
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(fetcher.max_in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_setting_loads_in_background() {
        let fetcher = FakeFetcher::returning(dec!(0.85).into());
        let cache = SettingValueCache::new(fetcher.clone(), DEBOUNCE);

        let setting = cache.cached_setting(KEY, fallback());
        assert_eq!(setting.key(), KEY);
        assert!(setting.is_loading());
        assert_eq!(setting.value(), fallback());

        assert_eq!(setting.load().await, dec!(0.85).into());
        assert!(!setting.is_loading());

        fetcher.respond_with(Response::Value(dec!(1.1).into()));
        assert_eq!(setting.refresh().await, dec!(1.1).into());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_discards_late_results() {
        let fetcher = FakeFetcher::returning(dec!(0.85).into());
        let cache = SettingValueCache::new(fetcher.clone(), DEBOUNCE);

        let setting = cache.cached_setting(KEY, fallback());
        cache.close();
        assert!(cache.is_closed());

        sleep(Duration::from_millis(200)).await;

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(setting.value(), fallback());
        assert_eq!(cache.phase(KEY), FetchPhase::Fetching);
        assert_eq!(setting.load().await, fallback());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_discards_late_results() {
        let fetcher = FakeFetcher::returning(dec!(0.85).into());
        let cache = SettingValueCache::new(fetcher.clone(), DEBOUNCE);
        let setting = cache.cached_setting(KEY, fallback());

        drop(cache);
        sleep(Duration::from_millis(200)).await;

        assert_eq!(setting.value(), fallback());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_refresh() {
        let fetcher = FakeFetcher::returning(dec!(0.85).into());
        let cache = Arc::new(SettingValueCache::new(fetcher.clone(), DEBOUNCE));

        let waiter = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.refresh(KEY).await })
        };
        sleep(Duration::from_millis(100)).await;
        cache.close();

        assert_eq!(waiter.await.unwrap(), None);
        sleep(DEBOUNCE).await;
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_with_config_uses_debounce_setting() {
        let config = SettingsCacheConfig {
            refresh_debounce_ms: 0,
        };
        let fetcher = FakeFetcher::new(Response::Value("ok".into()), Duration::ZERO);
        let cache = SettingValueCache::with_config(fetcher.clone(), &config);

        assert_eq!(cache.refresh(KEY).await, Some("ok".into()));
        assert_eq!(fetcher.calls(), 1);
    }
}
