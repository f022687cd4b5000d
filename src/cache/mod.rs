//! # Cache Module
//!
//! Daily song cache for Open Music.
//!
//! Songs fetched for a genre are kept for a day so genre pages load without
//! touching the rate-limited catalog proxy. The whole cache shares a single
//! `lastUpdated` timestamp:
//!
//! - **Global TTL**: once `now - lastUpdated` exceeds the TTL (24h by
//!   default) every genre is discarded together, never a partial view
//! - **Refresh on write**: adding any genre bumps `lastUpdated`, which also
//!   extends the life of genres written earlier
//! - **Self-healing**: an unreadable or corrupt stored value is erased and
//!   reported as "no cache"
//! - **Failure absorbing**: storage, quota and parse errors never reach the
//!   caller, they are logged as warnings
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use open_music_catalog::cache::DailyCacheStore;
//! use open_music_catalog::clock::SystemClock;
//! use open_music_catalog::storage::MemoryStorage;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let store = DailyCacheStore::new(Arc::new(MemoryStorage::new()), Arc::new(SystemClock));
//!
//! if store.needs_update().await {
//!     // fetch songs and call store.add_genre(...)
//! }
//! let songs = store.songs_for_genres(&["pop".to_string()], 5).await;
//! # }
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::sources::Track;
use crate::storage::KeyValueStorage;

/// Storage key holding the serialized cache
pub const CACHE_KEY: &str = "daily_songs_cache";

/// Songs per genre returned by [`DailyCacheStore::songs_for_genres`] by default
pub const DEFAULT_PER_GENRE_CAP: usize = 5;

/// A track as stored for one genre.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSong {
    #[serde(flatten)]
    pub track: Track,
    pub genre: String,
    /// 1-based position within the genre when it was cached
    pub rank: usize,
    pub cached_date: DateTime<Utc>,
}

impl CachedSong {
    /// Tags `tracks` with `genre`, ranking them by arrival order
    pub fn rank_tracks(genre: &str, tracks: Vec<Track>, cached_date: DateTime<Utc>) -> Vec<CachedSong> {
        tracks
            .into_iter()
            .enumerate()
            .map(|(i, track)| CachedSong {
                track,
                genre: genre.to_string(),
                rank: i + 1,
                cached_date,
            })
            .collect()
    }
}

/// Persisted shape of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySongsCache {
    pub last_updated: DateTime<Utc>,
    pub genres: BTreeMap<String, Vec<CachedSong>>,
}

impl DailySongsCache {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            last_updated: now,
            genres: BTreeMap::new(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_updated > ttl
    }
}

/// Genre-keyed store with a single global time-to-live.
pub struct DailyCacheStore {
    storage: Arc<dyn KeyValueStorage>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    // Serializes read-modify-write in add_genre
    write_lock: Mutex<()>,
}

impl DailyCacheStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            ttl: Duration::hours(24),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The current cache, or `None` when missing, corrupt or expired.
    ///
    /// Corrupt and expired values are erased from storage as a side effect.
    pub async fn read(&self) -> Option<DailySongsCache> {
        let raw = match self.storage.get(CACHE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("⚠️ No se pudo leer el caché diario: {}", e);
                return None;
            }
        };

        let cache: DailySongsCache = match serde_json::from_str(&raw) {
            Ok(cache) => cache,
            Err(e) => {
                warn!("🧹 Caché diario corrupto, eliminando: {}", e);
                self.erase().await;
                return None;
            }
        };

        if cache.is_expired(self.clock.now(), self.ttl) {
            info!("⏰ Caché diario expirado (última actualización {})", cache.last_updated);
            self.erase().await;
            return None;
        }

        Some(cache)
    }

    /// Replaces the stored cache, stamping it with the current time
    pub async fn write(&self, mut cache: DailySongsCache) {
        cache.last_updated = self.clock.now();

        let content = match serde_json::to_string(&cache) {
            Ok(content) => content,
            Err(e) => {
                warn!("⚠️ No se pudo serializar el caché diario: {}", e);
                return;
            }
        };

        match self.storage.set(CACHE_KEY, &content).await {
            Ok(()) => debug!("💾 Caché diario guardado ({} géneros)", cache.genres.len()),
            Err(e) => warn!("⚠️ No se pudo guardar el caché diario: {}", e),
        }
    }

    pub async fn songs_for_genre(&self, genre: &str) -> Vec<CachedSong> {
        self.read()
            .await
            .and_then(|mut cache| cache.genres.remove(genre))
            .unwrap_or_default()
    }

    /// Up to `per_genre_cap` songs per genre, concatenated in request order
    pub async fn songs_for_genres(&self, genres: &[String], per_genre_cap: usize) -> Vec<CachedSong> {
        let Some(mut cache) = self.read().await else {
            return Vec::new();
        };

        genres
            .iter()
            .filter_map(|genre| cache.genres.remove(genre))
            .flat_map(|songs| songs.into_iter().take(per_genre_cap))
            .collect()
    }

    /// Genres among `genres` that have no cached songs
    pub async fn missing_genres(&self, genres: &[String]) -> Vec<String> {
        let cache = self.read().await;
        genres
            .iter()
            .filter(|genre| {
                cache
                    .as_ref()
                    .and_then(|c| c.genres.get(genre.as_str()))
                    .is_none_or(|songs| songs.is_empty())
            })
            .cloned()
            .collect()
    }

    /// Overwrites one genre and refreshes the cache-wide timestamp
    pub async fn add_genre(&self, genre: &str, songs: Vec<CachedSong>) {
        let _guard = self.write_lock.lock().await;

        let mut cache = match self.read().await {
            Some(cache) => cache,
            None => DailySongsCache::empty(self.clock.now()),
        };
        info!("📝 Género '{}' cacheado con {} canciones", genre, songs.len());
        cache.genres.insert(genre.to_string(), songs);
        self.write(cache).await;
    }

    pub async fn needs_update(&self) -> bool {
        self.read().await.is_none()
    }

    pub async fn clear(&self) {
        self.erase().await;
        info!("🗑️ Caché diario limpiado");
    }

    async fn erase(&self) {
        if let Err(e) = self.storage.remove(CACHE_KEY).await {
            warn!("⚠️ No se pudo eliminar el caché diario: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::sources::sample_track;
    use crate::storage::MemoryStorage;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap()
    }

    fn store() -> (DailyCacheStore, Arc<MemoryStorage>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(start()));
        let store = DailyCacheStore::new(storage.clone(), clock.clone());
        (store, storage, clock)
    }

    fn songs(genre: &str, n: usize) -> Vec<CachedSong> {
        let tracks = (1..=n)
            .map(|i| sample_track(&format!("{}-{}", genre, i), Some("https://cdn/p.mp3")))
            .collect();
        CachedSong::rank_tracks(genre, tracks, start())
    }

    #[tokio::test]
    async fn test_empty_store_needs_update() {
        let (store, _, _) = store();
        assert!(store.needs_update().await);
        assert!(store.read().await.is_none());
        assert!(store.songs_for_genre("pop").await.is_empty());
    }

    #[tokio::test]
    async fn test_add_genre_then_read_back_in_rank_order() {
        let (store, _, _) = store();
        store.add_genre("pop", songs("pop", 3)).await;

        let cached = store.songs_for_genre("pop").await;
        let ranks: Vec<usize> = cached.iter().map(|s| s.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(cached[0].track.id, "pop-1");
        assert!(!store.needs_update().await);
    }

    #[tokio::test]
    async fn test_songs_for_genres_caps_and_keeps_request_order() {
        let (store, _, _) = store();
        store.add_genre("pop", songs("pop", 7)).await;
        store.add_genre("rock", songs("rock", 2)).await;

        let result = store
            .songs_for_genres(&["rock".to_string(), "jazz".to_string(), "pop".to_string()], 5)
            .await;
        let ids: Vec<&str> = result.iter().map(|s| s.track.id.as_str()).collect();

        assert_eq!(ids, vec!["rock-1", "rock-2", "pop-1", "pop-2", "pop-3", "pop-4", "pop-5"]);
    }

    #[tokio::test]
    async fn test_expiry_is_whole_cache() {
        let (store, storage, clock) = store();
        store.add_genre("pop", songs("pop", 2)).await;

        clock.advance(Duration::hours(24));
        assert!(!store.needs_update().await);

        clock.advance(Duration::seconds(1));
        assert!(store.needs_update().await);
        assert!(storage.raw(CACHE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_writing_one_genre_extends_the_others() {
        let (store, _, clock) = store();
        store.add_genre("rock", songs("rock", 2)).await;

        clock.advance(Duration::hours(23));
        store.add_genre("pop", songs("pop", 2)).await;
        assert!(!store.needs_update().await);

        clock.advance(Duration::hours(20));
        assert_eq!(store.songs_for_genre("rock").await.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_value_is_erased() {
        let (store, storage, _) = store();
        storage.set(CACHE_KEY, "{not json").await.unwrap();

        assert!(store.read().await.is_none());
        assert!(storage.raw(CACHE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_storage_failures_are_absorbed() {
        let storage = Arc::new(MemoryStorage::new().with_quota(16));
        let store = DailyCacheStore::new(storage.clone(), Arc::new(ManualClock::new(start())));

        store.add_genre("pop", songs("pop", 3)).await;
        assert!(store.needs_update().await);

        storage.set_available(false);
        store.clear().await;
        assert!(store.read().await.is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (store, storage, _) = store();
        store.clear().await;
        store.add_genre("pop", songs("pop", 1)).await;
        store.clear().await;
        store.clear().await;
        assert!(storage.raw(CACHE_KEY).is_none());
        assert!(store.needs_update().await);
    }

    #[tokio::test]
    async fn test_missing_genres() {
        let (store, _, _) = store();
        store.add_genre("pop", songs("pop", 1)).await;
        store.add_genre("rock", Vec::new()).await;

        let missing = store
            .missing_genres(&["pop".to_string(), "rock".to_string(), "jazz".to_string()])
            .await;
        assert_eq!(missing, vec!["rock".to_string(), "jazz".to_string()]);
    }

    #[test]
    fn test_serialized_shape() {
        let mut cache = DailySongsCache::empty(start());
        cache.genres.insert("pop".to_string(), songs("pop", 1));

        let value = serde_json::to_value(&cache).unwrap();
        assert!(value.get("lastUpdated").is_some());
        let song = &value["genres"]["pop"][0];
        assert_eq!(song["genre"], "pop");
        assert_eq!(song["rank"], 1);
        assert_eq!(song["title"], "Song pop-1");
        assert!(song.get("cachedDate").is_some());
    }
}
