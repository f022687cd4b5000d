use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::catalog::{DEFAULT_TOP_TRACKS, MAX_LIMIT};
use super::strategy::{
    CacheStrategy, GenreRequest, GuaranteedStrategy, LiveStrategy, MockStrategy, ResolutionStrategy,
};
use super::{guaranteed, DataSource, MusicCatalog, Resolution, Track};
use crate::cache::{CachedSong, DailyCacheStore, DEFAULT_PER_GENRE_CAP};
use crate::clock::Clock;
use crate::error::ResolveError;

/// Ajustes de [`ResolutionService`]
#[derive(Debug, Clone)]
pub struct ResolutionSettings {
    /// Canciones devueltas por género (máximo 50)
    pub per_genre_cap: usize,
    /// Canciones pedidas al catálogo (y guardadas) por género
    pub songs_per_genre: usize,
}

impl Default for ResolutionSettings {
    fn default() -> Self {
        Self {
            per_genre_cap: DEFAULT_PER_GENRE_CAP,
            songs_per_genre: 20,
        }
    }
}

/// Punto de entrada para las páginas que necesitan canciones.
///
/// Las búsquedas por género recorren una cadena ordenada de estrategias
/// (caché diario, catálogo en vivo, canciones de demostración, datos
/// garantizados) y devuelven la primera respuesta no vacía, etiquetada con su
/// origen. Solo la entrada mal formada es un error; la falta de datos nunca.
pub struct ResolutionService {
    store: Arc<DailyCacheStore>,
    catalog: Option<Arc<dyn MusicCatalog>>,
    strategies: Vec<Box<dyn ResolutionStrategy>>,
    per_genre_cap: usize,
}

impl ResolutionService {
    pub fn new(
        store: Arc<DailyCacheStore>,
        catalog: Option<Arc<dyn MusicCatalog>>,
        clock: Arc<dyn Clock>,
        settings: ResolutionSettings,
    ) -> Self {
        let mut strategies: Vec<Box<dyn ResolutionStrategy>> = vec![Box::new(CacheStrategy::new(store.clone()))];

        match &catalog {
            Some(catalog) => {
                info!("🔑 Catálogo en vivo configurado: {}", catalog.source_name());
                strategies.push(Box::new(LiveStrategy::new(
                    catalog.clone(),
                    store.clone(),
                    clock.clone(),
                    settings.songs_per_genre.clamp(1, MAX_LIMIT),
                )));
            }
            None => info!("ℹ️ Sin catálogo en vivo, usando solo caché y datos locales"),
        }

        strategies.push(Box::new(MockStrategy::new(clock.clone())));
        strategies.push(Box::new(GuaranteedStrategy::new(clock)));

        Self::with_strategies(store, catalog, strategies, settings.per_genre_cap)
    }

    /// Crea el servicio con una cadena de estrategias explícita
    pub fn with_strategies(
        store: Arc<DailyCacheStore>,
        catalog: Option<Arc<dyn MusicCatalog>>,
        strategies: Vec<Box<dyn ResolutionStrategy>>,
        per_genre_cap: usize,
    ) -> Self {
        Self {
            store,
            catalog,
            strategies,
            per_genre_cap: per_genre_cap.clamp(1, MAX_LIMIT),
        }
    }

    /// Nombres de las estrategias en el orden en que se prueban
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn store(&self) -> &Arc<DailyCacheStore> {
        &self.store
    }

    pub fn has_catalog(&self) -> bool {
        self.catalog.is_some()
    }

    /// Canciones para `genres`, como mucho `per_genre_cap` por género, en el
    /// orden pedido.
    ///
    /// Los nombres se recortan, pasan a minúsculas y se deduplican. Una lista
    /// vacía o un nombre en blanco se rechaza antes de cualquier E/S.
    pub async fn songs_by_genres<S: AsRef<str>>(
        &self,
        genres: &[S],
    ) -> Result<Resolution<CachedSong>, ResolveError> {
        let request = GenreRequest {
            genres: normalize_genres(genres)?,
            per_genre_cap: self.per_genre_cap,
        };
        let start_time = Instant::now();

        for strategy in &self.strategies {
            let resolution = strategy.resolve(&request).await;
            if resolution.is_empty() {
                debug!("⚠️ {} no devolvió canciones", strategy.name());
                continue;
            }

            info!(
                "✅ {:?}: {} canciones desde {} ({}) en {:?}",
                request.genres,
                resolution.len(),
                strategy.name(),
                resolution.source,
                start_time.elapsed()
            );
            return Ok(resolution);
        }

        warn!("❌ Ninguna estrategia devolvió canciones para {:?}", request.genres);
        Ok(Resolution::new(DataSource::Guaranteed, Vec::new()))
    }

    /// Búsqueda en vivo con los datos garantizados como respaldo (ids `search-*`)
    pub async fn search(&self, query: &str, limit: usize) -> Result<Resolution<Track>, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::InvalidQuery("query is empty".to_string()));
        }
        let limit = limit.clamp(1, MAX_LIMIT);

        if let Some(catalog) = &self.catalog {
            match catalog.search(query, limit).await {
                Ok(tracks) if !tracks.is_empty() => return Ok(Resolution::new(DataSource::Live, tracks)),
                Ok(_) => warn!("⚠️ Búsqueda '{}' sin resultados en vivo", query),
                Err(e) => warn!("❌ Búsqueda '{}' falló: {}", query, e),
            }
        }

        Ok(Resolution::new(DataSource::Guaranteed, guaranteed::search(query, limit)))
    }

    /// Selección para la portada, `limit` por defecto 6
    pub async fn top_tracks(&self, limit: Option<usize>) -> Resolution<Track> {
        let limit = limit.unwrap_or(DEFAULT_TOP_TRACKS).max(1);

        if let Some(catalog) = &self.catalog {
            match catalog.top_tracks(limit).await {
                Ok(tracks) if !tracks.is_empty() => return Resolution::new(DataSource::Live, tracks),
                Ok(_) => warn!("⚠️ Top tracks vacío en vivo"),
                Err(e) => warn!("❌ Top tracks falló: {}", e),
            }
        }

        Resolution::new(DataSource::Guaranteed, guaranteed::top(limit))
    }
}

fn normalize_genres<S: AsRef<str>>(genres: &[S]) -> Result<Vec<String>, ResolveError> {
    if genres.is_empty() {
        return Err(ResolveError::InvalidGenres("no genres requested".to_string()));
    }

    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(genres.len());
    for genre in genres {
        let genre = genre.as_ref().trim().to_lowercase();
        if genre.is_empty() {
            return Err(ResolveError::InvalidGenres("blank genre name".to_string()));
        }
        if seen.insert(genre.clone()) {
            normalized.push(genre);
        }
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CatalogError;
    use crate::sources::{sample_track, MockMusicCatalog};
    use crate::storage::MemoryStorage;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    struct Fixture {
        clock: Arc<ManualClock>,
        storage: Arc<MemoryStorage>,
        store: Arc<DailyCacheStore>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()));
        let storage = Arc::new(MemoryStorage::new());
        let store = Arc::new(DailyCacheStore::new(storage.clone(), clock.clone()));
        Fixture { clock, storage, store }
    }

    fn service(f: &Fixture, catalog: Option<MockMusicCatalog>) -> ResolutionService {
        ResolutionService::new(
            f.store.clone(),
            catalog.map(|c| Arc::new(c) as Arc<dyn MusicCatalog>),
            f.clock.clone(),
            ResolutionSettings::default(),
        )
    }

    fn failing_catalog() -> MockMusicCatalog {
        let mut catalog = MockMusicCatalog::new();
        catalog
            .expect_songs_by_genre()
            .returning(|genre, _| Err(CatalogError::NoPlayableResults(genre.to_string())));
        catalog.expect_search().returning(|q, _| Err(CatalogError::NoPlayableResults(q.to_string())));
        catalog
            .expect_top_tracks()
            .returning(|_| Err(CatalogError::NoPlayableResults("top".to_string())));
        catalog.expect_source_name().return_const("failing");
        catalog
    }

    #[test]
    fn test_normalize_genres() {
        assert_eq!(
            normalize_genres(&[" Pop", "rock", "POP "]).unwrap(),
            vec!["pop".to_string(), "rock".to_string()]
        );
        assert!(matches!(normalize_genres::<&str>(&[]), Err(ResolveError::InvalidGenres(_))));
        assert!(matches!(normalize_genres(&["pop", "  "]), Err(ResolveError::InvalidGenres(_))));
    }

    #[tokio::test]
    async fn test_strategy_order() {
        let f = fixture();
        let offline = service(&f, None);
        assert_eq!(
            offline.strategy_names(),
            vec!["daily cache", "bundled mock songs", "guaranteed data"]
        );

        let online = service(&f, Some(failing_catalog()));
        assert_eq!(
            online.strategy_names(),
            vec!["daily cache", "live catalog", "bundled mock songs", "guaranteed data"]
        );
    }

    #[tokio::test]
    async fn test_failing_catalog_falls_back_to_mock_songs() {
        let f = fixture();
        let svc = service(&f, Some(failing_catalog()));

        let result = svc.songs_by_genres(&["pop"]).await.unwrap();

        assert_eq!(result.source, DataSource::Mock);
        assert!(!result.is_empty());
        assert!(result.songs.iter().all(|s| s.track.id.starts_with("mock-")));
        assert!(result.len() <= DEFAULT_PER_GENRE_CAP);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_the_catalog() {
        let f = fixture();
        let mut catalog = MockMusicCatalog::new();
        catalog
            .expect_songs_by_genre()
            .times(1)
            .returning(|_, _| Ok((1..=8).map(|i| sample_track(&format!("p{}", i), Some("u"))).collect()));
        catalog.expect_source_name().return_const("mock catalog");
        let svc = service(&f, Some(catalog));

        let first = svc.songs_by_genres(&["pop"]).await.unwrap();
        assert_eq!(first.source, DataSource::Live);
        assert_eq!(first.len(), DEFAULT_PER_GENRE_CAP);

        f.clock.advance(Duration::hours(1));
        let second = svc.songs_by_genres(&["pop"]).await.unwrap();

        assert_eq!(second.source, DataSource::Cache);
        assert_eq!(second.songs, first.songs);
    }

    #[tokio::test]
    async fn test_expired_cache_is_not_served_when_catalog_is_down() {
        let f = fixture();
        let tracks = vec![sample_track("p1", Some("u"))];
        f.store
            .add_genre("pop", CachedSong::rank_tracks("pop", tracks, f.clock.now()))
            .await;

        f.clock.advance(Duration::hours(25));
        let svc = service(&f, Some(failing_catalog()));
        let result = svc.songs_by_genres(&["pop"]).await.unwrap();

        assert_eq!(result.source, DataSource::Mock);
        assert!(result.songs.iter().all(|s| s.track.id != "p1"));
        assert!(f.storage.raw(crate::cache::CACHE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_partial_cache_with_failing_catalog_is_tagged_as_cache() {
        let f = fixture();
        let tracks = vec![sample_track("p1", Some("u"))];
        f.store
            .add_genre("pop", CachedSong::rank_tracks("pop", tracks, f.clock.now()))
            .await;

        f.clock.advance(Duration::hours(5));
        let svc = service(&f, Some(failing_catalog()));
        let result = svc.songs_by_genres(&["pop", "rock"]).await.unwrap();

        assert_eq!(result.source, DataSource::Cache);
        let ids: Vec<&str> = result.songs.iter().map(|s| s.track.id.as_str()).collect();
        assert_eq!(ids, vec!["p1"]);
    }

    #[tokio::test]
    async fn test_huge_per_genre_cap_is_clamped() {
        let f = fixture();
        let settings = ResolutionSettings {
            per_genre_cap: usize::MAX / 2,
            ..ResolutionSettings::default()
        };
        let svc = ResolutionService::new(f.store.clone(), None, f.clock.clone(), settings);

        let result = svc.songs_by_genres(&["pop", "rock", "jazz"]).await.unwrap();

        assert_eq!(result.source, DataSource::Mock);
        assert!(!result.is_empty());
        assert!(result.len() <= 3 * MAX_LIMIT);
    }

    #[tokio::test]
    async fn test_invalid_genres_rejected_without_io() {
        let f = fixture();
        let mut catalog = MockMusicCatalog::new();
        catalog.expect_songs_by_genre().never();
        catalog.expect_source_name().return_const("mock catalog");
        let svc = service(&f, Some(catalog));

        let err = svc.songs_by_genres::<&str>(&[]).await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidGenres(_)));
    }

    #[tokio::test]
    async fn test_search_falls_back_to_guaranteed() {
        let f = fixture();
        let svc = service(&f, Some(failing_catalog()));

        let result = svc.search("jazz", 10).await.unwrap();
        assert_eq!(result.source, DataSource::Guaranteed);
        assert!(result.songs.iter().all(|t| t.id.starts_with("search-")));

        assert!(matches!(svc.search("  ", 10).await, Err(ResolveError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_search_live() {
        let f = fixture();
        let mut catalog = MockMusicCatalog::new();
        catalog
            .expect_search()
            .withf(|q, limit| q == "daft punk" && *limit == 50)
            .returning(|_, _| Ok(vec![sample_track("1", Some("u"))]));
        catalog.expect_source_name().return_const("mock catalog");
        let svc = service(&f, Some(catalog));

        let result = svc.search(" daft punk ", 500).await.unwrap();
        assert_eq!(result.source, DataSource::Live);
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_top_tracks_fallback_and_default_limit() {
        let f = fixture();
        let offline = service(&f, None);
        let result = offline.top_tracks(None).await;
        assert_eq!(result.source, DataSource::Guaranteed);
        assert_eq!(result.len(), DEFAULT_TOP_TRACKS);

        let online = service(&f, Some(failing_catalog()));
        assert_eq!(online.top_tracks(Some(2)).await.len(), 2);
    }
}
