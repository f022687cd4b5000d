//! Estrategias de resolución para las páginas de género.
//!
//! El servicio recorre la lista en orden y se queda con la primera respuesta
//! no vacía. Las estrategias nunca fallan: un nivel que no puede responder
//! devuelve una lista vacía y se prueba el siguiente.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{guaranteed, mock, DataSource, MusicCatalog, Resolution};
use crate::cache::{CachedSong, DailyCacheStore};
use crate::clock::Clock;

/// Petición de géneros ya validada
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenreRequest {
    /// Normalizados, sin duplicados, en el orden pedido
    pub genres: Vec<String>,
    pub per_genre_cap: usize,
}

#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Nivel al que pertenece la estrategia
    fn source(&self) -> DataSource;

    /// Canciones etiquetadas con su origen real; vacío si no puede responder
    async fn resolve(&self, request: &GenreRequest) -> Resolution<CachedSong>;
}

/// Sirve el caché diario cuando contiene todos los géneros pedidos
pub struct CacheStrategy {
    store: Arc<DailyCacheStore>,
}

impl CacheStrategy {
    pub fn new(store: Arc<DailyCacheStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ResolutionStrategy for CacheStrategy {
    fn name(&self) -> &'static str {
        "daily cache"
    }

    fn source(&self) -> DataSource {
        DataSource::Cache
    }

    async fn resolve(&self, request: &GenreRequest) -> Resolution<CachedSong> {
        let Some(mut cache) = self.store.read().await else {
            debug!("📭 Sin caché diario vigente");
            return Resolution::new(self.source(), Vec::new());
        };

        let mut songs = Vec::new();
        for genre in &request.genres {
            match cache.genres.remove(genre) {
                Some(cached) if !cached.is_empty() => {
                    songs.extend(cached.into_iter().take(request.per_genre_cap));
                }
                _ => {
                    debug!("📭 Género '{}' no está en caché", genre);
                    return Resolution::new(self.source(), Vec::new());
                }
            }
        }
        Resolution::new(self.source(), songs)
    }
}

/// Pide al catálogo los géneros que faltan en caché y los guarda
pub struct LiveStrategy {
    catalog: Arc<dyn MusicCatalog>,
    store: Arc<DailyCacheStore>,
    clock: Arc<dyn Clock>,
    songs_per_genre: usize,
}

impl LiveStrategy {
    pub fn new(
        catalog: Arc<dyn MusicCatalog>,
        store: Arc<DailyCacheStore>,
        clock: Arc<dyn Clock>,
        songs_per_genre: usize,
    ) -> Self {
        Self {
            catalog,
            store,
            clock,
            songs_per_genre,
        }
    }
}

#[async_trait]
impl ResolutionStrategy for LiveStrategy {
    fn name(&self) -> &'static str {
        "live catalog"
    }

    fn source(&self) -> DataSource {
        DataSource::Live
    }

    async fn resolve(&self, request: &GenreRequest) -> Resolution<CachedSong> {
        let missing = self.store.missing_genres(&request.genres).await;
        let mut fetched: Vec<(String, Vec<CachedSong>)> = Vec::new();

        // Un género a la vez; si uno falla los demás siguen
        for genre in &missing {
            match self.catalog.songs_by_genre(genre, self.songs_per_genre).await {
                Ok(tracks) => {
                    let ranked = CachedSong::rank_tracks(genre, tracks, self.clock.now());
                    info!(
                        "🌐 {} devolvió {} canciones para '{}'",
                        self.catalog.source_name(),
                        ranked.len(),
                        genre
                    );
                    self.store.add_genre(genre, ranked.clone()).await;
                    fetched.push((genre.clone(), ranked));
                }
                Err(e) if e.is_transient() => {
                    warn!("⏳ Género '{}' no disponible por ahora: {}", genre, e)
                }
                Err(e) => warn!("❌ Género '{}' no disponible: {}", genre, e),
            }
        }

        let cached = self
            .store
            .songs_for_genres(&request.genres, request.per_genre_cap)
            .await;
        if !cached.is_empty() {
            // Nada llegó del catálogo en esta llamada: todo sale del caché
            let source = if fetched.is_empty() {
                DataSource::Cache
            } else {
                self.source()
            };
            return Resolution::new(source, cached);
        }

        // El almacenamiento rechazó la escritura; se devuelve lo obtenido
        if !fetched.is_empty() {
            warn!("⚠️ Caché no disponible, usando resultados en vivo sin cachear");
        }
        let songs = request
            .genres
            .iter()
            .filter_map(|genre| fetched.iter().find(|(g, _)| g == genre))
            .flat_map(|(_, songs)| songs.iter().take(request.per_genre_cap).cloned())
            .collect();
        Resolution::new(self.source(), songs)
    }
}

/// Canciones de demostración incluidas en el binario
pub struct MockStrategy {
    clock: Arc<dyn Clock>,
}

impl MockStrategy {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl ResolutionStrategy for MockStrategy {
    fn name(&self) -> &'static str {
        "bundled mock songs"
    }

    fn source(&self) -> DataSource {
        DataSource::Mock
    }

    async fn resolve(&self, request: &GenreRequest) -> Resolution<CachedSong> {
        let songs = mock::songs_for_genres(&request.genres, request.per_genre_cap, self.clock.now());
        Resolution::new(self.source(), songs)
    }
}

/// Último nivel, siempre responde
pub struct GuaranteedStrategy {
    clock: Arc<dyn Clock>,
}

impl GuaranteedStrategy {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl ResolutionStrategy for GuaranteedStrategy {
    fn name(&self) -> &'static str {
        "guaranteed data"
    }

    fn source(&self) -> DataSource {
        DataSource::Guaranteed
    }

    async fn resolve(&self, request: &GenreRequest) -> Resolution<CachedSong> {
        let songs = guaranteed::for_genres(&request.genres, request.per_genre_cap, self.clock.now());
        Resolution::new(self.source(), songs)
    }
}
