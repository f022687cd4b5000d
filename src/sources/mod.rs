pub mod catalog;
pub mod guaranteed;
pub mod mock;
pub mod resolver;
pub mod strategy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub use catalog::{CatalogClient, CatalogSettings};
pub use resolver::ResolutionService;

/// Trait común para los catálogos de música en vivo
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MusicCatalog: Send + Sync {
    /// Busca tracks reproducibles
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>, CatalogError>;

    /// Tracks para un género (no existe endpoint nativo de géneros)
    async fn songs_by_genre(&self, genre: &str, limit: usize) -> Result<Vec<Track>, CatalogError>;

    /// Selección corta repartida entre los géneros semilla
    async fn top_tracks(&self, limit: usize) -> Result<Vec<Track>, CatalogError>;

    /// Nombre de la fuente
    fn source_name(&self) -> &'static str;
}

/// Canción resuelta desde cualquier nivel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist_name: String,
    pub artist_id: String,
    pub album_title: String,
    pub album_id: String,
    /// Segundos
    pub duration: u32,
    pub cover_url: Option<String>,
    /// Sin preview el track no se puede reproducir
    pub preview_url: Option<String>,
    /// Popularidad según el catálogo, solo comparable dentro de una respuesta
    pub popularity: u64,
}

impl Track {
    /// Título, artista y URL de preview no vacíos
    pub fn is_playable(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.artist_name.trim().is_empty()
            && self
                .preview_url
                .as_deref()
                .is_some_and(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub picture_url: Option<String>,
    pub fans: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub title: String,
    pub cover_url: Option<String>,
    pub release_date: Option<String>,
}

/// Nivel que produjo una resolución
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Cache,
    Live,
    Mock,
    Guaranteed,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Cache => "cache",
            DataSource::Live => "live",
            DataSource::Mock => "mock",
            DataSource::Guaranteed => "guaranteed",
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canciones junto con el nivel del que salieron, para no confundir datos de
/// respaldo con datos en vivo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution<T> {
    pub source: DataSource,
    pub songs: Vec<T>,
}

impl<T> Resolution<T> {
    pub fn new(source: DataSource, songs: Vec<T>) -> Self {
        Self { source, songs }
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    pub fn into_songs(self) -> Vec<T> {
        self.songs
    }
}

#[cfg(test)]
pub(crate) fn sample_track(id: &str, preview: Option<&str>) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Song {}", id),
        artist_name: "Artist".to_string(),
        artist_id: "1".to_string(),
        album_title: "Album".to_string(),
        album_id: "10".to_string(),
        duration: 180,
        cover_url: None,
        preview_url: preview.map(str::to_string),
        popularity: 500_000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playable_requires_preview_title_and_artist() {
        assert!(sample_track("1", Some("https://cdn/p.mp3")).is_playable());
        assert!(!sample_track("2", None).is_playable());
        assert!(!sample_track("3", Some("  ")).is_playable());

        let mut nameless = sample_track("4", Some("https://cdn/p.mp3"));
        nameless.artist_name = String::new();
        assert!(!nameless.is_playable());
    }

    #[test]
    fn test_data_source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&DataSource::Guaranteed).unwrap(), "\"guaranteed\"");
        assert_eq!(DataSource::Live.to_string(), "live");
    }
}
