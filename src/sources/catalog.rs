use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Album, Artist, MusicCatalog, Track};
use crate::error::CatalogError;

/// Máximo que acepta el proxy para `limit`
pub const MAX_LIMIT: usize = 50;

/// Los offsets de paginación salen de `0..OFFSET_RANGE`
pub const OFFSET_RANGE: u32 = 100;

/// Una sub-consulta por género semilla alimenta `top_tracks`
pub const SEED_GENRES: [&str; 3] = ["pop", "rock", "electronic"];

pub const DEFAULT_TOP_TRACKS: usize = 6;

const TOP_TRACKS_PER_SEED: usize = 2;
const SEED_QUERY_LIMIT: usize = 10;

pub const DEFAULT_BASE_URL: &str = "https://deezerdevs-deezer.p.rapidapi.com";
pub const DEFAULT_API_HOST: &str = "deezerdevs-deezer.p.rapidapi.com";

/// Ajustes de conexión al proxy del catálogo
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_host: String,
    pub timeout: Duration,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            api_host: DEFAULT_API_HOST.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiId {
    Number(u64),
    Text(String),
}

impl std::fmt::Display for ApiId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiId::Number(n) => write!(f, "{}", n),
            ApiId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    id: ApiId,
    title: Option<String>,
    duration: Option<u32>,
    rank: Option<u64>,
    preview: Option<String>,
    artist: Option<ApiArtist>,
    album: Option<ApiAlbum>,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    id: Option<ApiId>,
    name: Option<String>,
    picture_medium: Option<String>,
    picture: Option<String>,
    nb_fan: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    id: Option<ApiId>,
    title: Option<String>,
    cover_medium: Option<String>,
    cover: Option<String>,
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    #[serde(default)]
    data: Vec<Value>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl ApiTrack {
    fn into_track(self) -> Track {
        let (artist_id, artist_name) = match self.artist {
            Some(artist) => (
                artist.id.map(|id| id.to_string()).unwrap_or_default(),
                artist.name.unwrap_or_default(),
            ),
            None => (String::new(), String::new()),
        };

        let (album_id, album_title, cover_url) = match self.album {
            Some(album) => (
                album.id.map(|id| id.to_string()).unwrap_or_default(),
                album.title.unwrap_or_default(),
                non_empty(album.cover_medium).or(non_empty(album.cover)),
            ),
            None => (String::new(), String::new(), None),
        };

        Track {
            id: self.id.to_string(),
            title: self.title.unwrap_or_default(),
            artist_name,
            artist_id,
            album_title,
            album_id,
            duration: self.duration.unwrap_or(0),
            cover_url,
            preview_url: non_empty(self.preview),
            popularity: self.rank.unwrap_or(0),
        }
    }
}

/// Cliente para el proxy del catálogo de música
///
/// Todo track devuelto es reproducible. Las búsquedas usan un offset de
/// paginación aleatorio, así consultas repetidas traen canciones distintas;
/// con [`CatalogClient::with_seed`] los offsets son reproducibles.
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    api_host: String,
    rng: Mutex<StdRng>,
}

impl CatalogClient {
    pub fn new(settings: CatalogSettings) -> Result<Self, CatalogError> {
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        url::Url::parse(&base_url)
            .map_err(|e| CatalogError::InvalidRequest(format!("base URL '{}': {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("open-music-catalog/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: settings.api_key,
            api_host: settings.api_host,
            rng: Mutex::new(StdRng::from_entropy()),
        })
    }

    /// Fija la secuencia de offsets de paginación
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn next_offset(&self) -> u32 {
        self.rng.lock().gen_range(0..OFFSET_RANGE)
    }

    /// Busca tracks reproducibles
    ///
    /// El offset de paginación es aleatorio: llamadas idénticas pueden
    /// devolver canciones distintas.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::InvalidRequest("empty search query".to_string()));
        }
        if limit == 0 {
            return Err(CatalogError::InvalidRequest("limit must be at least 1".to_string()));
        }
        let limit = limit.min(MAX_LIMIT);
        let offset = self.next_offset();

        debug!("🔍 Buscando '{}' (limit {}, index {})", query, limit, offset);

        let page = self
            .get_page(
                "/search",
                &[
                    ("q", query.to_string()),
                    ("limit", limit.to_string()),
                    ("index", offset.to_string()),
                ],
            )
            .await?;

        let tracks = playable_tracks(page.data, query)?;
        info!("✅ '{}': {} tracks reproducibles", query, tracks.len());
        Ok(tracks)
    }

    /// El proxy no tiene endpoint de géneros, el nombre del género es la consulta
    pub async fn songs_by_genre(&self, genre: &str, limit: usize) -> Result<Vec<Track>, CatalogError> {
        self.search(genre, limit).await
    }

    /// Como mucho dos tracks por género semilla, en orden de semillas
    ///
    /// Una semilla que falla se registra y se omite; la llamada solo falla
    /// cuando ninguna semilla devolvió nada.
    pub async fn top_tracks(&self, limit: usize) -> Result<Vec<Track>, CatalogError> {
        if limit == 0 {
            return Err(CatalogError::InvalidRequest("limit must be at least 1".to_string()));
        }

        let lookups = SEED_GENRES
            .iter()
            .map(|genre| async move { (*genre, self.songs_by_genre(genre, SEED_QUERY_LIMIT).await) });
        let results = join_all(lookups).await;

        let mut seen = HashSet::new();
        let mut tracks = Vec::new();
        for (genre, result) in results {
            match result {
                Ok(found) => {
                    let picked: Vec<Track> = found
                        .into_iter()
                        .filter(|t| !seen.contains(&t.id))
                        .take(TOP_TRACKS_PER_SEED)
                        .collect();
                    seen.extend(picked.iter().map(|t| t.id.clone()));
                    tracks.extend(picked);
                }
                Err(e) => warn!("⚠️ Género semilla '{}' falló: {}", genre, e),
            }
        }

        tracks.truncate(limit);
        if tracks.is_empty() {
            return Err(CatalogError::NoPlayableResults("top tracks".to_string()));
        }
        Ok(tracks)
    }

    pub async fn track(&self, id: &str) -> Result<Track, CatalogError> {
        let body = self.get_json(&format!("/track/{}", encode_id(id)?), &[]).await?;
        let track = serde_json::from_value::<ApiTrack>(body)?.into_track();
        if !track.is_playable() {
            return Err(CatalogError::NoPlayableResults(format!("track {}", id)));
        }
        Ok(track)
    }

    pub async fn artist(&self, id: &str) -> Result<Artist, CatalogError> {
        let body = self.get_json(&format!("/artist/{}", encode_id(id)?), &[]).await?;
        let artist: ApiArtist = serde_json::from_value(body)?;
        Ok(Artist {
            id: artist.id.map(|i| i.to_string()).unwrap_or_else(|| id.to_string()),
            name: artist.name.unwrap_or_default(),
            picture_url: non_empty(artist.picture_medium).or(non_empty(artist.picture)),
            fans: artist.nb_fan.unwrap_or(0),
        })
    }

    pub async fn artist_top(&self, id: &str, limit: usize) -> Result<Vec<Track>, CatalogError> {
        let limit = limit.clamp(1, MAX_LIMIT);
        let page = self
            .get_page(
                &format!("/artist/{}/top", encode_id(id)?),
                &[("limit", limit.to_string())],
            )
            .await?;
        playable_tracks(page.data, &format!("artist {}", id))
    }

    pub async fn artist_albums(&self, id: &str) -> Result<Vec<Album>, CatalogError> {
        let page = self
            .get_page(&format!("/artist/{}/albums", encode_id(id)?), &[])
            .await?;

        let albums = page
            .data
            .into_iter()
            .filter_map(|record| serde_json::from_value::<ApiAlbum>(record).ok())
            .filter_map(|album| {
                Some(Album {
                    id: album.id?.to_string(),
                    title: non_empty(album.title)?,
                    cover_url: non_empty(album.cover_medium).or(non_empty(album.cover)),
                    release_date: album.release_date,
                })
            })
            .collect();
        Ok(albums)
    }

    /// Los listados de álbum no traen el objeto álbum, se completa con `id`
    pub async fn album_tracks(&self, id: &str) -> Result<Vec<Track>, CatalogError> {
        let page = self
            .get_page(&format!("/album/{}/tracks", encode_id(id)?), &[])
            .await?;
        let mut tracks = playable_tracks(page.data, &format!("album {}", id))?;
        for track in &mut tracks {
            if track.album_id.is_empty() {
                track.album_id = id.to_string();
            }
        }
        Ok(tracks)
    }

    /// Petición ligera usada por el health check
    pub async fn ping(&self) -> Result<(), CatalogError> {
        self.get_page("/search", &[("q", "pop".to_string()), ("limit", "1".to_string())])
            .await
            .map(|_| ())
    }

    async fn get_page(&self, path: &str, query: &[(&str, String)]) -> Result<ApiPage, CatalogError> {
        let body = self.get_json(path, query).await?;
        let page: ApiPage = serde_json::from_value(body)?;
        debug!(
            "📄 {}: {} registros (total {:?}, siguiente: {})",
            path,
            page.data.len(),
            page.total,
            page.next.is_some()
        );
        Ok(page)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, CatalogError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request
                .header("X-RapidAPI-Key", key)
                .header("X-RapidAPI-Host", &self.api_host);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::from_status(response.status(), path));
        }

        let body: Value = serde_json::from_str(&response.text().await?)?;

        // El proxy reporta algunos errores dentro de una respuesta 200
        if let Some(error) = body.get("error") {
            let error: ApiErrorBody = serde_json::from_value(error.clone()).unwrap_or(ApiErrorBody {
                kind: None,
                message: Some(error.to_string()),
            });
            return Err(CatalogError::Api {
                kind: error.kind.unwrap_or_else(|| "Unknown".to_string()),
                message: error.message.unwrap_or_default(),
            });
        }

        Ok(body)
    }
}

fn encode_id(id: &str) -> Result<String, CatalogError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CatalogError::InvalidRequest("empty id".to_string()));
    }
    Ok(urlencoding::encode(id).into_owned())
}

/// Decodifica, filtra y deduplica los registros del catálogo.
///
/// Los registros mal formados o sin preview se descartan en silencio.
fn playable_tracks(records: Vec<Value>, context: &str) -> Result<Vec<Track>, CatalogError> {
    let received = records.len();
    let mut seen = HashSet::new();

    let tracks: Vec<Track> = records
        .into_iter()
        .filter_map(|record| serde_json::from_value::<ApiTrack>(record).ok())
        .map(ApiTrack::into_track)
        .filter(Track::is_playable)
        .filter(|t| seen.insert(t.id.clone()))
        .collect();

    if tracks.len() < received {
        debug!("🧹 '{}': {} de {} registros descartados", context, received - tracks.len(), received);
    }

    if tracks.is_empty() {
        return Err(CatalogError::NoPlayableResults(context.to_string()));
    }
    Ok(tracks)
}

#[async_trait]
impl MusicCatalog for CatalogClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Track>, CatalogError> {
        self.search(query, limit).await
    }

    async fn songs_by_genre(&self, genre: &str, limit: usize) -> Result<Vec<Track>, CatalogError> {
        self.songs_by_genre(genre, limit).await
    }

    async fn top_tracks(&self, limit: usize) -> Result<Vec<Track>, CatalogError> {
        self.top_tracks(limit).await
    }

    fn source_name(&self) -> &'static str {
        "Catalog proxy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client() -> CatalogClient {
        CatalogClient::new(CatalogSettings::default()).unwrap()
    }

    #[test]
    fn test_seeded_offsets_are_reproducible() {
        let a = client().with_seed(7);
        let b = client().with_seed(7);

        let first: Vec<u32> = (0..20).map(|_| a.next_offset()).collect();
        let second: Vec<u32> = (0..20).map(|_| b.next_offset()).collect();

        assert_eq!(first, second);
        assert!(first.iter().all(|o| *o < OFFSET_RANGE));
    }

    #[test]
    fn test_playable_filter_drops_incomplete_records() {
        let records = vec![
            json!({"id": 1, "title": "Ok", "preview": "https://cdn/1.mp3",
                   "artist": {"id": 5, "name": "A"}, "album": {"id": 9, "title": "X", "cover_medium": "https://img/9"}}),
            json!({"id": 2, "title": "No preview", "preview": "", "artist": {"id": 5, "name": "A"}}),
            json!({"id": 3, "title": "No artist", "preview": "https://cdn/3.mp3"}),
            json!({"title": "No id"}),
            json!({"id": "1", "title": "Duplicate", "preview": "https://cdn/1b.mp3", "artist": {"name": "B"}}),
        ];

        let tracks = playable_tracks(records, "test").unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "1");
        assert_eq!(tracks[0].artist_id, "5");
        assert_eq!(tracks[0].album_title, "X");
        assert_eq!(tracks[0].cover_url.as_deref(), Some("https://img/9"));
    }

    #[test]
    fn test_all_filtered_is_an_error() {
        let records = vec![json!({"id": 2, "title": "t", "artist": {"name": "a"}})];
        let err = playable_tracks(records, "jazz").unwrap_err();
        assert!(matches!(err, CatalogError::NoPlayableResults(ref q) if q == "jazz"));
    }

    #[tokio::test]
    async fn test_invalid_requests_rejected_before_io() {
        let c = client();
        assert!(matches!(c.search("   ", 10).await, Err(CatalogError::InvalidRequest(_))));
        assert!(matches!(c.search("pop", 0).await, Err(CatalogError::InvalidRequest(_))));
        assert!(matches!(c.top_tracks(0).await, Err(CatalogError::InvalidRequest(_))));
        assert!(matches!(c.track(" ").await, Err(CatalogError::InvalidRequest(_))));
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let settings = CatalogSettings {
            base_url: "not a url".to_string(),
            ..CatalogSettings::default()
        };
        assert!(matches!(CatalogClient::new(settings), Err(CatalogError::InvalidRequest(_))));
    }
}
