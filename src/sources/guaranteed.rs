//! Datos garantizados: tracks incluidos en el binario con previews que suenan.
//!
//! Es el último respaldo de toda resolución. Los ids llevan prefijo
//! (`guaranteed-*`, `search-*`) para no chocar nunca con ids del catálogo.

use chrono::{DateTime, Utc};

use super::Track;
use crate::cache::CachedSong;

pub const GUARANTEED_PREFIX: &str = "guaranteed";
pub const SEARCH_PREFIX: &str = "search";

/// Registro estático compartido por las tablas incluidas
#[derive(Debug, Clone, Copy)]
pub struct BundledTrack {
    pub slug: &'static str,
    pub title: &'static str,
    pub artist: &'static str,
    pub album: &'static str,
    pub genre: &'static str,
    pub duration: u32,
    pub preview_url: &'static str,
    pub cover_url: &'static str,
}

impl BundledTrack {
    pub fn to_track(&self, id: String) -> Track {
        Track {
            id,
            title: self.title.to_string(),
            artist_name: self.artist.to_string(),
            artist_id: format!("bundled-{}", self.artist.to_lowercase().replace(' ', "-")),
            album_title: self.album.to_string(),
            album_id: format!("bundled-{}", self.album.to_lowercase().replace(' ', "-")),
            duration: self.duration,
            cover_url: Some(self.cover_url.to_string()),
            preview_url: Some(self.preview_url.to_string()),
            popularity: 0,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        [self.title, self.artist, self.album, self.genre]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) const fn bundled(
    slug: &'static str,
    title: &'static str,
    artist: &'static str,
    album: &'static str,
    genre: &'static str,
    duration: u32,
    preview_url: &'static str,
    cover_url: &'static str,
) -> BundledTrack {
    BundledTrack {
        slug,
        title,
        artist,
        album,
        genre,
        duration,
        preview_url,
        cover_url,
    }
}

static GUARANTEED_TRACKS: &[BundledTrack] = &[
    bundled(
        "helix-1", "Helix Song One", "SoundHelix", "SoundHelix Examples", "electronic", 372,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3",
        "https://picsum.photos/seed/helix-1/300/300",
    ),
    bundled(
        "helix-2", "Helix Song Two", "SoundHelix", "SoundHelix Examples", "pop", 425,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-2.mp3",
        "https://picsum.photos/seed/helix-2/300/300",
    ),
    bundled(
        "helix-3", "Helix Song Three", "SoundHelix", "SoundHelix Examples", "rock", 344,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-3.mp3",
        "https://picsum.photos/seed/helix-3/300/300",
    ),
    bundled(
        "helix-4", "Helix Song Four", "SoundHelix", "SoundHelix Examples", "jazz", 302,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-4.mp3",
        "https://picsum.photos/seed/helix-4/300/300",
    ),
    bundled(
        "helix-5", "Helix Song Five", "SoundHelix", "SoundHelix Examples", "ambient", 353,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-5.mp3",
        "https://picsum.photos/seed/helix-5/300/300",
    ),
    bundled(
        "helix-6", "Helix Song Six", "SoundHelix", "SoundHelix Examples", "hip-hop", 406,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-6.mp3",
        "https://picsum.photos/seed/helix-6/300/300",
    ),
    bundled(
        "helix-7", "Helix Song Seven", "SoundHelix", "SoundHelix Examples", "classical", 421,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-7.mp3",
        "https://picsum.photos/seed/helix-7/300/300",
    ),
    bundled(
        "helix-8", "Helix Song Eight", "SoundHelix", "SoundHelix Examples", "indie", 315,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-8.mp3",
        "https://picsum.photos/seed/helix-8/300/300",
    ),
];

/// Todos los tracks garantizados, ids `guaranteed-*`
pub fn tracks() -> Vec<Track> {
    GUARANTEED_TRACKS
        .iter()
        .map(|t| t.to_track(format!("{}-{}", GUARANTEED_PREFIX, t.slug)))
        .collect()
}

/// Los primeros `limit` tracks garantizados
pub fn top(limit: usize) -> Vec<Track> {
    tracks().into_iter().take(limit).collect()
}

/// Tracks garantizados que coinciden con `query`, o todos si ninguno coincide.
/// Los ids usan el prefijo `search-*`.
pub fn search(query: &str, limit: usize) -> Vec<Track> {
    let needle = query.trim().to_lowercase();
    let matching: Vec<&BundledTrack> = GUARANTEED_TRACKS.iter().filter(|t| t.matches(&needle)).collect();
    let pool = if matching.is_empty() {
        GUARANTEED_TRACKS.iter().collect()
    } else {
        matching
    };

    pool.into_iter()
        .take(limit)
        .map(|t| t.to_track(format!("{}-{}", SEARCH_PREFIX, t.slug)))
        .collect()
}

/// Canciones garantizadas por género pedido, como mucho `per_genre_cap` cada uno
pub fn for_genres(genres: &[String], per_genre_cap: usize, now: DateTime<Utc>) -> Vec<CachedSong> {
    select_for_genres(GUARANTEED_TRACKS, GUARANTEED_PREFIX, genres, per_genre_cap, now)
}

/// Selección determinista por género desde una tabla incluida.
///
/// Cada género recibe las entradas etiquetadas con él; un género sin entradas
/// recibe una porción rotada de toda la tabla, así todos aportan canciones.
/// Los ids son `{prefix}-{genre}-{slug}`, únicos por resultado.
pub(crate) fn select_for_genres(
    table: &[BundledTrack],
    prefix: &str,
    genres: &[String],
    per_genre_cap: usize,
    now: DateTime<Utc>,
) -> Vec<CachedSong> {
    if table.is_empty() {
        return Vec::new();
    }

    let len = table.len();
    let per_genre = per_genre_cap.min(len);
    let mut songs = Vec::with_capacity(genres.len().saturating_mul(per_genre));
    for (position, genre) in genres.iter().enumerate() {
        let mut picked: Vec<&BundledTrack> = table
            .iter()
            .filter(|t| t.genre.eq_ignore_ascii_case(genre))
            .take(per_genre_cap)
            .collect();

        if picked.is_empty() {
            // position * per_genre_cap mod len, sin desbordar
            let start = (position % len) * (per_genre_cap % len) % len;
            picked = (0..per_genre).map(|i| &table[(start + i) % len]).collect();
        }

        let tracks = picked
            .into_iter()
            .map(|t| t.to_track(format!("{}-{}-{}", prefix, genre, t.slug)))
            .collect();
        songs.extend(CachedSong::rank_tracks(genre, tracks, now));
    }
    songs
}
