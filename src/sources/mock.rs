// Canciones de demostración usadas cuando ni el caché ni el catálogo responden.
// Distintas del Guaranteed Data Set: solo las usa songs_by_genres.

use chrono::{DateTime, Utc};

use super::guaranteed::{bundled, select_for_genres, BundledTrack};
use crate::cache::CachedSong;

pub const MOCK_PREFIX: &str = "mock";

static MOCK_SONGS: &[BundledTrack] = &[
    bundled(
        "neon-skyline", "Neon Skyline", "Luna Vega", "City Lights", "pop", 201,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-9.mp3",
        "https://picsum.photos/seed/neon-skyline/300/300",
    ),
    bundled(
        "paper-hearts", "Paper Hearts", "The Daydreams", "Polaroid Summer", "pop", 187,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-10.mp3",
        "https://picsum.photos/seed/paper-hearts/300/300",
    ),
    bundled(
        "gravel-road", "Gravel Road", "Rust Belt Kings", "Mile Marker", "rock", 243,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-11.mp3",
        "https://picsum.photos/seed/gravel-road/300/300",
    ),
    bundled(
        "static-bloom", "Static Bloom", "Voltage Garden", "Overdrive", "rock", 229,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-12.mp3",
        "https://picsum.photos/seed/static-bloom/300/300",
    ),
    bundled(
        "pulse-theory", "Pulse Theory", "Kilohertz", "Waveform", "electronic", 262,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-13.mp3",
        "https://picsum.photos/seed/pulse-theory/300/300",
    ),
    bundled(
        "night-drive", "Night Drive", "Synthwave Society", "Outrun", "electronic", 274,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-14.mp3",
        "https://picsum.photos/seed/night-drive/300/300",
    ),
    bundled(
        "blue-corner", "Blue Corner", "Marcus Hale Trio", "Late Set", "jazz", 318,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-15.mp3",
        "https://picsum.photos/seed/blue-corner/300/300",
    ),
    bundled(
        "block-party", "Block Party", "MC Verse", "Cipher", "hip-hop", 196,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-16.mp3",
        "https://picsum.photos/seed/block-party/300/300",
    ),
    bundled(
        "sol-de-noche", "Sol de Noche", "Ritmo Azul", "Calor", "latin", 214,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-9.mp3",
        "https://picsum.photos/seed/sol-de-noche/300/300",
    ),
    bundled(
        "quiet-harbor", "Quiet Harbor", "Ellen Marsh", "Tidewater", "indie", 233,
        "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-10.mp3",
        "https://picsum.photos/seed/quiet-harbor/300/300",
    ),
];

/// Canciones de demostración para los géneros pedidos, como mucho
/// `per_genre_cap` por género. Determinista.
pub fn songs_for_genres(genres: &[String], per_genre_cap: usize, now: DateTime<Utc>) -> Vec<CachedSong> {
    select_for_genres(MOCK_SONGS, MOCK_PREFIX, genres, per_genre_cap, now)
}
