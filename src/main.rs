use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

use open_music_catalog::cache::DailyCacheStore;
use open_music_catalog::clock::{Clock, SystemClock};
use open_music_catalog::config::Config;
use open_music_catalog::sources::{CatalogClient, MusicCatalog, ResolutionService};
use open_music_catalog::storage::{JsonFileStorage, KeyValueStorage};

const USAGE: &str = "Uso: open-music-catalog <comando>

Comandos:
  genres <género>...   Canciones para uno o más géneros
  search <consulta>    Busca canciones
  top [n]              Selección para la portada (6 por defecto)
  cache-status         Estado del caché diario
  clear-cache          Borra el caché diario
  --health-check       Comprueba configuración, almacenamiento y catálogo";

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging (stderr, stdout queda para el JSON)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("open_music_catalog=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    info!("🎵 Iniciando Open Music Catalog v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;
    info!("{}", config.summary());

    let args: Vec<String> = std::env::args().skip(1).collect();

    // Manejar health check si es necesario
    if args.iter().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    let Some((command, rest)) = args.split_first() else {
        eprintln!("{}", USAGE);
        anyhow::bail!("Falta el comando");
    };

    // Inicializar almacenamiento JSON
    let storage = build_storage(&config).await?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let ttl = chrono::Duration::from_std(config.cache_ttl).context("CACHE_TTL fuera de rango")?;
    let store = Arc::new(DailyCacheStore::new(storage, clock.clone()).with_ttl(ttl));

    let catalog = build_catalog(&config)?;
    let service = ResolutionService::new(store.clone(), catalog, clock, config.resolution_settings());

    let output = match command.as_str() {
        "genres" => {
            let resolution = service.songs_by_genres(rest).await?;
            serde_json::to_value(&resolution)?
        }
        "search" => {
            let query = rest.join(" ");
            let resolution = service.search(&query, config.search_limit).await?;
            serde_json::to_value(&resolution)?
        }
        "top" => {
            let limit = match rest.first() {
                Some(n) => Some(n.parse::<usize>().with_context(|| format!("Número inválido: {}", n))?),
                None => None,
            };
            serde_json::to_value(service.top_tracks(limit).await)?
        }
        "cache-status" => match store.read().await {
            Some(cache) => {
                let genres: serde_json::Map<String, serde_json::Value> = cache
                    .genres
                    .iter()
                    .map(|(genre, songs)| (genre.clone(), json!(songs.len())))
                    .collect();
                json!({
                    "lastUpdated": cache.last_updated,
                    "expiresAt": cache.last_updated.checked_add_signed(store.ttl()),
                    "genres": genres,
                })
            }
            None => json!({ "lastUpdated": null, "genres": {} }),
        },
        "clear-cache" => {
            store.clear().await;
            json!({ "cleared": true })
        }
        other => {
            eprintln!("{}", USAGE);
            anyhow::bail!("Comando desconocido: {}", other);
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn build_storage(config: &Config) -> Result<Arc<dyn KeyValueStorage>> {
    let mut storage = JsonFileStorage::new(config.data_dir.clone())
        .await
        .with_context(|| format!("No se pudo abrir {}", config.data_dir.display()))?;

    if let Some(quota) = config.cache_quota_bytes {
        storage = storage.with_quota(quota);
    }

    Ok(Arc::new(storage))
}

fn build_catalog(config: &Config) -> Result<Option<Arc<dyn MusicCatalog>>> {
    if !config.has_catalog() {
        warn!("🔑 CATALOG_API_KEY no configurada, modo sin conexión");
        return Ok(None);
    }

    let client = CatalogClient::new(config.catalog_settings()).context("Cliente de catálogo inválido")?;
    Ok(Some(Arc::new(client)))
}

async fn health_check(config: &Config) -> Result<()> {
    let storage = JsonFileStorage::new(config.data_dir.clone()).await?;
    let stats = storage.stats().await?;
    info!("💾 {}", stats);

    if config.has_catalog() {
        let client = CatalogClient::new(config.catalog_settings())?;
        if let Err(e) = client.ping().await {
            error!("❌ Catálogo no disponible: {}", e);
            anyhow::bail!("Catálogo no disponible");
        }
    }

    println!("OK");
    Ok(())
}
