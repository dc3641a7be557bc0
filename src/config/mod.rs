use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub geo: GeoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// HTTP status for redirects (301, 302, 303, 307 or 308).
    pub redirect_status: u16,
    /// Development runs have no proxy in front, so no public forwarded
    /// address exists; let the geo service infer from its own peer.
    pub dev_geo_fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    pub api_url: String,
    pub lang: String,
    pub timeout_ms: u64,
    pub cache_capacity: u64,
}

const REDIRECT_STATUSES: &[u16] = &[301, 302, 303, 307, 308];

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./minlink.db".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()?;

        let host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let redirect_status = std::env::var("REDIRECT_STATUS")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(302);

        let redirect_status = if REDIRECT_STATUSES.contains(&redirect_status) {
            redirect_status
        } else {
            tracing::warn!(
                "Unsupported REDIRECT_STATUS '{redirect_status}', falling back to 302. Supported values: 301, 302, 303, 307, 308"
            );
            302
        };

        let dev_geo_fallback = std::env::var("APP_ENV")
            .map(|v| v.to_lowercase() == "development")
            .unwrap_or(false);

        let geo_api_url =
            std::env::var("GEO_API_URL").unwrap_or_else(|_| "http://ip-api.com".to_string());
        let geo_lang = std::env::var("GEO_LANG").unwrap_or_else(|_| "en".to_string());
        let geo_timeout_ms = std::env::var("GEO_TIMEOUT_MS")
            .unwrap_or_else(|_| "1500".to_string())
            .parse::<u64>()?;
        let geo_cache_capacity = std::env::var("GEO_CACHE_CAPACITY")
            .unwrap_or_else(|_| "10000".to_string())
            .parse::<u64>()?;

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            server: ServerConfig {
                host,
                port,
                redirect_status,
                dev_geo_fallback,
            },
            geo: GeoConfig {
                api_url: geo_api_url,
                lang: geo_lang,
                timeout_ms: geo_timeout_ms,
                cache_capacity: geo_cache_capacity,
            },
        })
    }
}
