use std::{env, time::Duration};

use url::Url;

use super::env::{
    AppConfig, BackendConfig, ConfigError, ConnectivityConfig, DirectoryConfig, LoggingConfig,
    SyncConfig, SyncMode,
};

const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = env::var("BACKEND_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let base_url = parse_base_url(&raw_url)?;

        let backend = BackendConfig {
            base_url,
            classify_timeout: millis("CLASSIFY_TIMEOUT", 3_000),
            request_timeout: millis("BACKEND_REQUEST_TIMEOUT", 10_000),
        };

        let connectivity = ConnectivityConfig {
            probe_interval: millis("CONNECTIVITY_PROBE_INTERVAL", 15_000),
            probe_timeout: millis("CONNECTIVITY_PROBE_TIMEOUT", 3_000),
        };

        let sync = SyncConfig {
            mode: match env::var("SYNC_MODE") {
                Ok(value) => parse_sync_mode(&value)?,
                Err(_) => SyncMode::Confirmed,
            },
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "reliefline.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            backend,
            connectivity,
            sync,
            directories,
            logging,
        })
    }
}

/// Parses the backend base URL, keeping a trailing slash so that `Url::join`
/// appends endpoint paths instead of replacing the last segment.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    let url = Url::parse(&normalized).map_err(|_| ConfigError::Invalid {
        key: "BACKEND_API_URL",
        value: raw.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            key: "BACKEND_API_URL",
            value: raw.to_string(),
        });
    }
    Ok(url)
}

fn parse_sync_mode(value: &str) -> Result<SyncMode, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "confirmed" => Ok(SyncMode::Confirmed),
        "optimistic" => Ok(SyncMode::Optimistic),
        _ => Err(ConfigError::Invalid {
            key: "SYNC_MODE",
            value: value.to_string(),
        }),
    }
}

fn millis(key: &str, default: u64) -> Duration {
    Duration::from_millis(
        env::var(key)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(default),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let url = parse_base_url("http://relief.local:8000/api").unwrap();
        assert_eq!(url.as_str(), "http://relief.local:8000/api/");
        assert_eq!(
            url.join("analyze/request").unwrap().as_str(),
            "http://relief.local:8000/api/analyze/request"
        );
    }

    #[test]
    fn base_url_rejects_non_http_schemes() {
        assert!(parse_base_url("ftp://relief.local").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn sync_mode_parsing() {
        assert_eq!(parse_sync_mode("Optimistic").unwrap(), SyncMode::Optimistic);
        assert_eq!(parse_sync_mode("confirmed").unwrap(), SyncMode::Confirmed);
        assert!(parse_sync_mode("sometimes").is_err());
    }
}
