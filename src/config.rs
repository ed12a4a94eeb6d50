use std::{collections::HashMap, env, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_FALLBACK_ORIGIN: &str = "https://localhost";
pub const DEFAULT_MAX_BODY_BYTES: u64 = 100 * 1024 * 1024;
const CONFIG_PATH_VAR: &str = "IMGPROXY_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub base_url: String,
}

/// Process-wide settings, read once at startup and shared read-only.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub port: u16,
    /// Origin used for tenant ids missing from `customers`.
    pub fallback_origin: String,
    pub customers: HashMap<String, Tenant>,
    pub max_body_bytes: u64,
    pub upstream_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            fallback_origin: DEFAULT_FALLBACK_ORIGIN.to_string(),
            customers: HashMap::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            upstream_timeout_secs: None,
        }
    }
}

impl Config {
    /// Reads the file named by `IMGPROXY_CONFIG` (or `config.json`) and
    /// applies the `PORT` override.
    pub fn load() -> Result<Config> {
        let path = env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let config = if Path::new(&path).exists() {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            info!("loaded config from {}", path);
            Config::from_json(&text).with_context(|| format!("parsing config file {path}"))?
        } else {
            warn!("config file {} not found, no tenants registered", path);
            Config::default()
        };

        config.with_port_override(env::var("PORT").ok())
    }

    pub fn from_json(text: &str) -> Result<Config> {
        let mut config: Config = serde_json::from_str(text)?;

        config.fallback_origin = normalize_origin(&config.fallback_origin)
            .context("invalid fallbackOrigin")?;

        for (id, tenant) in config.customers.iter_mut() {
            tenant.base_url = normalize_origin(&tenant.base_url)
                .with_context(|| format!("invalid baseUrl for tenant {id}"))?;
        }

        Ok(config)
    }

    pub fn with_port_override(mut self, port: Option<String>) -> Result<Config> {
        if let Some(port) = port {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port: {port}"))?;
        }
        Ok(self)
    }

    pub fn upstream_timeout(&self) -> Option<Duration> {
        self.upstream_timeout_secs.map(Duration::from_secs)
    }

    /// Base URL for `tenant_id`. Unknown ids get the fallback origin, not an
    /// error.
    pub fn resolve_tenant(&self, tenant_id: &str) -> &str {
        match self.customers.get(tenant_id) {
            Some(tenant) => &tenant.base_url,
            None => {
                debug!("unknown tenant {}, using fallback origin", tenant_id);
                &self.fallback_origin
            }
        }
    }
}

/// Checks `origin` parses as an absolute URL and strips trailing slashes so
/// that `{origin}/{path}` never doubles them.
fn normalize_origin(origin: &str) -> Result<String> {
    Url::parse(origin)?;
    Ok(origin.trim_end_matches('/').to_string())
}
