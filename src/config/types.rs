use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the landing page (served as a fallback)
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Ceiling on the whole request body; larger uploads are rejected with 413
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Idle time after which a session binding is forgotten (default: 24)
    #[serde(default = "default_session_timeout")]
    pub session_timeout_hours: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_upload_bytes() -> usize {
    100 * 1024 * 1024
}
fn default_session_timeout() -> u64 {
    24
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            max_upload_bytes: default_max_upload_bytes(),
            session_timeout_hours: default_session_timeout(),
        }
    }
}

/// Bounds on the in-memory result store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Maximum number of live batches; the oldest is evicted past this
    #[serde(default = "default_max_batches")]
    pub max_batches: usize,

    /// Batches older than this are removed by the sweep task
    #[serde(default = "default_batch_ttl")]
    pub batch_ttl_secs: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_max_batches() -> usize {
    256
}
fn default_batch_ttl() -> u64 {
    3600
}
fn default_sweep_interval() -> u64 {
    60
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_batches: default_max_batches(),
            batch_ttl_secs: default_batch_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// Format used when a request omits the `format` field
    #[serde(default = "default_format")]
    pub default_format: String,

    #[serde(default = "default_preview_max_dimension")]
    pub preview_max_dimension: u32,

    #[serde(default = "default_preview_quality")]
    pub preview_quality: u8,
}

fn default_format() -> String {
    "JPEG".to_string()
}
fn default_preview_max_dimension() -> u32 {
    200
}
fn default_preview_quality() -> u8 {
    85
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            preview_max_dimension: default_preview_max_dimension(),
            preview_quality: default_preview_quality(),
        }
    }
}
