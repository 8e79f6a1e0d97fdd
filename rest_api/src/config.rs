// rest_api/src/config.rs

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const DEFAULT_DATA_DIRECTORY: &str = "./data";

const CONFIG_FILE: &str = "lifecode_config.yaml";

/// Represents the configuration for the REST API server itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RestApiConfig {
    pub host: String,
    pub port: u16,
    /// Base URL of the public profile pages, embedded in generated QR codes.
    pub frontend_url: String,
    /// Where the sled database lives.
    pub data_directory: PathBuf,
    /// The shared admin secret. Unset means admin endpoints refuse everyone.
    pub admin_api_key: Option<String>,
    /// Opt-in: render QR targets as self-contained data documents instead of
    /// network URLs. Experimental; the default Plain mode is canonical.
    pub qr_inline_mode: bool,
}

impl Default for RestApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            data_directory: PathBuf::from(DEFAULT_DATA_DIRECTORY),
            admin_api_key: None,
            qr_inline_mode: false,
        }
    }
}

// Wrapper struct to match the 'rest_api:' key in the YAML config.
#[derive(Debug, Deserialize)]
struct RestApiConfigWrapper {
    rest_api: RestApiConfig,
}

/// Loads the REST API configuration: `lifecode_config.yaml` if present, then
/// environment overrides (`HOST`, `PORT`, `FRONTEND_URL`, `DATA_DIRECTORY`,
/// `ADMIN_API_KEY`, `QR_INLINE_MODE`), then hard defaults. A malformed file
/// or an unparsable numeric/boolean override is an error at startup, not a
/// silent default.
pub fn load_rest_api_config(config_file_path: Option<PathBuf>) -> Result<RestApiConfig> {
    let path = config_file_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let mut config = if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        parse_config_file(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?
    } else {
        RestApiConfig::default()
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}

fn parse_config_file(content: &str) -> Result<RestApiConfig> {
    let wrapper: RestApiConfigWrapper =
        serde_yaml2::from_str(content).map_err(|e| anyhow::anyhow!("{}", e))?;
    Ok(wrapper.rest_api)
}

fn apply_env_overrides(config: &mut RestApiConfig) -> Result<()> {
    if let Ok(host) = env::var("HOST") {
        config.host = host;
    }
    if let Ok(port) = env::var("PORT") {
        config.port = port
            .parse()
            .with_context(|| format!("PORT value '{}' is not a valid port number", port))?;
    }
    if let Ok(url) = env::var("FRONTEND_URL") {
        config.frontend_url = url;
    }
    if let Ok(dir) = env::var("DATA_DIRECTORY") {
        config.data_directory = PathBuf::from(dir);
    }
    if let Ok(key) = env::var("ADMIN_API_KEY") {
        config.admin_api_key = Some(key);
    }
    if let Ok(flag) = env::var("QR_INLINE_MODE") {
        config.qr_inline_mode = flag
            .parse()
            .with_context(|| format!("QR_INLINE_MODE value '{}' is not a boolean", flag))?;
    }
    Ok(())
}
