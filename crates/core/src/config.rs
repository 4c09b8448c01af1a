use serde::Deserialize;

use crate::error::StudioResult;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `AUDIENCE_STUDIO__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// JSON file holding the customer collection queried by segments.
    #[serde(default)]
    pub customers_path: Option<String>,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

// Default functions
fn default_log_format() -> String {
    "text".to_string()
}
fn default_sample_size() -> usize {
    5
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            customers_path: None,
            log_format: default_log_format(),
            preview: PreviewConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional config file, then environment
    /// variables (which take precedence).
    pub fn load(file: Option<&str>) -> StudioResult<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("AUDIENCE_STUDIO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
