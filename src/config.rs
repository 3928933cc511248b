use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Variable names used by earlier deployments, mapped to config keys
const LEGACY_ENV: &[(&str, &str)] = &[
    ("ACR_CLOUD_ACCESS_KEY", "recognition.access_key"),
    ("ACR_CLOUD_ACCESS_SECRET", "recognition.access_secret"),
    ("ACR_CLOUD_HOST", "recognition.host"),
    ("API_URL", "lookup.base_url"),
    ("OPENAI_API_KEY", "sources.openai_api_key"),
    ("GOOGLE_CSE_API_KEY", "sources.google_api_key"),
    ("GOOGLE_CSE_ID", "sources.google_cse_id"),
];

pub const DEFAULT_LOOKUP_URL: &str = "https://soundtrack-finder.onrender.com";

/// Longest recording a listen cycle may ask for
pub const MAX_CAPTURE_SECS: u64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureConfig,
    pub recognition: RecognitionConfig,
    pub lookup: LookupConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
    /// Origins allowed by CORS; empty allows any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    pub duration_secs: u64,
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_ms: u64,
    /// Peak-normalize the clip before upload
    pub normalize: bool,
}

impl CaptureConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }
}

#[derive(Clone, Deserialize)]
pub struct RecognitionConfig {
    pub host: String,
    pub access_key: String,
    pub access_secret: String,
    /// Overrides `https://{host}`; the signed path stays `/v1/identify`
    #[serde(default)]
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl RecognitionConfig {
    pub fn is_configured(&self) -> bool {
        !self.access_key.is_empty()
            && !self.access_secret.is_empty()
            && (!self.host.is_empty() || self.base_url.is_some())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Keeps the secret out of logs
impl std::fmt::Debug for RecognitionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionConfig")
            .field("host", &self.host)
            .field("access_key", &self.access_key)
            .field("access_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    pub base_url: String,
    /// Endpoint path; `/identify` is canonical, `/find-that-soundtrack` is also served
    pub path: String,
    pub timeout_secs: u64,
    /// Delay before the "still working" status message
    pub still_working_after_secs: u64,
}

impl LookupConfig {
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Upstream services used by the lookup server
#[derive(Clone, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub temperature: f32,
    #[serde(default)]
    pub google_api_key: Option<String>,
    #[serde(default)]
    pub google_cse_id: Option<String>,
    pub google_base_url: String,
    pub search_results: u32,
    pub timeout_secs: u64,
}

impl SourcesConfig {
    pub fn search_enabled(&self) -> bool {
        self.google_api_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.google_cse_id.as_deref().is_some_and(|k| !k.is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for SourcesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourcesConfig")
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("search_enabled", &self.search_enabled())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load defaults, then `path` (optional file), then the environment
    pub fn load(path: &str) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Like [`Config::load`], reading legacy variables through `lookup_env`
    pub fn load_with<F>(path: &str, lookup_env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .set_default("service.name", "soundtrack-finder")?
            .set_default("service.http.bind", "0.0.0.0")?
            .set_default("service.http.port", 5000)?
            .set_default("capture.duration_secs", 10)?
            .set_default("capture.sample_rate", 44100)?
            .set_default("capture.channels", 1)?
            .set_default("capture.buffer_ms", 100)?
            .set_default("capture.normalize", true)?
            .set_default("recognition.host", "")?
            .set_default("recognition.access_key", "")?
            .set_default("recognition.access_secret", "")?
            .set_default("recognition.timeout_secs", 30)?
            .set_default("lookup.base_url", DEFAULT_LOOKUP_URL)?
            .set_default("lookup.path", "/identify")?
            .set_default("lookup.timeout_secs", 120)?
            .set_default("lookup.still_working_after_secs", 5)?
            .set_default("sources.openai_base_url", "https://api.openai.com/v1")?
            .set_default("sources.openai_model", "gpt-4")?
            .set_default("sources.temperature", 0.5)?
            .set_default("sources.google_base_url", "https://www.googleapis.com/customsearch/v1")?
            .set_default("sources.search_results", 10)?
            .set_default("sources.timeout_secs", 90)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SOUNDTRACK_FINDER")
                    .prefix_separator("__")
                    .separator("__"),
            );

        for (var, key) in LEGACY_ENV {
            if let Some(value) = lookup_env(var).filter(|v| !v.is_empty()) {
                builder = builder.set_override(*key, value)?;
            }
        }

        let settings = builder
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path))?;

        let cfg: Config = settings
            .try_deserialize()
            .context("Invalid configuration")?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_CAPTURE_SECS).contains(&self.capture.duration_secs) {
            bail!(
                "capture.duration_secs must be between 1 and {}, got {}",
                MAX_CAPTURE_SECS,
                self.capture.duration_secs
            );
        }
        if !(1..=2).contains(&self.capture.channels) {
            bail!("capture.channels must be 1 or 2, got {}", self.capture.channels);
        }
        if self.capture.sample_rate < 8000 {
            bail!("capture.sample_rate must be at least 8000 Hz");
        }
        if !self.lookup.path.starts_with('/') {
            bail!("lookup.path must start with '/', got {:?}", self.lookup.path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::load_with("does/not/exist/soundtrack-finder", |key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_file() -> Result<()> {
        let cfg = load(&[])?;
        assert_eq!(cfg.capture.duration_secs, 10);
        assert_eq!(cfg.capture.sample_rate, 44100);
        assert_eq!(cfg.lookup.endpoint(), "https://soundtrack-finder.onrender.com/identify");
        assert_eq!(cfg.lookup.still_working_after_secs, 5);
        assert!(!cfg.recognition.is_configured());
        assert!(!cfg.sources.search_enabled());
        Ok(())
    }

    #[test]
    fn legacy_variables_fill_credentials() -> Result<()> {
        let cfg = load(&[
            ("ACR_CLOUD_ACCESS_KEY", "key"),
            ("ACR_CLOUD_ACCESS_SECRET", "secret"),
            ("ACR_CLOUD_HOST", "identify-eu-west-1.acrcloud.com"),
            ("API_URL", "http://localhost:5000/"),
        ])?;
        assert!(cfg.recognition.is_configured());
        assert_eq!(cfg.recognition.host, "identify-eu-west-1.acrcloud.com");
        assert_eq!(cfg.lookup.endpoint(), "http://localhost:5000/identify");
        Ok(())
    }

    #[test]
    fn capture_duration_is_bounded() -> Result<()> {
        let mut cfg = load(&[])?;

        cfg.capture.duration_secs = 0;
        assert!(cfg.validate().is_err());

        cfg.capture.duration_secs = u64::MAX;
        assert!(cfg.validate().is_err());

        cfg.capture.duration_secs = MAX_CAPTURE_SECS;
        assert!(cfg.validate().is_ok());
        Ok(())
    }

    #[test]
    fn debug_output_hides_secrets() -> Result<()> {
        let cfg = load(&[("ACR_CLOUD_ACCESS_SECRET", "hunter2"), ("OPENAI_API_KEY", "sk-123")])?;
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("sk-123"));
        Ok(())
    }
}
