use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub intro: IntroConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct SummarizerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_model() -> String {
    "google/gemini-2.5-flash-lite".to_string()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    3
}

impl SummarizerConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

fn default_token_ttl_secs() -> u64 {
    86_400
}

/// Intro splash timings. The total intro wait is derived as the sum of the
/// four phase durations rather than stored separately, so the phases and the
/// total cannot drift apart.
#[derive(Debug, Deserialize, Clone)]
pub struct IntroConfig {
    #[serde(default = "default_title_anim_ms")]
    pub title_anim_ms: u64,
    #[serde(default = "default_subtitle_delay_ms")]
    pub subtitle_delay_ms: u64,
    #[serde(default = "default_subtitle_anim_ms")]
    pub subtitle_anim_ms: u64,
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
    #[serde(default = "default_exit_anim_ms")]
    pub exit_anim_ms: u64,
    #[serde(default = "default_redirect_path")]
    pub redirect_path: String,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            title_anim_ms: default_title_anim_ms(),
            subtitle_delay_ms: default_subtitle_delay_ms(),
            subtitle_anim_ms: default_subtitle_anim_ms(),
            hold_ms: default_hold_ms(),
            exit_anim_ms: default_exit_anim_ms(),
            redirect_path: default_redirect_path(),
        }
    }
}

impl IntroConfig {
    /// Total time the splash stays on screen before the exit animation starts.
    pub fn intro_wait_ms(&self) -> u64 {
        self.title_anim_ms + self.subtitle_delay_ms + self.subtitle_anim_ms + self.hold_ms
    }
}

fn default_title_anim_ms() -> u64 {
    1200
}
fn default_subtitle_delay_ms() -> u64 {
    400
}
fn default_subtitle_anim_ms() -> u64 {
    1400
}
fn default_hold_ms() -> u64 {
    1500
}
fn default_exit_anim_ms() -> u64 {
    800
}
fn default_redirect_path() -> String {
    "/login".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("temp")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }

    match config.summarizer.provider.as_str() {
        "disabled" | "openrouter" => {}
        other => anyhow::bail!(
            "Unknown summarizer provider: '{}'. Must be disabled or openrouter.",
            other
        ),
    }

    if config.auth.token_ttl_secs == 0 {
        anyhow::bail!("auth.token_ttl_secs must be > 0");
    }

    if config.intro.redirect_path.is_empty() {
        anyhow::bail!("intro.redirect_path must not be empty");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_str)?;
        validate(&config)?;
        Ok(config)
    }

    const MINIMAL: &str = r#"
[db]
path = "data/lectern.sqlite"

[server]
bind = "127.0.0.1:8000"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse(MINIMAL).unwrap();
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 100);
        assert_eq!(config.summarizer.provider, "disabled");
        assert!(!config.summarizer.is_enabled());
        assert_eq!(config.intro.redirect_path, "/login");
    }

    #[test]
    fn intro_wait_is_sum_of_phases() {
        let config = parse(MINIMAL).unwrap();
        // 1200 + 400 + 1400 + 1500
        assert_eq!(config.intro.intro_wait_ms(), 4500);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let toml_str = format!("{MINIMAL}\n[chunking]\nchunk_size = 100\nchunk_overlap = 100\n");
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let toml_str = format!("{MINIMAL}\n[summarizer]\nprovider = \"openai\"\n");
        assert!(parse(&toml_str).is_err());
    }

    #[test]
    fn openrouter_provider_accepted() {
        let toml_str = format!("{MINIMAL}\n[summarizer]\nprovider = \"openrouter\"\n");
        let config = parse(&toml_str).unwrap();
        assert!(config.summarizer.is_enabled());
        assert_eq!(config.summarizer.model, "google/gemini-2.5-flash-lite");
    }
}
