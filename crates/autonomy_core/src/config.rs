//! Configuration surface (§6). Parsed from TOML with `serde(default)`
//! throughout so a partial or absent file still produces a usable config;
//! environment variables override file values for the knobs operators most
//! often need to flip without editing the file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::affect::Pad;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: String,
    pub llm: LlmConfig,
    pub persona: PersonaConfig,
    pub memory: MemoryConfig,
    pub autonomy: AutonomyConfig,
    pub cryostasis: CryostasisConfig,
    pub emotion: EmotionConfig,
}

impl Config {
    /// Load config from a TOML file. Fails (fatal at startup per §7) only
    /// if the file exists but fails to parse; a missing file is handled by
    /// `load_or_default`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file: {}", path.as_ref().display()))?;
        let mut config: Config =
            toml::from_str(&content).with_context(|| "failed to parse TOML config")?;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("config file not found or invalid ({e}), using defaults");
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("AUTONOMY_DATA_DIR") {
            self.data_dir = v;
        }
        if let Ok(v) = std::env::var("AUTONOMY_LLM_URL") {
            self.llm.url = v;
        }
        if let Ok(v) = std::env::var("AUTONOMY_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("AUTONOMY_LLM_TIMEOUT_S") {
            if let Ok(n) = v.parse() {
                self.llm.timeout_s = n;
            }
        }
        if let Ok(v) = std::env::var("AUTONOMY_PERSONA_NAME") {
            self.persona.name = v;
        }
        if let Ok(v) = std::env::var("AUTONOMY_AUTONOMY_ENABLED") {
            if let Ok(b) = v.parse() {
                self.autonomy.enabled = b;
            }
        }
        if let Ok(v) = std::env::var("AUTONOMY_CRYOSTASIS_ENABLED") {
            if let Ok(b) = v.parse() {
                self.cryostasis.enabled = b;
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub url: String,
    pub model: String,
    pub timeout_s: u64,
    pub retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            model: "local-default".to_string(),
            timeout_s: 60,
            retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub name: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub stop_tokens: Vec<String>,
    pub max_output_tokens: u32,
    pub examples: Vec<(String, String)>,
    pub default_pad: Pad,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "Agent".to_string(),
            system_prompt: String::new(),
            temperature: 0.7,
            stop_tokens: Vec::new(),
            max_output_tokens: 512,
            examples: Vec::new(),
            default_pad: Pad::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub buffer_size: usize,
    pub consolidation_threshold: usize,
    pub importance_threshold: f32,
    pub semantic_search_limit: usize,
    pub auto_snapshot_interval_h: u64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            buffer_size: 50,
            consolidation_threshold: 40,
            importance_threshold: 0.4,
            semantic_search_limit: 5,
            auto_snapshot_interval_h: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutonomyConfig {
    pub enabled: bool,
    pub min_interval_minutes: i64,
    pub check_interval_seconds: u64,
    pub trigger_probability: f32,
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_minutes: 60,
            check_interval_seconds: 30,
            trigger_probability: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CryostasisConfig {
    pub enabled: bool,
    pub poll_s: u64,
    pub gpu_pct: f32,
    pub cpu_pct: f32,
    pub vram_mb: f32,
    pub blacklist: Vec<String>,
    pub wake_cooldown_s: u64,
}

impl Default for CryostasisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_s: 15,
            gpu_pct: 90.0,
            cpu_pct: 90.0,
            vram_mb: 8192.0,
            blacklist: Vec::new(),
            wake_cooldown_s: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmotionConfig {
    pub pad_decay_rate: f32,
    pub decay_interval_s: u64,
    pub enable_circadian: bool,
}

impl Default for EmotionConfig {
    fn default() -> Self {
        Self {
            pad_decay_rate: 0.05,
            decay_interval_s: 60,
            enable_circadian: true,
        }
    }
}
