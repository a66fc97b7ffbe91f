use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ProjectChatError;
use crate::llm::{ClaudeClient, GenerationParams, DEFAULT_MODEL};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub projects_dir: PathBuf,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let params = GenerationParams::default();
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: None,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            projects_dir: PathBuf::from("projects"),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("projectchat")
            .join("config.toml")
    }

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("ignoring invalid settings at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<(), ProjectChatError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ProjectChatError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the API key from the environment variable specified in settings.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.llm.max_tokens,
            temperature: self.llm.temperature,
        }
    }

    /// Build the Claude client. A missing credential is a configuration error.
    pub fn build_llm_client(&self) -> Result<ClaudeClient, ProjectChatError> {
        let api_key = self.api_key().ok_or_else(|| {
            ProjectChatError::Config(format!("{} not set", self.llm.api_key_env))
        })?;
        let mut client = ClaudeClient::new(api_key)?.with_model(&self.llm.model);
        if let Some(ref url) = self.llm.base_url {
            client = client.with_base_url(url);
        }
        Ok(client)
    }
}
