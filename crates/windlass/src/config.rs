use crate::paths::WindlassPaths;
use eyre::Context as _;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const MAINNET_NODE_URL: &str = "https://fullnode.mainnet.aptoslabs.com";
pub const TESTNET_NODE_URL: &str = "https://fullnode.testnet.aptoslabs.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    #[default]
    Mainnet,
    Testnet,
}

impl NetworkMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Primary fullnode REST URL. Unset means the network default.
    pub node_url: Option<String>,
    /// Extra fullnode URLs consulted by idempotent reads when the primary
    /// misbehaves. Broadcast never rotates.
    pub fallback_node_urls: Vec<String>,
    pub max_gas_amount: u64,
    pub gas_unit_price: u64,
    /// Transaction expiry window, seconds from build time.
    pub expiration_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_url: None,
            fallback_node_urls: vec![],
            max_gas_amount: 20_000,
            gas_unit_price: 100,
            expiration_secs: 120,
        }
    }
}

impl NodeConfig {
    /// Primary-first URL list for the selected network.
    pub fn resolved_urls(&self, network: NetworkMode) -> Vec<String> {
        let primary = self.node_url.clone().unwrap_or_else(|| {
            match network {
                NetworkMode::Mainnet => MAINNET_NODE_URL,
                NetworkMode::Testnet => TESTNET_NODE_URL,
            }
            .to_owned()
        });
        let mut urls = vec![primary];
        for u in &self.fallback_node_urls {
            if !urls.contains(u) {
                urls.push(u.clone());
            }
        }
        urls
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Hard deadline on the finality wait. A hung node surfaces a timeout
    /// with the hash, never an indefinite block.
    pub confirm_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            confirm_timeout_secs: 30,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    /// OpenAI-compatible chat-completions base URL.
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the extractor API key. The key itself
    /// never lives in the config file.
    pub api_key_env: String,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            api_key_env: "WINDLASS_EXTRACTOR_API_KEY".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeySettings {
    /// Environment variable holding the hex private key.
    pub private_key_env: String,
    /// Fallback file containing the hex private key, for hosts that mount
    /// secrets as files.
    pub private_key_file: Option<PathBuf>,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            private_key_env: "WINDLASS_PRIVATE_KEY".to_owned(),
            private_key_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WindlassConfig {
    pub network: NetworkMode,
    pub node: NodeConfig,
    pub executor: ExecutorSettings,
    pub extractor: ExtractorSettings,
    pub key: KeySettings,
}

/// Where the signing key came from, for diagnostics (never the key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    Env,
    File,
    None,
}

impl WindlassConfig {
    /// Load `config.toml` from the config dir; absent file means defaults.
    pub fn load(paths: &WindlassPaths) -> eyre::Result<Self> {
        let path = paths.config_file();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse {}", path.display()))
    }

    pub fn key_source(&self) -> KeySource {
        if env_nonempty(&self.key.private_key_env).is_some() {
            return KeySource::Env;
        }
        match &self.key.private_key_file {
            Some(p) if p.exists() => KeySource::File,
            Some(_) | None => KeySource::None,
        }
    }

    /// Resolve the signing key material. Env var wins over file.
    pub fn load_private_key(&self) -> eyre::Result<SecretString> {
        if let Some(v) = env_nonempty(&self.key.private_key_env) {
            return Ok(SecretString::new(v.into()));
        }
        if let Some(path) = &self.key.private_key_file {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read key file {}", path.display()))?;
            return Ok(SecretString::new(text.trim().to_owned().into()));
        }
        eyre::bail!(
            "no signing key: set {} or configure key.private_key_file",
            self.key.private_key_env
        )
    }

    pub fn extractor_api_key(&self) -> Option<String> {
        env_nonempty(&self.extractor.api_key_env)
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}
