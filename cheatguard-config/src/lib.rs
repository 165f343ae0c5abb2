//! Loader for CheatGuard configuration with YAML + environment overlays.
//!
//! Precedence, lowest first: built-in defaults, YAML file(s) in the order
//! they were attached, then `CHEATGUARD__SECTION__KEY` environment variables.
//! String values may reference `${VAR}`; references are expanded after the
//! merge, recursively up to a fixed depth.
//!
//! ```yaml
//! mode: digest
//! llm:
//!   provider: ollama
//!   model: llama3.2
//! search:
//!   api_key: "${BRAVE_API_KEY}"
//!   include_sites: [arxiv.org]
//! mail:
//!   sender: bot@example.com
//!   receiver: "${DIGEST_TO}"
//! ```
use cheatguard_common::{
    observability::LogFormat, LlmConfig, MalformedOutputPolicy, RunMode, DEFAULT_OLLAMA_URL,
};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const ENV_PREFIX: &str = "CHEATGUARD";
pub const DEFAULT_CONFIG_FILE: &str = "cheatguard.yaml";

const LIST_KEYS: &[&str] = &[
    "search.include_sites",
    "search.exclude_sites",
    "search.urls",
    "extract.deny_classes",
];

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CheatguardConfig {
    pub mode: RunMode,
    pub llm: LlmSection,
    pub search: SearchSection,
    pub extract: ExtractSection,
    pub pipeline: PipelineSection,
    pub mail: MailSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    Ollama,
    Openai,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub provider: LlmProvider,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub auth_token: Option<String>,
}

impl LlmSection {
    /// Resolve into the provider configuration the LLM crate consumes.
    pub fn to_llm_config(&self) -> Result<LlmConfig, ConfigError> {
        match self.provider {
            LlmProvider::Ollama => Ok(LlmConfig::Ollama {
                base_url: self
                    .endpoint
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                model: self.model.clone().unwrap_or_else(|| "llama3.2".to_string()),
            }),
            LlmProvider::Openai => {
                let api_key = non_blank(self.auth_token.as_deref()).ok_or_else(|| {
                    ConfigError::Message("llm.auth_token is required for openai".into())
                })?;
                Ok(LlmConfig::OpenAi {
                    api_key: api_key.to_string(),
                    model: self.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string()),
                    base_url: self.endpoint.clone(),
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProviderKind {
    #[default]
    Brave,
    /// Fixed URL list from `search.urls`.
    Static,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub provider: SearchProviderKind,
    pub api_key: Option<String>,
    #[serde(deserialize_with = "lenient::parse")]
    pub max_results: usize,
    pub include_sites: Vec<String>,
    pub exclude_sites: Vec<String>,
    pub urls: Vec<String>,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::default(),
            api_key: None,
            max_results: 3,
            include_sites: Vec::new(),
            exclude_sites: Vec::new(),
            urls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractSection {
    /// Excerpt ceiling override; the run mode decides when unset.
    #[serde(deserialize_with = "lenient::parse_opt")]
    pub max_chars: Option<usize>,
    #[serde(deserialize_with = "lenient::parse")]
    pub timeout_secs: u64,
    pub user_agent: String,
    pub deny_classes: Vec<String>,
}

impl Default for ExtractSection {
    fn default() -> Self {
        Self {
            max_chars: None,
            timeout_secs: 10,
            user_agent: "Mozilla/5.0".into(),
            deny_classes: vec!["extra-services".into(), "labstabs".into()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub malformed_output: MalformedOutputPolicy,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MailSection {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Where OAuth tokens are persisted; defaults under the user config dir.
    pub token_path: Option<PathBuf>,
    pub subject: String,
}

impl Default for MailSection {
    fn default() -> Self {
        Self {
            sender: None,
            receiver: None,
            client_id: None,
            client_secret: None,
            token_path: None,
            subject: "CheatGuard digest".into(),
        }
    }
}

impl MailSection {
    /// All four identity fields are present and non-blank.
    pub fn is_complete(&self) -> bool {
        [
            &self.sender,
            &self.receiver,
            &self.client_id,
            &self.client_secret,
        ]
        .iter()
        .all(|v| non_blank(v.as_deref()).is_some())
    }

    pub fn resolved_token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| config_dir().join("gmail-token.json"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub dir: Option<PathBuf>,
    #[serde(deserialize_with = "lenient::parse")]
    pub stderr: bool,
    pub format: LogFormat,
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            dir: None,
            stderr: false,
            format: LogFormat::Text,
            filter: "info".into(),
        }
    }
}

/// Environment overrides and `${VAR}` references arrive as strings; numeric
/// and boolean fields accept either form.
mod lenient {
    use serde::Deserialize;
    use serde::de::{Deserializer, Error};
    use std::fmt::Display;
    use std::str::FromStr;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Typed(T),
        Text(String),
    }

    fn from_raw<T, E>(raw: Raw<T>) -> Result<T, E>
    where
        T: FromStr,
        T::Err: Display,
        E: Error,
    {
        match raw {
            Raw::Typed(v) => Ok(v),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| E::custom(format!("{s:?}: {e}"))),
        }
    }

    pub fn parse<'de, D, T>(d: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        from_raw(Raw::<T>::deserialize(d)?)
    }

    pub fn parse_opt<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + FromStr,
        T::Err: Display,
    {
        Option::<Raw<T>>::deserialize(d)?.map(from_raw).transpose()
    }
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.trim().is_empty())
}

/// `~/.config/cheatguard` (or the platform equivalent).
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cheatguard")
}

/// Default location of the user-level config file.
pub fn default_config_path() -> PathBuf {
    config_dir().join(DEFAULT_CONFIG_FILE)
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct CheatguardConfigLoader {
    files: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for CheatguardConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CheatguardConfigLoader {
    /// Start with no files attached.
    ///
    /// ```
    /// use cheatguard_config::CheatguardConfigLoader;
    /// use cheatguard_common::RunMode;
    ///
    /// let config = CheatguardConfigLoader::new()
    ///     .with_yaml_str("mode: digest")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.mode, RunMode::Digest);
    /// assert_eq!(config.search.max_results, 3);
    /// ```
    pub fn new() -> Self {
        Self {
            files: Config::builder(),
        }
    }

    /// Attach a file that must exist; the format is inferred from the suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files = self
            .files
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is read only when present.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files = self
            .files
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.files = self
            .files
            .add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, apply env overrides and `${VAR}` expansion, and
    /// deserialize into [`CheatguardConfig`].
    ///
    /// ```
    /// use cheatguard_config::CheatguardConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOC_BRAVE_KEY", "from-env"); }
    ///
    /// let config = CheatguardConfigLoader::new()
    ///     .with_yaml_str("search:\n  api_key: \"${DOC_BRAVE_KEY}\"")
    ///     .load()
    ///     .expect("valid configuration");
    /// assert_eq!(config.search.api_key.as_deref(), Some("from-env"));
    ///
    /// unsafe { std::env::remove_var("DOC_BRAVE_KEY"); }
    /// ```
    pub fn load(self) -> Result<CheatguardConfig, ConfigError> {
        let mut env = Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",");
        for key in LIST_KEYS {
            env = env.with_list_parse_key(key);
        }
        let cfg = self.files.add_source(env).build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: CheatguardConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}
