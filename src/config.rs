use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    DEFAULT_CPU_TIME_LIMIT_S, DEFAULT_JUDGE0_URL, DEFAULT_MAX_OUTPUT_BYTES,
    DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_MEMORY_LIMIT_KB, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_TIMEOUT_MS,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct JudgeConfig {
    pub local: LocalConfig,
    /// Present only when an API key is configured; its absence disables the
    /// remote judge entirely.
    pub remote: Option<RemoteConfig>,
    pub harness: HarnessConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    pub timeout_ms: u64,
    pub max_output_bytes: usize,
    pub max_concurrent_runs: usize,
    pub node_path: PathBuf,
    pub python_path: PathBuf,
    pub temp_root: Option<PathBuf>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            max_concurrent_runs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
            node_path: PathBuf::from("node"),
            python_path: PathBuf::from("python3"),
            temp_root: None,
        }
    }
}

impl LocalConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn temp_root(&self) -> PathBuf {
        self.temp_root.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub api_key: String,
    #[serde(default)]
    pub api_host: Option<String>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    #[serde(default = "default_cpu_time_limit")]
    pub cpu_time_limit: f64,
    #[serde(default = "default_memory_limit")]
    pub memory_limit: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl RemoteConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            api_host: None,
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            cpu_time_limit: default_cpu_time_limit(),
            memory_limit: default_memory_limit(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Time spent polling when every attempt comes back pending.
    pub fn poll_budget(&self) -> Option<Duration> {
        self.poll_interval().checked_mul(self.max_poll_attempts)
    }

    /// Hard ceiling on a single remote execution: the poll budget plus one
    /// interval of slack for the submit round trip. `None` on overflow.
    pub fn poll_window(&self) -> Option<Duration> {
        self.poll_budget()?.checked_add(self.poll_interval())
    }
}

fn default_base_url() -> String {
    DEFAULT_JUDGE0_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_max_poll_attempts() -> u32 {
    DEFAULT_MAX_POLL_ATTEMPTS
}

fn default_cpu_time_limit() -> f64 {
    DEFAULT_CPU_TIME_LIMIT_S
}

fn default_memory_limit() -> u64 {
    DEFAULT_MEMORY_LIMIT_KB
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Number of test cases evaluated at once. 1 keeps evaluation sequential.
    pub concurrency: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

impl JudgeConfig {
    /// Loads the optional JSON file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parsed(&lookup, "JUDGE_TIMEOUT_MS")? {
            self.local.timeout_ms = v;
        }
        if let Some(v) = parsed(&lookup, "JUDGE_MAX_OUTPUT_BYTES")? {
            self.local.max_output_bytes = v;
        }
        if let Some(v) = parsed(&lookup, "JUDGE_MAX_CONCURRENT_RUNS")? {
            self.local.max_concurrent_runs = v;
        }
        if let Some(v) = lookup("JUDGE_NODE_PATH") {
            self.local.node_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("JUDGE_PYTHON_PATH") {
            self.local.python_path = PathBuf::from(v);
        }
        if let Some(v) = parsed(&lookup, "JUDGE_HARNESS_CONCURRENCY")? {
            self.harness.concurrency = v;
        }

        if let Some(key) = lookup("JUDGE0_API_KEY").filter(|k| !k.trim().is_empty()) {
            let mut remote = self
                .remote
                .take()
                .unwrap_or_else(|| RemoteConfig::new(DEFAULT_JUDGE0_URL, ""));
            remote.api_key = key;
            if let Some(url) = lookup("JUDGE0_API_URL") {
                remote.base_url = url;
            }
            if let Some(host) = lookup("JUDGE0_API_HOST") {
                remote.api_host = Some(host);
            }
            self.remote = Some(remote);
        }
        self.remote = self.remote.filter(|r| !r.api_key.trim().is_empty());

        if self.local.max_concurrent_runs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_concurrent_runs",
                value: "0".to_string(),
            });
        }
        if let Some(remote) = &self.remote {
            if remote.poll_window().is_none() {
                return Err(ConfigError::InvalidValue {
                    key: "remote.max_poll_attempts",
                    value: remote.max_poll_attempts.to_string(),
                });
            }
        }
        if self.harness.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "harness.concurrency",
                value: "0".to_string(),
            });
        }

        Ok(self)
    }
}

fn parsed<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => Ok(None),
    }
}
