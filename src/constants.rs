pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

pub const DEFAULT_JUDGE0_URL: &str = "https://judge0-ce.p.rapidapi.com";
pub const JUDGE0_KEY_HEADER: &str = "X-RapidAPI-Key";
pub const JUDGE0_HOST_HEADER: &str = "X-RapidAPI-Host";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 20;
pub const DEFAULT_CPU_TIME_LIMIT_S: f64 = 2.0;
pub const DEFAULT_MEMORY_LIMIT_KB: u64 = 128_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

pub const REDACTED: &str = "(hidden)";

pub const WORKSPACE_PREFIX: &str = "lms-judge";
