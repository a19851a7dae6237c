use std::collections::HashMap;
use std::sync::Arc;

use crate::config::LocalConfig;
use crate::core::language::normalize;
use crate::core::traits::runner::Runner;
use crate::native::html::HtmlRunner;
use crate::native::process::ProcessRunner;

pub const JAVASCRIPT: &str = "javascript";
pub const PYTHON: &str = "python";
pub const HTML: &str = "html";

/// Languages that never leave the machine, even with a remote judge configured.
pub const ALWAYS_LOCAL: &[&str] = &[HTML];

/// Canonical language id -> local runner. Adding a language means
/// registering a runner, not editing the dispatcher.
#[derive(Clone, Debug, Default)]
pub struct RunnerRegistry {
    runners: HashMap<String, Arc<dyn Runner>>,
    aliases: HashMap<String, String>,
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// JavaScript, Python and HTML runners built from the local config.
    pub fn from_config(config: &LocalConfig) -> Self {
        let temp_root = config.temp_root();
        let javascript: Arc<dyn Runner> = Arc::new(
            ProcessRunner::javascript(&config.node_path)
                .temp_root(&temp_root)
                .max_output_bytes(config.max_output_bytes),
        );
        let python: Arc<dyn Runner> = Arc::new(
            ProcessRunner::python(&config.python_path)
                .temp_root(&temp_root)
                .max_output_bytes(config.max_output_bytes),
        );

        Self::new()
            .register(JAVASCRIPT, javascript.clone())
            .alias("js", JAVASCRIPT)
            .alias("node", JAVASCRIPT)
            .alias("nodejs", JAVASCRIPT)
            .register(PYTHON, python)
            .alias("python3", PYTHON)
            .alias("py", PYTHON)
            .register(HTML, Arc::new(HtmlRunner::new(javascript)))
            .alias("htm", HTML)
    }

    pub fn register(mut self, language: &str, runner: Arc<dyn Runner>) -> Self {
        self.runners.insert(normalize(Some(language)), runner);
        self
    }

    pub fn alias(mut self, alias: &str, language: &str) -> Self {
        self.aliases
            .insert(normalize(Some(alias)), normalize(Some(language)));
        self
    }

    /// Resolves aliases to the registered canonical id.
    pub fn canonical(&self, language: &str) -> String {
        let language = normalize(Some(language));
        self.aliases.get(&language).cloned().unwrap_or(language)
    }

    pub fn get(&self, language: &str) -> Option<Arc<dyn Runner>> {
        self.runners.get(&self.canonical(language)).cloned()
    }

    pub fn is_always_local(&self, language: &str) -> bool {
        ALWAYS_LOCAL.contains(&self.canonical(language).as_str())
    }

    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<_> = self.runners.keys().cloned().collect();
        languages.sort();
        languages
    }
}
