use std::sync::{Arc, LazyLock};
use std::time::Duration;

use itertools::Itertools;
use regex::Regex;
use tokio::time::Instant;

use crate::core::domain::{ExecutionResult, ExecutionStatus};
use crate::core::traits::runner::Runner;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").expect("valid regex"));
static HIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>|<!--.*?-->").expect("valid regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// "Runs" an HTML document: its visible text is the output, and every inline
/// `<script>` block is executed in order through the JavaScript runner.
#[derive(Debug)]
pub struct HtmlRunner {
    script_runner: Arc<dyn Runner>,
}

impl HtmlRunner {
    pub fn new(script_runner: Arc<dyn Runner>) -> Self {
        Self { script_runner }
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Document {
    text: String,
    scripts: Vec<String>,
}

fn parse(markup: &str) -> Document {
    let scripts = SCRIPT_RE
        .captures_iter(markup)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let without_scripts = SCRIPT_RE.replace_all(markup, " ");
    let without_hidden = HIDDEN_RE.replace_all(&without_scripts, " ");
    let flattened = TAG_RE.replace_all(&without_hidden, " ");
    let text = SPACE_RE
        .replace_all(&decode_entities(&flattened), " ")
        .trim()
        .to_string();

    Document { text, scripts }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[async_trait::async_trait]
impl Runner for HtmlRunner {
    #[tracing::instrument(skip(self, code, stdin))]
    async fn execute(&self, code: &str, stdin: &str, timeout: Duration) -> ExecutionResult {
        let start = Instant::now();
        let document = parse(code);
        tracing::debug!("Extracted {} script block(s)", document.scripts.len());

        let mut outputs = vec![document.text];
        let mut stderr = Vec::new();

        for (idx, script) in document.scripts.iter().enumerate() {
            let remaining = timeout.saturating_sub(start.elapsed());
            let result = self.script_runner.execute(script, stdin, remaining).await;

            if result.status != ExecutionStatus::Passed {
                tracing::debug!("Script block {} failed: {:?}", idx, result.status);
                return ExecutionResult {
                    stdout: outputs.into_iter().filter(|o| !o.is_empty()).join("\n"),
                    time_ms: start.elapsed().as_millis() as u64,
                    message: format!("Script block {} failed: {}", idx + 1, result.message)
                        .trim_end_matches([' ', ':'])
                        .to_string(),
                    ..result
                };
            }

            outputs.push(result.stdout);
            stderr.push(result.stderr);
        }

        ExecutionResult::passed(
            outputs.into_iter().filter(|o| !o.is_empty()).join("\n"),
            stderr.into_iter().filter(|e| !e.is_empty()).join("\n"),
            start.elapsed().as_millis() as u64,
        )
    }
}
