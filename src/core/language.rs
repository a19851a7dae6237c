/// Canonical language id: trimmed and lower-cased. Unknown names pass through
/// unchanged and are rejected later by the absence of a registered runner.
pub fn normalize(language: Option<&str>) -> String {
    language.map(|l| l.trim().to_lowercase()).unwrap_or_default()
}
