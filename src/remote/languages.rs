/// Judge0 CE language ids for the languages the remote judge is used for.
const LANGUAGE_IDS: &[(&str, u32)] = &[
    ("javascript", 63),
    ("python", 71),
    ("java", 62),
    ("c", 50),
    ("cpp", 54),
    ("csharp", 51),
    ("go", 60),
    ("rust", 73),
    ("ruby", 72),
    ("php", 68),
    ("typescript", 74),
    ("kotlin", 78),
    ("swift", 83),
    ("r", 80),
    ("bash", 46),
    ("sql", 82),
];

const ALIASES: &[(&str, &str)] = &[
    ("js", "javascript"),
    ("node", "javascript"),
    ("nodejs", "javascript"),
    ("python3", "python"),
    ("py", "python"),
    ("c++", "cpp"),
    ("c#", "csharp"),
    ("cs", "csharp"),
    ("golang", "go"),
    ("ts", "typescript"),
    ("sh", "bash"),
];

/// Expects a normalized language id.
pub fn language_id(language: &str) -> Option<u32> {
    let language = ALIASES
        .iter()
        .find(|(alias, _)| *alias == language)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(language);

    LANGUAGE_IDS
        .iter()
        .find(|(name, _)| *name == language)
        .map(|(_, id)| *id)
}
