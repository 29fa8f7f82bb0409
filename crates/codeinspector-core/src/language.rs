use once_cell::sync::Lazy;
use regex::Regex;

struct LanguageRule {
    language: &'static str,
    patterns: Vec<Regex>,
}

fn rule(language: &'static str, patterns: &[&str]) -> LanguageRule {
    LanguageRule {
        language,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(p).expect("language pattern must compile"))
            .collect(),
    }
}

// Checked in order; the first rule with a matching pattern wins.
static RULES: Lazy<Vec<LanguageRule>> = Lazy::new(|| {
    vec![
        rule("python", &[r"\bdef\s+\w+\s*\(", r"\bimport\s+\w+"]),
        rule(
            "javascript",
            &[
                r"\bfunction\s+\w+\s*\(",
                r"\bconst\s+\w+\s*=",
                r"\blet\s+\w+\s*=",
            ],
        ),
        rule(
            "java",
            &[r"\bpublic\s+class\s+\w+", r"\bpublic\s+static\s+void\s+main"],
        ),
        rule("c/c++", &[r"#include\s*<", r"\bint\s+main\s*\("]),
    ]
});

/// Best-effort guess of a snippet's language from a few syntax markers.
/// Returns `"unknown"` when nothing matches.
pub fn detect_language(code: &str) -> &'static str {
    let code = code.trim();
    RULES
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| p.is_match(code)))
        .map(|rule| rule.language)
        .unwrap_or("unknown")
}
