//! File pattern compilation and changeset classification.
//!
//! Two source syntaxes compile to a [`FilePattern`]:
//!
//! - **glob**: `**` spans any number of path segments, `*` stays inside one
//!   segment, a trailing `/` selects a directory and everything beneath it.
//!   Other patterns are anchored to the end of the path, never the start, so
//!   `*_test.go` matches at any depth.
//! - **`regex{{...}}`**: the inner text is used as the regexp verbatim.
//!
//! [`FileMatcher`] holds the effective inclusion (test files) and exclusion
//! (files the test check ignores) sets; [`FileCategories`] tallies a
//! changeset against them.

pub mod categories;

pub use categories::FileCategories;

use std::fmt;

use regex::Regex;
use serde::Deserialize;

use crate::config::merge_list;
use crate::error::{BotError, Result};

/// Test file naming conventions across common languages.
pub const DEFAULT_INCLUSION: &[&str] = &[
    // Java / Kotlin / Groovy / Scala
    "*Test.java",
    "*Tests.java",
    "*TestCase.java",
    "*IT.java",
    "*Test.kt",
    "*Spec.groovy",
    "*Test.groovy",
    "*Spec.scala",
    "*Test.scala",
    // Go
    "*_test.go",
    // Python
    "test_*.py",
    "*_test.py",
    // JavaScript / TypeScript
    "*.spec.js",
    "*.test.js",
    "*.spec.ts",
    "*.test.ts",
    // Ruby
    "*_spec.rb",
    "*_test.rb",
    // C#
    "*Test.cs",
    "*Tests.cs",
    // Rust
    "tests/*.rs",
];

/// Dependency directories, documentation, build descriptors and CI config.
pub const DEFAULT_EXCLUSION: &[&str] = &[
    // Dependencies
    "vendor/",
    "node_modules/",
    "bower_components/",
    "third_party/",
    // Documentation
    "docs/",
    "*.md",
    "*.adoc",
    "*.rst",
    "*.txt",
    "LICENSE",
    "NOTICE",
    // Build descriptors
    "pom.xml",
    "build.gradle",
    "settings.gradle",
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "go.mod",
    "go.sum",
    "Gopkg.toml",
    "Gopkg.lock",
    "Cargo.toml",
    "Cargo.lock",
    "Gemfile",
    "Gemfile.lock",
    "Makefile",
    "Dockerfile",
    // CI and repository metadata
    ".travis.yml",
    ".gitlab-ci.yml",
    "Jenkinsfile",
    ".github/",
    ".circleci/",
    ".gitignore",
    ".editorconfig",
];

const REGEX_OPEN: &str = "regex{{";
const REGEX_CLOSE: &str = "}}";

/// A compiled file pattern.
#[derive(Debug, Clone)]
pub struct FilePattern {
    regexp: Regex,
}

impl FilePattern {
    /// Compile a pattern string written in either source syntax.
    pub fn parse(pattern: &str) -> Result<Self> {
        Self::from_regexp(&to_regexp(pattern))
    }

    pub fn from_regexp(regexp: &str) -> Result<Self> {
        let regexp = Regex::new(regexp).map_err(|source| BotError::Pattern {
            pattern: regexp.to_string(),
            source,
        })?;
        Ok(Self { regexp })
    }

    /// The compiled regexp source.
    pub fn as_str(&self) -> &str {
        self.regexp.as_str()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regexp.is_match(path)
    }
}

impl PartialEq for FilePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for FilePattern {}

impl fmt::Display for FilePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inner text of a `regex{{...}}` wrapper, if `pattern` is one.
fn unwrap_regex(pattern: &str) -> Option<&str> {
    pattern
        .trim()
        .strip_prefix(REGEX_OPEN)?
        .strip_suffix(REGEX_CLOSE)
}

/// Translate a pattern string to regexp source without compiling it.
pub fn to_regexp(pattern: &str) -> String {
    match unwrap_regex(pattern) {
        Some(inner) => inner.to_string(),
        None => glob_to_regexp(pattern.trim()),
    }
}

fn glob_to_regexp(glob: &str) -> String {
    let (body, subtree) = match glob.strip_suffix('/') {
        Some(dir) => (dir, true),
        None => (glob, false),
    };

    let mut out = String::new();
    let mut literal = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '*' {
            literal.push(c);
            continue;
        }
        out.push_str(&regex::escape(&literal));
        literal.clear();
        if chars.peek() == Some(&'*') {
            chars.next();
            out.push_str(".*");
        } else {
            out.push_str("[^/]*");
        }
    }
    out.push_str(&regex::escape(&literal));

    if subtree {
        out.push_str("/.*");
    } else {
        out.push('$');
    }
    out
}

/// Compile pattern strings into an ordered, duplicate-free set.
pub fn parse_file_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<FilePattern>> {
    let mut parsed: Vec<FilePattern> = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        let compiled = FilePattern::parse(pattern.as_ref())?;
        if !parsed.contains(&compiled) {
            parsed.push(compiled);
        }
    }
    Ok(parsed)
}

/// User-supplied patterns as they appear in repository configuration.
///
/// A single string is a raw regexp (a `regex{{...}}` wrapper is tolerated);
/// a list holds pattern strings in either source syntax.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PatternSource {
    Regexp(String),
    Patterns(Vec<String>),
}

impl PatternSource {
    fn to_regexps(&self) -> Vec<String> {
        match self {
            PatternSource::Regexp(raw) => {
                let raw = unwrap_regex(raw).unwrap_or(raw).trim();
                if raw.is_empty() {
                    Vec::new()
                } else {
                    vec![raw.to_string()]
                }
            }
            PatternSource::Patterns(patterns) => patterns
                .iter()
                .filter(|p| !p.trim().is_empty())
                .map(|p| to_regexp(p))
                .collect(),
        }
    }
}

/// Defaults, optionally replaced or extended by user patterns.
///
/// Unset or empty user patterns leave the defaults in force. Otherwise the
/// user set replaces the defaults, unless `combine` asks for the union.
fn effective_patterns(
    defaults: &[&str],
    user: Option<&PatternSource>,
    combine: bool,
) -> Result<Vec<FilePattern>> {
    let mut regexps: Vec<String> = defaults.iter().map(|g| glob_to_regexp(g)).collect();
    let user_regexps = user.map(PatternSource::to_regexps).unwrap_or_default();
    if !user_regexps.is_empty() {
        merge_list(&mut regexps, user_regexps, &[], !combine);
    }
    regexps.iter().map(|r| FilePattern::from_regexp(r)).collect()
}

/// Effective inclusion and exclusion sets for one repository.
#[derive(Debug, Clone)]
pub struct FileMatcher {
    pub inclusion: Vec<FilePattern>,
    pub exclusion: Vec<FilePattern>,
}

impl FileMatcher {
    /// Built-in test and exclusion patterns only.
    pub fn defaults() -> Self {
        Self::from_sources(None, None, false).expect("built-in file patterns must compile")
    }

    pub fn from_sources(
        inclusion: Option<&PatternSource>,
        exclusion: Option<&PatternSource>,
        combine: bool,
    ) -> Result<Self> {
        Ok(Self {
            inclusion: effective_patterns(DEFAULT_INCLUSION, inclusion, combine)?,
            exclusion: effective_patterns(DEFAULT_EXCLUSION, exclusion, combine)?,
        })
    }

    pub fn matches_inclusion(&self, path: &str) -> bool {
        self.inclusion.iter().any(|p| p.matches(path))
    }

    pub fn matches_exclusion(&self, path: &str) -> bool {
        self.exclusion.iter().any(|p| p.matches(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regexp_of(pattern: &str) -> String {
        FilePattern::parse(pattern).unwrap().as_str().to_string()
    }

    fn glob_matches(pattern: &str, path: &str) -> bool {
        FilePattern::parse(pattern).unwrap().matches(path)
    }

    // ── Compilation ──

    #[test]
    fn double_star_spans_directories() {
        assert_eq!(regexp_of("**/*Test.java"), r".*/[^/]*Test\.java$");
        assert_eq!(regexp_of("pkg/**/*_test.go"), r"pkg/.*/[^/]*_test\.go$");
    }

    #[test]
    fn single_star_stays_in_segment() {
        assert_eq!(regexp_of("*/*Test.java"), r"[^/]*/[^/]*Test\.java$");
        assert_eq!(regexp_of("test_*.py"), r"test_[^/]*\.py$");
        assert_eq!(
            regexp_of("pkg/*/**/*_test.go"),
            r"pkg/[^/]*/.*/[^/]*_test\.go$"
        );
    }

    #[test]
    fn trailing_slash_selects_subtree() {
        assert_eq!(regexp_of("vendor/"), "vendor/.*");
    }

    #[test]
    fn metacharacters_are_escaped() {
        assert_eq!(regexp_of("a+b(c).txt"), r"a\+b\(c\)\.txt$");
    }

    #[test]
    fn regex_wrapper_passes_through() {
        assert_eq!(regexp_of("regex{{my-regexp}}"), "my-regexp");
        assert_eq!(regexp_of(r"regex{{^src/.*\.(rs|go)$}}"), r"^src/.*\.(rs|go)$");
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = FilePattern::parse("regex{{(unclosed}}").unwrap_err();
        assert!(matches!(err, BotError::Pattern { .. }));
    }

    #[test]
    fn parse_file_patterns_dedupes_in_order() {
        let parsed = parse_file_patterns(&["*.md", "vendor/", "*.md"]).unwrap();
        let sources: Vec<&str> = parsed.iter().map(FilePattern::as_str).collect();
        assert_eq!(sources, vec![r"[^/]*\.md$", "vendor/.*"]);
    }

    // ── Matching semantics ──

    #[test]
    fn double_star_matches_any_depth() {
        assert!(glob_matches("src/**/*.rs", "src/a/b/c/lib.rs"));
        assert!(glob_matches("src/**/*.rs", "src/a/lib.rs"));
        assert!(!glob_matches("src/**/*.rs", "src/lib.go"));
    }

    #[test]
    fn single_star_does_not_cross_slash() {
        assert!(glob_matches("src/*/mod.rs", "src/a/mod.rs"));
        assert!(!glob_matches("src/*/mod.rs", "src/a/b/mod.rs"));
    }

    #[test]
    fn anchored_to_end_only() {
        assert!(glob_matches("*_test.go", "deep/path/main_test.go"));
        assert!(!glob_matches("*_test.go", "path/_test.go/page.html"));
    }

    #[test]
    fn subtree_matches_everything_below() {
        assert!(glob_matches("vendor/", "vendor/github.com/x/y.go"));
        assert!(glob_matches("node_modules/", "web/node_modules/leftpad/index.js"));
        assert!(!glob_matches("vendor/", "vendored.go"));
    }

    // ── Effective sets ──

    #[test]
    fn defaults_compile() {
        let matcher = FileMatcher::defaults();
        assert_eq!(matcher.inclusion.len(), DEFAULT_INCLUSION.len());
        assert_eq!(matcher.exclusion.len(), DEFAULT_EXCLUSION.len());
    }

    #[test]
    fn user_patterns_replace_defaults() {
        let user = PatternSource::Regexp(r"_test\.rb$".into());
        let matcher = FileMatcher::from_sources(Some(&user), None, false).unwrap();
        assert_eq!(matcher.inclusion.len(), 1);
        assert!(matcher.matches_inclusion("path/to/service_test.rb"));
        assert!(!matcher.matches_inclusion("path/to/ServiceTest.java"));
        // Exclusion untouched
        assert!(matcher.matches_exclusion("README.md"));
    }

    #[test]
    fn combine_unions_with_defaults() {
        let user = PatternSource::Patterns(vec!["*FunctionalSpec.java".into()]);
        let matcher = FileMatcher::from_sources(Some(&user), None, true).unwrap();
        assert!(matcher.matches_inclusion("src/AwesomeFunctionalSpec.java"));
        assert!(matcher.matches_inclusion("src/UnitTest.java"));
    }

    #[test]
    fn empty_user_pattern_keeps_defaults() {
        let user = PatternSource::Regexp("  ".into());
        let matcher = FileMatcher::from_sources(Some(&user), None, false).unwrap();
        assert_eq!(matcher.inclusion.len(), DEFAULT_INCLUSION.len());
    }

    #[test]
    fn pattern_source_accepts_string_or_list() {
        #[derive(Deserialize)]
        struct Holder {
            p: PatternSource,
        }
        let single: Holder = toml::from_str(r#"p = '\.svg$'"#).unwrap();
        assert_eq!(single.p, PatternSource::Regexp(r"\.svg$".into()));
        let list: Holder = toml::from_str(r#"p = ["docs/", "*.svg"]"#).unwrap();
        assert_eq!(
            list.p,
            PatternSource::Patterns(vec!["docs/".into(), "*.svg".into()])
        );
    }
}
