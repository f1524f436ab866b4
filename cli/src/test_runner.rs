use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use serde::Deserialize;

use engine::{FieldValue, MatchResult};

use crate::rules::{CustomType, Rule, RuleError, RuleSet, RulesFile};

/// An expected field value: a string, or a list for repeated captures.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExpectedValue {
    Single(String),
    List(Vec<String>),
}

impl ExpectedValue {
    fn matches(&self, actual: &FieldValue) -> bool {
        match (self, actual) {
            (ExpectedValue::Single(expected), FieldValue::Single(actual)) => expected == actual,
            (ExpectedValue::List(expected), FieldValue::List(actual)) => expected == actual,
            _ => false,
        }
    }
}

impl fmt::Display for ExpectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedValue::Single(value) => write!(f, "{}", value),
            ExpectedValue::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Named fields every input must produce, and nothing else.
    #[serde(default)]
    pub expect_fields: Option<BTreeMap<String, ExpectedValue>>,

    /// If true, no input may match.
    #[serde(default)]
    pub expect_no_match: bool,

    /// If true, the template must fail to compile.
    #[serde(default)]
    pub expect_compile_error: bool,

    /// Custom input types for this test, name to regex.
    #[serde(default)]
    pub custom_types: BTreeMap<String, String>,
}

/// A parsed `.test.md` file.
#[derive(Debug)]
pub struct TestCase {
    pub config: TestConfig,
    pub template: String,
    pub inputs: Vec<String>,
}

/// Split off the `---` delimited TOML frontmatter, returning it and the body.
fn split_frontmatter(content: &str) -> Result<(&str, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- frontmatter delimiter")?;

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- frontmatter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let body = &after_open[close_pos + 4..];
    Ok((toml_str, body))
}

/// Collect fenced code blocks by info string.
fn fenced_blocks(body: &str) -> Vec<(String, String)> {
    let mut blocks = Vec::new();
    let mut current: Option<(String, String)> = None;

    for event in Parser::new(body) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                let lang = info.split_whitespace().next().unwrap_or_default();
                current = Some((lang.to_string(), String::new()));
            }
            Event::Text(text) => {
                if let Some((_, content)) = &mut current {
                    content.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((lang, mut content)) = current.take() {
                    if content.ends_with('\n') {
                        content.pop();
                    }
                    blocks.push((lang, content));
                }
            }
            _ => {}
        }
    }
    blocks
}

/// Parse a `.test.md` file: frontmatter, one `template` block and any number
/// of `input` blocks.
pub fn parse_test_file(content: &str) -> Result<TestCase, String> {
    let (toml_str, body) = split_frontmatter(content)?;
    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    let mut template = None;
    let mut inputs = Vec::new();
    for (lang, content) in fenced_blocks(body) {
        match lang.as_str() {
            "template" if template.is_some() => {
                return Err("more than one template block".into());
            }
            "template" => template = Some(content),
            "input" => inputs.push(content),
            _ => {}
        }
    }

    let template = template.ok_or("missing template block")?;
    if inputs.is_empty() && !config.expect_compile_error {
        return Err("missing input block".into());
    }

    Ok(TestCase {
        config,
        template,
        inputs,
    })
}

/// Compare a match against the expected named fields.
fn check_fields(
    input: &str,
    result: &MatchResult,
    expected: &BTreeMap<String, ExpectedValue>,
) -> Option<String> {
    for (name, value) in expected {
        match result.value(name) {
            Some(actual) if value.matches(actual) => {}
            Some(actual) => {
                return Some(format!(
                    "input \"{}\": field '{}'\n  expected: {}\n  actual:   {}",
                    input, name, value, actual
                ));
            }
            None => {
                return Some(format!(
                    "input \"{}\": field '{}' missing (expected {})",
                    input, name, value
                ));
            }
        }
    }

    let extra: Vec<&str> = result
        .fields
        .iter()
        .filter_map(|field| field.name.as_deref())
        .filter(|name| !expected.contains_key(*name))
        .collect();
    if !extra.is_empty() {
        return Some(format!(
            "input \"{}\": unexpected field(s): {}",
            input,
            extra.join(", ")
        ));
    }
    None
}

/// Run a parsed test case. Returns `Some(reason)` on failure.
fn check_case(case: &TestCase) -> Option<String> {
    let file = RulesFile {
        types: case
            .config
            .custom_types
            .iter()
            .map(|(name, regex)| {
                (
                    name.clone(),
                    CustomType {
                        regex: regex.clone(),
                    },
                )
            })
            .collect(),
        rules: vec![Rule {
            name: "template".to_string(),
            template: case.template.clone(),
        }],
    };

    let rule_set = RuleSet::new(file);
    if case.config.expect_compile_error {
        return match rule_set {
            Err(RuleError::Compile { .. }) => None,
            Err(other) => Some(format!("expected compile error, got: {}", other)),
            Ok(_) => Some("expected compile error, but the template compiled".into()),
        };
    }

    let mut rules = match rule_set {
        Ok(rules) => rules,
        Err(RuleError::Compile { errors, .. }) => {
            let msgs: Vec<String> = errors.iter().map(|e| e.message.clone()).collect();
            return Some(format!("unexpected compile error: {}", msgs.join("; ")));
        }
        Err(other) => return Some(other.to_string()),
    };

    for input in &case.inputs {
        let matched = match rules.match_input(input) {
            Ok(matched) => matched,
            Err(error) => return Some(error.to_string()),
        };
        match (matched, case.config.expect_no_match) {
            (None, true) => {}
            (Some((_, result)), true) => {
                return Some(format!(
                    "input \"{}\": expected no match, matched with {} field(s)",
                    input,
                    result.fields.len()
                ));
            }
            (None, false) => return Some(format!("input \"{}\": no match", input)),
            (Some((_, result)), false) => {
                if let Some(expected) = &case.config.expect_fields {
                    if let Some(reason) = check_fields(input, &result, expected) {
                        return Some(reason);
                    }
                }
            }
        }
    }
    None
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(".test.md"))
                .unwrap_or("?")
        })
    }
}

pub fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let case = match parse_test_file(&content) {
        Ok(case) => case,
        Err(e) => return fail(None, format!("test file error: {}", e)),
    };

    let description = case.config.description.clone();
    match check_case(&case) {
        Some(reason) => fail(description, reason),
        None => TestResult {
            path: path.to_path_buf(),
            description,
            outcome: TestOutcome::Pass,
        },
    }
}

/// Discover `.test.md` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(".test.md"))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        eprintln!("  {} ({} tests)", category_label(cat), files.len());
    }
}

/// Select the categories to run. A requested category also selects its
/// subcategories.
fn filter_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a [PathBuf]> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
    }

    let mut filtered = BTreeMap::new();
    for req in requested {
        let req = req.trim_matches('/');
        let prefix = format!("{}/", req);
        let before = filtered.len();
        for (cat, files) in all {
            if cat == req || cat.starts_with(&prefix) {
                filtered.insert(cat.as_str(), files.as_slice());
            }
        }
        if filtered.len() == before {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

/// Prints per-test lines as they run, then failures and a summary.
struct Reporter {
    no_color: bool,
    passed: usize,
    failures: Vec<TestResult>,
}

impl Reporter {
    fn new(no_color: bool) -> Self {
        Reporter {
            no_color,
            passed: 0,
            failures: Vec::new(),
        }
    }

    fn paint(&self, s: &str, code: &str) -> String {
        if self.no_color {
            s.to_string()
        } else {
            format!("\x1b[{}m{}\x1b[0m", code, s)
        }
    }

    fn header(&self, category: &str) {
        eprintln!();
        eprintln!("{}", self.paint(category_label(category), "1"));
    }

    fn record(&mut self, result: TestResult) {
        match result.outcome {
            TestOutcome::Pass => {
                self.passed += 1;
                eprintln!("  {}  {}", self.paint("PASS", "32"), result.label());
            }
            TestOutcome::Fail(_) => {
                eprintln!("  {}  {}", self.paint("FAIL", "31"), result.label());
                self.failures.push(result);
            }
        }
    }

    /// Print failure details and the summary line. Returns the exit code.
    fn finish(self) -> i32 {
        if !self.failures.is_empty() {
            eprintln!();
            eprintln!("failures:");
            for failure in &self.failures {
                eprintln!();
                eprintln!("  --- {} ---", failure.path.display());
                if let TestOutcome::Fail(reason) = &failure.outcome {
                    for line in reason.lines() {
                        eprintln!("  {}", line);
                    }
                }
            }
        }

        eprintln!();
        let failed = self.failures.len();
        if failed == 0 {
            eprintln!(
                "test result: {}. {} passed, 0 failed",
                self.paint("ok", "32"),
                self.passed
            );
            0
        } else {
            eprintln!(
                "test result: {}. {} passed, {} failed (of {})",
                self.paint("FAILED", "31"),
                self.passed,
                failed,
                self.passed + failed
            );
            1
        }
    }
}

/// Run all `.test.md` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let mut reporter = Reporter::new(no_color);

    if path.is_file() {
        reporter.record(run_single_test(path));
        return reporter.finish();
    }

    let all_categories = discover_categorized(path);
    if all_categories.is_empty() {
        eprintln!("no .test.md files found in {}", path.display());
        return 1;
    }

    let run_categories = filter_categories(&all_categories, categories);
    if run_categories.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    for (cat, files) in run_categories {
        reporter.header(cat);
        for file in files {
            reporter.record(run_single_test(file));
        }
    }
    reporter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASE: &str = r#"---
description = "tag and note"

[expect_fields]
tag = "ideas"
note = "fan-art"
---

A hashtag followed by free text.

```template
#{tag:word} {note}
```

```input
#ideas fan-art
```
"#;

    #[test]
    fn parses_frontmatter_and_blocks() {
        let case = parse_test_file(CASE).expect("parse");
        assert_eq!(case.config.description.as_deref(), Some("tag and note"));
        assert_eq!(case.template, "#{tag:word} {note}");
        assert_eq!(case.inputs, vec!["#ideas fan-art".to_string()]);
        let fields = case.config.expect_fields.as_ref().expect("fields");
        assert_eq!(fields["tag"], ExpectedValue::Single("ideas".into()));
        assert!(check_case(&case).is_none());
    }

    #[test]
    fn reports_field_mismatch() {
        let case = parse_test_file(&CASE.replace("fan-art\"", "fanart\"")).expect("parse");
        let reason = check_case(&case).expect("should fail");
        assert!(reason.contains("field 'note'"), "{}", reason);
    }

    #[test]
    fn list_values_and_custom_types() {
        let content = r##"---
expect_fields = { tag = ["#a", "#b"] }
custom_types = { hashtag = '^#\w+$' }
---
```template
{tag:hashtag} {tag:hashtag}
```
```input
#a #b
```
"##;
        let case = parse_test_file(content).expect("parse");
        assert!(check_case(&case).is_none(), "{:?}", check_case(&case));
    }

    #[test]
    fn compile_error_expectation() {
        let content = "---\nexpect_compile_error = true\n---\n```template\n#{tag\n```\n";
        let case = parse_test_file(content).expect("parse");
        assert!(case.inputs.is_empty());
        assert!(check_case(&case).is_none());
    }

    #[test]
    fn rejects_malformed_files() {
        assert!(parse_test_file("no frontmatter").is_err());
        assert!(parse_test_file("---\n---\n```input\nx\n```\n").is_err());
        assert!(parse_test_file("---\n---\n```template\nx\n```\n").is_err());
        assert!(parse_test_file("---\nbogus = 1\n---\n```template\nx\n```\n```input\nx\n```\n").is_err());
    }

    #[test]
    fn fixture_suite_passes() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/cases");
        let categories = discover_categorized(&root);
        assert!(!categories.is_empty());
        for files in categories.values() {
            for file in files {
                let result = run_single_test(file);
                if let TestOutcome::Fail(reason) = &result.outcome {
                    panic!("{}: {}", file.display(), reason);
                }
            }
        }
    }
}
