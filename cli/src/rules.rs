use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use serde::Deserialize;

use engine::{Combination, MatchError, MatchResult, MatcherRegistry, RegexMatcher};
use notepat::{CompileError, Compiler, InputType, Pattern};

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rules file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("rule '{rule}' has an invalid template")]
    Compile {
        rule: String,
        template: String,
        errors: Vec<CompileError>,
    },

    #[error("rule '{rule}': {source}")]
    Match {
        rule: String,
        #[source]
        source: MatchError,
    },

    #[error(transparent)]
    Registry(#[from] MatchError),
}

/// A custom input type backed by a regex matcher.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomType {
    pub regex: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub name: String,
    pub template: String,
}

/// A TOML rules file: custom input types plus templates tried in order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RulesFile {
    #[serde(default)]
    pub types: BTreeMap<String, CustomType>,

    #[serde(default, rename = "rule")]
    pub rules: Vec<Rule>,
}

impl RulesFile {
    pub fn load(path: &Path) -> Result<Self, RuleError> {
        let content = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, RuleError> {
        Ok(toml::from_str(content)?)
    }

    pub fn custom_type_names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    /// Built-in matchers plus one regex matcher per custom type.
    pub fn registry(&self) -> Result<MatcherRegistry, MatchError> {
        let mut registry = MatcherRegistry::builtin();
        for (name, custom) in &self.types {
            registry.register(
                InputType::Custom(name.clone()),
                RegexMatcher::new(name, &custom.regex)?,
            );
        }
        Ok(registry)
    }
}

/// A compiled template and its ranked readings.
#[derive(Debug)]
pub struct CachedPattern {
    pub pattern: Pattern,
    pub combinations: Vec<Combination>,
}

/// Compiled patterns keyed by template text. A template whose text changes
/// is simply a new key, so stale entries are never served.
pub struct PatternCache {
    custom_types: Vec<String>,
    entries: HashMap<String, CachedPattern>,
}

impl PatternCache {
    pub fn new(custom_types: Vec<String>) -> Self {
        PatternCache {
            custom_types,
            entries: HashMap::new(),
        }
    }

    pub fn get_or_compile(&mut self, template: &str) -> Result<&CachedPattern, Vec<CompileError>> {
        match self.entries.entry(template.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                tracing::debug!(template, "compiling template");
                let pattern = Compiler::new(template, 0)
                    .with_custom_types(self.custom_types.iter().cloned())
                    .compile()?;
                let combinations = engine::expand(&pattern);
                Ok(entry.insert(CachedPattern {
                    pattern,
                    combinations,
                }))
            }
        }
    }
}

/// Rules ready for matching: every template compiled and checked against
/// the registry up front.
pub struct RuleSet {
    rules: Vec<Rule>,
    registry: MatcherRegistry,
    cache: PatternCache,
}

impl RuleSet {
    pub fn new(file: RulesFile) -> Result<Self, RuleError> {
        let registry = file.registry()?;
        let mut cache = PatternCache::new(file.custom_type_names());

        for rule in &file.rules {
            let cached = cache
                .get_or_compile(&rule.template)
                .map_err(|errors| RuleError::Compile {
                    rule: rule.name.clone(),
                    template: rule.template.clone(),
                    errors,
                })?;
            registry
                .validate(&cached.pattern)
                .map_err(|source| RuleError::Match {
                    rule: rule.name.clone(),
                    source,
                })?;
        }

        Ok(RuleSet {
            rules: file.rules,
            registry,
            cache,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Match `input` against each rule in order; the first match wins.
    pub fn match_input(&mut self, input: &str) -> Result<Option<(&str, MatchResult)>, RuleError> {
        for rule in &self.rules {
            let cached = self
                .cache
                .get_or_compile(&rule.template)
                .map_err(|errors| RuleError::Compile {
                    rule: rule.name.clone(),
                    template: rule.template.clone(),
                    errors,
                })?;
            let result = engine::match_combinations(input, &cached.combinations, &self.registry)
                .map_err(|source| RuleError::Match {
                    rule: rule.name.clone(),
                    source,
                })?;
            if let Some(result) = result {
                tracing::debug!(rule = %rule.name, "rule matched");
                return Ok(Some((rule.name.as_str(), result)));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use engine::FieldValue;

    use super::*;

    const RULES: &str = r#"
[types.hashtag]
regex = '^#\w+$'

[[rule]]
name = "contact"
template = "{name:word} {phone:phone}"

[[rule]]
name = "tagged"
template = "{tag:hashtag} {note}"

[[rule]]
name = "note"
template = "{note}"
"#;

    #[test]
    fn first_matching_rule_wins() {
        let mut rules = RuleSet::new(RulesFile::parse(RULES).expect("parse")).expect("rules");
        assert_eq!(rules.len(), 3);

        let (name, result) = rules
            .match_input("Jon +380123456789")
            .expect("match")
            .expect("no match");
        assert_eq!(name, "contact");
        assert_eq!(result.value("phone"), Some(&FieldValue::Single("+380123456789".into())));

        let (name, result) = rules
            .match_input("#ideas fan-art")
            .expect("match")
            .expect("no match");
        assert_eq!(name, "tagged");
        assert_eq!(result.value("tag"), Some(&FieldValue::Single("#ideas".into())));

        let (name, _) = rules.match_input("anything else").expect("match").expect("no match");
        assert_eq!(name, "note");
    }

    #[test]
    fn cache_compiles_each_template_once() {
        let mut cache = PatternCache::new(Vec::new());
        cache.get_or_compile("#{tag:word}").expect("compile");
        cache.get_or_compile("#{tag:word}").expect("compile");
        assert_eq!(cache.entries.len(), 1);
        cache.get_or_compile("#{tag:word} {note}").expect("compile");
        assert_eq!(cache.entries.len(), 2);
        assert!(cache.get_or_compile("#{tag").is_err());
        assert_eq!(cache.entries.len(), 2);
    }

    #[test]
    fn invalid_template_is_reported_at_load() {
        let file = RulesFile::parse("[[rule]]\nname = \"broken\"\ntemplate = \"#{tag\"\n")
            .expect("parse");
        let Err(RuleError::Compile { rule, errors, .. }) = RuleSet::new(file) else {
            panic!("expected compile error");
        };
        assert_eq!(rule, "broken");
        assert_eq!(errors[0].message, "unclosed '{'");
    }

    #[test]
    fn invalid_custom_regex_is_reported_at_load() {
        let file = RulesFile::parse("[types.bad]\nregex = \"(\"\n").expect("parse");
        assert!(matches!(RuleSet::new(file), Err(RuleError::Registry(_))));
    }

    #[test]
    fn load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(RULES.as_bytes()).expect("write");
        let rules = RulesFile::load(file.path()).expect("load");
        assert_eq!(rules.rules.len(), 3);
        assert_eq!(rules.custom_type_names(), vec!["hashtag".to_string()]);

        let missing = RulesFile::load(Path::new("/nonexistent/rules.toml"));
        assert!(matches!(missing, Err(RuleError::Io { .. })));
    }
}
