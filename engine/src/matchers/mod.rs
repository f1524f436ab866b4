//! Type matchers: pluggable extractors that propose captures for one
//! input type, plus the registry that binds input types to them.

pub mod boundary;
pub mod builtin;

use std::collections::HashMap;

use notepat::{InputType, Pattern, Variable};

use crate::combination::Segment;
use crate::error::MatchError;

pub use boundary::select_by_boundary;
pub use builtin::{BoundaryMatcher, RegexMatcher, SubPatternMatcher};

/// Everything a matcher sees when asked for a capture.
pub struct MatchRequest<'a> {
    /// Unconsumed input.
    pub remaining: &'a str,
    /// The variable being captured.
    pub variable: &'a Variable,
    /// Segments after this variable in the current combination.
    pub following: &'a [Segment],
    /// Registry for matchers that recurse into sub-patterns.
    pub matchers: &'a MatcherRegistry,
}

impl<'a> MatchRequest<'a> {
    /// The literal that must come right after this capture, if any.
    pub fn following_text(&self) -> Option<&'a str> {
        match self.following.first() {
            Some(Segment::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// Lazy, ordered candidates. Each must be a prefix of the remaining input.
pub type Candidates<'a> = Box<dyn Iterator<Item = Result<&'a str, MatchError>> + 'a>;

/// What a matcher proposes for the current position.
pub enum Capture<'a> {
    /// The only possible capture.
    Single(&'a str),
    /// Ambiguous boundary: tried in order until the rest of the combination
    /// also matches.
    Candidates(Candidates<'a>),
}

pub trait Matcher: Send + Sync {
    /// Propose captures for `request`, or `None` if nothing here fits.
    fn capture<'a>(&self, request: &MatchRequest<'a>) -> Result<Option<Capture<'a>>, MatchError>;
}

/// Binds input types to matcher implementations.
pub struct MatcherRegistry {
    matchers: HashMap<InputType, Box<dyn Matcher>>,
}

impl MatcherRegistry {
    /// A registry with no matchers at all.
    pub fn empty() -> Self {
        MatcherRegistry {
            matchers: HashMap::new(),
        }
    }

    /// A registry with a matcher for every built-in input type.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for input_type in InputType::BUILTIN {
            if let Some(matcher) = builtin::builtin_matcher(&input_type) {
                registry.matchers.insert(input_type, matcher);
            }
        }
        registry
    }

    /// Register `matcher` for `input_type`, replacing any previous one.
    pub fn register<M: Matcher + 'static>(&mut self, input_type: InputType, matcher: M) -> &mut Self {
        self.matchers.insert(input_type, Box::new(matcher));
        self
    }

    pub fn with<M: Matcher + 'static>(mut self, input_type: InputType, matcher: M) -> Self {
        self.register(input_type, matcher);
        self
    }

    pub fn contains(&self, input_type: &InputType) -> bool {
        self.matchers.contains_key(input_type)
    }

    pub fn get(&self, input_type: &InputType) -> Result<&dyn Matcher, MatchError> {
        self.matchers
            .get(input_type)
            .map(|matcher| matcher.as_ref())
            .ok_or_else(|| MatchError::MissingMatcher(input_type.clone()))
    }

    /// Check that every variable in `pattern`, including nested
    /// sub-patterns, can be served by this registry.
    pub fn validate(&self, pattern: &Pattern) -> Result<(), MatchError> {
        let mut result = Ok(());
        pattern.visit_variables(&mut |variable| {
            if result.is_err() {
                return;
            }
            if !self.contains(&variable.input_type) {
                result = Err(MatchError::MissingMatcher(variable.input_type.clone()));
            } else if variable.input_type == InputType::Match && variable.pattern.is_none() {
                result = Err(MatchError::MissingSubPattern(variable.name.clone()));
            }
        });
        result
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_covers_builtin_types() {
        let registry = MatcherRegistry::builtin();
        for input_type in InputType::BUILTIN {
            assert!(registry.contains(&input_type), "{}", input_type);
        }
        assert!(!registry.contains(&InputType::Custom("date".into())));
    }

    #[test]
    fn validate_reports_unregistered_custom_types() {
        let pattern = notepat::Compiler::new("at {when:date}", 0)
            .with_custom_types(["date"])
            .compile()
            .expect("compile failed");

        let err = MatcherRegistry::builtin()
            .validate(&pattern)
            .expect_err("expected missing matcher");
        assert!(matches!(err, MatchError::MissingMatcher(InputType::Custom(ref name)) if name == "date"));

        let registry = MatcherRegistry::builtin().with(
            InputType::Custom("date".into()),
            BoundaryMatcher::new(|s| s.contains('.')),
        );
        assert!(registry.validate(&pattern).is_ok());
    }

    #[test]
    fn validate_descends_into_sub_patterns() {
        let pattern = notepat::Compiler::new("{qty:{n:date} kg}", 0)
            .with_custom_types(["date"])
            .compile()
            .expect("compile failed");
        assert!(MatcherRegistry::builtin().validate(&pattern).is_err());
    }
}
