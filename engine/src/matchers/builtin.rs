use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use notepat::InputType;

use crate::combination::expand;
use crate::error::MatchError;
use crate::matchers::{select_by_boundary, Capture, MatchRequest, Matcher};
use crate::pattern::match_combinations;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@.]+$").unwrap());

static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d(?:[\d ().-]*\d)?$").unwrap());

const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;

/// The matcher serving a built-in input type. Custom types have none.
pub(crate) fn builtin_matcher(input_type: &InputType) -> Option<Box<dyn Matcher>> {
    match input_type {
        InputType::Text => Some(Box::new(BoundaryMatcher::new(is_text))),
        InputType::Word | InputType::Database => Some(Box::new(BoundaryMatcher::new(is_word))),
        InputType::Number => Some(Box::new(BoundaryMatcher::new(is_number))),
        InputType::Url => Some(Box::new(BoundaryMatcher::new(is_url))),
        InputType::Email => Some(Box::new(BoundaryMatcher::new(is_email))),
        InputType::Phone => Some(Box::new(BoundaryMatcher::new(is_phone))),
        InputType::Match => Some(Box::new(SubPatternMatcher)),
        InputType::Custom(_) => None,
    }
}

pub fn is_text(_value: &str) -> bool {
    true
}

pub fn is_word(value: &str) -> bool {
    !value.chars().any(char::is_whitespace)
}

pub fn is_number(value: &str) -> bool {
    value.parse::<f64>().is_ok_and(f64::is_finite)
}

pub fn is_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

pub fn is_phone(value: &str) -> bool {
    PHONE.is_match(value)
        && PHONE_DIGITS.contains(&value.chars().filter(char::is_ascii_digit).count())
}

/// Absolute http(s)/ftp URLs, or bare `domain.tld[/path]`.
pub fn is_url(value: &str) -> bool {
    if value.is_empty() || !is_word(value) {
        return false;
    }

    if value.contains("://") {
        return Url::parse(value).is_ok_and(|url| {
            matches!(url.scheme(), "http" | "https" | "ftp") && url.host_str().is_some()
        });
    }

    let Ok(url) = Url::parse(&format!("http://{}", value)) else {
        return false;
    };
    if !url.username().is_empty() || url.password().is_some() {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };
    match host.rsplit_once('.') {
        Some((domain, tld)) => {
            !domain.is_empty() && tld.len() >= 2 && tld.chars().all(char::is_alphabetic)
        }
        None => false,
    }
}

/// A boundary matcher whose captures must satisfy a plain predicate.
pub struct BoundaryMatcher {
    validate: fn(&str) -> bool,
}

impl BoundaryMatcher {
    pub const fn new(validate: fn(&str) -> bool) -> Self {
        BoundaryMatcher { validate }
    }
}

impl Matcher for BoundaryMatcher {
    fn capture<'a>(&self, request: &MatchRequest<'a>) -> Result<Option<Capture<'a>>, MatchError> {
        let validate = self.validate;
        select_by_boundary(request, move |candidate| Ok(validate(candidate)))
    }
}

/// Captures must fully match the variable's own nested pattern.
pub struct SubPatternMatcher;

impl Matcher for SubPatternMatcher {
    fn capture<'a>(&self, request: &MatchRequest<'a>) -> Result<Option<Capture<'a>>, MatchError> {
        let variable = request.variable;
        let sub = variable
            .pattern
            .as_ref()
            .ok_or_else(|| MatchError::MissingSubPattern(variable.name.clone()))?;
        let combinations = expand(sub);
        let matchers = request.matchers;
        select_by_boundary(request, move |candidate| {
            Ok(match_combinations(candidate, &combinations, matchers)?.is_some())
        })
    }
}

/// A plugin matcher for custom input types, validated by a regex.
///
/// The regex is applied to whole candidates, so anchor it (`^...$`) unless a
/// partial hit is meant to accept the candidate.
pub struct RegexMatcher {
    regex: Regex,
}

impl RegexMatcher {
    pub fn new(name: &str, pattern: &str) -> Result<Self, MatchError> {
        let regex = Regex::new(pattern).map_err(|source| MatchError::InvalidRegex {
            name: name.to_string(),
            source,
        })?;
        Ok(RegexMatcher { regex })
    }
}

impl Matcher for RegexMatcher {
    fn capture<'a>(&self, request: &MatchRequest<'a>) -> Result<Option<Capture<'a>>, MatchError> {
        let regex = self.regex.clone();
        select_by_boundary(request, move |candidate| Ok(regex.is_match(candidate)))
    }
}
