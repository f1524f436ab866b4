use notepat::InputType;

/// Configuration errors raised while matching. These indicate broken
/// template or matcher wiring, never bad input: input that does not fit a
/// template is reported as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("no matcher registered for input type '{0}'")]
    MissingMatcher(InputType),

    #[error("variable '{}' has input type 'match' but no sub-pattern", .0.as_deref().unwrap_or("_"))]
    MissingSubPattern(Option<String>),

    #[error("invalid regex for input type '{name}': {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: regex::Error,
    },
}
