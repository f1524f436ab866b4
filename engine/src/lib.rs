pub mod caseless;
pub mod combination;
pub mod error;
pub mod field;
pub mod matchers;
pub mod pattern;

pub use combination::{expand, Combination, Segment};
pub use error::MatchError;
pub use field::{Field, FieldValue, MatchResult};
pub use matchers::{
    BoundaryMatcher, Capture, MatchRequest, Matcher, MatcherRegistry, RegexMatcher,
    SubPatternMatcher,
};
pub use pattern::{match_combinations, match_pattern};
