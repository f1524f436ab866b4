use std::ops::Range;

use notepat::{Pattern, Variable};

use crate::caseless::strip_prefix_ignore_case;
use crate::combination::{expand, Combination, Segment};
use crate::error::MatchError;
use crate::field::MatchResult;
use crate::matchers::{Capture, Candidates, MatchRequest, MatcherRegistry};

/// Attempt to match `input` against a compiled pattern.
///
/// Returns `Ok(Some(result))` for the first ranked reading that consumes the
/// whole input, `Ok(None)` if no reading does. Errors are configuration
/// problems (a variable whose input type has no matcher) and abort the whole
/// match.
pub fn match_pattern(
    input: &str,
    pattern: &Pattern,
    matchers: &MatcherRegistry,
) -> Result<Option<MatchResult>, MatchError> {
    matchers.validate(pattern)?;
    let combinations = expand(pattern);
    match_combinations(input, &combinations, matchers)
}

/// Attempt to match `input` against already-expanded combinations, in order.
pub fn match_combinations(
    input: &str,
    combinations: &[Combination],
    matchers: &MatcherRegistry,
) -> Result<Option<MatchResult>, MatchError> {
    for (rank, combination) in combinations.iter().enumerate() {
        let mut captures = Vec::new();
        let walk = Walk {
            input_len: input.len(),
            matchers,
        };
        if walk.match_inner(&combination.segments, input, &mut captures)? {
            tracing::debug!(rank, score = combination.score, "combination accepted");
            let mut result = MatchResult::new();
            for captured in captures {
                if captured.variable.is_captured() {
                    result.capture(
                        captured.variable.name.as_ref(),
                        &captured.variable.input_type,
                        &input[captured.span.clone()],
                        captured.span,
                    );
                }
            }
            result.combination = Some(combination.clone());
            return Ok(Some(result));
        }
        tracing::trace!(rank, score = combination.score, "combination rejected");
    }
    Ok(None)
}

struct Captured<'a> {
    variable: &'a Variable,
    span: Range<usize>,
}

struct Walk<'a> {
    input_len: usize,
    matchers: &'a MatcherRegistry,
}

impl<'a> Walk<'a> {
    /// Match `segments` against `remaining`, backtracking over candidate
    /// captures. Succeeds only if the input is consumed exactly.
    fn match_inner(
        &self,
        segments: &'a [Segment],
        remaining: &'a str,
        captures: &mut Vec<Captured<'a>>,
    ) -> Result<bool, MatchError> {
        let Some((first, rest)) = segments.split_first() else {
            return Ok(remaining.is_empty());
        };

        let variable = match first {
            Segment::Text(text) => {
                return match strip_prefix_ignore_case(remaining, text) {
                    Some(after) => self.match_inner(rest, after, captures),
                    None => Ok(false),
                };
            }
            Segment::Variable(variable) => variable,
        };

        let matcher = self.matchers.get(&variable.input_type)?;
        let request = MatchRequest {
            remaining,
            variable,
            following: rest,
            matchers: self.matchers,
        };
        let candidates: Candidates<'a> = match matcher.capture(&request)? {
            None => return Ok(false),
            Some(Capture::Single(value)) => Box::new(std::iter::once(Ok(value))),
            Some(Capture::Candidates(candidates)) => candidates,
        };

        let start = self.input_len - remaining.len();
        let depth = captures.len();
        for candidate in candidates {
            let candidate = candidate?;
            let Some(after) = remaining.strip_prefix(candidate) else {
                tracing::warn!(
                    input_type = %variable.input_type,
                    candidate,
                    "matcher proposed a capture that is not a prefix of the input"
                );
                continue;
            };
            tracing::trace!(input_type = %variable.input_type, candidate, "trying capture");
            captures.push(Captured {
                variable,
                span: start..start + candidate.len(),
            });
            if self.match_inner(rest, after, captures)? {
                return Ok(true);
            }
            captures.truncate(depth);
        }
        Ok(false)
    }
}
