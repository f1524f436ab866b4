use crate::caseless::find_all_ignore_case;
use crate::error::MatchError;
use crate::matchers::{Capture, MatchRequest};

/// Propose captures that end where the following literal begins.
///
/// The remaining input is split on every case-insensitive occurrence of the
/// literal after this variable. Candidate prefixes run from the rightmost
/// occurrence leftward, so the longest capture is tried first; only those
/// passing `validate` are produced. Without a following literal the whole
/// remaining input is the only candidate. Empty captures are never proposed.
pub fn select_by_boundary<'a, V>(
    request: &MatchRequest<'a>,
    mut validate: V,
) -> Result<Option<Capture<'a>>, MatchError>
where
    V: FnMut(&str) -> Result<bool, MatchError> + 'a,
{
    let remaining = request.remaining;

    let Some(boundary) = request.following_text() else {
        if !remaining.is_empty() && validate(remaining)? {
            return Ok(Some(Capture::Single(remaining)));
        }
        return Ok(None);
    };

    let ends = find_all_ignore_case(remaining, boundary);
    if ends.is_empty() {
        return Ok(None);
    }

    Ok(Some(Capture::Candidates(Box::new(BoundaryCandidates {
        remaining,
        ends,
        validate,
    }))))
}

struct BoundaryCandidates<'a, V> {
    remaining: &'a str,
    /// Byte offsets where the following literal starts, ascending.
    ends: Vec<usize>,
    validate: V,
}

impl<'a, V> Iterator for BoundaryCandidates<'a, V>
where
    V: FnMut(&str) -> Result<bool, MatchError>,
{
    type Item = Result<&'a str, MatchError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(end) = self.ends.pop() {
            if end == 0 {
                continue;
            }
            let candidate = &self.remaining[..end];
            match (self.validate)(candidate) {
                Ok(true) => return Some(Ok(candidate)),
                Ok(false) => {}
                Err(err) => {
                    self.ends.clear();
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use notepat::{InputType, Variable};

    use super::*;
    use crate::combination::Segment;
    use crate::matchers::MatcherRegistry;

    fn candidates(remaining: &str, following: Option<&str>, validate: fn(&str) -> bool) -> Vec<String> {
        let variable = Variable::new(Some("v".into()), InputType::Text);
        let following: Vec<Segment> = following
            .map(|text| vec![Segment::Text(text.to_string())])
            .unwrap_or_default();
        let registry = MatcherRegistry::empty();
        let request = MatchRequest {
            remaining,
            variable: &variable,
            following: &following,
            matchers: &registry,
        };
        match select_by_boundary(&request, move |c| Ok(validate(c))).expect("no error") {
            None => Vec::new(),
            Some(Capture::Single(value)) => vec![value.to_string()],
            Some(Capture::Candidates(iter)) => iter
                .map(|c| c.expect("no error").to_string())
                .collect(),
        }
    }

    #[test]
    fn longest_candidate_comes_first() {
        assert_eq!(
            candidates("x and y and z", Some(" and "), |_| true),
            vec!["x and y", "x"]
        );
    }

    #[test]
    fn validator_filters_candidates() {
        assert_eq!(
            candidates("a #b #c #d my note", Some(" "), |s| !s.contains(' ')),
            vec!["a"]
        );
    }

    #[test]
    fn no_following_literal_takes_everything() {
        assert_eq!(candidates("rest of it", None, |_| true), vec!["rest of it"]);
        assert!(candidates("", None, |_| true).is_empty());
        assert!(candidates("two words", None, |s| !s.contains(' ')).is_empty());
    }

    #[test]
    fn missing_literal_means_no_capture() {
        assert!(candidates("abc", Some("#"), |_| true).is_empty());
    }

    #[test]
    fn empty_prefix_is_skipped() {
        assert_eq!(candidates(" x y", Some(" "), |_| true), vec![" x"]);
    }
}
