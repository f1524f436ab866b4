//! Expansion of a pattern tree into its linear readings.
//!
//! Every optional, variational and any-order node is resolved, yielding a
//! list of [`Combination`]s that contain only literal text and variables.
//! The list is ranked by score so that specific readings (long literals,
//! typed variables) are tried before generic free-text ones.

use std::collections::HashSet;
use std::fmt;

use notepat::{Pattern, Token, Variable};
use serde::Serialize;

/// Any-order groups larger than this are logged, since their readings grow
/// factorially.
const LARGE_ANY_ORDER: usize = 6;

/// One element of a fully-resolved reading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Segment {
    Text(String),
    Variable(Variable),
}

impl Segment {
    pub fn is_variable(&self) -> bool {
        matches!(self, Segment::Variable(_))
    }

    fn score(&self) -> u32 {
        match self {
            Segment::Text(text) => text.chars().count() as u32 * 2,
            Segment::Variable(variable) => variable.input_type.score_weight(),
        }
    }
}

/// A linear reading of a pattern together with its ranking score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Combination {
    pub segments: Vec<Segment>,
    pub score: u32,
}

impl Combination {
    /// Build a combination from raw segments, merging adjacent text.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let segments = simplify(segments);
        let score = segments.iter().map(Segment::score).sum();
        Combination { segments, score }
    }

    /// Two variables side by side leave their boundary undecidable.
    pub fn has_adjacent_variables(&self) -> bool {
        self.segments
            .windows(2)
            .any(|pair| pair[0].is_variable() && pair[1].is_variable())
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Variable(variable) => Some(variable),
            Segment::Text(_) => None,
        })
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => write!(f, "{}", text)?,
                Segment::Variable(variable) => write!(f, "{}", variable)?,
            }
        }
        Ok(())
    }
}

type Reading = Vec<Segment>;

/// Enumerate every reading of `pattern`, ranked by descending score.
///
/// Ties keep enumeration order. Readings with adjacent variables are dropped
/// and duplicates are removed, keeping the first occurrence.
pub fn expand(pattern: &Pattern) -> Vec<Combination> {
    let readings = pattern_readings(pattern);
    let total = readings.len();

    let mut combinations: Vec<Combination> = readings
        .into_iter()
        .map(Combination::from_segments)
        .collect();
    combinations.sort_by(|a, b| b.score.cmp(&a.score));
    combinations.retain(|combination| !combination.has_adjacent_variables());

    let mut seen = HashSet::new();
    combinations.retain(|combination| seen.insert(combination.segments.clone()));

    tracing::debug!(
        readings = total,
        combinations = combinations.len(),
        "expanded pattern"
    );
    combinations
}

fn pattern_readings(pattern: &Pattern) -> Vec<Reading> {
    pattern
        .iter()
        .fold(vec![Vec::new()], |acc, token| cross(&acc, &token_readings(token)))
}

fn token_readings(token: &Token) -> Vec<Reading> {
    match token {
        Token::Text(text) => vec![vec![Segment::Text(text.clone())]],
        Token::Variable(variable) => vec![vec![Segment::Variable(variable.clone())]],
        Token::Optional(body) => {
            let mut readings = vec![Vec::new()];
            readings.extend(pattern_readings(body));
            readings
        }
        Token::Variational(branches) => branches.iter().flat_map(pattern_readings).collect(),
        Token::AnyOrder(branches) => any_order_readings(branches),
    }
}

/// Cartesian product: every left reading followed by every right reading.
fn cross(left: &[Reading], right: &[Reading]) -> Vec<Reading> {
    let mut out = Vec::with_capacity(left.len() * right.len());
    for l in left {
        for r in right {
            let mut joined = l.clone();
            joined.extend(r.iter().cloned());
            out.push(joined);
        }
    }
    out
}

fn any_order_readings(branches: &[Pattern]) -> Vec<Reading> {
    if branches.len() > LARGE_ANY_ORDER {
        tracing::warn!(
            branches = branches.len(),
            "any-order group expands factorially"
        );
    }

    // One reading per branch, in every combination.
    let squashed = branches.iter().fold(vec![Vec::new()], |acc, branch| {
        let readings = pattern_readings(branch);
        let mut next = Vec::with_capacity(acc.len() * readings.len());
        for tuple in &acc {
            for reading in &readings {
                let mut tuple: Vec<Reading> = tuple.clone();
                tuple.push(reading.clone());
                next.push(tuple);
            }
        }
        next
    });

    let orders = permutations(branches.len());
    let mut out = Vec::with_capacity(squashed.len() * orders.len());
    for tuple in &squashed {
        for order in &orders {
            out.push(order.iter().flat_map(|&i| tuple[i].iter().cloned()).collect());
        }
    }
    out
}

/// All orderings of `0..n`, lexicographic.
fn permutations(n: usize) -> Vec<Vec<usize>> {
    fn extend(prefix: &mut Vec<usize>, used: &mut [bool], out: &mut Vec<Vec<usize>>) {
        if prefix.len() == used.len() {
            out.push(prefix.clone());
            return;
        }
        for i in 0..used.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            prefix.push(i);
            extend(prefix, used, out);
            prefix.pop();
            used[i] = false;
        }
    }

    let mut out = Vec::new();
    extend(&mut Vec::with_capacity(n), &mut vec![false; n], &mut out);
    out
}

/// Merge adjacent text segments and drop empty ones.
fn simplify(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match (out.last_mut(), segment) {
            (_, Segment::Text(text)) if text.is_empty() => {}
            (Some(Segment::Text(prev)), Segment::Text(text)) => prev.push_str(&text),
            (_, segment) => out.push(segment),
        }
    }
    out
}
