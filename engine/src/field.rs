use std::fmt;
use std::ops::Range;

use notepat::InputType;
use serde::Serialize;

use crate::combination::Combination;

/// The captured value of a field. A name captured more than once within
/// one combination collects into a list, in capture order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    List(Vec<String>),
}

impl FieldValue {
    fn push(&mut self, value: String) {
        match self {
            FieldValue::Single(first) => {
                *self = FieldValue::List(vec![std::mem::take(first), value]);
            }
            FieldValue::List(values) => values.push(value),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            FieldValue::Single(value) => Some(value),
            FieldValue::List(_) => None,
        }
    }

    /// All captured values, in capture order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Single(value) => vec![value.as_str()],
            FieldValue::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Single(value) => write!(f, "{}", value),
            FieldValue::List(values) => write!(f, "[{}]", values.join(", ")),
        }
    }
}

/// One extracted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: Option<String>,
    pub input_type: InputType,
    pub value: FieldValue,
}

/// A successful match: the fields, the reading that matched, and the byte
/// ranges of every kept capture in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub fields: Vec<Field>,
    pub combination: Option<Combination>,
    pub spans: Vec<Range<usize>>,
}

impl MatchResult {
    pub(crate) fn new() -> Self {
        MatchResult {
            fields: Vec::new(),
            combination: None,
            spans: Vec::new(),
        }
    }

    /// Record a capture, appending to an existing field of the same name.
    pub(crate) fn capture(
        &mut self,
        name: Option<&String>,
        input_type: &InputType,
        value: &str,
        span: Range<usize>,
    ) {
        self.spans.push(span);
        match self.fields.iter_mut().find(|field| field.name.as_ref() == name) {
            Some(field) => field.value.push(value.to_string()),
            None => self.fields.push(Field {
                name: name.cloned(),
                input_type: input_type.clone(),
                value: FieldValue::Single(value.to_string()),
            }),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|field| field.name.as_deref() == Some(name))
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.field(name).map(|field| &field.value)
    }

    /// Re-render `input` with every captured value wrapped in `open`/`close`.
    /// `input` must be the text this result was produced from.
    pub fn highlight(&self, input: &str, open: &str, close: &str) -> String {
        let mut out = String::with_capacity(input.len());
        let mut at = 0;
        for span in &self.spans {
            let (Some(before), Some(value)) = (input.get(at..span.start), input.get(span.clone()))
            else {
                continue;
            };
            out.push_str(before);
            out.push_str(open);
            out.push_str(value);
            out.push_str(close);
            at = span.end;
        }
        out.push_str(input.get(at..).unwrap_or_default());
        out
    }
}
