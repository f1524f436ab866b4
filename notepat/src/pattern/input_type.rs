use std::fmt;

use serde::{Serialize, Serializer};

/// The kind of value a variable captures. Each input type has a ranking
/// weight and is served by one matcher at match time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputType {
    /// Free text, any characters.
    Text,
    /// A single run of non-whitespace.
    Word,
    Number,
    Url,
    Email,
    Phone,
    /// A word that is always captured, even without a variable name.
    Database,
    /// Captured text must match the variable's own nested pattern.
    Match,
    /// An input type supplied by a plugin matcher, e.g. a locale date parser.
    Custom(String),
}

impl InputType {
    /// All built-in input types, in declaration order.
    pub const BUILTIN: [InputType; 8] = [
        InputType::Text,
        InputType::Word,
        InputType::Number,
        InputType::Url,
        InputType::Email,
        InputType::Phone,
        InputType::Database,
        InputType::Match,
    ];

    /// Look up a built-in input type by its template name (`word`, `number`, ...).
    pub fn from_builtin_name(name: &str) -> Option<InputType> {
        match name {
            "text" => Some(InputType::Text),
            "word" => Some(InputType::Word),
            "number" => Some(InputType::Number),
            "url" => Some(InputType::Url),
            "email" => Some(InputType::Email),
            "phone" => Some(InputType::Phone),
            "database" => Some(InputType::Database),
            "match" => Some(InputType::Match),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            InputType::Text => "text",
            InputType::Word => "word",
            InputType::Number => "number",
            InputType::Url => "url",
            InputType::Email => "email",
            InputType::Phone => "phone",
            InputType::Database => "database",
            InputType::Match => "match",
            InputType::Custom(name) => name,
        }
    }

    /// Ranking weight of a variable of this type inside a combination.
    /// Specific types outrank free text so they are tried first.
    pub fn score_weight(&self) -> u32 {
        match self {
            InputType::Text => 1,
            InputType::Word | InputType::Database => 2,
            InputType::Url
            | InputType::Email
            | InputType::Phone
            | InputType::Number
            | InputType::Match
            | InputType::Custom(_) => 3,
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, InputType::Custom(_))
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Serialize for InputType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
