pub mod input_type;

use std::fmt;

use serde::Serialize;

use crate::pattern::input_type::InputType;

/// A compiled template: an ordered sequence of grammar nodes.
///
/// Patterns are owned, acyclic trees. Nothing mutates them once the compiler
/// hands them out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Pattern {
    pub tokens: Vec<Token>,
}

impl Pattern {
    pub fn new(tokens: Vec<Token>) -> Self {
        Pattern { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// Visit every variable in the tree, including those inside nested
    /// `match` sub-patterns.
    pub fn visit_variables<'a>(&'a self, visit: &mut dyn FnMut(&'a Variable)) {
        for token in &self.tokens {
            match token {
                Token::Text(_) => {}
                Token::Variable(variable) => {
                    visit(variable);
                    if let Some(sub) = &variable.pattern {
                        sub.visit_variables(visit);
                    }
                }
                Token::Optional(body) => body.visit_variables(visit),
                Token::Variational(branches) | Token::AnyOrder(branches) => {
                    for branch in branches {
                        branch.visit_variables(visit);
                    }
                }
            }
        }
    }
}

impl<'a> IntoIterator for &'a Pattern {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// One grammar node of a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Token {
    /// Literal text, matched case-insensitively: `hello`
    Text(String),
    /// Capture site: `{name:type}`
    Variable(Variable),
    /// Body may be present or absent: `[...]`
    Optional(Pattern),
    /// Exactly one branch is chosen: `(a|b)`
    Variational(Vec<Pattern>),
    /// Every branch occurs once, in any order: `<a|b>`
    AnyOrder(Vec<Pattern>),
}

/// A capture site inside a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Variable {
    /// `None` consumes input without producing a field, except for
    /// [`InputType::Database`] which is always captured.
    pub name: Option<String>,
    pub input_type: InputType,
    /// Nested grammar, present exactly when `input_type` is [`InputType::Match`].
    pub pattern: Option<Pattern>,
}

impl Variable {
    pub fn new(name: Option<String>, input_type: InputType) -> Self {
        Variable {
            name,
            input_type,
            pattern: None,
        }
    }

    pub fn with_pattern(name: Option<String>, pattern: Pattern) -> Self {
        Variable {
            name,
            input_type: InputType::Match,
            pattern: Some(pattern),
        }
    }

    /// Whether a successful capture of this variable produces a field.
    pub fn is_captured(&self) -> bool {
        self.name.is_some() || self.input_type == InputType::Database
    }
}

// ---------------------------------------------------------------------------
// Rendering back to template syntax
// ---------------------------------------------------------------------------

const SPECIAL: &[char] = &['{', '}', '[', ']', '(', ')', '<', '>', '|', '\\'];

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str, extra: &[char]) -> fmt::Result {
    for c in s.chars() {
        if SPECIAL.contains(&c) || extra.contains(&c) {
            write!(f, "\\")?;
        }
        write!(f, "{}", c)?;
    }
    Ok(())
}

fn write_branches(f: &mut fmt::Formatter<'_>, branches: &[Pattern]) -> fmt::Result {
    for (i, branch) in branches.iter().enumerate() {
        if i > 0 {
            write!(f, "|")?;
        }
        write!(f, "{}", branch)?;
    }
    Ok(())
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(text) => write_escaped(f, text, &[]),
            Token::Variable(variable) => write!(f, "{}", variable),
            Token::Optional(body) => write!(f, "[{}]", body),
            Token::Variational(branches) => {
                write!(f, "(")?;
                write_branches(f, branches)?;
                write!(f, ")")
            }
            Token::AnyOrder(branches) => {
                write!(f, "<")?;
                write_branches(f, branches)?;
                write!(f, ">")
            }
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.input_type == InputType::Database {
            return write!(f, "{{database}}");
        }
        write!(f, "{{")?;
        if let Some(name) = &self.name {
            write_escaped(f, name, &[':'])?;
        }
        match (&self.input_type, &self.pattern) {
            (InputType::Text, _) => {}
            (InputType::Match, Some(sub)) => {
                let rendered = sub.to_string();
                // A sub-pattern spelled like a type name must not read back as one.
                if InputType::from_builtin_name(&rendered).is_some() {
                    write!(f, ":\\{}", rendered)?;
                } else {
                    write!(f, ":{}", rendered)?;
                }
            }
            (other, _) => write!(f, ":{}", other)?,
        }
        write!(f, "}}")
    }
}
