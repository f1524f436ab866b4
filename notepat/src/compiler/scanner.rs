use std::ops::Range;

use crate::compiler::error::CompileError;
use crate::pattern::input_type::InputType;
use crate::pattern::{Pattern, Token, Variable};

/// The four bracketed scopes of the template grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Variable,
    Optional,
    Variational,
    AnyOrder,
}

impl Scope {
    fn opened_by(c: char) -> Option<Scope> {
        match c {
            '{' => Some(Scope::Variable),
            '[' => Some(Scope::Optional),
            '(' => Some(Scope::Variational),
            '<' => Some(Scope::AnyOrder),
            _ => None,
        }
    }

    fn closed_by(c: char) -> Option<Scope> {
        match c {
            '}' => Some(Scope::Variable),
            ']' => Some(Scope::Optional),
            ')' => Some(Scope::Variational),
            '>' => Some(Scope::AnyOrder),
            _ => None,
        }
    }

    fn opener(self) -> char {
        match self {
            Scope::Variable => '{',
            Scope::Optional => '[',
            Scope::Variational => '(',
            Scope::AnyOrder => '<',
        }
    }

    fn closer(self) -> char {
        match self {
            Scope::Variable => '}',
            Scope::Optional => ']',
            Scope::Variational => ')',
            Scope::AnyOrder => '>',
        }
    }
}

/// An open bracket awaiting its closer.
struct OpenScope {
    scope: Scope,
    /// Byte offset of the opening bracket.
    at: usize,
    /// Number of errors recorded when the scope was opened.
    errors_before: usize,
}

pub(crate) struct Scanner<'a> {
    source: &'a str,
    file_id: usize,
    custom_types: &'a [String],
    pub(crate) errors: Vec<CompileError>,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(source: &'a str, file_id: usize, custom_types: &'a [String]) -> Self {
        Scanner {
            source,
            file_id,
            custom_types,
            errors: Vec::new(),
        }
    }

    /// Compile `source[range]` into a pattern. Spans in recorded errors are
    /// absolute offsets into the whole template.
    pub(crate) fn compile_range(&mut self, range: Range<usize>) -> Pattern {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut stack: Vec<OpenScope> = Vec::new();
        let source = self.source;
        let mut chars = source[range.clone()].char_indices();

        while let Some((offset, c)) = chars.next() {
            let at = range.start + offset;

            if c == '\\' {
                let escaped = chars.next();
                if stack.is_empty() {
                    literal.push(escaped.map_or('\\', |(_, next)| next));
                }
                continue;
            }

            if let Some(scope) = Scope::opened_by(c) {
                if stack.is_empty() && !literal.is_empty() {
                    tokens.push(Token::Text(std::mem::take(&mut literal)));
                }
                stack.push(OpenScope {
                    scope,
                    at,
                    errors_before: self.errors.len(),
                });
                continue;
            }

            if let Some(scope) = Scope::closed_by(c) {
                let Some(open) = stack.pop() else {
                    self.errors.push(
                        CompileError::new(format!("unexpected '{}'", c), at..at + 1, self.file_id)
                            .with_note(format!(
                                "write '\\{}' to match a literal '{}'",
                                c, c
                            )),
                    );
                    continue;
                };

                if open.scope != scope {
                    self.errors.push(
                        CompileError::new(
                            format!(
                                "expected '{}' but found '{}'",
                                open.scope.closer(),
                                c
                            ),
                            at..at + 1,
                            self.file_id,
                        )
                        .with_note(format!(
                            "'{}' opened at offset {}",
                            open.scope.opener(),
                            open.at
                        )),
                    );
                    continue;
                }

                if stack.is_empty() && self.errors.len() == open.errors_before {
                    if let Some(token) = self.build_scope(open.scope, open.at + 1..at) {
                        tokens.push(token);
                    }
                }
                continue;
            }

            if stack.is_empty() {
                literal.push(c);
            }
        }

        for open in &stack {
            self.errors.push(
                CompileError::new(
                    format!("unclosed '{}'", open.scope.opener()),
                    open.at..open.at + 1,
                    self.file_id,
                )
                .with_note(format!("expected a matching '{}'", open.scope.closer())),
            );
        }

        if !literal.is_empty() {
            tokens.push(Token::Text(literal));
        }

        Pattern::new(tokens)
    }

    fn build_scope(&mut self, scope: Scope, content: Range<usize>) -> Option<Token> {
        match scope {
            Scope::Variable => self.build_variable(content).map(Token::Variable),
            Scope::Optional => Some(Token::Optional(self.compile_range(content))),
            Scope::Variational => Some(Token::Variational(self.build_branches(content))),
            Scope::AnyOrder => Some(Token::AnyOrder(self.build_branches(content))),
        }
    }

    fn build_branches(&mut self, content: Range<usize>) -> Vec<Pattern> {
        split_top_level(self.source, content, '|')
            .into_iter()
            .map(|branch| self.compile_range(branch))
            .collect()
    }

    fn build_variable(&mut self, content: Range<usize>) -> Option<Variable> {
        let source = self.source;
        let mut parts = split_top_level(source, content.clone(), ':').into_iter();
        let name_range = parts.next().unwrap_or(content.clone());
        let type_range = parts.next().map(|first| first.start..content.end);

        let name = unescape(&source[name_range]);
        if name == "database" {
            return Some(Variable::new(None, InputType::Database));
        }
        let name = if name.is_empty() { None } else { Some(name) };

        let Some(type_range) = type_range else {
            return Some(Variable::new(name, InputType::Text));
        };

        // Include the braces so the label covers the whole variable.
        let span = content.start - 1..content.end + 1;
        let raw = &source[type_range.clone()];

        if raw.is_empty() {
            self.errors.push(
                CompileError::new("missing input type after ':'", span, self.file_id)
                    .with_note("remove the ':' to capture free text"),
            );
            return None;
        }

        match InputType::from_builtin_name(raw) {
            Some(InputType::Match) => {
                self.errors.push(
                    CompileError::new("input type 'match' needs a sub-pattern", span, self.file_id)
                        .with_note("write the sub-pattern itself after ':', e.g. {qty:{n:number} kg}"),
                );
                None
            }
            Some(input_type) => Some(Variable::new(name, input_type)),
            None if self.custom_types.iter().any(|t| t == raw) => {
                Some(Variable::new(name, InputType::Custom(raw.to_string())))
            }
            None => {
                let sub = self.compile_range(type_range);
                Some(Variable::with_pattern(name, sub))
            }
        }
    }
}

/// Split `source[range]` on `separator` occurrences that are neither escaped
/// nor inside brackets. Always returns at least one (possibly empty) range.
fn split_top_level(source: &str, range: Range<usize>, separator: char) -> Vec<Range<usize>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut part_start = range.start;
    let mut chars = source[range.clone()].char_indices();

    while let Some((offset, c)) = chars.next() {
        let at = range.start + offset;
        if c == '\\' {
            chars.next();
        } else if Scope::opened_by(c).is_some() {
            depth += 1;
        } else if Scope::closed_by(c).is_some() {
            depth = depth.saturating_sub(1);
        } else if c == separator && depth == 0 {
            parts.push(part_start..at);
            part_start = at + c.len_utf8();
        }
    }

    parts.push(part_start..range.end);
    parts
}

/// Resolve backslash escapes: `\x` becomes `x`, a trailing `\` stays.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            out.push(chars.next().unwrap_or('\\'));
        } else {
            out.push(c);
        }
    }
    out
}
