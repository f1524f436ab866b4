pub mod error;
mod scanner;

pub use error::CompileError;

use crate::pattern::Pattern;
use crate::compiler::scanner::Scanner;

/// Template compiler entry point.
pub struct Compiler {
    source: String,
    file_id: usize,
    custom_types: Vec<String>,
}

impl Compiler {
    pub fn new(source: impl Into<String>, file_id: usize) -> Self {
        Compiler {
            source: source.into(),
            file_id,
            custom_types: Vec::new(),
        }
    }

    /// Names that resolve to [`InputType::Custom`](crate::InputType::Custom)
    /// after `:` instead of being compiled as a literal sub-pattern.
    pub fn with_custom_types<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.custom_types.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compile the template into a Pattern. Malformed bracket nesting is
    /// reported as errors, never as a partial pattern.
    pub fn compile(&self) -> Result<Pattern, Vec<CompileError>> {
        let mut scanner = Scanner::new(&self.source, self.file_id, &self.custom_types);
        let pattern = scanner.compile_range(0..self.source.len());
        if scanner.errors.is_empty() {
            Ok(pattern)
        } else {
            Err(scanner.errors)
        }
    }
}
