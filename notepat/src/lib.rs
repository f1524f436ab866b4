pub mod compiler;
pub mod pattern;

pub use compiler::{CompileError, Compiler};
pub use pattern::input_type::InputType;
pub use pattern::{Pattern, Token, Variable};

/// Compile a template string with no custom input types.
pub fn compile(template: &str) -> Result<Pattern, Vec<CompileError>> {
    Compiler::new(template, 0).compile()
}
