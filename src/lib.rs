//! Front end for a small Ruby-like language: source text is tokenized,
//! parsed into an AST and lowered to instruction sets for a stack VM.
//!
//! ```
//! use garnet::{ParserMode, compile_to_bytecode};
//!
//! let listing = compile_to_bytecode("1 + 2", ParserMode::Test).unwrap();
//! assert_eq!(listing, "<ProgramStart>\n0 putobject 1\n1 putobject 2\n2 send + 1\n3 leave");
//! ```

pub mod ast;
pub mod bytecode;
pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod token;

pub use bytecode::{CompileError, Generator, InstructionSet};
pub use lexer::Lexer;
pub use parser::{Parser, ParserMode};
pub use parser_error::{ParserError, ParserErrorKind};

/// Lexes, parses and compiles `source` into instruction sets. `Repl` mode
/// also keeps the program's last value by skipping its final `leave`.
pub fn compile_to_instructions(
    source: &str,
    mode: ParserMode,
) -> Result<Vec<InstructionSet>, CompileError> {
    let mut parser = Parser::new(Lexer::new(source), mode);
    let program = parser.parse_program()?;

    let mut generator = Generator::with_repl(mode == ParserMode::Repl);
    generator.init_top_level_scope(&program);
    generator.generate(&program.statements)
}

/// Like `compile_to_instructions`, rendered as the textual listing.
pub fn compile_to_bytecode(source: &str, mode: ParserMode) -> Result<String, CompileError> {
    let sets = compile_to_instructions(source, mode)?;
    Ok(bytecode::disasm::render(&sets))
}
