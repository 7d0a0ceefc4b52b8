//! calc: an arithmetic expression compiler, a binary archive format for the
//! compiled program, and a stack VM that runs it.
//!
//! ```text
//! source --lexer--> tokens --parser--> Expr --compiler--> Program --vm--> f64
//!                                                            |  ^
//!                                                     archive::serialize / deserialize
//! ```
//!
//! Every stage is a pure function of its inputs. The [`builtins::Builtins`]
//! registry is the only shared input and is read-only once built.

pub mod archive;
pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod vm;

use builtins::Builtins;

/// Any failure along the pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] parser::ParseError),
    #[error(transparent)]
    Compile(#[from] compiler::CompileError),
    #[error(transparent)]
    Archive(#[from] archive::ArchiveError),
    #[error(transparent)]
    Runtime(#[from] vm::VmError),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Parse(e) => e.code(),
            Error::Compile(e) => e.code(),
            Error::Archive(e) => e.code(),
            Error::Runtime(e) => e.code(),
        }
    }
}

/// Parse and compile `source` without running it.
pub fn compile_source(source: &str, builtins: &Builtins) -> Result<vm::Program, Error> {
    let expr = parser::parse(source)?;
    Ok(compiler::compile(&expr, builtins)?)
}

/// Parse, compile and run `source`.
pub fn evaluate(source: &str, builtins: &Builtins) -> Result<f64, Error> {
    let program = compile_source(source, builtins)?;
    Ok(vm::run(&program, builtins)?)
}

/// Parse and compile `source` into archive bytes.
pub fn build(source: &str, builtins: &Builtins) -> Result<Vec<u8>, Error> {
    let program = compile_source(source, builtins)?;
    Ok(archive::serialize(&program))
}

/// Load archive bytes and run them.
pub fn execute(bytes: &[u8], builtins: &Builtins) -> Result<f64, Error> {
    let program = archive::deserialize(bytes)?;
    Ok(vm::run(&program, builtins)?)
}
