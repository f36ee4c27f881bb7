pub mod ast;
pub mod codegen;
pub mod frontend;

use thiserror::Error;

pub use codegen::{CodegenOptions, JasminAsm, LimitStrategy};

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Lexical error: {0}")]
    Lexical(#[from] frontend::lexer::LexicalError),

    #[error("Parse error ({line}:{col}): {message}\n  Context: {context}")]
    Parse {
        line: usize,
        col: usize,
        context: String,
        message: String,
    },

    #[error("CodegenError:{kind} - {message}")]
    Codegen {
        kind: CodegenErrorKind,
        message: String,
    },
}

impl CompileError {
    pub fn codegen(kind: CodegenErrorKind, message: impl Into<String>) -> Self {
        CompileError::Codegen {
            kind,
            message: message.into(),
        }
    }

    /// The code generation failure kind, if this error came from the back end.
    pub fn codegen_kind(&self) -> Option<CodegenErrorKind> {
        match self {
            CompileError::Codegen { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodegenErrorKind {
    UnknownOperator,
    UndeclaredVariable,
    UnknownFunction,
    InvalidLvalue,
    NonBooleanCondition,
    InternalDispatch,
    ReturnOutsideFunction,
    StorageExhausted,
}

impl std::fmt::Display for CodegenErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodegenErrorKind::UnknownOperator => write!(f, "UnknownOperator"),
            CodegenErrorKind::UndeclaredVariable => write!(f, "UndeclaredVariable"),
            CodegenErrorKind::UnknownFunction => write!(f, "UnknownFunction"),
            CodegenErrorKind::InvalidLvalue => write!(f, "InvalidLvalue"),
            CodegenErrorKind::NonBooleanCondition => write!(f, "NonBooleanCondition"),
            CodegenErrorKind::InternalDispatch => write!(f, "InternalDispatch"),
            CodegenErrorKind::ReturnOutsideFunction => write!(f, "ReturnOutsideFunction"),
            CodegenErrorKind::StorageExhausted => write!(f, "StorageExhausted"),
        }
    }
}

/// Parse C-- source text into an AST.
pub fn parse(source: &str) -> Result<ast::Program, CompileError> {
    frontend::parse(source)
}

/// Compile C-- source text to Jasmin assembly with default options.
pub fn compile(source: &str, base_name: &str) -> Result<String, CompileError> {
    let options = CodegenOptions::new(base_name);
    Ok(compile_with_options(source, &options)?.join())
}

/// Compile C-- source text to Jasmin assembly lines.
pub fn compile_with_options(
    source: &str,
    options: &CodegenOptions,
) -> Result<JasminAsm, CompileError> {
    let program = parse(source)?;
    codegen::generate(&program, options)
}
