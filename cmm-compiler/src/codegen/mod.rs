//! Jasmin code generation.
//!
//! Lowers a parsed [`Program`] straight to JVM assembly for a single class.
//! All values live in method locals; numbers are `float`, booleans are `int`
//! 0/1 and strings are `java/lang/String` references.

pub mod context;
pub mod expr;
pub mod instruction;
pub mod limits;
pub mod program;
pub mod scope;
pub mod stmt;
pub mod types;

pub use context::Gen;
pub use instruction::{AsmItem, JvmInstr};
pub use limits::LimitStrategy;
pub use types::ValueType;

use crate::ast::Program;
use crate::CompileError;

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Class name; also the owner of every `invokestatic`.
    pub base_name: String,
    pub limits: LimitStrategy,
}

impl CodegenOptions {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            limits: LimitStrategy::default(),
        }
    }

    pub fn with_limits(mut self, limits: LimitStrategy) -> Self {
        self.limits = limits;
        self
    }
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self::new("a")
    }
}

// ============================================================================
// Output type
// ============================================================================

/// A generated class: typed items plus their rendered lines.
#[derive(Debug, Clone)]
pub struct JasminAsm {
    pub items: Vec<AsmItem>,
    pub lines: Vec<String>,
}

impl JasminAsm {
    pub fn from_items(items: Vec<AsmItem>) -> Self {
        let lines = items.iter().map(ToString::to_string).collect();
        Self { items, lines }
    }

    pub fn join(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

/// Generate the Jasmin class for `program`.
pub fn generate(program: &Program, options: &CodegenOptions) -> Result<JasminAsm, CompileError> {
    let mut gen = Gen::new(options);
    gen.lower_program(program)?;
    let asm = JasminAsm::from_items(gen.finish());
    log::debug!("generated {} lines for {}", asm.lines.len(), options.base_name);
    Ok(asm)
}
