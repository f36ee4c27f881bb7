//! Program-level assembly.
//!
//! A class file is the standard header, then every top-level item in source
//! order, then the runtime trailer holding the built-in methods.

use super::context::Gen;
use super::instruction::{AsmItem, JvmInstr};
use super::limits::{method_limits, stack_profile};
use super::types::{full_name, signature};
use crate::ast::{Declaration, FunctionDef, Item, Program};
use crate::CompileError;

const HEADER: &str = include_str!("assets/header.j");
const RUNTIME: &str = include_str!("assets/runtime.j");

/// Placeholder in the assets replaced by the class name.
const BASENAME: &str = "$basename";

impl Gen {
    pub fn lower_program(&mut self, p: &Program) -> Result<(), CompileError> {
        self.emit_asset(HEADER);
        for item in &p.items {
            match item {
                Item::Declaration(decl) => self.declare_globals(decl)?,
                Item::Function(func) => self.lower_function(func)?,
            }
        }
        self.emit_asset(RUNTIME);
        Ok(())
    }

    /// Register top-level variables. Code is only legal inside a method, so
    /// nothing is emitted; each function gets its own locals and cannot
    /// reach these names.
    fn declare_globals(&mut self, decl: &Declaration) -> Result<(), CompileError> {
        let ty = self.resolve_type(&decl.ty)?;
        for name in &decl.names {
            self.scopes.declare_variable(name, ty)?;
        }
        Ok(())
    }

    fn emit_asset(&mut self, text: &str) {
        for line in text.lines() {
            let line = line.replace(BASENAME, &self.base_name);
            let item = if line.is_empty() {
                AsmItem::Blank
            } else {
                AsmItem::Raw(line)
            };
            self.emit_item(item);
        }
    }

    /// Emit one `.method` for a function definition.
    ///
    /// The function is registered in the enclosing frame before its body is
    /// lowered, so it can call itself. The body is buffered so the limits
    /// directives can be computed from it.
    pub fn lower_function(&mut self, func: &FunctionDef) -> Result<(), CompileError> {
        let return_type = self.resolve_type(&func.return_type)?;
        let param_types = func
            .params
            .iter()
            .map(|p| self.resolve_type(&p.ty))
            .collect::<Result<Vec<_>, _>>()?;
        let sig = signature(&func.name, &param_types);
        let full = full_name(&sig, return_type);
        log::debug!("lowering function {full}");

        self.scopes.declare_function(sig, full.clone(), return_type);
        self.scopes.push_function(return_type);
        for (param, ty) in func.params.iter().zip(&param_types) {
            self.scopes.declare_variable(&param.name, *ty)?;
        }

        let lowered = self.with_buffer(|g| g.lower_block(&func.body));
        let slots = self.scopes.pop_function();
        let ((), mut body) = lowered?;

        // Falling off the end returns the default value.
        if stack_profile(&body).final_depth.is_some() {
            body.push(JvmInstr::Ldc(return_type.default_constant()).into());
            body.push(JvmInstr::Return(return_type).into());
        }

        let limits = method_limits(self.limits, &body, slots);
        log::debug!(
            "{full}: stack {} locals {} ({} items)",
            limits.stack,
            limits.locals,
            body.len()
        );

        self.emit_item(AsmItem::Blank);
        self.emit_item(AsmItem::Directive(format!(".method public static {full}")));
        self.emit_item(AsmItem::Directive(format!("  .limit stack {}", limits.stack)));
        self.emit_item(AsmItem::Directive(format!("  .limit locals {}", limits.locals)));
        self.out.extend(body);
        self.emit_item(AsmItem::Directive(".end method".to_string()));
        Ok(())
    }
}
