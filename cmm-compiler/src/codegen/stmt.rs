use super::context::Gen;
use super::expr::compare_cond;
use super::instruction::JvmInstr;
use super::types::ValueType;
use crate::ast::{Block, ChainKind, Declaration, Expr, Stmt};
use crate::{CodegenErrorKind, CompileError};

impl Gen {
    pub fn lower_stmt(&mut self, s: &Stmt) -> Result<(), CompileError> {
        match s {
            Stmt::Declaration(decl) => self.lower_declaration(decl),
            Stmt::Expr(e) => self.lower_expr_stmt(e),
            Stmt::If {
                branches,
                else_block,
            } => self.lower_if(branches, else_block.as_ref()),
            Stmt::While { condition, body } => self.lower_while(condition, body),
            Stmt::DoWhile { body, condition } => self.lower_do_while(body, condition),
            Stmt::Return(value) => self.lower_return(value),
            Stmt::Block(block) => self.lower_block(block),
        }
    }

    /// Lower a `{ ... }` block in a fresh lexical frame.
    pub fn lower_block(&mut self, block: &Block) -> Result<(), CompileError> {
        self.scopes.push_block();
        for s in &block.stmts {
            self.lower_stmt(s)?;
        }
        self.scopes.pop_block();
        Ok(())
    }

    /// Declare each name in the current frame and initialise it to the
    /// type's default constant.
    pub fn lower_declaration(&mut self, decl: &Declaration) -> Result<(), CompileError> {
        let ty = self.resolve_type(&decl.ty)?;
        for name in &decl.names {
            let slot = self.scopes.declare_variable(name, ty)?;
            log::trace!("{name}: {ty} in slot {}", slot.index);
            self.emit(JvmInstr::Ldc(ty.default_constant()));
            self.emit(JvmInstr::store(ty, slot.index, name));
        }
        Ok(())
    }

    /// An expression evaluated for its effect; any value it leaves is popped.
    fn lower_expr_stmt(&mut self, e: &Expr) -> Result<(), CompileError> {
        let produced = match e {
            Expr::Assign { target, value } => self.lower_assign(target, value, true)?,
            other => self.lower_expr(other)?,
        };
        if produced.is_some() {
            self.emit(JvmInstr::Pop);
        }
        Ok(())
    }

    /// Emit code that jumps to `target` when `cond` is false and falls
    /// through otherwise.
    ///
    /// A single comparison branches on the `fcmpl` result directly instead
    /// of materialising a 0/1 first.
    pub fn lower_condition_branch_false(&mut self, cond: &Expr, target: &str) -> Result<(), CompileError> {
        if let Expr::Chain {
            kind: ChainKind::Comparison,
            first,
            rest,
        } = cond
        {
            if let [(op, right)] = rest.as_slice() {
                if let Some(holds) = compare_cond(*op) {
                    self.lower_value(first)?;
                    self.lower_value(right)?;
                    self.emit(JvmInstr::Fcmpl);
                    self.emit(JvmInstr::If {
                        cond: holds.negate(),
                        label: target.to_string(),
                    });
                    return Ok(());
                }
            }
        }

        match self.lower_expr(cond)? {
            Some(ValueType::Boolean) => {
                self.emit(JvmInstr::if_false(target));
                Ok(())
            }
            _ => Err(self.make_error(
                CodegenErrorKind::NonBooleanCondition,
                "Condition not evaluating to boolean".to_string(),
            )),
        }
    }

    /// `if` / `elsif` / `else`.
    ///
    /// Each guarded branch falls to the next test on false; every branch
    /// but the last jumps to the shared end label.
    fn lower_if(&mut self, branches: &[(Expr, Block)], else_block: Option<&Block>) -> Result<(), CompileError> {
        let endif = self.new_label();
        for (i, (cond, block)) in branches.iter().enumerate() {
            let is_last = i + 1 == branches.len() && else_block.is_none();
            let next = if is_last { endif.clone() } else { self.new_label() };
            self.lower_condition_branch_false(cond, &next)?;
            self.lower_block(block)?;
            if !is_last {
                self.emit(JvmInstr::Goto(endif.clone()));
                self.emit_label(next);
            }
        }
        if let Some(block) = else_block {
            self.lower_block(block)?;
        }
        self.emit_label(endif);
        Ok(())
    }

    fn lower_while(&mut self, cond: &Expr, body: &Block) -> Result<(), CompileError> {
        let start = self.new_label();
        let end = self.new_label();
        self.emit_label(start.clone());
        self.lower_condition_branch_false(cond, &end)?;
        self.lower_block(body)?;
        self.emit(JvmInstr::Goto(start));
        self.emit_label(end);
        Ok(())
    }

    /// Body first, then the test; loop back while it holds.
    fn lower_do_while(&mut self, body: &Block, cond: &Expr) -> Result<(), CompileError> {
        let start = self.new_label();
        let end = self.new_label();
        self.emit_label(start.clone());
        self.lower_block(body)?;
        self.lower_condition_branch_false(cond, &end)?;
        self.emit(JvmInstr::Goto(start));
        self.emit_label(end);
        Ok(())
    }

    fn lower_return(&mut self, value: &Expr) -> Result<(), CompileError> {
        let Some(return_type) = self.scopes.current_return_type() else {
            return Err(self.make_error(
                CodegenErrorKind::ReturnOutsideFunction,
                "return outside of a function body".to_string(),
            ));
        };
        let value_type = self.lower_value(value)?;
        if value_type != return_type {
            log::warn!("returning {value_type} from a function declared to return {return_type}");
        }
        self.emit(JvmInstr::Return(return_type));
        Ok(())
    }
}
