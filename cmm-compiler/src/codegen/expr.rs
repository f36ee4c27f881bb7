use super::context::Gen;
use super::instruction::{ArithOp, BitOp, Cond, JvmInstr};
use super::scope::Symbol;
use super::types::{signature, Constant, ValueType};
use crate::ast::{BinOp, ChainKind, Expr, Literal};
use crate::{CodegenErrorKind, CompileError};

/// `if<cond>` that holds after `fcmpl` when the comparison is true.
pub fn compare_cond(op: BinOp) -> Option<Cond> {
    match op {
        BinOp::Lt => Some(Cond::Lt),
        BinOp::Le => Some(Cond::Le),
        BinOp::Gt => Some(Cond::Gt),
        BinOp::Ge => Some(Cond::Ge),
        BinOp::Eq => Some(Cond::Eq),
        BinOp::Ne => Some(Cond::Ne),
        _ => None,
    }
}

impl Gen {
    /// Lower an expression, returning the type of the value it leaves on the
    /// operand stack (or `None` if it leaves nothing).
    pub fn lower_expr(&mut self, e: &Expr) -> Result<Option<ValueType>, CompileError> {
        match e {
            Expr::Literal(lit) => Ok(Some(self.lower_literal(lit))),
            Expr::Ident(name) => self.lower_ident(name).map(Some),
            Expr::Call { name, args } => self.lower_call(name, args).map(Some),
            Expr::Assign { target, value } => self.lower_assign(target, value, false),
            Expr::Chain { kind, first, rest } => self.lower_chain(*kind, first, rest).map(Some),
            Expr::Not(operand) => self.lower_not(operand).map(Some),
        }
    }

    /// Lower an expression that must produce a value.
    pub fn lower_value(&mut self, e: &Expr) -> Result<ValueType, CompileError> {
        self.lower_expr(e)?.ok_or_else(|| {
            self.make_error(
                CodegenErrorKind::InternalDispatch,
                "Internal error: expression produced no value".to_string(),
            )
        })
    }

    fn lower_literal(&mut self, lit: &Literal) -> ValueType {
        let constant = match lit {
            Literal::Number(n) => Constant::Float(*n),
            Literal::String(s) => Constant::Str(s.clone()),
            Literal::Boolean(b) => Constant::Int(i32::from(*b)),
        };
        let ty = constant.value_type();
        self.emit(JvmInstr::Ldc(constant));
        ty
    }

    fn lower_ident(&mut self, name: &str) -> Result<ValueType, CompileError> {
        match self.scopes.lookup_from_function(name) {
            Some((Symbol::Variable(_), true)) => Err(self.global_in_function(name)),
            Some((Symbol::Variable(slot), false)) => {
                let (ty, index) = (slot.ty, slot.index);
                self.emit(JvmInstr::load(ty, index, name));
                Ok(ty)
            }
            Some(_) => Err(self.make_error(
                CodegenErrorKind::InternalDispatch,
                format!("Internal error: '{name}' has no storage"),
            )),
            None => Err(self.make_error(
                CodegenErrorKind::UndeclaredVariable,
                format!("Use of undeclared variable {name}"),
            )),
        }
    }

    fn global_in_function(&self, name: &str) -> CompileError {
        self.make_error(
            CodegenErrorKind::UndeclaredVariable,
            format!("Global variable {name} is not accessible inside a function"),
        )
    }

    fn lower_call(&mut self, name: &str, args: &[Expr]) -> Result<ValueType, CompileError> {
        let mut arg_types = Vec::with_capacity(args.len());
        for arg in args {
            arg_types.push(self.lower_value(arg)?);
        }
        let sig = signature(name, &arg_types);
        let Some(entry) = self.scopes.lookup_function(&sig) else {
            return Err(self.make_error(
                CodegenErrorKind::UnknownFunction,
                format!("Attempt to call non-existent function: {sig}"),
            ));
        };
        let (full_name, return_type) = (entry.full_name.clone(), entry.return_type);
        self.emit(JvmInstr::invoke_static(&self.base_name, &full_name, args.len()));
        Ok(return_type)
    }

    /// Lower `target = value`.
    ///
    /// As a bare statement the value is stored and nothing is left behind;
    /// inside an expression it is duplicated first so the assignment yields
    /// the stored value.
    pub fn lower_assign(
        &mut self,
        target: &Expr,
        value: &Expr,
        as_statement: bool,
    ) -> Result<Option<ValueType>, CompileError> {
        let Expr::Ident(name) = target else {
            return Err(self.make_error(
                CodegenErrorKind::InvalidLvalue,
                "Assigning to non-lvalue".to_string(),
            ));
        };
        let slot = match self.scopes.lookup_from_function(name) {
            Some((Symbol::Variable(_), true)) => return Err(self.global_in_function(name)),
            Some((Symbol::Variable(slot), false)) => slot.clone(),
            Some(_) => {
                return Err(self.make_error(
                    CodegenErrorKind::InvalidLvalue,
                    format!("Assigning to non-variable {name}"),
                ))
            }
            None => {
                return Err(self.make_error(
                    CodegenErrorKind::UndeclaredVariable,
                    format!("Assigning to undeclared variable {name}"),
                ))
            }
        };
        self.lower_value(value)?;
        if as_statement {
            self.emit(JvmInstr::store(slot.ty, slot.index, name));
            Ok(None)
        } else {
            self.emit(JvmInstr::Dup);
            self.emit(JvmInstr::store(slot.ty, slot.index, name));
            Ok(Some(slot.ty))
        }
    }

    fn lower_chain(
        &mut self,
        kind: ChainKind,
        first: &Expr,
        rest: &[(BinOp, Expr)],
    ) -> Result<ValueType, CompileError> {
        match kind {
            ChainKind::Logical => self.lower_logical(first, rest),
            ChainKind::Comparison => self.lower_comparison(first, rest),
            ChainKind::Sum => self.lower_sum(first, rest),
            ChainKind::Term => self.lower_term(first, rest),
            ChainKind::Exponent => self.lower_exponent(first, rest),
        }
    }

    fn unknown_operator(&self, op: BinOp, kind: ChainKind) -> CompileError {
        self.make_error(
            CodegenErrorKind::UnknownOperator,
            format!("Unknown operator: {op} in {kind} expression"),
        )
    }

    // ── and / or ────────────────────────────────────────────────────────

    fn lower_logical(&mut self, first: &Expr, rest: &[(BinOp, Expr)]) -> Result<ValueType, CompileError> {
        self.lower_value(first)?;
        for (op, operand) in rest {
            self.lower_value(operand)?;
            let bit = match op {
                BinOp::And => BitOp::And,
                BinOp::Or => BitOp::Or,
                other => return Err(self.unknown_operator(*other, ChainKind::Logical)),
            };
            self.emit(JvmInstr::Bitwise(bit));
        }
        Ok(ValueType::Boolean)
    }

    // ── comparisons ─────────────────────────────────────────────────────

    /// Each pair is compared independently: `fcmpl`, then push 1 if the
    /// branch condition holds, else 0.
    fn lower_comparison(&mut self, first: &Expr, rest: &[(BinOp, Expr)]) -> Result<ValueType, CompileError> {
        self.lower_value(first)?;
        for (op, operand) in rest {
            self.lower_value(operand)?;
            let cond = compare_cond(*op)
                .ok_or_else(|| self.unknown_operator(*op, ChainKind::Comparison))?;
            let holds = self.new_label();
            let done = self.new_label();
            self.emit(JvmInstr::Fcmpl);
            self.emit(JvmInstr::If {
                cond,
                label: holds.clone(),
            });
            self.emit(JvmInstr::Ldc(Constant::Int(0)));
            self.emit(JvmInstr::Goto(done.clone()));
            self.emit_label(holds);
            self.emit(JvmInstr::Ldc(Constant::Int(1)));
            self.emit_label(done);
        }
        Ok(ValueType::Boolean)
    }

    // ── + and - ─────────────────────────────────────────────────────────

    /// Lower an additive chain.
    ///
    /// Each right operand is lowered into a side buffer first so the
    /// operator can see both operand types before choosing between a float
    /// add and a string concatenation. Once either side of a `+` is a
    /// string the running type becomes `String` and every later operand is
    /// converted to text before being concatenated.
    fn lower_sum(&mut self, first: &Expr, rest: &[(BinOp, Expr)]) -> Result<ValueType, CompileError> {
        let mut running = self.lower_value(first)?;
        for (op, operand) in rest {
            let (operand_ty, mut buf) = self.with_buffer(|g| g.lower_value(operand))?;
            match op {
                BinOp::Minus => {
                    if running == ValueType::String {
                        log::warn!("'-' applied to a string operand; the JVM will reject it");
                    } else {
                        running = ValueType::Number;
                    }
                    buf.push(JvmInstr::Arith(ArithOp::Sub).into());
                }
                BinOp::Plus => {
                    let coerced = self.concat_sequence(running, operand_ty)?;
                    match coerced {
                        Some(seq) => {
                            buf.extend(seq.into_iter().map(Into::into));
                            running = ValueType::String;
                        }
                        None => {
                            buf.push(JvmInstr::Arith(ArithOp::Add).into());
                            running = ValueType::Number;
                        }
                    }
                }
                other => return Err(self.unknown_operator(*other, ChainKind::Sum)),
            }
            self.out.extend(buf);
        }
        Ok(running)
    }

    /// Instructions that turn `<left> <right>` on the stack into their
    /// concatenation, or `None` when neither side is a string.
    fn concat_sequence(
        &mut self,
        left: ValueType,
        right: ValueType,
    ) -> Result<Option<Vec<JvmInstr>>, CompileError> {
        use ValueType::{Boolean, Number, String};
        let seq = match (left, right) {
            (String, String) => vec![JvmInstr::string_concat()],
            (String, Number) => vec![JvmInstr::float_to_string(), JvmInstr::string_concat()],
            (String, Boolean) => vec![self.builtin_call("concat", &[String, Boolean])?],
            (Boolean, String) => vec![self.builtin_call("concat", &[Boolean, String])?],
            (Number, String) => {
                // The number sits under the string; park the string while
                // the number is converted.
                let scratch = self.scopes.declare_scratch()?;
                vec![
                    JvmInstr::Store {
                        ty: String,
                        index: scratch,
                        name: None,
                    },
                    JvmInstr::float_to_string(),
                    JvmInstr::Load {
                        ty: String,
                        index: scratch,
                        name: None,
                    },
                    JvmInstr::string_concat(),
                ]
            }
            _ => return Ok(None),
        };
        Ok(Some(seq))
    }

    // ── * / % ───────────────────────────────────────────────────────────

    /// Operand types are not checked; a non-number reaches the JVM as is.
    fn lower_term(&mut self, first: &Expr, rest: &[(BinOp, Expr)]) -> Result<ValueType, CompileError> {
        self.lower_value(first)?;
        for (op, operand) in rest {
            self.lower_value(operand)?;
            let arith = match op {
                BinOp::Multiply => ArithOp::Mul,
                BinOp::Divide => ArithOp::Div,
                BinOp::Mod => ArithOp::Rem,
                other => return Err(self.unknown_operator(*other, ChainKind::Term)),
            };
            self.emit(JvmInstr::Arith(arith));
        }
        Ok(ValueType::Number)
    }

    // ── ^ ───────────────────────────────────────────────────────────────

    /// `^` is xor on two booleans and `pow` otherwise.
    fn lower_exponent(&mut self, first: &Expr, rest: &[(BinOp, Expr)]) -> Result<ValueType, CompileError> {
        let mut running = self.lower_value(first)?;
        for (op, operand) in rest {
            let operand_ty = self.lower_value(operand)?;
            if *op != BinOp::Exp {
                return Err(self.unknown_operator(*op, ChainKind::Exponent));
            }
            if running == ValueType::Boolean && operand_ty == ValueType::Boolean {
                self.emit(JvmInstr::Bitwise(BitOp::Xor));
            } else {
                let pow = self.builtin_call("pow", &[ValueType::Number, ValueType::Number])?;
                self.emit(pow);
                running = ValueType::Number;
            }
        }
        Ok(running)
    }

    // ── not ─────────────────────────────────────────────────────────────

    fn lower_not(&mut self, operand: &Expr) -> Result<ValueType, CompileError> {
        self.lower_value(operand)?;
        let was_false = self.new_label();
        let done = self.new_label();
        self.emit(JvmInstr::if_false(was_false.clone()));
        self.emit(JvmInstr::Ldc(Constant::Int(0)));
        self.emit(JvmInstr::Goto(done.clone()));
        self.emit_label(was_false);
        self.emit(JvmInstr::Ldc(Constant::Int(1)));
        self.emit_label(done);
        Ok(ValueType::Boolean)
    }
}
