//! JVM instruction types and assembly output items.
//!
//! Every line the generator emits is a typed value rendered to Jasmin text
//! through `Display`. Keeping instructions typed lets the limits analysis
//! compute operand-stack effects without re-parsing text.

use super::types::{Constant, ValueType};
use std::fmt;

// ============================================================================
// Operators
// ============================================================================

/// Float arithmetic on the two topmost operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            ArithOp::Add => "fadd",
            ArithOp::Sub => "fsub",
            ArithOp::Mul => "fmul",
            ArithOp::Div => "fdiv",
            ArithOp::Rem => "frem",
        }
    }
}

/// Integer bitwise ops, used on 0/1 booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    And,
    Or,
    Xor,
}

impl BitOp {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            BitOp::And => "iand",
            BitOp::Or => "ior",
            BitOp::Xor => "ixor",
        }
    }
}

/// Condition of a single-operand `if<cond>` branch against zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cond {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Cond::Eq => "ifeq",
            Cond::Ne => "ifne",
            Cond::Lt => "iflt",
            Cond::Le => "ifle",
            Cond::Gt => "ifgt",
            Cond::Ge => "ifge",
        }
    }

    /// The condition that holds exactly when `self` does not.
    pub fn negate(self) -> Cond {
        match self {
            Cond::Eq => Cond::Ne,
            Cond::Ne => Cond::Eq,
            Cond::Lt => Cond::Ge,
            Cond::Ge => Cond::Lt,
            Cond::Le => Cond::Gt,
            Cond::Gt => Cond::Le,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Static,
    Virtual,
}

// ============================================================================
// Typed JVM instruction
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum JvmInstr {
    /// `ldc <constant>`
    Ldc(Constant),
    /// `<p>load <index>`; `name` is rendered as a trailing comment.
    Load {
        ty: ValueType,
        index: u16,
        name: Option<String>,
    },
    /// `<p>store <index>`
    Store {
        ty: ValueType,
        index: u16,
        name: Option<String>,
    },
    Dup,
    Pop,
    Arith(ArithOp),
    Bitwise(BitOp),
    /// `fcmpl` — compares two floats, pushes -1, 0 or 1.
    Fcmpl,
    /// `if<cond> <label>` — pops one int.
    If { cond: Cond, label: String },
    Goto(String),
    /// `invoke<kind> <target>`; `pops` counts the receiver for virtual calls.
    Invoke {
        kind: InvokeKind,
        target: String,
        pops: usize,
        pushes: usize,
    },
    /// `<p>return`
    Return(ValueType),
}

// ── Convenience constructors ────────────────────────────────────────────

impl JvmInstr {
    pub fn load(ty: ValueType, index: u16, name: &str) -> Self {
        JvmInstr::Load {
            ty,
            index,
            name: Some(name.to_string()),
        }
    }

    pub fn store(ty: ValueType, index: u16, name: &str) -> Self {
        JvmInstr::Store {
            ty,
            index,
            name: Some(name.to_string()),
        }
    }

    pub fn if_false(label: impl Into<String>) -> Self {
        JvmInstr::If {
            cond: Cond::Eq,
            label: label.into(),
        }
    }

    /// `invokestatic <owner>/<method>` for a method with `params` arguments
    /// and a non-void return.
    pub fn invoke_static(owner: &str, method: &str, params: usize) -> Self {
        JvmInstr::Invoke {
            kind: InvokeKind::Static,
            target: format!("{owner}/{method}"),
            pops: params,
            pushes: 1,
        }
    }

    /// `java/lang/Float/toString(F)` — number on top of stack to text.
    pub fn float_to_string() -> Self {
        Self::invoke_static("java/lang/Float", "toString(F)Ljava/lang/String;", 1)
    }

    /// `String.concat` — receiver and argument to one string.
    pub fn string_concat() -> Self {
        JvmInstr::Invoke {
            kind: InvokeKind::Virtual,
            target: "java/lang/String/concat(Ljava/lang/String;)Ljava/lang/String;".to_string(),
            pops: 2,
            pushes: 1,
        }
    }

    /// Net change in operand-stack depth.
    pub fn stack_effect(&self) -> i32 {
        match self {
            JvmInstr::Ldc(_) | JvmInstr::Load { .. } | JvmInstr::Dup => 1,
            JvmInstr::Store { .. } | JvmInstr::Pop => -1,
            JvmInstr::Arith(_) | JvmInstr::Bitwise(_) | JvmInstr::Fcmpl => -1,
            JvmInstr::If { .. } => -1,
            JvmInstr::Goto(_) => 0,
            JvmInstr::Invoke { pops, pushes, .. } => *pushes as i32 - *pops as i32,
            JvmInstr::Return(_) => -1,
        }
    }

    /// Label this instruction may transfer control to.
    pub fn branch_target(&self) -> Option<&str> {
        match self {
            JvmInstr::If { label, .. } | JvmInstr::Goto(label) => Some(label.as_str()),
            _ => None,
        }
    }

    /// `true` if control never falls through to the next instruction.
    pub fn ends_flow(&self) -> bool {
        matches!(self, JvmInstr::Goto(_) | JvmInstr::Return(_))
    }

    /// Local slot read or written by this instruction.
    pub fn local_index(&self) -> Option<u16> {
        match self {
            JvmInstr::Load { index, .. } | JvmInstr::Store { index, .. } => Some(*index),
            _ => None,
        }
    }
}

// ── Display — lower to assembly text ────────────────────────────────────

impl fmt::Display for JvmInstr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JvmInstr::Ldc(c) => write!(f, "  ldc {c}"),
            JvmInstr::Load { ty, index, name } => {
                write!(f, "  {}load {index}", ty.prefix())?;
                if let Some(n) = name {
                    write!(f, "   ;{n}")?;
                }
                Ok(())
            }
            JvmInstr::Store { ty, index, name } => {
                write!(f, "  {}store {index}", ty.prefix())?;
                if let Some(n) = name {
                    write!(f, "   ; {n}")?;
                }
                Ok(())
            }
            JvmInstr::Dup => write!(f, "  dup"),
            JvmInstr::Pop => write!(f, "  pop"),
            JvmInstr::Arith(op) => write!(f, "  {}", op.mnemonic()),
            JvmInstr::Bitwise(op) => write!(f, "  {}", op.mnemonic()),
            JvmInstr::Fcmpl => write!(f, "  fcmpl"),
            JvmInstr::If { cond, label } => write!(f, "  {} {label}", cond.mnemonic()),
            JvmInstr::Goto(label) => write!(f, "  goto {label}"),
            JvmInstr::Invoke { kind, target, .. } => match kind {
                InvokeKind::Static => write!(f, "  invokestatic {target}"),
                InvokeKind::Virtual => write!(f, "  invokevirtual {target}"),
            },
            JvmInstr::Return(ty) => write!(f, "  {}return", ty.prefix()),
        }
    }
}

// ============================================================================
// AsmItem — one output line
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AsmItem {
    /// A label on its own line.
    Label(String),
    Instr(JvmInstr),
    /// Assembler directive such as `.limit stack 4`.
    Directive(String),
    /// Verbatim text (header and runtime trailer).
    Raw(String),
    Blank,
}

impl AsmItem {
    pub fn as_instr(&self) -> Option<&JvmInstr> {
        match self {
            AsmItem::Instr(i) => Some(i),
            _ => None,
        }
    }
}

impl From<JvmInstr> for AsmItem {
    fn from(instr: JvmInstr) -> Self {
        AsmItem::Instr(instr)
    }
}

impl fmt::Display for AsmItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmItem::Label(l) => write!(f, "{l}:"),
            AsmItem::Instr(i) => write!(f, "{i}"),
            AsmItem::Directive(d) => write!(f, "{d}"),
            AsmItem::Raw(s) => write!(f, "{s}"),
            AsmItem::Blank => Ok(()),
        }
    }
}
