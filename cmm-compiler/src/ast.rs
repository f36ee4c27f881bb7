//! Abstract syntax tree for C--.
//!
//! The tree is a closed set of node categories. Expression chains keep the
//! shape of the grammar's precedence ladder (logical, comparison, sum, term,
//! exponent), so each chain is lowered by exactly one routine.

use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub items: Vec<Item>,
}

/// A top-level item, visited in source order.
#[derive(Debug, Clone)]
pub enum Item {
    Declaration(Declaration),
    Function(FunctionDef),
}

/// `Type id (, id)* ;`
#[derive(Debug, Clone)]
pub struct Declaration {
    pub ty: TypeName,
    pub names: Vec<String>,
}

/// `Type id ( params ) Block`
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub return_type: TypeName,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub ty: TypeName,
    pub name: String,
}

/// A type-name token as written in the source (`number`, `string`, `boolean`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName(pub String);

impl TypeName {
    pub fn new(name: impl Into<String>) -> Self {
        TypeName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Declaration(Declaration),
    /// Expression evaluated for its effect; any value it leaves is discarded.
    Expr(Expr),
    /// `if (c) {..} (elsif (c) {..})* (else {..})?`
    If {
        branches: Vec<(Expr, Block)>,
        else_block: Option<Block>,
    },
    While {
        condition: Expr,
        body: Block,
    },
    /// `do {..} while (c);`
    DoWhile {
        body: Block,
        condition: Expr,
    },
    Return(Expr),
    Block(Block),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    Call {
        name: String,
        args: Vec<Expr>,
    },
    /// `target = value`; only a bare identifier is a valid target.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// A left-associative operator chain at one precedence level.
    Chain {
        kind: ChainKind,
        first: Box<Expr>,
        rest: Vec<(BinOp, Expr)>,
    },
    /// `not Element`
    Not(Box<Expr>),
}

impl Expr {
    pub fn number(value: f32) -> Self {
        Expr::Literal(Literal::Number(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Expr::Literal(Literal::Boolean(value))
    }

    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args,
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn chain(kind: ChainKind, first: Expr, rest: Vec<(BinOp, Expr)>) -> Self {
        Expr::Chain {
            kind,
            first: Box::new(first),
            rest,
        }
    }

    /// Convenience for a two-operand chain.
    pub fn binary(kind: ChainKind, left: Expr, op: BinOp, right: Expr) -> Self {
        Self::chain(kind, left, vec![(op, right)])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f32),
    String(String),
    Boolean(bool),
}

/// Precedence level of an operator chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    Logical,
    Comparison,
    Sum,
    Term,
    Exponent,
}

/// Every binary operator token of the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    And,
    Or,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Plus,
    Minus,
    Multiply,
    Divide,
    Mod,
    Exp,
}

impl BinOp {
    /// The precedence level this operator belongs to.
    pub fn chain_kind(self) -> ChainKind {
        match self {
            BinOp::And | BinOp::Or => ChainKind::Logical,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne => {
                ChainKind::Comparison
            }
            BinOp::Plus | BinOp::Minus => ChainKind::Sum,
            BinOp::Multiply | BinOp::Divide | BinOp::Mod => ChainKind::Term,
            BinOp::Exp => ChainKind::Exponent,
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Plus => "+",
            BinOp::Minus => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Mod => "%",
            BinOp::Exp => "^",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainKind::Logical => write!(f, "logical"),
            ChainKind::Comparison => write!(f, "comparison"),
            ChainKind::Sum => write!(f, "sum"),
            ChainKind::Term => write!(f, "term"),
            ChainKind::Exponent => write!(f, "exponent"),
        }
    }
}
