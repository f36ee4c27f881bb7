//! Recursive-descent parser for C--.
//!
//! Grammar (one function per rule):
//!
//! ```text
//! Program     -> (Declaration | FunctionDefinition)*
//! Declaration -> Type id (, id)* ;
//! Function    -> Type id ( (Type id (, Type id)*)? ) Block
//! Block       -> { (Declaration | Statement)* }
//! Statement   -> If | While | DoLoop | Return | Block | Assignment ;
//! Assignment  -> Logical (= Assignment)?
//! Logical     -> Comparison ((and | or) Comparison)*
//! Comparison  -> Sum ((< | <= | > | >= | == | !=) Sum)*
//! Sum         -> Term ((+ | -) Term)*
//! Term        -> Exp ((* | / | %) Exp)*
//! Exp         -> Element (^ Element)*
//! Element     -> not Element | literal | id | id ( args ) | ( Assignment )
//! ```

use super::lexer::{self, Spanned, Token};
use crate::ast::*;
use crate::CompileError;

pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Spanned>,
    current: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, tokens: Vec<Spanned>) -> Self {
        Self {
            source,
            tokens,
            current: 0,
        }
    }

    pub fn parse_program(&mut self) -> Result<Program, CompileError> {
        let mut items = Vec::new();
        while !self.is_at_end() {
            items.push(self.item()?);
        }
        Ok(Program { items })
    }

    // ── Top level ───────────────────────────────────────────────────────

    fn item(&mut self) -> Result<Item, CompileError> {
        let ty = self.type_name()?;
        let name = self.expect_ident("expected identifier after type")?;
        if self.check(&Token::LParen) {
            Ok(Item::Function(self.function_rest(ty, name)?))
        } else {
            Ok(Item::Declaration(self.declaration_rest(ty, name)?))
        }
    }

    fn function_rest(&mut self, return_type: TypeName, name: String) -> Result<FunctionDef, CompileError> {
        self.expect(&Token::LParen, "expected '(' after function name")?;
        let mut params = Vec::new();
        if !self.check(&Token::RParen) {
            loop {
                let ty = self.type_name()?;
                let name = self.expect_ident("expected parameter name")?;
                params.push(Param { ty, name });
                if !self.matches(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "expected ')' after parameters")?;
        let body = self.block()?;
        Ok(FunctionDef {
            return_type,
            name,
            params,
            body,
        })
    }

    fn declaration_rest(&mut self, ty: TypeName, first: String) -> Result<Declaration, CompileError> {
        let mut names = vec![first];
        while self.matches(&Token::Comma) {
            names.push(self.expect_ident("expected identifier in declaration")?);
        }
        self.expect(&Token::Semicolon, "expected ';' after declaration")?;
        Ok(Declaration { ty, names })
    }

    fn type_name(&mut self) -> Result<TypeName, CompileError> {
        let name = match self.peek() {
            Some(Token::NumberType) => "number",
            Some(Token::StringType) => "string",
            Some(Token::BooleanType) => "boolean",
            _ => return Err(self.error_here("expected a type (number, string or boolean)")),
        };
        self.advance();
        Ok(TypeName::new(name))
    }

    // ── Statements ──────────────────────────────────────────────────────

    fn block(&mut self) -> Result<Block, CompileError> {
        self.expect(&Token::LBrace, "expected '{'")?;
        let mut stmts = Vec::new();
        while !self.check(&Token::RBrace) {
            if self.is_at_end() {
                return Err(self.error_here("expected '}' before end of input"));
            }
            stmts.push(self.statement()?);
        }
        self.advance();
        Ok(Block { stmts })
    }

    fn statement(&mut self) -> Result<Stmt, CompileError> {
        match self.peek() {
            Some(Token::NumberType | Token::StringType | Token::BooleanType) => {
                let ty = self.type_name()?;
                let first = self.expect_ident("expected identifier after type")?;
                Ok(Stmt::Declaration(self.declaration_rest(ty, first)?))
            }
            Some(Token::If) => self.if_statement(),
            Some(Token::While) => {
                self.advance();
                let condition = self.condition()?;
                let body = self.block()?;
                Ok(Stmt::While { condition, body })
            }
            Some(Token::Do) => {
                self.advance();
                let body = self.block()?;
                self.expect(&Token::While, "expected 'while' after do-block")?;
                let condition = self.condition()?;
                self.expect(&Token::Semicolon, "expected ';' after do-while condition")?;
                Ok(Stmt::DoWhile { body, condition })
            }
            Some(Token::Return) => {
                self.advance();
                let value = self.expression()?;
                self.expect(&Token::Semicolon, "expected ';' after return value")?;
                Ok(Stmt::Return(value))
            }
            Some(Token::LBrace) => Ok(Stmt::Block(self.block()?)),
            _ => {
                let expr = self.expression()?;
                self.expect(&Token::Semicolon, "expected ';' after expression")?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn if_statement(&mut self) -> Result<Stmt, CompileError> {
        self.advance(); // consume 'if'
        let mut branches = vec![(self.condition()?, self.block()?)];
        while self.matches(&Token::Elsif) {
            let cond = self.condition()?;
            let block = self.block()?;
            branches.push((cond, block));
        }
        let else_block = if self.matches(&Token::Else) {
            Some(self.block()?)
        } else {
            None
        };
        Ok(Stmt::If {
            branches,
            else_block,
        })
    }

    /// `( Assignment )`
    fn condition(&mut self) -> Result<Expr, CompileError> {
        self.expect(&Token::LParen, "expected '(' before condition")?;
        let expr = self.expression()?;
        self.expect(&Token::RParen, "expected ')' after condition")?;
        Ok(expr)
    }

    // ── Expressions ─────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr, CompileError> {
        let target = self.logical()?;
        if self.matches(&Token::Assign) {
            let value = self.expression()?;
            return Ok(Expr::assign(target, value));
        }
        Ok(target)
    }

    fn logical(&mut self) -> Result<Expr, CompileError> {
        self.chain(ChainKind::Logical, Self::comparison, |t| match t {
            Token::And => Some(BinOp::And),
            Token::Or => Some(BinOp::Or),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Result<Expr, CompileError> {
        self.chain(ChainKind::Comparison, Self::sum, |t| match t {
            Token::Lt => Some(BinOp::Lt),
            Token::Le => Some(BinOp::Le),
            Token::Gt => Some(BinOp::Gt),
            Token::Ge => Some(BinOp::Ge),
            Token::Eq => Some(BinOp::Eq),
            Token::Neq => Some(BinOp::Ne),
            _ => None,
        })
    }

    fn sum(&mut self) -> Result<Expr, CompileError> {
        self.chain(ChainKind::Sum, Self::term, |t| match t {
            Token::Plus => Some(BinOp::Plus),
            Token::Minus => Some(BinOp::Minus),
            _ => None,
        })
    }

    fn term(&mut self) -> Result<Expr, CompileError> {
        self.chain(ChainKind::Term, Self::exponent, |t| match t {
            Token::Mul => Some(BinOp::Multiply),
            Token::Div => Some(BinOp::Divide),
            Token::Mod => Some(BinOp::Mod),
            _ => None,
        })
    }

    fn exponent(&mut self) -> Result<Expr, CompileError> {
        self.chain(ChainKind::Exponent, Self::element, |t| match t {
            Token::Caret => Some(BinOp::Exp),
            _ => None,
        })
    }

    /// Parse `operand (op operand)*`; a single operand is returned unwrapped.
    fn chain(
        &mut self,
        kind: ChainKind,
        operand: fn(&mut Self) -> Result<Expr, CompileError>,
        op_of: fn(&Token) -> Option<BinOp>,
    ) -> Result<Expr, CompileError> {
        let first = operand(self)?;
        let mut rest = Vec::new();
        while let Some(op) = self.peek().and_then(op_of) {
            self.advance();
            rest.push((op, operand(self)?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::chain(kind, first, rest))
        }
    }

    fn element(&mut self) -> Result<Expr, CompileError> {
        let token = match self.peek() {
            Some(t) => t.clone(),
            None => return Err(self.error_here("unexpected end of input, expected an expression")),
        };
        match token {
            Token::Not => {
                self.advance();
                Ok(Expr::Not(Box::new(self.element()?)))
            }
            Token::Number(n) => {
                self.advance();
                Ok(Expr::number(n))
            }
            Token::String(s) => {
                self.advance();
                Ok(Expr::string(s))
            }
            Token::Boolean(b) => {
                self.advance();
                Ok(Expr::boolean(b))
            }
            Token::Ident(name) => {
                self.advance();
                if self.matches(&Token::LParen) {
                    let args = self.arguments()?;
                    Ok(Expr::call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Token::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(&Token::RParen, "expected ')' after expression")?;
                Ok(inner)
            }
            other => Err(self.error_here(&format!("unexpected token {}, expected an expression", other))),
        }
    }

    /// Argument list after the opening parenthesis.
    fn arguments(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = Vec::new();
        if self.matches(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if !self.matches(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "expected ')' after arguments")?;
        Ok(args)
    }

    // ── Token helpers ───────────────────────────────────────────────────

    fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current).map(|(t, _)| t)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.current += 1;
        }
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn matches(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token, message: &str) -> Result<(), CompileError> {
        if self.matches(token) {
            Ok(())
        } else {
            Err(self.error_here(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<String, CompileError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error_here(message)),
        }
    }

    fn error_here(&self, message: &str) -> CompileError {
        let position = self
            .tokens
            .get(self.current)
            .map(|(_, span)| span.start)
            .unwrap_or(self.source.len());
        let (line, col) = lexer::position_to_line_col(self.source, position);
        let found = match self.peek() {
            Some(t) => format!("found {}", t),
            None => "found end of input".to_string(),
        };
        CompileError::Parse {
            line,
            col,
            context: lexer::get_error_context(self.source, position),
            message: format!("{} ({})", message, found),
        }
    }
}
