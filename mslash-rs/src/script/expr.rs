//! MSlash expression lexer, AST, parser, and evaluator.
//!
//! Expressions appear after `say`, `math`, `if`, `return`, on the right of
//! `var NAME =`, as call arguments, and inside `${...}`.  The grammar is
//! closed: literals, list and map displays, arithmetic, comparison and
//! boolean operators, subscripts, instance attribute reads, and calls to the
//! whitelisted built-ins in [`builtins`](super::builtins).  Nothing else is
//! reachable, so evaluating untrusted script text cannot touch the host.
//!
//! Operator precedence (lowest → highest):
//!   or  →  and  →  not  →  comparison (`== != < <= > >= in`, `not in`,
//!   chained)  →  additive  →  multiplicative (`* / // %`)  →  unary (`+ -`)
//!   →  power (`**`, right-assoc)  →  postfix (`[i]`, `.attr`)  →  primary

use tracing::trace;

use super::builtins::{call_builtin, insert_pair, is_builtin};
use super::env::Environment;
use super::error::EvalError;
use super::value::Value;

// ── EvalContext ───────────────────────────────────────────────────────────────

/// Name-resolution interface used by the evaluator.
///
/// [`Environment`] implements this so bare names see frame variables and,
/// inside methods, the receiver's attributes.
pub trait EvalContext {
    /// Resolve a bare name to a value.
    fn lookup(&self, name: &str) -> Option<Value>;
}

impl EvalContext for Environment {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.resolve(name)
    }
}

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),

    // Arithmetic
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,

    // Comparison
    Eq, // ==
    Ne, // !=
    Lt,
    Le,
    Gt,
    Ge,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    /// Unrecognised input character; the parser rejects it.
    Unknown(char),
    Eof,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer {
    src: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Lexer {
            src: src.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek2(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn read_digits(&mut self, s: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                s.push(c);
            } else if c != '_' {
                break;
            }
            self.pos += 1;
        }
    }

    fn read_number(&mut self, first: char) -> Result<Token, EvalError> {
        let mut s = String::new();
        let mut is_float = first == '.';
        s.push(first);
        if first == '.' {
            self.read_digits(&mut s);
        } else {
            self.read_digits(&mut s);
            if self.peek() == Some('.') && !matches!(self.peek2(), Some(c) if c.is_alphabetic() || c == '_') {
                is_float = true;
                s.push('.');
                self.pos += 1;
                self.read_digits(&mut s);
            }
        }
        if matches!(self.peek(), Some('e' | 'E'))
            && matches!(self.peek2(), Some(c) if c.is_ascii_digit() || c == '+' || c == '-')
        {
            is_float = true;
            s.push('e');
            self.pos += 1;
            if let Some(sign @ ('+' | '-')) = self.peek() {
                s.push(sign);
                self.pos += 1;
            }
            self.read_digits(&mut s);
        }

        if is_float {
            s.parse()
                .map(Token::Float)
                .map_err(|_| EvalError::Parse(format!("invalid number literal '{s}'")))
        } else if s.len() > 1 && s.starts_with('0') && s.bytes().any(|b| b != b'0') {
            Err(EvalError::Parse(format!("leading zeros in integer literal '{s}'")))
        } else {
            s.parse().map(Token::Int).map_err(|_| EvalError::Overflow)
        }
    }

    fn read_string(&mut self, quote: char) -> Result<Token, EvalError> {
        let mut s = String::new();
        loop {
            match self.advance() {
                None => return Err(EvalError::Parse("unterminated string literal".into())),
                Some('\\') => match self.advance() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('0') => s.push('\0'),
                    Some(c @ ('\\' | '\'' | '"')) => s.push(c),
                    Some(c) => {
                        s.push('\\');
                        s.push(c);
                    }
                    None => return Err(EvalError::Parse("unterminated string literal".into())),
                },
                Some(c) if c == quote => break,
                Some(c) => s.push(c),
            }
        }
        Ok(Token::Str(s))
    }

    fn read_ident(&mut self, first: char) -> Token {
        let mut s = String::new();
        s.push(first);
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            s.push(self.src[self.pos]);
            self.pos += 1;
        }
        Token::Ident(s)
    }

    fn next_token(&mut self) -> Result<Token, EvalError> {
        self.skip_ws();
        let ch = match self.advance() {
            None => return Ok(Token::Eof),
            Some(c) => c,
        };

        Ok(match ch {
            '0'..='9' => self.read_number(ch)?,
            '.' if matches!(self.peek(), Some(c) if c.is_ascii_digit()) => self.read_number(ch)?,
            '"' | '\'' => self.read_string(ch)?,
            c if c.is_alphabetic() || c == '_' => self.read_ident(c),
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => {
                if self.eat('*') {
                    Token::DoubleStar
                } else {
                    Token::Star
                }
            }
            '/' => {
                if self.eat('/') {
                    Token::DoubleSlash
                } else {
                    Token::Slash
                }
            }
            '%' => Token::Percent,
            '=' if self.eat('=') => Token::Eq,
            '!' if self.eat('=') => Token::Ne,
            '<' => {
                if self.eat('=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '.' => Token::Dot,
            c => Token::Unknown(c),
        })
    }

    fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        loop {
            let t = self.next_token()?;
            let done = matches!(t, Token::Eof);
            tokens.push(t);
            if done {
                break;
            }
        }
        Ok(tokens)
    }
}

// ── AST ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Rem,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Var(String),
    List(Vec<Expr>),
    Map(Vec<(Expr, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// `a < b <= c`: each operand is evaluated once, left to right.
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Attr(Box<Expr>, String),
    Call(String, Vec<Expr>),
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token, context: &str) -> Result<(), EvalError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(EvalError::Parse(format!(
                "expected {expected:?} {context}, found {:?}",
                self.peek()
            )))
        }
    }

    fn is_keyword(&self, offset: usize, kw: &str) -> bool {
        matches!(self.peek_at(offset), Token::Ident(s) if s == kw)
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_and()?;
        while self.is_keyword(0, "or") {
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_not()?;
        while self.is_keyword(0, "and") {
            self.pos += 1;
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, EvalError> {
        if self.is_keyword(0, "not") {
            self.pos += 1;
            let inner = self.parse_not()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        let first = self.parse_additive()?;
        let mut chain = Vec::new();
        loop {
            let op = match self.peek() {
                Token::Eq => CmpOp::Eq,
                Token::Ne => CmpOp::Ne,
                Token::Lt => CmpOp::Lt,
                Token::Le => CmpOp::Le,
                Token::Gt => CmpOp::Gt,
                Token::Ge => CmpOp::Ge,
                Token::Ident(s) if s == "in" => CmpOp::In,
                Token::Ident(s) if s == "not" && self.is_keyword(1, "in") => {
                    self.pos += 1;
                    CmpOp::NotIn
                }
                _ => break,
            };
            self.pos += 1;
            chain.push((op, self.parse_additive()?));
        }
        if chain.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), chain))
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::DoubleSlash => BinOp::FloorDiv,
                Token::Percent => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        match self.peek() {
            Token::Minus => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Neg, Box::new(self.parse_unary()?)))
            }
            Token::Plus => {
                self.pos += 1;
                Ok(Expr::Unary(UnaryOp::Pos, Box::new(self.parse_unary()?)))
            }
            _ => self.parse_power(),
        }
    }

    fn parse_power(&mut self) -> Result<Expr, EvalError> {
        let base = self.parse_postfix()?;
        if self.eat(&Token::DoubleStar) {
            // Right-associative, and binds looser than a unary minus on the right.
            let exp = self.parse_unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::LBracket => {
                    self.pos += 1;
                    let index = self.parse_expr()?;
                    self.expect(&Token::RBracket, "after subscript")?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                Token::Dot => {
                    self.pos += 1;
                    match self.advance() {
                        Token::Ident(name) => expr = Expr::Attr(Box::new(expr), name),
                        other => {
                            return Err(EvalError::Parse(format!(
                                "expected attribute name, found {other:?}"
                            )))
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Comma-separated items up to `close`, allowing a trailing comma.
    fn parse_items<T>(
        &mut self,
        close: &Token,
        mut item: impl FnMut(&mut Self) -> Result<T, EvalError>,
    ) -> Result<Vec<T>, EvalError> {
        let mut items = Vec::new();
        while self.peek() != close {
            items.push(item(self)?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(close, "to close display")?;
        Ok(items)
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let tok = self.advance();
        match tok {
            Token::Int(n) => Ok(Expr::Literal(Value::Int(n))),
            Token::Float(x) => Ok(Expr::Literal(Value::Float(x))),
            Token::Str(s) => {
                // Adjacent string literals concatenate.
                let mut s = s;
                while let Token::Str(next) = self.peek().clone() {
                    self.pos += 1;
                    s.push_str(&next);
                }
                Ok(Expr::Literal(Value::Str(s)))
            }
            Token::Ident(name) => match name.as_str() {
                "True" | "true" => Ok(Expr::Literal(Value::Bool(true))),
                "False" | "false" => Ok(Expr::Literal(Value::Bool(false))),
                "None" | "null" => Ok(Expr::Literal(Value::Null)),
                "and" | "or" | "not" | "in" => {
                    Err(EvalError::Parse(format!("unexpected keyword '{name}'")))
                }
                _ => {
                    if self.eat(&Token::LParen) {
                        let args = self.parse_items(&Token::RParen, Self::parse_expr)?;
                        Ok(Expr::Call(name, args))
                    } else {
                        Ok(Expr::Var(name))
                    }
                }
            },
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen, "to close group")?;
                Ok(inner)
            }
            Token::LBracket => {
                let items = self.parse_items(&Token::RBracket, Self::parse_expr)?;
                Ok(Expr::List(items))
            }
            Token::LBrace => {
                let pairs = self.parse_items(&Token::RBrace, |p| {
                    let key = p.parse_expr()?;
                    p.expect(&Token::Colon, "in map display")?;
                    let value = p.parse_expr()?;
                    Ok((key, value))
                })?;
                Ok(Expr::Map(pairs))
            }
            other => Err(EvalError::Parse(format!("unexpected token {other:?}"))),
        }
    }
}

/// Parse an MSlash expression string into an AST.
///
/// The whole input must be consumed; trailing tokens are an error.
pub fn parse_expr(src: &str) -> Result<Expr, EvalError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(EvalError::Parse(format!("unexpected trailing {other:?}"))),
    }
}

// ── Evaluator ─────────────────────────────────────────────────────────────────

/// Evaluate an [`Expr`] AST node against the given context.
pub fn eval_expr(expr: &Expr, ctx: &dyn EvalContext) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),

        Expr::Var(name) => ctx
            .lookup(name)
            .ok_or_else(|| EvalError::UnknownName(name.clone())),

        Expr::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for e in items {
                out.push(eval_expr(e, ctx)?);
            }
            Ok(Value::List(out))
        }

        Expr::Map(entries) => {
            let mut pairs = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let key = eval_expr(k, ctx)?;
                let value = eval_expr(v, ctx)?;
                insert_pair(&mut pairs, key, value)?;
            }
            Ok(Value::Map(pairs))
        }

        Expr::Unary(op, inner) => {
            let v = eval_expr(inner, ctx)?;
            match op {
                UnaryOp::Neg => v.arith_neg(),
                UnaryOp::Pos => v.arith_pos(),
                UnaryOp::Not => Ok(Value::Bool(!v.is_truthy())),
            }
        }

        Expr::Binary(op, lhs, rhs) => {
            let l = eval_expr(lhs, ctx)?;
            let r = eval_expr(rhs, ctx)?;
            match op {
                BinOp::Add => l.arith_add(&r),
                BinOp::Sub => l.arith_sub(&r),
                BinOp::Mul => l.arith_mul(&r),
                BinOp::Div => l.arith_div(&r),
                BinOp::FloorDiv => l.arith_floor_div(&r),
                BinOp::Rem => l.arith_rem(&r),
                BinOp::Pow => l.arith_pow(&r),
            }
        }

        Expr::Compare(first, chain) => {
            let mut lhs = eval_expr(first, ctx)?;
            for (op, rhs_expr) in chain {
                let rhs = eval_expr(rhs_expr, ctx)?;
                if !eval_cmp(*op, &lhs, &rhs)? {
                    return Ok(Value::Bool(false));
                }
                lhs = rhs;
            }
            Ok(Value::Bool(true))
        }

        // Short-circuit; the result is the deciding operand, not a bool.
        Expr::And(lhs, rhs) => {
            let l = eval_expr(lhs, ctx)?;
            if !l.is_truthy() {
                return Ok(l);
            }
            eval_expr(rhs, ctx)
        }
        Expr::Or(lhs, rhs) => {
            let l = eval_expr(lhs, ctx)?;
            if l.is_truthy() {
                return Ok(l);
            }
            eval_expr(rhs, ctx)
        }

        Expr::Index(target, index) => {
            let t = eval_expr(target, ctx)?;
            let i = eval_expr(index, ctx)?;
            t.index(&i)
        }

        Expr::Attr(target, name) => eval_expr(target, ctx)?.attr(name),

        Expr::Call(name, arg_exprs) => {
            // A binding with the same name shadows the built-in.
            if ctx.lookup(name).is_some() {
                return Err(EvalError::NotCallable(name.clone()));
            }
            if !is_builtin(name) {
                return Err(EvalError::UnknownName(name.clone()));
            }
            let mut args = Vec::with_capacity(arg_exprs.len());
            for ae in arg_exprs {
                args.push(eval_expr(ae, ctx)?);
            }
            call_builtin(name, args).unwrap_or_else(|| Err(EvalError::UnknownName(name.clone())))
        }
    }
}

fn eval_cmp(op: CmpOp, l: &Value, r: &Value) -> Result<bool, EvalError> {
    use std::cmp::Ordering;
    Ok(match op {
        CmpOp::Eq => l.loose_eq(r),
        CmpOp::Ne => !l.loose_eq(r),
        CmpOp::Lt => l.compare(r, "<")? == Some(Ordering::Less),
        CmpOp::Le => matches!(l.compare(r, "<=")?, Some(Ordering::Less | Ordering::Equal)),
        CmpOp::Gt => l.compare(r, ">")? == Some(Ordering::Greater),
        CmpOp::Ge => matches!(l.compare(r, ">=")?, Some(Ordering::Greater | Ordering::Equal)),
        CmpOp::In => r.contains(l)?,
        CmpOp::NotIn => !r.contains(l)?,
    })
}

/// Convenience: parse and evaluate an expression string.
pub fn eval_str(src: &str, ctx: &dyn EvalContext) -> Result<Value, EvalError> {
    let expr = parse_expr(src)?;
    eval_expr(&expr, ctx)
}

/// Fail-soft evaluation: every error becomes `None`.
///
/// Callers decide what absence means (print the raw text, report a
/// diagnostic, or treat it as false).
pub fn evaluate(src: &str, ctx: &dyn EvalContext) -> Option<Value> {
    match eval_str(src, ctx) {
        Ok(v) => Some(v),
        Err(e) => {
            trace!(expr = src, error = %e, "evaluation failed");
            None
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
