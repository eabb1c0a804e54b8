//! A tiny, dependency-free parser and evaluator for the Boolean expression sublanguage used in
//! preconditions, effect guards and goals.
//!
//! Grammar (highest to lowest precedence):
//!
//! ```text
//! primary    := "True" | "False" | integer | float | 'string' | "string" | ident | "(" or ")"
//! equality   := primary [ "==" primary ]
//! unary      := "not" unary | equality
//! conjunct   := unary ( "and" unary )*
//! disjunct   := conjunct ( "or" conjunct )*
//! expression := disjunct
//! ```

use std::fmt;

use crate::error::{Error, Result};
use crate::state::State;
use crate::value::Value;

/// A parsed expression, ready to be evaluated against any number of states.
#[derive(Debug, Clone)]
pub struct CompiledExpr {
    text: String,
    ast: Expr,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Lit(Value),
    Var(String),
    Not(Box<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl CompiledExpr {
    /// Parses `text` once. An empty string is accepted and always evaluates to `Bool(true)`,
    /// matching the "empty precondition means always applicable" convention.
    pub fn compile(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(CompiledExpr {
                text: text.to_string(),
                ast: Expr::Lit(Value::Bool(true)),
            });
        }
        let tokens = tokenize(text).map_err(|cause| Error::InvalidExpression {
            text: text.to_string(),
            cause,
        })?;
        let mut parser = Parser { tokens: &tokens, pos: 0 };
        let ast = parser.parse_expr().map_err(|cause| Error::InvalidExpression {
            text: text.to_string(),
            cause,
        })?;
        parser.expect_end().map_err(|cause| Error::InvalidExpression {
            text: text.to_string(),
            cause,
        })?;
        Ok(CompiledExpr { text: text.to_string(), ast })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Evaluates the expression against `state`, returning the raw [`Value`] it reduces to.
    pub fn eval(&self, state: &State) -> Result<Value> {
        eval_node(&self.ast, state)
    }

    /// Evaluates the expression and interprets the result per [`Value::truthy`]. This is what
    /// preconditions and goals actually use.
    pub fn eval_bool(&self, state: &State) -> Result<bool> {
        Ok(self.eval(state)?.truthy())
    }
}

impl fmt::Display for CompiledExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

fn eval_node(e: &Expr, state: &State) -> Result<Value> {
    match e {
        Expr::Lit(v) => Ok(v.clone()),
        Expr::Var(name) => state
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnboundVariable(name.clone())),
        Expr::Not(inner) => Ok(Value::Bool(!eval_node(inner, state)?.truthy())),
        Expr::Eq(a, b) => {
            let a = eval_node(a, state)?;
            let b = eval_node(b, state)?;
            Ok(Value::Bool(a == b))
        }
        Expr::And(terms) => {
            for t in terms {
                if !eval_node(t, state)?.truthy() {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Expr::Or(terms) => {
            for t in terms {
                if eval_node(t, state)?.truthy() {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
    }
}

// ---------------------------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    True,
    False,
    Not,
    And,
    Or,
    EqEq,
    LParen,
    RParen,
    Int(i64),
    Real(f64),
    Str(String),
    Ident(String),
}

fn tokenize(text: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    let mut tokens = Vec::new();
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::EqEq);
                    i += 2;
                } else {
                    return Err(format!("unexpected character '=' at offset {i} (did you mean '==')"));
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != quote {
                    j += 1;
                }
                if j >= chars.len() {
                    return Err(format!("unterminated string literal starting at offset {i}"));
                }
                let s: String = chars[start..j].iter().collect();
                tokens.push(Token::Str(s));
                i = j + 1;
            }
            _ if c.is_ascii_digit() => {
                let start = i;
                let mut j = i;
                let mut is_float = false;
                while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                    if chars[j] == '.' {
                        is_float = true;
                    }
                    j += 1;
                }
                let lexeme: String = chars[start..j].iter().collect();
                if is_float {
                    let v: f64 = lexeme
                        .parse()
                        .map_err(|_| format!("invalid float literal '{lexeme}'"))?;
                    tokens.push(Token::Real(v));
                } else {
                    let v: i64 = lexeme
                        .parse()
                        .map_err(|_| format!("invalid integer literal '{lexeme}'"))?;
                    tokens.push(Token::Int(v));
                }
                i = j;
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                let mut j = i;
                while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                let lexeme: String = chars[start..j].iter().collect();
                tokens.push(match lexeme.as_str() {
                    "True" => Token::True,
                    "False" => Token::False,
                    "not" => Token::Not,
                    "and" => Token::And,
                    "or" => Token::Or,
                    _ => Token::Ident(lexeme),
                });
                i = j;
            }
            other => return Err(format!("unexpected character '{other}' at offset {i}")),
        }
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------------------------
// Recursive-descent parser
// ---------------------------------------------------------------------------------------------

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

type PResult<T> = std::result::Result<T, String>;

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect_end(&self) -> PResult<()> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(format!("unexpected trailing token {:?}", self.tokens[self.pos]))
        }
    }

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut terms = vec![self.parse_and()?];
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 { terms.pop().unwrap() } else { Expr::Or(terms) })
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut terms = vec![self.parse_not()?];
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            terms.push(self.parse_not()?);
        }
        Ok(if terms.len() == 1 { terms.pop().unwrap() } else { Expr::And(terms) })
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_equality()
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        let lhs = self.parse_primary()?;
        if matches!(self.peek(), Some(Token::EqEq)) {
            self.advance();
            let rhs = self.parse_primary()?;
            return Ok(Expr::Eq(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        match self.advance() {
            Some(Token::True) => Ok(Expr::Lit(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Lit(Value::Bool(false))),
            Some(Token::Int(i)) => Ok(Expr::Lit(Value::Int(*i))),
            Some(Token::Real(r)) => Ok(Expr::Lit(Value::Real(*r))),
            Some(Token::Str(s)) => Ok(Expr::Lit(Value::Str(s.clone()))),
            Some(Token::Ident(name)) => Ok(Expr::Var(name.clone())),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    other => Err(format!("expected ')', found {other:?}")),
                }
            }
            other => Err(format!("expected an expression, found {other:?}")),
        }
    }
}
