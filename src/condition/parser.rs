//! Recursive-descent parser producing the boolean expression AST.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr    := or
//! or      := and ( ("or" | "||") and )*
//! and     := unary ( ("and" | "&&") unary )*
//! unary   := ("not" | "!") unary | compare
//! compare := operand ( ("==" | "!=") operand | "not"? "in" operand )?
//! operand := IDENT | STRING | INT | "true" | "false"
//!          | "(" expr ")" | "[" ( operand ("," operand)* )? "]"
//! ```

use super::lexer::Token;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    In,
    NotIn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ref(String),
    List(Vec<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare { op: CompareOp, left: Box<Expr>, right: Box<Expr> },
}

impl Expr {
    /// Appends every context name referenced by the expression, in source order.
    pub fn collect_references(&self, out: &mut Vec<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ref(name) => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            Expr::List(items) => items.iter().for_each(|item| item.collect_references(out)),
            Expr::Not(inner) => inner.collect_references(out),
            Expr::And(left, right) | Expr::Or(left, right) => {
                left.collect_references(out);
                right.collect_references(out);
            }
            Expr::Compare { left, right, .. } => {
                left.collect_references(out);
                right.collect_references(out);
            }
        }
    }
}

/// Cursor over a token slice.
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    pub fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn expect(&mut self, expected: &Token) -> Result<(), String> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => {
                Err(format!("expected {} but found {}", expected.describe(), token.describe()))
            }
            None => Err(format!("expected {} but reached end of input", expected.describe())),
        }
    }

    pub fn parse_expression(&mut self) -> Result<Expr, String> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_compare()
    }

    fn parse_compare(&mut self) -> Result<Expr, String> {
        let left = self.parse_operand()?;
        let op = match (self.peek(), self.peek_at(1)) {
            (Some(Token::Eq), _) => CompareOp::Eq,
            (Some(Token::Ne), _) => CompareOp::Ne,
            (Some(Token::In), _) => CompareOp::In,
            (Some(Token::Not), Some(Token::In)) => {
                self.advance();
                CompareOp::NotIn
            }
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_operand()?;
        Ok(Expr::Compare { op, left: Box::new(left), right: Box::new(right) })
    }

    pub fn parse_operand(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(Expr::Ref(name.clone())),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::Str(s.clone()))),
            Some(Token::Int(n)) => Ok(Expr::Literal(Value::Int(*n))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::LParen) => {
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                if self.peek() == Some(&Token::RBracket) {
                    self.advance();
                    return Ok(Expr::List(items));
                }
                loop {
                    items.push(self.parse_operand()?);
                    match self.advance() {
                        Some(Token::Comma) => continue,
                        Some(Token::RBracket) => break,
                        Some(token) => {
                            return Err(format!(
                                "expected ',' or ']' in list but found {}",
                                token.describe()
                            ))
                        }
                        None => return Err("unterminated list".into()),
                    }
                }
                Ok(Expr::List(items))
            }
            Some(token) => Err(format!("unexpected {}", token.describe())),
            None => Err("unexpected end of expression".into()),
        }
    }
}

/// Parses a complete token sequence into one expression.
pub fn parse(tokens: &[Token]) -> Result<Expr, String> {
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(format!("unexpected trailing {}", token.describe())),
    }
}
