//! Conditional-activation predicates.
//!
//! A small expression language for `enable_if` strings, evaluated against a
//! context mapping of named values:
//!
//! ```text
//! expr    := or ;             or  := and ( "or" and )* ;
//! and     := unary ( "and" unary )* ;
//! unary   := "not" unary | cmp ;
//! cmp     := operand ( ("=="|"!="|"<="|">="|"<"|">") operand )? ;
//! operand := literal | identifier | "(" expr ")" ;
//! literal := number | quoted string | "true" | "false" | "null" ;
//! ```
//!
//! Identifiers resolve against the context; a missing identifier, a
//! non-boolean result, or a type-confused comparison is an evaluation
//! error. Connectives evaluate both operands (no short-circuit), so a type
//! error on either side always surfaces. The only caller treats every
//! failure as "source disabled" (see source.rs).

use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, Result};

/// A parsed `enable_if` expression, ready to evaluate against a context.
#[derive(Debug, Clone)]
pub struct Predicate {
    root: Expr,
}

impl Predicate {
    /// Parse an expression string.
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { tokens, position: 0 };
        let root = parser.expr()?;
        if let Some(token) = parser.peek() {
            return Err(invalid(format!("unexpected trailing {token:?}")));
        }
        Ok(Predicate { root })
    }

    /// Evaluate against a context mapping. The expression must produce a
    /// boolean.
    pub fn eval(&self, context: &Mapping) -> Result<bool> {
        match eval_expr(&self.root, context)? {
            Scalar::Bool(b) => Ok(b),
            other => Err(invalid(format!("expression result {other:?} is not a boolean"))),
        }
    }
}

#[derive(Debug, Clone)]
enum Expr {
    Literal(Scalar),
    Var(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// The value domain expressions evaluate in.
#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
}

fn invalid(message: String) -> ConfigError {
    ConfigError::InvalidContext(message)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Str(String),
    Bool(bool),
    Null,
    And,
    Or,
    Not,
    Cmp(CmpOp),
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Cmp(CmpOp::Eq));
                    i += 2;
                } else {
                    return Err(invalid(format!("unexpected '=' at offset {i}")));
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Cmp(CmpOp::Ne));
                    i += 2;
                } else {
                    return Err(invalid(format!("unexpected '!' at offset {i}")));
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Cmp(CmpOp::Le));
                    i += 2;
                } else {
                    tokens.push(Token::Cmp(CmpOp::Lt));
                    i += 1;
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Cmp(CmpOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Cmp(CmpOp::Gt));
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && bytes[end] as char != quote {
                    end += 1;
                }
                if end == bytes.len() {
                    return Err(invalid(format!("unterminated string at offset {i}")));
                }
                tokens.push(Token::Str(text[start..end].to_string()));
                i = end + 1;
            }
            _ if c.is_ascii_digit() || c == '-' || c == '.' => {
                let start = i;
                i += 1;
                while i < bytes.len() && ((bytes[i] as char).is_ascii_digit() || bytes[i] == b'.') {
                    i += 1;
                }
                let number = text[start..i]
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("invalid number {:?}", &text[start..i])))?;
                tokens.push(Token::Number(number));
            }
            _ if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                i += 1;
                while i < bytes.len()
                    && ((bytes[i] as char).is_ascii_alphanumeric() || bytes[i] == b'_')
                {
                    i += 1;
                }
                tokens.push(match &text[start..i] {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    "true" => Token::Bool(true),
                    "false" => Token::Bool(false),
                    "null" => Token::Null,
                    ident => Token::Ident(ident.to_string()),
                });
            }
            _ => return Err(invalid(format!("unexpected character {c:?} at offset {i}"))),
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expr(&mut self) -> Result<Expr> {
        let mut lhs = self.and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.next();
            let rhs = self.and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.next();
            let rhs = self.unary()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.next();
            let operand = self.unary()?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.cmp()
    }

    fn cmp(&mut self) -> Result<Expr> {
        let lhs = self.operand()?;
        if let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.next();
            let rhs = self.operand()?;
            return Ok(Expr::Cmp(op, Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn operand(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Scalar::Num(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Scalar::Str(s))),
            Some(Token::Bool(b)) => Ok(Expr::Literal(Scalar::Bool(b))),
            Some(Token::Null) => Ok(Expr::Literal(Scalar::Null)),
            Some(Token::Ident(name)) => Ok(Expr::Var(name)),
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(invalid("missing closing parenthesis".to_string())),
                }
            }
            Some(token) => Err(invalid(format!("unexpected {token:?}"))),
            None => Err(invalid("unexpected end of expression".to_string())),
        }
    }
}

fn eval_expr(expr: &Expr, context: &Mapping) -> Result<Scalar> {
    match expr {
        Expr::Literal(scalar) => Ok(scalar.clone()),
        Expr::Var(name) => resolve(name, context),
        Expr::Not(operand) => match eval_expr(operand, context)? {
            Scalar::Bool(b) => Ok(Scalar::Bool(!b)),
            other => Err(invalid(format!("cannot negate {other:?}"))),
        },
        Expr::And(lhs, rhs) => {
            let lhs = eval_bool(lhs, context)?;
            let rhs = eval_bool(rhs, context)?;
            Ok(Scalar::Bool(lhs && rhs))
        }
        Expr::Or(lhs, rhs) => {
            let lhs = eval_bool(lhs, context)?;
            let rhs = eval_bool(rhs, context)?;
            Ok(Scalar::Bool(lhs || rhs))
        }
        Expr::Cmp(op, lhs, rhs) => {
            let lhs = eval_expr(lhs, context)?;
            let rhs = eval_expr(rhs, context)?;
            compare(*op, &lhs, &rhs).map(Scalar::Bool)
        }
    }
}

fn eval_bool(expr: &Expr, context: &Mapping) -> Result<bool> {
    match eval_expr(expr, context)? {
        Scalar::Bool(b) => Ok(b),
        other => Err(invalid(format!("connective operand {other:?} is not a boolean"))),
    }
}

fn resolve(name: &str, context: &Mapping) -> Result<Scalar> {
    let value = context
        .get(&Value::from(name))
        .ok_or_else(|| invalid(format!("unknown identifier {name:?}")))?;
    match value {
        Value::Null => Ok(Scalar::Null),
        Value::Bool(b) => Ok(Scalar::Bool(*b)),
        Value::Number(n) => n
            .as_f64()
            .map(Scalar::Num)
            .ok_or_else(|| invalid(format!("identifier {name:?} is not a finite number"))),
        Value::String(s) => Ok(Scalar::Str(s.clone())),
        _ => Err(invalid(format!("identifier {name:?} resolves to a container"))),
    }
}

fn compare(op: CmpOp, lhs: &Scalar, rhs: &Scalar) -> Result<bool> {
    use std::cmp::Ordering;
    let ordering = match (lhs, rhs) {
        (Scalar::Num(a), Scalar::Num(b)) => a.partial_cmp(b),
        (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
        (Scalar::Bool(a), Scalar::Bool(b)) if matches!(op, CmpOp::Eq | CmpOp::Ne) => {
            Some(if a == b { Ordering::Equal } else { Ordering::Less })
        }
        (Scalar::Null, Scalar::Null) if matches!(op, CmpOp::Eq | CmpOp::Ne) => {
            Some(Ordering::Equal)
        }
        _ => None,
    };
    let Some(ordering) = ordering else {
        return Err(invalid(format!("cannot compare {lhs:?} and {rhs:?}")));
    };
    Ok(match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(s: &str) -> Mapping {
        serde_yaml::from_str(s).unwrap()
    }

    fn eval(text: &str, ctx: &str) -> Result<bool> {
        Predicate::parse(text)?.eval(&context(ctx))
    }

    #[test]
    fn equality_against_context() {
        assert!(eval("flag == 2", "{flag: 2}").unwrap());
        assert!(!eval("flag == 2", "{flag: 3}").unwrap());
    }

    #[test]
    fn numeric_comparisons_cross_int_and_float() {
        assert!(eval("count >= 1.5", "{count: 2}").unwrap());
        assert!(eval("count < 10", "{count: 9.25}").unwrap());
    }

    #[test]
    fn string_comparisons_are_lexicographic() {
        assert!(eval("env == 'prod'", "{env: prod}").unwrap());
        assert!(eval("'a' < 'b'", "{}").unwrap());
        assert!(eval("env != \"dev\"", "{env: prod}").unwrap());
    }

    #[test]
    fn bare_boolean_identifier() {
        assert!(eval("enabled", "{enabled: true}").unwrap());
        assert!(!eval("enabled", "{enabled: false}").unwrap());
    }

    #[test]
    fn bare_non_boolean_identifier_is_an_error() {
        assert!(eval("count", "{count: 3}").is_err());
    }

    #[test]
    fn connective_precedence() {
        // and binds tighter than or
        assert!(eval("true or false and false", "{}").unwrap());
        // not binds tighter than and
        assert!(!eval("not true and true", "{}").unwrap());
        assert!(eval("not (true and false)", "{}").unwrap());
    }

    #[test]
    fn null_supports_equality_only() {
        assert!(eval("x == null", "{x: null}").unwrap());
        assert!(!eval("x != null", "{x: null}").unwrap());
        assert!(eval("x < null", "{x: null}").is_err());
    }

    #[test]
    fn missing_identifier_is_an_error() {
        assert!(eval("missing == 1", "{}").is_err());
    }

    #[test]
    fn container_identifier_is_an_error() {
        assert!(eval("x == 1", "{x: [1]}").is_err());
    }

    #[test]
    fn type_confused_comparison_is_an_error() {
        assert!(eval("1 == 'x'", "{}").is_err());
        assert!(eval("flag == 'x'", "{flag: true}").is_err());
    }

    #[test]
    fn connectives_evaluate_both_sides() {
        assert!(eval("true or missing == 1", "{}").is_err());
    }

    #[test]
    fn negative_numbers_parse() {
        assert!(eval("x == -1", "{x: -1}").unwrap());
    }

    #[test]
    fn parse_errors() {
        assert!(Predicate::parse("a ==").is_err());
        assert!(Predicate::parse("a == 1 extra").is_err());
        assert!(Predicate::parse("(a == 1").is_err());
        assert!(Predicate::parse("a ? b").is_err());
        assert!(Predicate::parse("'unterminated").is_err());
    }
}
