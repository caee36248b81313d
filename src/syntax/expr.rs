//! Tokenizer and parser for string steps.
//!
//! The language is deliberately small: literals, bare names, member access,
//! indexing, calls with argument lists, list literals and binary operators.
//! Every operator is sugar for a method call on its left operand, so the
//! evaluator only ever has to invoke operations by name.

use crate::error::{ChainError, Result};
use crate::value::Value;

/// Parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// `self`, the current receiver.
    SelfRef,
    /// Bare identifier. Resolved against the receiver, then against aliases.
    Name(String),
    /// Invocation of `name` on `target`, or on the receiver when `target` is
    /// `None`.
    Call {
        target: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    List(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Symbol(String),
    Op(&'static str),
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

/// Two-character operators first so `<<` never lexes as `<`, `<`.
const OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "<<", "<", ">", "+", "-", "*", "/", "%", "!",
];

/// Binary operators from loosest to tightest binding.
const PRECEDENCE: &[&[&str]] = &[
    &["==", "!="],
    &["<", ">", "<=", ">="],
    &["+", "-", "<<"],
    &["*", "/", "%"],
];

const KEYWORDS: &[&str] = &["self", "nil", "true", "false"];

/// Deepest nesting of groups, brackets, argument lists and prefix operators.
const MAX_DEPTH: usize = 64;

/// Parse `source` into an expression tree.
pub fn parse(source: &str) -> Result<Expr> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some((token, at)) => Err(invalid(source, *at, format!("unexpected {:?}", token))),
    }
}

fn invalid(source: &str, position: usize, message: impl Into<String>) -> ChainError {
    ChainError::InvalidExpression {
        expression: source.to_string(),
        position,
        message: message.into(),
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map_or(self.source.len(), |(at, _)| *at)
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            let start = self.offset();
            let token = match c {
                c if c.is_whitespace() => {
                    self.pos += 1;
                    continue;
                }
                c if is_ident_start(c) => Token::Ident(self.identifier()),
                c if c.is_ascii_digit() => self.number(start)?,
                '\'' | '"' => Token::Str(self.string(c, start)?),
                ':' => self.symbol(start)?,
                '.' => self.single(Token::Dot),
                ',' => self.single(Token::Comma),
                '(' => self.single(Token::LParen),
                ')' => self.single(Token::RParen),
                '[' => self.single(Token::LBracket),
                ']' => self.single(Token::RBracket),
                _ => Token::Op(self.operator(start)?),
            };
            tokens.push((token, start));
        }
        Ok(tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    /// Identifier, keeping a trailing `?` or `!` unless it starts `!=`.
    fn identifier(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            name.push(c);
            self.pos += 1;
        }
        if let Some(suffix) = self.peek().filter(|c| matches!(c, '?' | '!')) {
            if self.peek_at(1) != Some('=') {
                name.push(suffix);
                self.pos += 1;
            }
        }
        name
    }

    fn number(&mut self, start: usize) -> Result<Token> {
        let mut text = String::new();
        while let Some(c) = self.peek().filter(|c| c.is_ascii_digit() || *c == '_') {
            if c != '_' {
                text.push(c);
            }
            self.pos += 1;
        }
        let is_float = self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit());
        if !is_float {
            return text
                .parse()
                .map(Token::Int)
                .map_err(|e| invalid(self.source, start, e.to_string()));
        }
        text.push('.');
        self.pos += 1;
        while let Some(c) = self.peek().filter(|c| c.is_ascii_digit()) {
            text.push(c);
            self.pos += 1;
        }
        text.parse()
            .map(Token::Float)
            .map_err(|e| invalid(self.source, start, e.to_string()))
    }

    fn string(&mut self, quote: char, start: usize) -> Result<String> {
        self.pos += 1;
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(invalid(self.source, start, "unterminated string"));
            };
            self.pos += 1;
            match c {
                c if c == quote => return Ok(out),
                '\\' => {
                    let Some(escaped) = self.peek() else {
                        return Err(invalid(self.source, start, "unterminated string"));
                    };
                    self.pos += 1;
                    match (quote, escaped) {
                        ('"', 'n') => out.push('\n'),
                        ('"', 't') => out.push('\t'),
                        (_, e) if e == quote || e == '\\' => out.push(e),
                        (_, e) => {
                            out.push('\\');
                            out.push(e);
                        }
                    }
                }
                c => out.push(c),
            }
        }
    }

    fn symbol(&mut self, start: usize) -> Result<Token> {
        self.pos += 1;
        match self.peek() {
            Some(c) if is_ident_start(c) => Ok(Token::Symbol(self.identifier())),
            Some('[') if self.peek_at(1) == Some(']') => {
                self.pos += 2;
                Ok(Token::Symbol("[]".to_string()))
            }
            Some('"' | '\'') => {
                let quote = self.peek().unwrap_or('"');
                Ok(Token::Symbol(self.string(quote, start)?))
            }
            _ => Err(invalid(self.source, start, "expected symbol name after `:`")),
        }
    }

    fn operator(&mut self, start: usize) -> Result<&'static str> {
        let source = self.source;
        let rest = &source[start..];
        let Some(op) = OPERATORS.iter().copied().find(|op| rest.starts_with(*op)) else {
            let c = self.peek().unwrap_or_default();
            return Err(invalid(source, start, format!("unexpected character {:?}", c)));
        };
        self.pos += op.chars().count();
        Ok(op)
    }
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source.len(), |(_, at)| *at)
    }

    fn error(&self, message: impl Into<String>) -> ChainError {
        invalid(self.source, self.offset(), message)
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error("expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}", expected)))
        }
    }

    fn expression(&mut self) -> Result<Expr> {
        if let Some(command) = self.command()? {
            return Ok(command);
        }
        self.binary(0)
    }

    /// `name arg, arg` with no parentheses, calling `name` on the receiver.
    fn command(&mut self) -> Result<Option<Expr>> {
        let Some(Token::Ident(name)) = self.peek() else {
            return Ok(None);
        };
        if KEYWORDS.contains(&name.as_str()) {
            return Ok(None);
        }
        let starts_argument = match self.peek_at(1) {
            Some(
                Token::Ident(_) | Token::Int(_) | Token::Float(_) | Token::Str(_) | Token::Symbol(_),
            ) => true,
            _ => false,
        };
        if !starts_argument {
            return Ok(None);
        }
        let name = name.clone();
        self.pos += 1;
        let args = self.arguments(None)?;
        Ok(Some(Expr::Call {
            target: None,
            name,
            args,
        }))
    }

    /// Comma-separated expressions up to `close`, or to the end of input.
    fn arguments(&mut self, close: Option<&Token>) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        if close.is_some() && self.peek() == close {
            return Ok(args);
        }
        loop {
            args.push(self.nested(|p| p.binary(0))?);
            if !self.eat(&Token::Comma) {
                return Ok(args);
            }
        }
    }

    fn binary(&mut self, level: usize) -> Result<Expr> {
        let Some(ops) = PRECEDENCE.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary(level + 1)?;
        while let Some(Token::Op(op)) = self.peek() {
            let op = *op;
            if !ops.contains(&op) {
                break;
            }
            self.pos += 1;
            let rhs = self.binary(level + 1)?;
            lhs = Expr::Call {
                target: Some(Box::new(lhs)),
                name: op.to_string(),
                args: vec![rhs],
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Some(Token::Op("-")) => "-@",
            Some(Token::Op("!")) => "!",
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.nested(Self::unary)?;
        Ok(match (op, operand) {
            ("-@", Expr::Literal(Value::Int(i))) => Expr::Literal(Value::Int(-i)),
            ("-@", Expr::Literal(Value::Float(f))) => Expr::Literal(Value::Float(-f)),
            (op, operand) => Expr::Call {
                target: Some(Box::new(operand)),
                name: op.to_string(),
                args: Vec::new(),
            },
        })
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let Some(Token::Ident(name)) = self.peek() else {
                    return Err(self.error("expected name after `.`"));
                };
                let name = name.clone();
                self.pos += 1;
                let args = self.call_arguments()?.unwrap_or_default();
                expr = Expr::Call {
                    target: Some(Box::new(expr)),
                    name,
                    args,
                };
            } else if self.eat(&Token::LBracket) {
                let args = self.arguments(Some(&Token::RBracket))?;
                self.expect(Token::RBracket)?;
                expr = Expr::Call {
                    target: Some(Box::new(expr)),
                    name: "[]".to_string(),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    /// `( args )` directly after a name, if present.
    fn call_arguments(&mut self) -> Result<Option<Vec<Expr>>> {
        if !self.eat(&Token::LParen) {
            return Ok(None);
        }
        let args = self.arguments(Some(&Token::RParen))?;
        self.expect(Token::RParen)?;
        Ok(Some(args))
    }

    fn primary(&mut self) -> Result<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error("unexpected end of expression"));
        };
        self.pos += 1;
        Ok(match token {
            Token::Int(i) => Expr::Literal(Value::Int(i)),
            Token::Float(f) => Expr::Literal(Value::Float(f)),
            Token::Str(s) => Expr::Literal(Value::Str(s)),
            Token::Symbol(s) => Expr::Literal(Value::Symbol(s)),
            Token::Ident(name) => match name.as_str() {
                "self" => Expr::SelfRef,
                "nil" => Expr::Literal(Value::Nil),
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                _ => match self.call_arguments()? {
                    Some(args) => Expr::Call {
                        target: None,
                        name,
                        args,
                    },
                    None => Expr::Name(name),
                },
            },
            Token::LParen => {
                let inner = self.nested(|p| p.binary(0))?;
                self.expect(Token::RParen)?;
                inner
            }
            Token::LBracket => {
                let items = self.arguments(Some(&Token::RBracket))?;
                self.expect(Token::RBracket)?;
                Expr::List(items)
            }
            other => {
                self.pos -= 1;
                return Err(self.error(format!("unexpected {:?}", other)));
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(target: Option<Expr>, name: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            target: target.map(Box::new),
            name: name.to_string(),
            args,
        }
    }

    fn name(n: &str) -> Expr {
        Expr::Name(n.to_string())
    }

    #[test]
    fn test_bare_name() {
        assert_eq!(parse("bookstore").unwrap(), name("bookstore"));
        assert_eq!(parse("nil?").unwrap(), name("nil?"));
    }

    #[test]
    fn test_index_with_symbol() {
        assert_eq!(
            parse("shelves[:programing]").unwrap(),
            call(
                Some(name("shelves")),
                "[]",
                vec![Expr::Literal(Value::symbol("programing"))]
            )
        );
    }

    #[test]
    fn test_member_access_inside_index() {
        assert_eq!(
            parse("books[shelf.recommended_book_num]").unwrap(),
            call(
                Some(name("books")),
                "[]",
                vec![call(Some(name("shelf")), "recommended_book_num", vec![])]
            )
        );
    }

    #[test]
    fn test_call_with_arguments() {
        assert_eq!(
            parse("say(b.speaker, 'Cool')").unwrap(),
            call(
                None,
                "say",
                vec![
                    call(Some(name("b")), "speaker", vec![]),
                    Expr::Literal(Value::from("Cool")),
                ]
            )
        );
    }

    #[test]
    fn test_command_without_parentheses() {
        assert_eq!(
            parse("concat '/DC', 'x'").unwrap(),
            call(
                None,
                "concat",
                vec![Expr::Literal(Value::from("/DC")), Expr::Literal(Value::from("x"))]
            )
        );
    }

    #[test]
    fn test_operator_precedence() {
        let expr = parse("self + 2 * 3 == 7").unwrap();
        let product = call(Some(Expr::Literal(Value::Int(2))), "*", vec![Expr::Literal(Value::Int(3))]);
        let sum = call(Some(Expr::SelfRef), "+", vec![product]);
        assert_eq!(expr, call(Some(sum), "==", vec![Expr::Literal(Value::Int(7))]));
    }

    #[test]
    fn test_shift_is_one_operator() {
        assert_eq!(
            parse("self << ' Zeppelin'").unwrap(),
            call(Some(Expr::SelfRef), "<<", vec![Expr::Literal(Value::from(" Zeppelin"))])
        );
    }

    #[test]
    fn test_negative_literal_and_list() {
        assert_eq!(
            parse("[1, -2, 3.5]").unwrap(),
            Expr::List(vec![
                Expr::Literal(Value::Int(1)),
                Expr::Literal(Value::Int(-2)),
                Expr::Literal(Value::Float(3.5)),
            ])
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            parse(r#""a\"b""#).unwrap(),
            Expr::Literal(Value::from("a\"b"))
        );
        assert_eq!(parse(r"'it\'s'").unwrap(), Expr::Literal(Value::from("it's")));
    }

    #[test]
    fn test_not_equal_after_predicate_name() {
        assert_eq!(
            parse("a!=b").unwrap(),
            call(Some(name("a")), "!=", vec![name("b")])
        );
    }

    #[test]
    fn test_errors_carry_position() {
        match parse("books[1").unwrap_err() {
            ChainError::InvalidExpression { position, .. } => assert_eq!(position, 7),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(parse("'open").is_err());
        assert!(parse("a b c").is_err());
        assert!(parse("$x").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let at_limit = "(".repeat(MAX_DEPTH) + "1" + &")".repeat(MAX_DEPTH);
        assert_eq!(parse(&at_limit).unwrap(), Expr::Literal(Value::Int(1)));

        let past_limit = "(".repeat(MAX_DEPTH + 1) + "1" + &")".repeat(MAX_DEPTH + 1);
        match parse(&past_limit).unwrap_err() {
            ChainError::InvalidExpression { position, message, .. } => {
                assert_eq!(position, MAX_DEPTH + 1);
                assert_eq!(message, "expression nested too deeply");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(parse(&"!".repeat(100_000)).is_err());
        assert!(parse(&"[".repeat(100_000)).is_err());
    }
}
