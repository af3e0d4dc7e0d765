// tamarin-parser - Parser for Tamarin
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Pratt parser for Tamarin source code.
//!
//! Builds an [`ast::Program`](crate::ast::Program) from a token stream.
//! Parsing stops at the first error; the error carries the source position
//! the lexer had reached.

use std::fmt;

use crate::ast::{Block, Expr, Program, Stmt};
use crate::lexer::{Lexer, LexerError, Token};

/// Parser error with position information.
#[derive(Debug, Clone)]
pub struct ParserError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parse error at {}:{}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for ParserError {}

impl From<LexerError> for ParserError {
    fn from(err: LexerError) -> Self {
        ParserError {
            message: err.message,
            line: err.line,
            column: err.column,
        }
    }
}

/// Result type for parsing.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Operator binding strengths, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,      // == !=
    LessGreater, // < >
    Sum,         // + -
    Product,     // * /
    Prefix,      // -x !x
    Call,        // f(x)
    Index,       // xs[i]
}

fn token_precedence(token: &Token) -> Precedence {
    match token {
        Token::Eq | Token::NotEq => Precedence::Equals,
        Token::Lt | Token::Gt => Precedence::LessGreater,
        Token::Plus | Token::Minus => Precedence::Sum,
        Token::Asterisk | Token::Slash => Precedence::Product,
        Token::LParen => Precedence::Call,
        Token::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

/// The parser holds the lexer plus a two-token lookahead window.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    cur_token: Token,
    peek_token: Token,
}

impl<'a> Parser<'a> {
    /// Create a parser for the given source, priming the lookahead window.
    pub fn new(source: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let cur_token = lexer.next_token()?;
        let peek_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            cur_token,
            peek_token,
        })
    }

    /// Parse a whole program.
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut program = Program::default();
        while self.cur_token != Token::Eof {
            program.statements.push(self.parse_statement()?);
            self.next_token()?;
        }
        Ok(program)
    }

    fn next_token(&mut self) -> Result<()> {
        self.cur_token = std::mem::replace(&mut self.peek_token, self.lexer.next_token()?);
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ParserError {
        let (line, column) = self.lexer.position();
        ParserError {
            message: message.into(),
            line,
            column,
        }
    }

    /// Advance past `expected` in peek position, or fail.
    fn expect_peek(&mut self, expected: Token) -> Result<()> {
        if self.peek_token == expected {
            self.next_token()
        } else {
            Err(self.error(format!(
                "expected '{}', got '{}'",
                expected, self.peek_token
            )))
        }
    }

    fn parse_statement(&mut self) -> Result<Stmt> {
        match self.cur_token {
            Token::Let => self.parse_let_statement(),
            Token::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Result<Stmt> {
        self.next_token()?;
        let name = match &self.cur_token {
            Token::Ident(name) => name.clone(),
            other => return Err(self.error(format!("expected identifier, got '{}'", other))),
        };
        self.expect_peek(Token::Assign)?;
        self.next_token()?;
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_token == Token::Semicolon {
            self.next_token()?;
        }
        Ok(Stmt::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Result<Stmt> {
        self.next_token()?;
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_token == Token::Semicolon {
            self.next_token()?;
        }
        Ok(Stmt::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        if self.peek_token == Token::Semicolon {
            self.next_token()?;
        }
        Ok(Stmt::Expr(expr))
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expr> {
        let mut left = self.parse_prefix()?;

        while self.peek_token != Token::Semicolon
            && precedence < token_precedence(&self.peek_token)
        {
            left = match self.peek_token {
                Token::LParen => {
                    self.next_token()?;
                    self.parse_call_expression(left)?
                }
                Token::LBracket => {
                    self.next_token()?;
                    self.parse_index_expression(left)?
                }
                _ => {
                    self.next_token()?;
                    self.parse_infix_expression(left)?
                }
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        match self.cur_token.clone() {
            Token::Int(n) => Ok(Expr::Int(n)),
            Token::String(s) => Ok(Expr::String(s)),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::Bang => self.parse_prefix_expression("!"),
            Token::Minus => self.parse_prefix_expression("-"),
            Token::LParen => self.parse_grouped_expression(),
            Token::If => self.parse_if_expression(),
            Token::Function => self.parse_function_literal(),
            Token::LBracket => self.parse_array_literal(),
            Token::LBrace => self.parse_hash_literal(),
            other => Err(self.error(format!("unexpected token '{}' in expression", other))),
        }
    }

    fn parse_prefix_expression(&mut self, operator: &str) -> Result<Expr> {
        self.next_token()?;
        let right = self.parse_expression(Precedence::Prefix)?;
        Ok(Expr::Prefix {
            operator: operator.to_string(),
            right: Box::new(right),
        })
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Result<Expr> {
        let operator = self.cur_token.to_string();
        let precedence = token_precedence(&self.cur_token);
        self.next_token()?;
        let right = self.parse_expression(precedence)?;
        Ok(Expr::Infix {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Result<Expr> {
        self.next_token()?;
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(Token::RParen)?;
        Ok(expr)
    }

    fn parse_if_expression(&mut self) -> Result<Expr> {
        self.expect_peek(Token::LParen)?;
        self.next_token()?;
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(Token::RParen)?;
        self.expect_peek(Token::LBrace)?;
        let consequence = self.parse_block()?;

        let alternative = if self.peek_token == Token::Else {
            self.next_token()?;
            self.expect_peek(Token::LBrace)?;
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Expr::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    /// Parse a `{ ... }` block; the current token must be the opening brace.
    fn parse_block(&mut self) -> Result<Block> {
        let mut block = Block::default();
        self.next_token()?;
        while self.cur_token != Token::RBrace {
            if self.cur_token == Token::Eof {
                return Err(self.error("unexpected end of input in block"));
            }
            block.statements.push(self.parse_statement()?);
            self.next_token()?;
        }
        Ok(block)
    }

    fn parse_function_literal(&mut self) -> Result<Expr> {
        self.expect_peek(Token::LParen)?;
        let parameters = self.parse_function_parameters()?;
        self.expect_peek(Token::LBrace)?;
        let body = self.parse_block()?;
        Ok(Expr::Function { parameters, body })
    }

    fn parse_function_parameters(&mut self) -> Result<Vec<String>> {
        let mut parameters = Vec::new();

        if self.peek_token == Token::RParen {
            self.next_token()?;
            return Ok(parameters);
        }

        loop {
            self.next_token()?;
            match &self.cur_token {
                Token::Ident(name) => parameters.push(name.clone()),
                other => {
                    return Err(self.error(format!("expected parameter name, got '{}'", other)));
                }
            }
            if self.peek_token != Token::Comma {
                break;
            }
            self.next_token()?;
        }

        self.expect_peek(Token::RParen)?;
        Ok(parameters)
    }

    fn parse_call_expression(&mut self, function: Expr) -> Result<Expr> {
        let arguments = self.parse_expression_list(Token::RParen)?;
        Ok(Expr::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_index_expression(&mut self, left: Expr) -> Result<Expr> {
        self.next_token()?;
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek(Token::RBracket)?;
        Ok(Expr::Index {
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    fn parse_array_literal(&mut self) -> Result<Expr> {
        let elements = self.parse_expression_list(Token::RBracket)?;
        Ok(Expr::Array(elements))
    }

    /// Parse a comma-separated expression list up to `end`; the current
    /// token must be the opening delimiter.
    fn parse_expression_list(&mut self, end: Token) -> Result<Vec<Expr>> {
        let mut list = Vec::new();

        if self.peek_token == end {
            self.next_token()?;
            return Ok(list);
        }

        self.next_token()?;
        list.push(self.parse_expression(Precedence::Lowest)?);
        while self.peek_token == Token::Comma {
            self.next_token()?;
            self.next_token()?;
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek(end)?;
        Ok(list)
    }

    fn parse_hash_literal(&mut self) -> Result<Expr> {
        let mut pairs = Vec::new();

        while self.peek_token != Token::RBrace {
            self.next_token()?;
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect_peek(Token::Colon)?;
            self.next_token()?;
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if self.peek_token != Token::RBrace {
                self.expect_peek(Token::Comma)?;
            }
        }

        self.expect_peek(Token::RBrace)?;
        Ok(Expr::Hash(pairs))
    }
}

/// Parse a source string into a program in one call.
pub fn parse(source: &str) -> Result<Program> {
    Parser::new(source)?.parse_program()
}
