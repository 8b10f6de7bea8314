// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::lexer::*;
use crate::value::*;

use anyhow::{bail, Result};

#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
    line: u32,
    end: u32,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
            line: 0,
            end: 0,
        })
    }

    pub fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::Symbol | TokenKind::Number | TokenKind::Ident | TokenKind::Eof => {
                self.tok.1.text()
            }
            TokenKind::String => "",
        }
    }

    pub fn next_token(&mut self) -> Result<()> {
        self.line = self.tok.1.line;
        self.end = self.tok.1.end;
        if self.tok.0 == TokenKind::String {
            // Closing quote.
            self.end += 1;
        }
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text {
            self.next_token()
        } else {
            let msg = format!("expecting `{text}` {context}");
            Err(self.source.error(self.tok.1.line, self.tok.1.col, &msg))
        }
    }

    fn is_keyword(&self, ident: &str) -> bool {
        matches!(
            ident,
            "and" | "false" | "in" | "not" | "null" | "or" | "true"
        )
    }

    fn is_keyword_token(&self, kw: &str) -> bool {
        self.tok.0 == TokenKind::Ident && self.token_text() == kw
    }

    fn parse_ident(&mut self) -> Result<Identifier> {
        let span = self.tok.1.clone();
        match self.tok.0 {
            TokenKind::Ident if self.is_keyword(span.text()) => Err(self.source.error(
                self.tok.1.line,
                self.tok.1.col,
                &format!("unexpected keyword `{}`", span.text()),
            )),
            TokenKind::Ident => {
                self.next_token()?;
                Ok(Identifier {
                    name: span.text().to_string(),
                    span,
                    coerce_to_type: None,
                })
            }
            _ => Err(self
                .source
                .error(self.tok.1.line, self.tok.1.col, "expecting identifier")),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let span = self.tok.1.clone();
        let value = match &self.tok.0 {
            TokenKind::Number => match Value::from_number_str(span.text()) {
                Ok(v) => v,
                Err(_) => bail!(span.error("could not parse number")),
            },
            TokenKind::String => {
                match serde_json::from_str::<String>(format!("\"{}\"", span.text()).as_str()) {
                    Ok(s) => Value::String(s),
                    Err(e) => bail!(span.error(format!("invalid string literal. {e}").as_str())),
                }
            }
            TokenKind::Ident => match self.token_text() {
                "null" => Value::Null,
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => {
                    return Err(self.source.error(
                        self.tok.1.line,
                        self.tok.1.col,
                        "expecting literal",
                    ))
                }
            },
            TokenKind::Symbol if self.token_text() == "[" => return self.parse_array(),
            _ => {
                return Err(self.source.error(
                    self.tok.1.line,
                    self.tok.1.col,
                    "expecting literal",
                ))
            }
        };
        self.next_token()?;
        Ok(Literal { span, value })
    }

    fn parse_array(&mut self) -> Result<Literal> {
        let mut span = self.tok.1.clone();
        self.expect("[", "while parsing array")?;

        let mut items = vec![];
        if self.token_text() != "]" {
            items.push(self.parse_literal()?.value);
            while self.token_text() == "," {
                self.next_token()?;
                items.push(self.parse_literal()?.value);
            }
        }
        self.expect("]", "while parsing array")?;
        span.end = self.end;
        Ok(Literal {
            span,
            value: Value::Array(items),
        })
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp> {
        let op = match self.token_text() {
            "=" => CompareOp::Eq,
            ">=" => CompareOp::Ge,
            "<" => CompareOp::Lt,
            "in" if self.tok.0 == TokenKind::Ident => CompareOp::In,
            "not" if self.tok.0 == TokenKind::Ident => {
                self.next_token()?;
                if !self.is_keyword_token("in") {
                    return Err(self.source.error(
                        self.tok.1.line,
                        self.tok.1.col,
                        "expecting `in` after `not`",
                    ));
                }
                CompareOp::NotIn
            }
            op @ ("==" | "!=" | "<=" | ">") => {
                let msg = format!("unsupported operator `{op}`");
                return Err(self.source.error(self.tok.1.line, self.tok.1.col, &msg));
            }
            _ => {
                return Err(self.source.error(
                    self.tok.1.line,
                    self.tok.1.col,
                    "expecting comparison operator",
                ))
            }
        };
        self.next_token()?;
        Ok(op)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut span = self.tok.1.clone();
        let lhs = self.parse_ident()?;
        let op = self.parse_compare_op()?;
        let rhs = self.parse_literal()?;
        span.end = self.end;
        Ok(Expr::Compare { span, op, lhs, rhs })
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let mut span = self.tok.1.clone();
        if self.is_keyword_token("not") {
            self.next_token()?;
            let expr = self.parse_unary()?;
            span.end = self.end;
            return Ok(Expr::Not {
                span,
                expr: Box::new(expr),
            });
        }

        if self.tok.0 == TokenKind::Symbol && self.token_text() == "(" {
            self.next_token()?;
            let expr = self.parse_or()?;
            self.expect(")", "while parsing parenthesized expression")?;
            return Ok(expr);
        }

        self.parse_comparison()
    }

    fn parse_bool_expr(
        &mut self,
        op: BoolOp,
        operand: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let start = self.tok.1.clone();
        let mut expr = operand(self)?;
        while self.is_keyword_token(op.as_str()) {
            self.next_token()?;
            let rhs = operand(self)?;
            let mut span = start.clone();
            span.end = self.end;
            expr = Expr::BoolExpr {
                span,
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
            };
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        self.parse_bool_expr(BoolOp::And, Self::parse_unary)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.parse_bool_expr(BoolOp::Or, Self::parse_and)
    }

    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.parse_or()?;
        if self.tok.0 != TokenKind::Eof {
            return Err(self.source.error(
                self.tok.1.line,
                self.tok.1.col,
                "unexpected token after expression",
            ));
        }
        Ok(expr)
    }
}

/// The filter expression grammar.
///
/// Holds no state; each call to [`Grammar::parse`] lexes and parses its input
/// from scratch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Grammar;

impl Grammar {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, text: &str) -> Result<Expr> {
        let source = Source::from_contents("<filter>".to_string(), text.to_string())?;
        let mut parser = Parser::new(&source)?;
        parser.parse()
    }
}
