//! Placeholder expression parsers for measures and metrics.
//!
//! Measure expressions reference physical columns with
//! `{[DataObject].[Column]}` placeholders; metric formulas reference other
//! measures with `{[Name]}` placeholders. Both are parsed into AST fragments
//! at resolution time so the planners never manipulate strings.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::model::SemanticModel;
use crate::sql::expr::{Expr, Literal};
use crate::sql::BinaryOperator;

/// `{[DataObject].[Column]}` placeholders in measure expressions.
static COLUMN_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\[([^\]]+)\]\.\[([^\]]+)\]\}").unwrap());

/// `{[Name]}` placeholders in metric formulas. Does not match the two-part
/// measure placeholder form.
static NAME_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\[([^\]]+)\]\}").unwrap());

/// Errors raised while parsing placeholder expressions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprParseError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { message: String, offset: usize },

    #[error("expression references unknown data object '{0}'")]
    UnknownObject(String),

    #[error("expression references unknown column '{column}' on data object '{object}'")]
    UnknownColumn { object: String, column: String },
}

/// All `(object, column)` pairs referenced by a measure expression.
pub fn column_placeholders(formula: &str) -> Vec<(String, String)> {
    COLUMN_PLACEHOLDER
        .captures_iter(formula)
        .map(|cap| (cap[1].to_string(), cap[2].to_string()))
        .collect()
}

/// All measure/metric names referenced by a metric formula.
pub fn name_placeholders(formula: &str) -> Vec<String> {
    NAME_PLACEHOLDER
        .captures_iter(formula)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Parse a measure expression into an AST fragment.
///
/// Placeholders become qualified column references using the column's
/// physical code and the owning object's display name as table alias.
pub fn parse_measure_expression(formula: &str, model: &SemanticModel) -> Result<Expr, ExprParseError> {
    let tokens = tokenize(formula)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr(&mut |tok, offset| match tok {
        RefTok::Column { object, column } => {
            let obj = model
                .data_objects
                .get(&object)
                .ok_or(ExprParseError::UnknownObject(object.clone()))?;
            let col = obj
                .columns
                .get(&column)
                .ok_or(ExprParseError::UnknownColumn {
                    object: object.clone(),
                    column: column.clone(),
                })?;
            Ok(Expr::Column {
                table: Some(object),
                column: col.code.clone(),
            })
        }
        RefTok::Name(name) => Err(ExprParseError::Syntax {
            message: format!(
                "measure placeholders must be {{[DataObject].[Column]}}, found {{[{}]}}",
                name
            ),
            offset,
        }),
    })?;
    parser.expect_end()?;
    Ok(expr)
}

/// Parse a metric formula into an AST fragment.
///
/// `{[Name]}` references become bare column markers (`ColumnRef` with no
/// table) that the resolver and planners substitute later.
pub fn parse_metric_formula(formula: &str) -> Result<Expr, ExprParseError> {
    let tokens = tokenize(formula)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr(&mut |tok, offset| match tok {
        RefTok::Name(name) => Ok(Expr::Column {
            table: None,
            column: name,
        }),
        RefTok::Column { object, .. } => Err(ExprParseError::Syntax {
            message: format!(
                "metric placeholders must be {{[Measure Name]}}, found {{[{}].[..]}}",
                object
            ),
            offset,
        }),
    })?;
    parser.expect_end()?;
    Ok(expr)
}

// =============================================================================
// Tokenizer
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum RefTok {
    Column { object: String, column: String },
    Name(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ref(RefTok),
    Num(Literal),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Mul,
    Div,
    LParen,
    RParen,
    Comma,
}

fn tokenize(formula: &str) -> Result<Vec<(Tok, usize)>, ExprParseError> {
    let chars: Vec<char> = formula.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '{' => {
                let (tok, next) = scan_placeholder(&chars, i)?;
                tokens.push((Tok::Ref(tok), i));
                i = next;
            }
            '0'..='9' => {
                let (lit, next) = scan_number(&chars, i)?;
                tokens.push((Tok::Num(lit), i));
                i = next;
            }
            '\'' => {
                let (text, next) = scan_string(&chars, i)?;
                tokens.push((Tok::Str(text), i));
                i = next;
            }
            '+' => {
                tokens.push((Tok::Plus, i));
                i += 1;
            }
            '-' => {
                tokens.push((Tok::Minus, i));
                i += 1;
            }
            '*' => {
                tokens.push((Tok::Mul, i));
                i += 1;
            }
            '/' => {
                tokens.push((Tok::Div, i));
                i += 1;
            }
            '(' => {
                tokens.push((Tok::LParen, i));
                i += 1;
            }
            ')' => {
                tokens.push((Tok::RParen, i));
                i += 1;
            }
            ',' => {
                tokens.push((Tok::Comma, i));
                i += 1;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push((Tok::Ident(chars[start..i].iter().collect()), start));
            }
            other => {
                return Err(ExprParseError::Syntax {
                    message: format!("unexpected character '{}'", other),
                    offset: i,
                });
            }
        }
    }

    Ok(tokens)
}

fn scan_placeholder(chars: &[char], start: usize) -> Result<(RefTok, usize), ExprParseError> {
    let unclosed = || ExprParseError::Syntax {
        message: "unclosed {[...]} placeholder".into(),
        offset: start,
    };

    let mut i = start;
    if chars.get(i + 1) != Some(&'[') {
        return Err(ExprParseError::Syntax {
            message: "expected '[' after '{'".into(),
            offset: start,
        });
    }
    i += 2;
    let first_start = i;
    while i < chars.len() && chars[i] != ']' {
        i += 1;
    }
    if i >= chars.len() {
        return Err(unclosed());
    }
    let first: String = chars[first_start..i].iter().collect();
    i += 1; // consume ']'

    match chars.get(i) {
        Some('}') => Ok((RefTok::Name(first), i + 1)),
        Some('.') if chars.get(i + 1) == Some(&'[') => {
            i += 2;
            let second_start = i;
            while i < chars.len() && chars[i] != ']' {
                i += 1;
            }
            if i >= chars.len() || chars.get(i + 1) != Some(&'}') {
                return Err(unclosed());
            }
            let second: String = chars[second_start..i].iter().collect();
            Ok((
                RefTok::Column {
                    object: first,
                    column: second,
                },
                i + 2,
            ))
        }
        _ => Err(unclosed()),
    }
}

fn scan_number(chars: &[char], start: usize) -> Result<(Literal, usize), ExprParseError> {
    let mut i = start;
    let mut seen_dot = false;
    while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
        if chars[i] == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
        }
        i += 1;
    }
    let text: String = chars[start..i].iter().collect();
    let literal = if seen_dot {
        text.parse::<f64>().map(Literal::Float).map_err(|_| ())
    } else {
        text.parse::<i64>().map(Literal::Int).map_err(|_| ())
    };
    literal
        .map(|lit| (lit, i))
        .map_err(|_| ExprParseError::Syntax {
            message: format!("invalid numeric literal '{}'", text),
            offset: start,
        })
}

fn scan_string(chars: &[char], start: usize) -> Result<(String, usize), ExprParseError> {
    let mut i = start + 1;
    let mut text = String::new();
    while i < chars.len() {
        if chars[i] == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                text.push('\'');
                i += 2;
            } else {
                return Ok((text, i + 1));
            }
        } else {
            text.push(chars[i]);
            i += 1;
        }
    }
    Err(ExprParseError::Syntax {
        message: "unterminated string literal".into(),
        offset: start,
    })
}

// =============================================================================
// Recursive descent parser
// =============================================================================

type RefMapper<'m> = dyn FnMut(RefTok, usize) -> Result<Expr, ExprParseError> + 'm;

struct Parser {
    tokens: Vec<(Tok, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&(Tok, usize)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<(Tok, usize)> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect_end(&self) -> Result<(), ExprParseError> {
        match self.peek() {
            None => Ok(()),
            Some((tok, offset)) => Err(ExprParseError::Syntax {
                message: format!("unexpected trailing token {:?}", tok),
                offset: *offset,
            }),
        }
    }

    fn parse_expr(&mut self, refs: &mut RefMapper<'_>) -> Result<Expr, ExprParseError> {
        let mut left = self.parse_term(refs)?;
        while let Some((tok, _)) = self.peek() {
            let op = match tok {
                Tok::Plus => BinaryOperator::Plus,
                Tok::Minus => BinaryOperator::Minus,
                _ => break,
            };
            self.advance();
            let right = self.parse_term(refs)?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self, refs: &mut RefMapper<'_>) -> Result<Expr, ExprParseError> {
        let mut left = self.parse_factor(refs)?;
        while let Some((tok, _)) = self.peek() {
            let op = match tok {
                Tok::Mul => BinaryOperator::Mul,
                Tok::Div => BinaryOperator::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_factor(refs)?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_factor(&mut self, refs: &mut RefMapper<'_>) -> Result<Expr, ExprParseError> {
        let Some((tok, offset)) = self.advance() else {
            return Err(ExprParseError::Syntax {
                message: "unexpected end of expression".into(),
                offset: 0,
            });
        };

        match tok {
            Tok::LParen => {
                let inner = self.parse_expr(refs)?;
                match self.advance() {
                    Some((Tok::RParen, _)) => Ok(Expr::Paren(Box::new(inner))),
                    _ => Err(ExprParseError::Syntax {
                        message: "expected ')'".into(),
                        offset,
                    }),
                }
            }
            Tok::Num(lit) => Ok(Expr::Literal(lit)),
            Tok::Str(text) => Ok(Expr::Literal(Literal::String(text))),
            Tok::Ref(reference) => refs(reference, offset),
            Tok::Minus => {
                let operand = self.parse_factor(refs)?;
                Ok(Expr::UnaryOp {
                    op: crate::sql::UnaryOperator::Minus,
                    expr: Box::new(operand),
                })
            }
            Tok::Ident(name) => {
                if matches!(self.peek(), Some((Tok::LParen, _))) {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some((Tok::RParen, _))) {
                        loop {
                            args.push(self.parse_expr(refs)?);
                            match self.advance() {
                                Some((Tok::Comma, _)) => continue,
                                Some((Tok::RParen, _)) => break,
                                _ => {
                                    return Err(ExprParseError::Syntax {
                                        message: format!("unterminated call to '{}'", name),
                                        offset,
                                    });
                                }
                            }
                        }
                    } else {
                        self.advance();
                    }
                    Ok(Expr::Function {
                        name,
                        args,
                        distinct: false,
                        within_group: vec![],
                    })
                } else {
                    Err(ExprParseError::Syntax {
                        message: format!("bare identifier '{}' is not a function call", name),
                        offset,
                    })
                }
            }
            other => Err(ExprParseError::Syntax {
                message: format!("unexpected token {:?}", other),
                offset,
            }),
        }
    }
}
