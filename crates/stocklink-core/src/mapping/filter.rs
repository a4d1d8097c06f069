//! Restricted row-filter grammar for mapping `where_condition`s.
//!
//! Accepted form: an optional leading `WHERE`, then predicates joined by
//! `AND`. Each predicate is `<column> <op> <literal>` or
//! `<column> IS [NOT] NULL`. Literals are integers, decimals, single-quoted
//! strings (`''` escapes a quote), or `TRUE`/`FALSE`.

use serde::Serialize;

use super::{is_valid_identifier, MappingError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    IsNull,
    IsNotNull,
}

impl FilterOp {
    #[must_use]
    pub fn as_sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::NotEq => "<>",
            FilterOp::Lt => "<",
            FilterOp::LtEq => "<=",
            FilterOp::Gt => ">",
            FilterOp::GtEq => ">=",
            FilterOp::IsNull => "IS NULL",
            FilterOp::IsNotNull => "IS NOT NULL",
        }
    }

    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(FilterOp::Eq),
            "!=" | "<>" => Some(FilterOp::NotEq),
            "<" => Some(FilterOp::Lt),
            "<=" => Some(FilterOp::LtEq),
            ">" => Some(FilterOp::Gt),
            ">=" => Some(FilterOp::GtEq),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FilterValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

/// One bound comparison against a local column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub column: String,
    pub op: FilterOp,
    /// `None` for `IS NULL` / `IS NOT NULL`.
    pub value: Option<FilterValue>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Number(String),
    Str(String),
    Op(&'static str),
}

const KEYWORDS: [&str; 7] = ["where", "and", "is", "not", "null", "true", "false"];

fn is_keyword(word: &str, keyword: &str) -> bool {
    word.eq_ignore_ascii_case(keyword)
}

fn reject(reason: impl Into<String>) -> MappingError {
    MappingError::Validation(format!("where_condition: {}", reason.into()))
}

fn tokenize(raw: &str) -> Result<Vec<Token>, MappingError> {
    let chars: Vec<char> = raw.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        if c.is_whitespace() {
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while chars
                .get(i)
                .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_')
            {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit()
            || (c == '-' && chars.get(i + 1).is_some_and(char::is_ascii_digit))
        {
            let start = i;
            i += 1;
            let mut seen_dot = false;
            while let Some(&d) = chars.get(i) {
                if d.is_ascii_digit() {
                    i += 1;
                } else if d == '.' && !seen_dot {
                    seen_dot = true;
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push(Token::Number(chars[start..i].iter().collect()));
        } else if c == '\'' {
            i += 1;
            let mut value = String::new();
            loop {
                match chars.get(i) {
                    None => return Err(reject("unterminated string literal")),
                    Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                        value.push('\'');
                        i += 2;
                    }
                    Some('\'') => {
                        i += 1;
                        break;
                    }
                    Some(&other) => {
                        value.push(other);
                        i += 1;
                    }
                }
            }
            tokens.push(Token::Str(value));
        } else {
            let two: String = chars.iter().skip(i).take(2).collect();
            let op = ["<=", ">=", "<>", "!="]
                .into_iter()
                .find(|op| *op == two)
                .or_else(|| ["=", "<", ">"].into_iter().find(|op| op.starts_with(c)));
            match op {
                Some(op) => {
                    i += op.len();
                    tokens.push(Token::Op(op));
                }
                None => return Err(reject(format!("unexpected character {c:?}"))),
            }
        }
    }

    Ok(tokens)
}

fn parse_literal(token: Option<Token>) -> Result<FilterValue, MappingError> {
    match token {
        Some(Token::Number(n)) if n.contains('.') => n
            .parse::<f64>()
            .map(FilterValue::Float)
            .map_err(|e| reject(format!("invalid number {n:?}: {e}"))),
        Some(Token::Number(n)) => n
            .parse::<i64>()
            .map(FilterValue::Int)
            .map_err(|e| reject(format!("invalid integer {n:?}: {e}"))),
        Some(Token::Str(s)) => Ok(FilterValue::Text(s)),
        Some(Token::Word(w)) if is_keyword(&w, "true") => Ok(FilterValue::Bool(true)),
        Some(Token::Word(w)) if is_keyword(&w, "false") => Ok(FilterValue::Bool(false)),
        Some(other) => Err(reject(format!("expected a literal, found {other:?}"))),
        None => Err(reject("expected a literal, found end of input")),
    }
}

/// Parses a mapping row filter into bound predicates.
///
/// A blank condition yields an empty list.
///
/// # Errors
///
/// Returns [`MappingError::Validation`] for anything outside the accepted
/// grammar, including unknown operators, function calls, `OR`, sub-queries,
/// and statement separators.
pub fn parse_where_condition(raw: &str) -> Result<Vec<Predicate>, MappingError> {
    let mut tokens = tokenize(raw)?.into_iter().peekable();
    if tokens.peek().is_none() {
        return Ok(Vec::new());
    }
    if matches!(tokens.peek(), Some(Token::Word(w)) if is_keyword(w, "where")) {
        tokens.next();
    }

    let mut predicates = Vec::new();
    loop {
        let column = match tokens.next() {
            Some(Token::Word(w))
                if is_valid_identifier(&w) && !KEYWORDS.iter().any(|k| is_keyword(&w, k)) =>
            {
                w
            }
            Some(other) => return Err(reject(format!("expected a column name, found {other:?}"))),
            None => return Err(reject("expected a column name, found end of input")),
        };

        let predicate = match tokens.next() {
            Some(Token::Op(symbol)) => {
                let op = FilterOp::from_symbol(symbol)
                    .ok_or_else(|| reject(format!("unsupported operator {symbol}")))?;
                Predicate {
                    column,
                    op,
                    value: Some(parse_literal(tokens.next())?),
                }
            }
            Some(Token::Word(w)) if is_keyword(&w, "is") => {
                let negated = matches!(tokens.peek(), Some(Token::Word(w)) if is_keyword(w, "not"));
                if negated {
                    tokens.next();
                }
                match tokens.next() {
                    Some(Token::Word(w)) if is_keyword(&w, "null") => {}
                    _ => return Err(reject("expected NULL after IS")),
                }
                Predicate {
                    column,
                    op: if negated {
                        FilterOp::IsNotNull
                    } else {
                        FilterOp::IsNull
                    },
                    value: None,
                }
            }
            Some(other) => return Err(reject(format!("expected an operator, found {other:?}"))),
            None => return Err(reject("expected an operator, found end of input")),
        };
        predicates.push(predicate);

        match tokens.next() {
            None => break,
            Some(Token::Word(w)) if is_keyword(&w, "and") => {}
            Some(other) => return Err(reject(format!("expected AND, found {other:?}"))),
        }
    }

    Ok(predicates)
}
