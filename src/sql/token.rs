//! SQL tokens - the atomic units of SQL output.
//!
//! Tokens are dialect-agnostic representations that serialize to
//! dialect-specific strings. Identifier quoting and literal escaping live in
//! exactly one place: `Token::serialize`.

use super::dialect::{Dialect, SqlDialect};

/// A SQL token. Adding a variant forces every serializer to handle it.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // === Keywords ===
    Select,
    From,
    Where,
    And,
    Or,
    Not,
    As,
    On,
    Join,
    Left,
    Inner,
    GroupBy,
    Having,
    OrderBy,
    Asc,
    Desc,
    Limit,
    Case,
    When,
    Then,
    Else,
    End,
    In,
    Between,
    IsNull,
    IsNotNull,
    Distinct,
    Union,
    All,
    ByName,
    With,
    WithinGroup,
    Over,
    PartitionBy,
    Cast,

    // === Punctuation ===
    Comma,
    Dot,
    Star,
    LParen,
    RParen,

    // === Operators ===
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    Plus,
    Minus,
    Mul,
    Div,
    Concat,
    Like,
    NotLike,
    ILike,

    // === Whitespace ===
    Space,
    Newline,

    // === Dynamic content ===
    /// Quoted identifier (table alias, column, CTE name).
    Ident(String),
    /// Integer literal.
    LitInt(i64),
    /// Float literal.
    LitFloat(f64),
    /// String literal, single-quoted with `''` escaping.
    LitString(String),
    /// Boolean literal, rendered as the TRUE/FALSE keywords.
    LitBool(bool),
    /// NULL literal.
    LitNull,
    /// Function name, rendered verbatim (dialects supply exact casing).
    FunctionName(String),
    /// Raw SQL passed through unescaped. Only for trusted pre-rendered
    /// dialect fragments, never user input.
    Raw(String),
}

impl Token {
    /// Serialize this token to a string for the given dialect.
    pub fn serialize(&self, dialect: Dialect) -> String {
        match self {
            Token::Select => "SELECT".into(),
            Token::From => "FROM".into(),
            Token::Where => "WHERE".into(),
            Token::And => "AND".into(),
            Token::Or => "OR".into(),
            Token::Not => "NOT".into(),
            Token::As => "AS".into(),
            Token::On => "ON".into(),
            Token::Join => "JOIN".into(),
            Token::Left => "LEFT".into(),
            Token::Inner => "INNER".into(),
            Token::GroupBy => "GROUP BY".into(),
            Token::Having => "HAVING".into(),
            Token::OrderBy => "ORDER BY".into(),
            Token::Asc => "ASC".into(),
            Token::Desc => "DESC".into(),
            Token::Limit => "LIMIT".into(),
            Token::Case => "CASE".into(),
            Token::When => "WHEN".into(),
            Token::Then => "THEN".into(),
            Token::Else => "ELSE".into(),
            Token::End => "END".into(),
            Token::In => "IN".into(),
            Token::Between => "BETWEEN".into(),
            Token::IsNull => "IS NULL".into(),
            Token::IsNotNull => "IS NOT NULL".into(),
            Token::Distinct => "DISTINCT".into(),
            Token::Union => "UNION".into(),
            Token::All => "ALL".into(),
            Token::ByName => "BY NAME".into(),
            Token::With => "WITH".into(),
            Token::WithinGroup => "WITHIN GROUP".into(),
            Token::Over => "OVER".into(),
            Token::PartitionBy => "PARTITION BY".into(),
            Token::Cast => "CAST".into(),

            Token::Comma => ",".into(),
            Token::Dot => ".".into(),
            Token::Star => "*".into(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),

            Token::Eq => "=".into(),
            Token::Ne => "<>".into(),
            Token::Lt => "<".into(),
            Token::Gt => ">".into(),
            Token::Lte => "<=".into(),
            Token::Gte => ">=".into(),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Mul => "*".into(),
            Token::Div => "/".into(),
            Token::Concat => "||".into(),
            Token::Like => "LIKE".into(),
            Token::NotLike => "NOT LIKE".into(),
            Token::ILike => "ILIKE".into(),

            Token::Space => " ".into(),
            Token::Newline => "\n".into(),

            Token::Ident(name) => dialect.quote_identifier(name),
            Token::LitInt(n) => n.to_string(),
            Token::LitFloat(f) => {
                if f.is_nan() || f.is_infinite() {
                    // Non-finite floats never survive resolution; a literal
                    // NULL is the only representable output.
                    "NULL".into()
                } else {
                    let mut buffer = ryu::Buffer::new();
                    buffer.format(*f).to_string()
                }
            }
            Token::LitString(s) => format!("'{}'", s.replace('\'', "''")),
            Token::LitBool(b) => (if *b { "TRUE" } else { "FALSE" }).into(),
            Token::LitNull => "NULL".into(),
            Token::FunctionName(name) => name.clone(),
            Token::Raw(s) => s.clone(),
        }
    }
}

/// A stream of tokens that serializes to SQL text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenStream {
    tokens: Vec<Token>,
}

impl TokenStream {
    pub fn new() -> Self {
        Self { tokens: vec![] }
    }

    pub fn push(&mut self, token: Token) -> &mut Self {
        self.tokens.push(token);
        self
    }

    pub fn append(&mut self, other: &TokenStream) -> &mut Self {
        self.tokens.extend(other.tokens.iter().cloned());
        self
    }

    /// Serialize all tokens to a SQL string.
    pub fn serialize(&self, dialect: Dialect) -> String {
        self.tokens.iter().map(|t| t.serialize(dialect)).collect()
    }

    pub fn space(&mut self) -> &mut Self {
        self.push(Token::Space)
    }

    pub fn newline(&mut self) -> &mut Self {
        self.push(Token::Newline)
    }

    pub fn comma(&mut self) -> &mut Self {
        self.push(Token::Comma)
    }

    pub fn lparen(&mut self) -> &mut Self {
        self.push(Token::LParen)
    }

    pub fn rparen(&mut self) -> &mut Self {
        self.push(Token::RParen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_serialize() {
        assert_eq!(Token::Select.serialize(Dialect::Postgres), "SELECT");
        assert_eq!(Token::GroupBy.serialize(Dialect::Snowflake), "GROUP BY");
        assert_eq!(Token::ByName.serialize(Dialect::Snowflake), "BY NAME");
    }

    #[test]
    fn test_ident_quoting_per_dialect() {
        let tok = Token::Ident("Orders".into());
        assert_eq!(tok.serialize(Dialect::Postgres), "\"Orders\"");
        assert_eq!(tok.serialize(Dialect::Snowflake), "\"Orders\"");
        assert_eq!(tok.serialize(Dialect::ClickHouse), "\"Orders\"");
        assert_eq!(tok.serialize(Dialect::Dremio), "\"Orders\"");
        assert_eq!(tok.serialize(Dialect::Databricks), "`Orders`");
    }

    #[test]
    fn test_string_literal_escaping() {
        let tok = Token::LitString("it's".into());
        assert_eq!(tok.serialize(Dialect::Postgres), "'it''s'");
    }

    #[test]
    fn test_literal_keywords() {
        assert_eq!(Token::LitBool(true).serialize(Dialect::Postgres), "TRUE");
        assert_eq!(Token::LitBool(false).serialize(Dialect::Databricks), "FALSE");
        assert_eq!(Token::LitNull.serialize(Dialect::Dremio), "NULL");
    }

    #[test]
    fn test_float_serialize() {
        assert_eq!(Token::LitFloat(3.25).serialize(Dialect::Postgres), "3.25");
        assert_eq!(Token::LitFloat(f64::NAN).serialize(Dialect::Postgres), "NULL");
    }

    #[test]
    fn test_function_name_verbatim() {
        let tok = Token::FunctionName("toStartOfQuarter".into());
        assert_eq!(tok.serialize(Dialect::ClickHouse), "toStartOfQuarter");
    }

    #[test]
    fn test_token_stream() {
        let mut ts = TokenStream::new();
        ts.push(Token::Select)
            .space()
            .push(Token::Ident("name".into()))
            .newline()
            .push(Token::From)
            .space()
            .push(Token::Raw("WAREHOUSE.PUBLIC.ORDERS".into()));
        assert_eq!(
            ts.serialize(Dialect::Postgres),
            "SELECT \"name\"\nFROM WAREHOUSE.PUBLIC.ORDERS"
        );
    }
}
