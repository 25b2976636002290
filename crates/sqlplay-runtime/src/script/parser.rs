use sqlplay_types::Value;

use super::lexer::Chunk;
use super::sql::SqlTemplate;
use super::{Expr, ParseError, Statement, StatementKind};

pub(super) fn parse(chunks: &[Chunk]) -> Result<Vec<Statement>, ParseError> {
    let mut pos = 0;
    let statements = block(chunks, &mut pos, None)?;
    Ok(statements)
}

/// Parses statements until the matching `}` (or end of input at top level).
fn block(chunks: &[Chunk], pos: &mut usize, opened_on: Option<usize>) -> Result<Vec<Statement>, ParseError> {
    let mut statements = Vec::new();

    while let Some(chunk) = chunks.get(*pos) {
        *pos += 1;
        match chunk {
            Chunk::Statement { text, line } => statements.push(statement(text, *line)?),
            Chunk::Open { header, line } => {
                let body = block(chunks, pos, Some(*line))?;
                statements.push(block_statement(header, *line, body)?);
            }
            Chunk::Close { line } => {
                if opened_on.is_some() {
                    return Ok(statements);
                }
                return Err(ParseError::new(*line, "unexpected `}`"));
            }
        }
    }

    match opened_on {
        Some(line) => Err(ParseError::new(line, "block is never closed")),
        None => Ok(statements),
    }
}

fn block_statement(header: &str, line: usize, body: Vec<Statement>) -> Result<Statement, ParseError> {
    let (keyword, rest) = split_keyword(header);

    let kind = match keyword.to_ascii_lowercase().as_str() {
        "try" if rest.is_empty() => StatementKind::Try(body),
        "try" => return Err(ParseError::new(line, "`try` takes no arguments")),
        "repeat" => {
            if rest.is_empty() {
                return Err(ParseError::new(line, "`repeat` needs a count"));
            }
            StatementKind::Repeat {
                count: expression(rest, line)?,
                body,
            }
        }
        _ => {
            // with identity (<subject>, <role>)
            let rest = identity_arguments(rest).unwrap_or_default();
            let args = arguments(rest, line)?;
            let [subject, role]: [Expr; 2] = args.try_into().map_err(|_| {
                ParseError::new(line, "`with identity` takes (subject, role)")
            })?;
            StatementKind::WithIdentity {
                subject,
                role,
                body,
            }
        }
    };

    Ok(Statement { line, kind })
}

/// Text after `identity` in `with identity (...)`.
fn identity_arguments(rest: &str) -> Option<&str> {
    let (keyword, rest) = split_keyword(rest);
    keyword.eq_ignore_ascii_case("identity").then_some(rest)
}

fn statement(text: &str, line: usize) -> Result<Statement, ParseError> {
    let (keyword, rest) = split_keyword(text);

    let kind = match keyword.to_ascii_lowercase().as_str() {
        "let" => binding(rest, false, line)?,
        "export" => {
            let (next, rest) = split_keyword(rest);
            if !next.eq_ignore_ascii_case("let") {
                return Err(ParseError::new(line, "expected `let` after `export`"));
            }
            binding(rest, true, line)?
        }
        "log" => {
            let values = if rest.is_empty() {
                Vec::new()
            } else {
                expression_list(rest, line)?
            };
            StatementKind::Log(values)
        }
        "print" => StatementKind::Print(sql(rest, line)?),
        "sleep" => StatementKind::Sleep(expression(rest, line)?),
        "repeat" | "try" => {
            return Err(ParseError::new(
                line,
                format!("expected `{{` after `{}`", keyword.to_ascii_lowercase()),
            ));
        }
        "with" if identity_arguments(rest).is_some_and(|args| args.starts_with('(')) => {
            return Err(ParseError::new(line, "expected `{` after `with identity (...)`"));
        }
        _ => StatementKind::Sql(sql(text, line)?),
    };

    Ok(Statement { line, kind })
}

fn binding(rest: &str, exported: bool, line: usize) -> Result<StatementKind, ParseError> {
    let Some((name, value)) = rest.split_once('=') else {
        return Err(ParseError::new(line, "expected `let <name> = <value>`"));
    };
    let name = name.trim();
    if !is_identifier(name) {
        return Err(ParseError::new(line, format!("invalid binding name `{}`", name)));
    }

    let value = value.trim();
    let (keyword, query) = split_keyword(value);
    let value = if keyword.eq_ignore_ascii_case("query") {
        if query.is_empty() {
            return Err(ParseError::new(line, "`query` needs a SQL statement"));
        }
        Expr::Query(sql(query, line)?)
    } else {
        expression(value, line)?
    };

    Ok(StatementKind::Let {
        name: name.to_string(),
        exported,
        value,
    })
}

fn sql(text: &str, line: usize) -> Result<SqlTemplate, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::new(line, "expected a SQL statement"));
    }
    SqlTemplate::parse(text).map_err(|message| ParseError::new(line, message))
}

fn split_keyword(text: &str) -> (&str, &str) {
    let text = text.trim();
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    (&text[..end], text[end..].trim())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A single expression spanning all of `text`.
fn expression(text: &str, line: usize) -> Result<Expr, ParseError> {
    let tokens = tokenize(text, line)?;
    let mut parser = ExprParser { tokens, pos: 0, line };
    let expr = parser.expr()?;
    parser.finish()?;
    Ok(expr)
}

/// Comma-separated expressions.
pub(super) fn expression_list(text: &str, line: usize) -> Result<Vec<Expr>, ParseError> {
    let tokens = tokenize(text, line)?;
    let mut parser = ExprParser { tokens, pos: 0, line };
    let list = parser.list(None)?;
    parser.finish()?;
    Ok(list)
}

/// `(expr, ...)` spanning all of `text`.
fn arguments(text: &str, line: usize) -> Result<Vec<Expr>, ParseError> {
    let tokens = tokenize(text, line)?;
    let mut parser = ExprParser { tokens, pos: 0, line };
    parser.expect(Tok::LParen)?;
    let args = parser.list(Some(Tok::RParen))?;
    parser.expect(Tok::RParen)?;
    parser.finish()?;
    Ok(args)
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Number(String),
    Str(String),
    Ident(String),
    Call(String),
    LParen,
    RParen,
    Comma,
    Minus,
}

fn tokenize(text: &str, line: usize) -> Result<Vec<Tok>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Tok::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Tok::Comma);
                i += 1;
            }
            '-' => {
                tokens.push(Tok::Minus);
                i += 1;
            }
            '\'' => {
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(ParseError::new(line, "unterminated string literal")),
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            value.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            value.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Tok::Str(value));
            }
            '$' => {
                let start = i + 1;
                i = start;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                if i == start {
                    return Err(ParseError::new(line, "expected a function name after `$`"));
                }
                tokens.push(Tok::Call(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Tok::Number(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Tok::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(ParseError::new(
                    line,
                    format!("unexpected character `{}` in expression", other),
                ));
            }
        }
    }

    Ok(tokens)
}

struct ExprParser {
    tokens: Vec<Tok>,
    pos: usize,
    line: usize,
}

impl ExprParser {
    fn expr(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.tokens.get(self.pos).cloned() else {
            return Err(self.error("expected a value"));
        };
        self.pos += 1;

        match token {
            Tok::Number(n) => number(&n, false).ok_or_else(|| self.error(format!("invalid number `{}`", n))),
            Tok::Minus => match self.tokens.get(self.pos).cloned() {
                Some(Tok::Number(n)) => {
                    self.pos += 1;
                    number(&n, true).ok_or_else(|| self.error(format!("invalid number `-{}`", n)))
                }
                _ => Err(self.error("expected a number after `-`")),
            },
            Tok::Str(s) => Ok(Expr::Literal(Value::Text(s))),
            Tok::Ident(word) => match word.to_ascii_lowercase().as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" => Ok(Expr::Literal(Value::Null)),
                "query" => Err(self.error("`query` is only allowed as the whole value of `let`")),
                _ => Ok(Expr::Binding(word)),
            },
            Tok::Call(name) => {
                self.expect(Tok::LParen)?;
                let args = self.list(Some(Tok::RParen))?;
                self.expect(Tok::RParen)?;
                Ok(Expr::Call { name, args })
            }
            other => Err(self.error(format!("unexpected {}", describe(&other)))),
        }
    }

    /// Comma-separated expressions, stopping before `end` when given.
    fn list(&mut self, end: Option<Tok>) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        if end.is_some() && self.tokens.get(self.pos) == end.as_ref() {
            return Ok(items);
        }
        loop {
            items.push(self.expr()?);
            if self.tokens.get(self.pos) == Some(&Tok::Comma) {
                self.pos += 1;
            } else {
                return Ok(items);
            }
        }
    }

    fn expect(&mut self, tok: Tok) -> Result<(), ParseError> {
        match self.tokens.get(self.pos) {
            Some(found) if *found == tok => {
                self.pos += 1;
                Ok(())
            }
            Some(found) => Err(self.error(format!(
                "expected {}, found {}",
                describe(&tok),
                describe(found)
            ))),
            None => Err(self.error(format!("expected {}, found end of statement", describe(&tok)))),
        }
    }

    fn finish(&self) -> Result<(), ParseError> {
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some(extra) => Err(self.error(format!("unexpected {}", describe(extra)))),
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line, message)
    }
}

fn number(text: &str, negative: bool) -> Option<Expr> {
    let sign = if negative { "-" } else { "" };
    let text = format!("{}{}", sign, text);
    if text.contains('.') {
        text.parse().ok().map(|r| Expr::Literal(Value::Real(r)))
    } else {
        text.parse().ok().map(|n| Expr::Literal(Value::Integer(n)))
    }
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Number(n) => format!("`{}`", n),
        Tok::Str(s) => format!("'{}'", s),
        Tok::Ident(w) => format!("`{}`", w),
        Tok::Call(name) => format!("`${}`", name),
        Tok::LParen => "`(`".to_string(),
        Tok::RParen => "`)`".to_string(),
        Tok::Comma => "`,`".to_string(),
        Tok::Minus => "`-`".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::Script;
    use super::*;

    fn parse_one(source: &str) -> StatementKind {
        let mut script = Script::parse(source).unwrap();
        assert_eq!(script.statements.len(), 1);
        script.statements.remove(0).kind
    }

    #[test]
    fn test_let_and_export() {
        assert_eq!(
            parse_one("let n = 3;"),
            StatementKind::Let {
                name: "n".to_string(),
                exported: false,
                value: Expr::Literal(Value::Integer(3)),
            }
        );
        assert_eq!(
            parse_one("export let who = $pick('a', 'b');"),
            StatementKind::Let {
                name: "who".to_string(),
                exported: true,
                value: Expr::Call {
                    name: "pick".to_string(),
                    args: vec![
                        Expr::Literal(Value::from("a")),
                        Expr::Literal(Value::from("b")),
                    ],
                },
            }
        );
    }

    #[test]
    fn test_let_query() {
        let StatementKind::Let { value: Expr::Query(sql), .. } =
            parse_one("let total = query select count(*) from t where a = :a;")
        else {
            panic!("expected a query binding");
        };
        assert_eq!(sql.sql, "select count(*) from t where a = ?1");
        assert_eq!(sql.params, vec![Expr::Binding("a".to_string())]);
    }

    #[test]
    fn test_log_list() {
        assert_eq!(
            parse_one("log 'total:', n, -1.5, null;"),
            StatementKind::Log(vec![
                Expr::Literal(Value::from("total:")),
                Expr::Binding("n".to_string()),
                Expr::Literal(Value::Real(-1.5)),
                Expr::Literal(Value::Null),
            ])
        );
    }

    #[test]
    fn test_blocks_nest() {
        let script = Script::parse(
            "with identity ('u1', 'reader') {\n  try {\n    delete from notes;\n  }\n}",
        )
        .unwrap();
        let StatementKind::WithIdentity { subject, role, body } = &script.statements[0].kind else {
            panic!("expected an identity block");
        };
        assert_eq!(*subject, Expr::Literal(Value::from("u1")));
        assert_eq!(*role, Expr::Literal(Value::from("reader")));
        assert!(matches!(&body[0].kind, StatementKind::Try(inner) if inner.len() == 1));
        assert_eq!(body[0].line, 2);
    }

    #[test]
    fn test_everything_else_is_sql() {
        let StatementKind::Sql(sql) = parse_one("with recent as (select 1) select * from recent;") else {
            panic!("expected SQL");
        };
        assert!(sql.params.is_empty());
    }

    #[test]
    fn test_errors_carry_line() {
        let err = Script::parse("select 1;\nlet = 4;").unwrap_err();
        assert_eq!(err.line, 2);

        let err = Script::parse("log $uuid(;").unwrap_err();
        assert_eq!(err.line, 1);

        let err = Script::parse("repeat 2 {\n select 1;\n").unwrap_err();
        assert_eq!(err, ParseError::new(1, "block is never closed"));

        let err = Script::parse("log 1;\n}").unwrap_err();
        assert_eq!(err, ParseError::new(2, "unexpected `}`"));
    }

    #[test]
    fn test_query_only_as_let_value() {
        let err = Script::parse("log query select 1;").unwrap_err();
        assert!(err.message.contains("`query`"));
    }

    #[test]
    fn test_identity_needs_two_arguments() {
        let err = Script::parse("with identity ('u1') {\n}").unwrap_err();
        assert_eq!(err.message, "`with identity` takes (subject, role)");
    }
}
