use super::{
    ColumnDef, ColumnType, DefaultValue, ForeignKey, IndexDef, PolicyDef, PolicyOperation,
    SchemaError, SchemaModule, TableDef,
};

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Word(String),
    Number(String),
    Str(String),
    Sym(char),
    Arrow,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: usize,
}

impl Token {
    fn describe(&self) -> String {
        match &self.tok {
            Tok::Word(w) | Tok::Number(w) => w.clone(),
            Tok::Str(s) => format!("'{}'", s),
            Tok::Sym(c) => c.to_string(),
            Tok::Arrow => "->".to_string(),
        }
    }
}

pub(super) fn parse(source: &str) -> Result<SchemaModule, SchemaError> {
    let tokens = tokenize(source)?;
    Parser { tokens, pos: 0 }.module()
}

fn tokenize(source: &str) -> Result<Vec<Token>, SchemaError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '\n' => {
                line += 1;
                i += 1;
            }
            c if c.is_whitespace() => i += 1,
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '-' if next == Some('-') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '-' if next == Some('>') => {
                tokens.push(Token {
                    tok: Tok::Arrow,
                    line,
                });
                i += 2;
            }
            '-' if next.is_some_and(|n| n.is_ascii_digit()) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token {
                    tok: Tok::Number(chars[start..i].iter().collect()),
                    line,
                });
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token {
                    tok: Tok::Number(chars[start..i].iter().collect()),
                    line,
                });
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token {
                    tok: Tok::Word(chars[start..i].iter().collect()),
                    line,
                });
            }
            '\'' => {
                let start_line = line;
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(SchemaError::new(start_line, "unterminated string literal"));
                        }
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            text.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            if *ch == '\n' {
                                line += 1;
                            }
                            text.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token {
                    tok: Tok::Str(text),
                    line: start_line,
                });
            }
            '{' | '}' | '(' | ')' | ',' | '.' => {
                tokens.push(Token {
                    tok: Tok::Sym(c),
                    line,
                });
                i += 1;
            }
            other => {
                return Err(SchemaError::new(
                    line,
                    format!("unexpected character `{}`", other),
                ));
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn module(mut self) -> Result<SchemaModule, SchemaError> {
        let mut module = SchemaModule::default();

        while let Some(token) = self.peek().cloned() {
            match &token.tok {
                Tok::Word(w) if w.eq_ignore_ascii_case("table") => {
                    self.pos += 1;
                    module.tables.push(self.table(token.line)?);
                }
                Tok::Word(w) if w.eq_ignore_ascii_case("index") => {
                    self.pos += 1;
                    module.indexes.push(self.index(token.line, false)?);
                }
                Tok::Word(w) if w.eq_ignore_ascii_case("unique") => {
                    self.pos += 1;
                    self.expect_keyword("index")?;
                    module.indexes.push(self.index(token.line, true)?);
                }
                Tok::Word(w) if w.eq_ignore_ascii_case("policy") => {
                    self.pos += 1;
                    module.policies.push(self.policy(token.line)?);
                }
                _ => {
                    return Err(SchemaError::new(
                        token.line,
                        format!(
                            "expected `table`, `index` or `policy`, found `{}`",
                            token.describe()
                        ),
                    ));
                }
            }
        }

        Ok(module)
    }

    fn table(&mut self, line: usize) -> Result<TableDef, SchemaError> {
        let name = self.expect_name("table name")?;
        self.expect_sym('{')?;

        let mut columns = Vec::new();
        loop {
            if self.eat_sym('}') {
                break;
            }
            if self.peek().is_none() {
                return Err(SchemaError::new(
                    line,
                    format!("table `{}` is missing a closing `}}`", name),
                ));
            }
            columns.push(self.column(&name)?);
            self.eat_sym(',');
        }

        if columns.is_empty() {
            return Err(SchemaError::new(
                line,
                format!("table `{}` has no columns", name),
            ));
        }

        Ok(TableDef {
            name,
            columns,
            line,
        })
    }

    fn column(&mut self, table: &str) -> Result<ColumnDef, SchemaError> {
        let line = self.current_line();
        let name = self.expect_name("column name")?;
        let type_line = self.current_line();
        let type_name = self.expect_name("column type")?;
        let ty = ColumnType::parse(&type_name).ok_or_else(|| {
            SchemaError::new(
                type_line,
                format!("unknown type `{}` for column `{}.{}`", type_name, table, name),
            )
        })?;

        let mut column = ColumnDef {
            name,
            ty,
            primary_key: false,
            not_null: false,
            unique: false,
            default: None,
            references: None,
        };

        // Modifiers stay on the column's line.
        while let Some(token) = self.peek().cloned() {
            if token.line != line || matches!(token.tok, Tok::Sym(',') | Tok::Sym('}')) {
                break;
            }
            self.pos += 1;

            match &token.tok {
                Tok::Word(w) if w.eq_ignore_ascii_case("pk") => column.primary_key = true,
                Tok::Word(w) if w.eq_ignore_ascii_case("primary") => {
                    self.expect_keyword("key")?;
                    column.primary_key = true;
                }
                Tok::Word(w) if w.eq_ignore_ascii_case("not") => {
                    self.expect_keyword("null")?;
                    column.not_null = true;
                }
                Tok::Word(w) if w.eq_ignore_ascii_case("null") => column.not_null = false,
                Tok::Word(w) if w.eq_ignore_ascii_case("unique") => column.unique = true,
                Tok::Word(w) if w.eq_ignore_ascii_case("default") => {
                    column.default = Some(self.default_value()?);
                }
                Tok::Arrow => {
                    let table = self.expect_name("referenced table")?;
                    self.expect_sym('.')?;
                    let target = self.expect_name("referenced column")?;
                    let mut on_delete_cascade = false;
                    if self.eat_keyword("on") {
                        self.expect_keyword("delete")?;
                        self.expect_keyword("cascade")?;
                        on_delete_cascade = true;
                    }
                    column.references = Some(ForeignKey {
                        table,
                        column: target,
                        on_delete_cascade,
                    });
                }
                _ => {
                    return Err(SchemaError::new(
                        token.line,
                        format!(
                            "unexpected `{}` in column `{}.{}`",
                            token.describe(),
                            table,
                            column.name
                        ),
                    ));
                }
            }
        }

        Ok(column)
    }

    fn default_value(&mut self) -> Result<DefaultValue, SchemaError> {
        let token = self
            .next()
            .ok_or_else(|| SchemaError::new(self.last_line(), "expected a default value"))?;

        let value = match &token.tok {
            Tok::Str(s) => DefaultValue::Text(s.clone()),
            Tok::Number(n) if n.contains('.') => n
                .parse()
                .map(DefaultValue::Real)
                .map_err(|_| SchemaError::new(token.line, format!("invalid number `{}`", n)))?,
            Tok::Number(n) => n
                .parse()
                .map(DefaultValue::Integer)
                .map_err(|_| SchemaError::new(token.line, format!("invalid number `{}`", n)))?,
            Tok::Word(w) => match w.to_ascii_lowercase().as_str() {
                "true" => DefaultValue::Bool(true),
                "false" => DefaultValue::Bool(false),
                "null" => DefaultValue::Null,
                "now" => DefaultValue::Now,
                _ => {
                    return Err(SchemaError::new(
                        token.line,
                        format!("unsupported default `{}`", w),
                    ));
                }
            },
            _ => {
                return Err(SchemaError::new(
                    token.line,
                    format!("unsupported default `{}`", token.describe()),
                ));
            }
        };
        Ok(value)
    }

    fn index(&mut self, line: usize, unique: bool) -> Result<IndexDef, SchemaError> {
        let name = self.expect_name("index name")?;
        self.expect_keyword("on")?;
        let table = self.expect_name("table name")?;
        self.expect_sym('(')?;

        let mut columns = vec![self.expect_name("column name")?];
        while self.eat_sym(',') {
            columns.push(self.expect_name("column name")?);
        }
        self.expect_sym(')')?;

        Ok(IndexDef {
            name,
            table,
            columns,
            unique,
            line,
        })
    }

    fn policy(&mut self, line: usize) -> Result<PolicyDef, SchemaError> {
        let name = self.expect_name("policy name")?;
        self.expect_keyword("on")?;
        let table = self.expect_name("table name")?;
        self.expect_keyword("deny")?;

        let mut operations = Vec::new();
        loop {
            let op_line = self.current_line();
            let op = self.expect_name("operation")?;
            let parsed = PolicyOperation::parse(&op).ok_or_else(|| {
                SchemaError::new(
                    op_line,
                    format!("expected insert, update or delete, found `{}`", op),
                )
            })?;
            if !operations.contains(&parsed) {
                operations.push(parsed);
            }
            if !self.eat_sym(',') {
                break;
            }
        }

        self.expect_keyword("for")?;
        let role = self.expect_name("role")?;

        Ok(PolicyDef {
            name,
            table,
            operations,
            role,
            line,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn current_line(&self) -> usize {
        self.peek().map(|t| t.line).unwrap_or_else(|| self.last_line())
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map(|t| t.line).unwrap_or(1)
    }

    fn expect_name(&mut self, what: &str) -> Result<String, SchemaError> {
        match self.next() {
            Some(Token {
                tok: Tok::Word(w), ..
            }) => Ok(w),
            Some(token) => Err(SchemaError::new(
                token.line,
                format!("expected {}, found `{}`", what, token.describe()),
            )),
            None => Err(SchemaError::new(
                self.last_line(),
                format!("expected {}, found end of file", what),
            )),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), SchemaError> {
        if self.eat_keyword(keyword) {
            return Ok(());
        }
        let (line, found) = match self.peek() {
            Some(token) => (token.line, token.describe()),
            None => (self.last_line(), "end of file".to_string()),
        };
        Err(SchemaError::new(
            line,
            format!("expected `{}`, found `{}`", keyword, found),
        ))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if let Some(Token {
            tok: Tok::Word(w), ..
        }) = self.peek()
            && w.eq_ignore_ascii_case(keyword)
        {
            self.pos += 1;
            return true;
        }
        false
    }

    fn expect_sym(&mut self, sym: char) -> Result<(), SchemaError> {
        if self.eat_sym(sym) {
            return Ok(());
        }
        let (line, found) = match self.peek() {
            Some(token) => (token.line, token.describe()),
            None => (self.last_line(), "end of file".to_string()),
        };
        Err(SchemaError::new(
            line,
            format!("expected `{}`, found `{}`", sym, found),
        ))
    }

    fn eat_sym(&mut self, sym: char) -> bool {
        if let Some(Token {
            tok: Tok::Sym(c), ..
        }) = self.peek()
            && *c == sym
        {
            self.pos += 1;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOG: &str = r#"
        # authors first
        table authors {
          id    serial pk
          name  text not null
          email text not null unique
        }

        table posts {
          id        serial pk
          author_id int not null -> authors.id on delete cascade
          title     text not null default 'untitled'
          draft     bool default true
          score     real default -1.5
        }

        unique index posts_title on posts(author_id, title)
        policy readers on posts deny insert, update for reader
    "#;

    #[test]
    fn test_parse_tables_and_modifiers() {
        let module = parse(BLOG).unwrap();
        assert_eq!(module.tables.len(), 2);

        let posts = module.table("posts").unwrap();
        assert_eq!(posts.line, 9);
        let author = posts.column("author_id").unwrap();
        assert_eq!(author.ty, ColumnType::Int);
        assert!(author.not_null);
        assert_eq!(
            author.references,
            Some(ForeignKey {
                table: "authors".to_string(),
                column: "id".to_string(),
                on_delete_cascade: true,
            })
        );
        assert_eq!(
            posts.column("title").unwrap().default,
            Some(DefaultValue::Text("untitled".to_string()))
        );
        assert_eq!(
            posts.column("score").unwrap().default,
            Some(DefaultValue::Real(-1.5))
        );
    }

    #[test]
    fn test_parse_index_and_policy() {
        let module = parse(BLOG).unwrap();
        assert_eq!(module.indexes.len(), 1);
        assert!(module.indexes[0].unique);
        assert_eq!(module.indexes[0].columns, vec!["author_id", "title"]);

        let policy = &module.policies[0];
        assert_eq!(policy.role, "reader");
        assert_eq!(
            policy.operations,
            vec![PolicyOperation::Insert, PolicyOperation::Update]
        );
    }

    #[test]
    fn test_unknown_type_reports_line() {
        let err = parse("table t {\n  id serial pk\n  tags array\n}").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.message.contains("unknown type `array`"));
    }

    #[test]
    fn test_unclosed_table() {
        let err = parse("table t {\n  id int pk\n").unwrap_err();
        assert!(err.message.contains("missing a closing"));
    }

    #[test]
    fn test_stray_token_at_top_level() {
        let err = parse("create table t").unwrap_err();
        assert!(err.message.starts_with("expected `table`, `index` or `policy`"));
    }
}
