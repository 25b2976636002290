use super::Expr;
use super::parser::expression_list;

/// SQL text with script values lifted out as positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlTemplate {
    /// SQL as sent to the engine, with `?1`, `?2`, ... placeholders.
    pub sql: String,
    /// Values for the placeholders, evaluated on every execution.
    pub params: Vec<Expr>,
}

impl SqlTemplate {
    /// Rewrites `:name` bindings and `$fn(args)` calls into placeholders.
    ///
    /// Quoted text is left untouched, as are `::` casts and `$1`-style
    /// parameters.
    pub fn parse(text: &str) -> Result<Self, String> {
        let chars: Vec<char> = text.trim().chars().collect();
        let mut sql = String::with_capacity(chars.len());
        let mut params = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            match c {
                '\'' | '"' => {
                    let end = closing_quote(&chars, i)
                        .ok_or_else(|| "unterminated string literal".to_string())?;
                    sql.extend(&chars[i..=end]);
                    i = end + 1;
                }
                ':' if next == Some(':') => {
                    sql.push_str("::");
                    i += 2;
                }
                ':' if next.is_some_and(is_name_start) => {
                    let end = name_end(&chars, i + 1);
                    let name: String = chars[i + 1..end].iter().collect();
                    params.push(Expr::Binding(name));
                    sql.push_str(&format!("?{}", params.len()));
                    i = end;
                }
                '$' if next.is_some_and(is_name_start) => {
                    let end = name_end(&chars, i + 1);
                    let name: String = chars[i + 1..end].iter().collect();
                    if chars.get(end) != Some(&'(') {
                        return Err(format!("toolkit call `${}` needs parentheses", name));
                    }
                    let close = closing_paren(&chars, end)
                        .ok_or_else(|| format!("unclosed `(` in `${}(...)`", name))?;
                    let inner: String = chars[end + 1..close].iter().collect();
                    let args = if inner.trim().is_empty() {
                        Vec::new()
                    } else {
                        expression_list(&inner, 0).map_err(|err| err.message)?
                    };
                    params.push(Expr::Call { name, args });
                    sql.push_str(&format!("?{}", params.len()));
                    i = close + 1;
                }
                _ => {
                    sql.push(c);
                    i += 1;
                }
            }
        }

        Ok(Self { sql, params })
    }
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn name_end(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    end
}

/// Index of the quote closing the one at `open`; doubled quotes are escapes.
fn closing_quote(chars: &[char], open: usize) -> Option<usize> {
    let quote = chars[open];
    let mut i = open + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Some(i);
        }
        i += 1;
    }
    None
}

fn closing_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0;
    let mut i = open;
    while i < chars.len() {
        match chars[i] {
            '\'' | '"' => {
                i = closing_quote(chars, i)?;
            }
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}
