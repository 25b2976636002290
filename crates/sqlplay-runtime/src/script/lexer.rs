use super::ParseError;

/// Top-level pieces of a script, before statement parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum Chunk {
    /// Text up to a `;`, comments removed.
    Statement { text: String, line: usize },
    /// Block header such as `repeat 3`, followed by `{`.
    Open { header: String, line: usize },
    Close { line: usize },
}

/// Splits source into statements and block delimiters.
///
/// Quoted text is copied verbatim, so `;`, `{` and `--` inside string
/// literals never split a statement.
pub(super) fn split(source: &str) -> Result<Vec<Chunk>, ParseError> {
    let chars: Vec<char> = source.chars().collect();
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut start_line = 0;
    let mut line = 1;
    // Braces that belong to SQL text rather than to a block.
    let mut sql_braces = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '\'' | '"' => {
                if buf.is_empty() {
                    start_line = line;
                }
                let opened_on = line;
                buf.push(c);
                i += 1;
                loop {
                    let Some(&ch) = chars.get(i) else {
                        return Err(ParseError::new(opened_on, "unterminated string literal"));
                    };
                    buf.push(ch);
                    i += 1;
                    if ch == '\n' {
                        line += 1;
                    }
                    if ch == c {
                        // Doubled quote is an escaped quote.
                        if chars.get(i) == Some(&c) {
                            buf.push(c);
                            i += 1;
                            continue;
                        }
                        break;
                    }
                }
                continue;
            }
            '-' if next == Some('-') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
                continue;
            }
            ';' => {
                let text = buf.trim();
                if !text.is_empty() {
                    chunks.push(Chunk::Statement {
                        text: text.to_string(),
                        line: start_line,
                    });
                }
                buf.clear();
                sql_braces = 0;
            }
            '{' if sql_braces == 0 && is_block_header(&buf) => {
                chunks.push(Chunk::Open {
                    header: buf.trim().to_string(),
                    line: start_line,
                });
                buf.clear();
            }
            '}' if sql_braces == 0 => {
                if !buf.trim().is_empty() {
                    return Err(ParseError::new(
                        start_line,
                        "expected `;` before `}`",
                    ));
                }
                chunks.push(Chunk::Close { line });
                buf.clear();
            }
            _ => {
                if c == '\n' {
                    line += 1;
                }
                if buf.is_empty() && c.is_whitespace() {
                    i += 1;
                    continue;
                }
                if buf.is_empty() {
                    start_line = line;
                }
                match c {
                    '{' => sql_braces += 1,
                    '}' => sql_braces -= 1,
                    _ => {}
                }
                buf.push(c);
            }
        }
        i += 1;
    }

    // A trailing statement may omit its `;`.
    let text = buf.trim();
    if !text.is_empty() {
        chunks.push(Chunk::Statement {
            text: text.to_string(),
            line: start_line,
        });
    }

    Ok(chunks)
}

fn is_block_header(buf: &str) -> bool {
    let mut words = buf.split_whitespace().map(|w| w.to_ascii_lowercase());
    match words.next().as_deref() {
        Some("repeat") | Some("try") => true,
        Some("with") => words
            .next()
            .is_some_and(|w| w == "identity" || w.starts_with("identity(")),
        _ => false,
    }
}
