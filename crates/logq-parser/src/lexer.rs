//! Stage splitting and argument tokens.
//!
//! Offsets are absolute byte positions in the query text, so errors point
//! at the right place no matter which stage they come from.

use crate::error::QuerySyntaxError;

/// Split `query` on `|` outside double quotes. Returns `(offset, text)` for
/// each stage, with surrounding whitespace trimmed.
pub fn split_stages(query: &str) -> Result<Vec<(usize, &str)>, QuerySyntaxError> {
    if query.trim().is_empty() {
        return Err(QuerySyntaxError::new(query, 0, "empty query"));
    }
    let mut stages = Vec::new();
    let mut start = 0;
    let mut quote_start: Option<usize> = None;
    let mut escaped = false;

    for (i, c) in query.char_indices() {
        if quote_start.is_some() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => quote_start = None,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => quote_start = Some(i),
            '|' => {
                stages.push(trimmed(query, start, i)?);
                start = i + 1;
            }
            _ => {}
        }
    }
    if let Some(pos) = quote_start {
        return Err(QuerySyntaxError::new(query, pos, "unterminated string"));
    }
    stages.push(trimmed(query, start, query.len())?);
    Ok(stages)
}

fn trimmed(query: &str, start: usize, end: usize) -> Result<(usize, &str), QuerySyntaxError> {
    let raw = &query[start..end];
    let text = raw.trim();
    if text.is_empty() {
        return Err(QuerySyntaxError::new(query, start, "empty stage"));
    }
    let lead = raw.len() - raw.trim_start().len();
    Ok((start + lead, text))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Bare word: field names, keywords, numbers, `-field`.
    Word,
    /// Double-quoted string; `text` is the unescaped content.
    Quoted,
    Comma,
    LParen,
    RParen,
    /// Comparison or assignment operator.
    Op(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
}

impl Token {
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(word)
    }

    pub fn is_op(&self, op: &str) -> bool {
        matches!(self.kind, TokenKind::Op(o) if o == op)
    }
}

const OPS: [&str; 7] = ["==", "!=", "<=", ">=", "<", ">", "="];

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, ',' | '(' | ')' | '"' | '=' | '!' | '<' | '>')
}

/// Tokenize `text`, which starts at byte `base` of `query`.
pub fn tokenize(query: &str, base: usize, text: &str) -> Result<Vec<Token>, QuerySyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        let offset = base + i;
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let simple = match c {
            ',' => Some(TokenKind::Comma),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            _ => None,
        };
        if let Some(kind) = simple {
            chars.next();
            tokens.push(Token { kind, text: c.to_string(), offset });
            continue;
        }
        if c == '"' {
            chars.next();
            let mut value = String::new();
            let mut closed = false;
            while let Some((_, c)) = chars.next() {
                match c {
                    '\\' => {
                        if let Some((_, esc)) = chars.next() {
                            value.push(esc);
                        }
                    }
                    '"' => {
                        closed = true;
                        break;
                    }
                    _ => value.push(c),
                }
            }
            if !closed {
                return Err(QuerySyntaxError::new(query, offset, "unterminated string"));
            }
            tokens.push(Token { kind: TokenKind::Quoted, text: value, offset });
            continue;
        }
        if let Some(&op) = OPS.iter().find(|op| text[i..].starts_with(**op)) {
            for _ in 0..op.len() {
                chars.next();
            }
            tokens.push(Token { kind: TokenKind::Op(op), text: op.to_string(), offset });
            continue;
        }
        if c == '!' {
            return Err(QuerySyntaxError::new(query, offset, "unexpected '!'"));
        }
        let mut end = i;
        while let Some(&(j, c)) = chars.peek() {
            if !is_word_char(c) {
                break;
            }
            end = j + c.len_utf8();
            chars.next();
        }
        tokens.push(Token {
            kind: TokenKind::Word,
            text: text[i..end].to_string(),
            offset,
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_outside_quotes() {
        let q = r#"table a | search msg == "x | y" |  fields msg "#;
        let stages = split_stages(q).unwrap();
        let texts: Vec<_> = stages.iter().map(|(_, t)| *t).collect();
        assert_eq!(texts, vec!["table a", r#"search msg == "x | y""#, "fields msg"]);
        assert_eq!(&q[stages[2].0..stages[2].0 + 6], "fields");
    }

    #[test]
    fn empty_and_unterminated() {
        assert_eq!(split_stages("   ").unwrap_err().position, 0);
        assert_eq!(split_stages("table a || drop").unwrap_err().position, 9);
        assert_eq!(split_stages("table a |").unwrap_err().message, "empty stage");
        assert_eq!(split_stages(r#"search a == "x"#).unwrap_err().position, 12);
    }

    #[test]
    fn tokens() {
        let text = r#"limit=5 a>=1, b != "q\"x" (c) -d"#;
        let toks = tokenize(text, 100, text).unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| (t.kind.clone(), t.text.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (TokenKind::Word, "limit"),
                (TokenKind::Op("="), "="),
                (TokenKind::Word, "5"),
                (TokenKind::Word, "a"),
                (TokenKind::Op(">="), ">="),
                (TokenKind::Word, "1"),
                (TokenKind::Comma, ","),
                (TokenKind::Word, "b"),
                (TokenKind::Op("!="), "!="),
                (TokenKind::Quoted, "q\"x"),
                (TokenKind::LParen, "("),
                (TokenKind::Word, "c"),
                (TokenKind::RParen, ")"),
                (TokenKind::Word, "-d"),
            ]
        );
        assert_eq!(toks[0].offset, 100);
        assert_eq!(toks[3].offset, 108);
    }
}
