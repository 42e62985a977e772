//! Grammar building blocks: the keyword table (`Syntax`), its contributors
//! (`QueryParser`), and the token cursor a keyword parser reads from
//! (`Stage`).

use std::collections::BTreeMap;

use logq_commands::{Command, CommandError};

use crate::error::{QuerySyntaxError, RegistrationError};
use crate::lexer::{Token, TokenKind};

/// Builds one command from its stage.
pub type ParseFn = fn(&mut Stage<'_>) -> Result<Box<dyn Command>, QuerySyntaxError>;

/// A grammar contributor: adds its keyword(s) to the syntax table.
pub trait QueryParser: Send + Sync {
    fn name(&self) -> &'static str;

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError>;
}

#[derive(Clone, Copy)]
struct Entry {
    parse: ParseFn,
    owner: &'static str,
}

/// Keyword -> parse function table.
#[derive(Clone, Default)]
pub struct Syntax {
    owner: &'static str,
    entries: BTreeMap<&'static str, Entry>,
}

impl Syntax {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table whose additions are attributed to `owner`.
    pub fn for_contributor(owner: &'static str) -> Self {
        Self {
            owner,
            entries: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, keyword: &'static str, parse: ParseFn) -> Result<(), RegistrationError> {
        if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_lowercase() || c == '_') {
            return Err(RegistrationError::InvalidKeyword(keyword));
        }
        if let Some(existing) = self.entries.get(keyword) {
            return Err(RegistrationError::Duplicate {
                keyword,
                owner: existing.owner,
            });
        }
        self.entries.insert(
            keyword,
            Entry {
                parse,
                owner: self.owner,
            },
        );
        Ok(())
    }

    /// Move every keyword of `other` in, or none of them on a clash.
    pub fn merge(&mut self, other: Syntax) -> Result<(), RegistrationError> {
        for &keyword in other.entries.keys() {
            if let Some(existing) = self.entries.get(keyword) {
                return Err(RegistrationError::Duplicate {
                    keyword,
                    owner: existing.owner,
                });
            }
        }
        self.entries.extend(other.entries);
        Ok(())
    }

    pub fn get(&self, keyword: &str) -> Option<ParseFn> {
        self.entries.get(keyword).map(|e| e.parse)
    }

    pub fn owner(&self, keyword: &str) -> Option<&'static str> {
        self.entries.get(keyword).map(|e| e.owner)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One `|`-separated stage: its keyword and a cursor over its arguments.
pub struct Stage<'q> {
    query: &'q str,
    offset: usize,
    end: usize,
    keyword: String,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'q> Stage<'q> {
    pub fn new(query: &'q str, offset: usize, keyword: String, tokens: Vec<Token>, end: usize) -> Self {
        Self {
            query,
            offset,
            end,
            keyword,
            tokens,
            pos: 0,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Byte offset of the stage in the query.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn error_at(&self, position: usize, message: impl Into<String>) -> QuerySyntaxError {
        QuerySyntaxError::new(self.query, position, message)
    }

    /// Error at the current token, or at the end of the stage.
    pub fn error_here(&self, message: impl Into<String>) -> QuerySyntaxError {
        let at = self.peek().map_or(self.end, |t| t.offset);
        self.error_at(at, message)
    }

    /// A command constructor refused its arguments; report it at `position`.
    pub fn rejected(&self, position: usize, err: CommandError) -> QuerySyntaxError {
        match err {
            CommandError::Exec(message) => self.error_at(position, message),
            other => self.error_at(position, other.to_string()),
        }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead)
    }

    pub fn next_token(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Fail unless every token was consumed.
    pub fn finish(&self) -> Result<(), QuerySyntaxError> {
        match self.peek() {
            None => Ok(()),
            Some(t) => Err(self.error_at(t.offset, format!("unexpected '{}'", t.text))),
        }
    }

    /// Consume the next token if it satisfies `pred`.
    fn take_if(&mut self, pred: impl FnOnce(&Token) -> bool) -> Option<Token> {
        if self.peek().is_some_and(pred) {
            self.next_token()
        } else {
            None
        }
    }

    pub fn expect_word(&mut self, what: &str) -> Result<Token, QuerySyntaxError> {
        self.take_if(|t| t.kind == TokenKind::Word)
            .ok_or_else(|| self.error_here(format!("expected {what}")))
    }

    /// A word or a quoted string.
    pub fn expect_value(&mut self, what: &str) -> Result<Token, QuerySyntaxError> {
        self.take_if(|t| matches!(t.kind, TokenKind::Word | TokenKind::Quoted))
            .ok_or_else(|| self.error_here(format!("expected {what}")))
    }

    pub fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, QuerySyntaxError> {
        self.take_if(|t| t.kind == kind)
            .ok_or_else(|| self.error_here(format!("expected {what}")))
    }

    /// Consume `word` (case-insensitive) if it is next.
    pub fn eat_word(&mut self, word: &str) -> bool {
        self.take_if(|t| t.is_word(word)).is_some()
    }

    pub fn eat(&mut self, kind: TokenKind) -> bool {
        self.take_if(|t| t.kind == kind).is_some()
    }

    /// Leading `name=value` options whose names are in `allowed`.
    pub fn options(&mut self, allowed: &[&str]) -> Result<BTreeMap<String, Token>, QuerySyntaxError> {
        let mut out = BTreeMap::new();
        loop {
            let is_option = match (self.peek(), self.peek_at(1)) {
                (Some(name), Some(eq)) => {
                    name.kind == TokenKind::Word
                        && eq.is_op("=")
                        && allowed.iter().any(|a| name.is_word(a))
                }
                _ => false,
            };
            if !is_option {
                return Ok(out);
            }
            let name = self.expect_word("option name")?;
            self.pos += 1;
            let value = self.expect_value(&format!("value for {}", name.text))?;
            let key = name.text.to_ascii_lowercase();
            if out.contains_key(&key) {
                return Err(self.error_at(name.offset, format!("duplicate option '{key}'")));
            }
            out.insert(key, value);
        }
    }

    /// Parse an option value as a count of at least one.
    pub fn positive(&self, token: &Token, name: &str) -> Result<u64, QuerySyntaxError> {
        match token.text.parse::<u64>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(self.error_at(
                token.offset,
                format!("{name} must be a positive integer, got '{}'", token.text),
            )),
        }
    }

    /// `word[, word]...`
    pub fn word_list(&mut self, what: &str) -> Result<Vec<Token>, QuerySyntaxError> {
        let mut out = vec![self.expect_word(what)?];
        while self.eat(TokenKind::Comma) {
            out.push(self.expect_word(what)?);
        }
        Ok(out)
    }
}
