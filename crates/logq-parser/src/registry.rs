//! Process-wide Syntax Registry.
//!
//! Built once on first use from the fixed contributor list. Each
//! contributor registers into its own scratch table, which is merged only
//! if the whole contribution is valid, so one bad contributor never leaves
//! half its keywords behind or blocks the others.

use once_cell::sync::Lazy;

use logq_commands::Command;

use crate::error::{QuerySyntaxError, RegistrationError};
use crate::lexer::{split_stages, tokenize};
use crate::parsers;
use crate::syntax::{QueryParser, Stage, Syntax};

static GLOBAL: Lazy<SyntaxRegistry> = Lazy::new(|| {
    let contributors = parsers::contributors();
    let refs: Vec<&dyn QueryParser> = contributors.iter().map(|c| c.as_ref()).collect();
    SyntaxRegistry::build(&refs)
});

/// A contributor that could not register, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationFailure {
    pub contributor: &'static str,
    pub error: RegistrationError,
}

pub struct SyntaxRegistry {
    syntax: Syntax,
    failures: Vec<RegistrationFailure>,
}

impl SyntaxRegistry {
    /// The shared registry with every built-in keyword.
    pub fn global() -> &'static SyntaxRegistry {
        &GLOBAL
    }

    pub fn build(contributors: &[&dyn QueryParser]) -> Self {
        let mut syntax = Syntax::new();
        let mut failures = Vec::new();
        for contributor in contributors {
            let mut scratch = Syntax::for_contributor(contributor.name());
            let added = contributor
                .add_syntax(&mut scratch)
                .and_then(|()| syntax.merge(scratch));
            if let Err(error) = added {
                tracing::error!(
                    contributor = contributor.name(),
                    error = %error,
                    "query parser failed to register"
                );
                failures.push(RegistrationFailure {
                    contributor: contributor.name(),
                    error,
                });
            }
        }
        tracing::debug!(keywords = syntax.len(), failed = failures.len(), "syntax registry built");
        Self { syntax, failures }
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn registration_failures(&self) -> &[RegistrationFailure] {
        &self.failures
    }

    /// Compile `query` into a linked chain and return its head.
    pub fn compile(&self, query: &str) -> Result<Box<dyn Command>, QuerySyntaxError> {
        let mut commands = Vec::new();
        for (offset, text) in split_stages(query)? {
            let (keyword, rest) = match text.find(char::is_whitespace) {
                Some(i) => (&text[..i], &text[i..]),
                None => (text, ""),
            };
            let lowered = keyword.to_ascii_lowercase();
            let parse = self.syntax.get(&lowered).ok_or_else(|| {
                QuerySyntaxError::new(query, offset, format!("unknown command '{keyword}'"))
            })?;
            let args_offset = offset + keyword.len();
            let tokens = tokenize(query, args_offset, rest)?;
            let mut stage = Stage::new(query, offset, lowered, tokens, offset + text.len());
            commands.push(parse(&mut stage)?);
        }

        let mut head: Option<Box<dyn Command>> = None;
        while let Some(mut cmd) = commands.pop() {
            if let Some(next) = head.take() {
                cmd.set_next(next);
            }
            head = Some(cmd);
        }
        head.ok_or_else(|| QuerySyntaxError::new(query, 0, "empty query"))
    }
}
