use logq_commands::commands::Rename;

use super::Parsed;
use crate::error::RegistrationError;
use crate::lexer::TokenKind;
use crate::syntax::{QueryParser, Stage, Syntax};

pub struct RenameParser;

impl QueryParser for RenameParser {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError> {
        syntax.add("rename", parse)
    }
}

/// `rename a as b[, c as d]...`
fn parse(stage: &mut Stage<'_>) -> Parsed {
    let mut renames = Vec::new();
    loop {
        let from = stage.expect_word("field name")?;
        if !stage.eat_word("as") {
            return Err(stage.error_here("expected 'as'"));
        }
        let to = stage.expect_word("new field name")?;
        renames.push((from.text, to.text));
        if !stage.eat(TokenKind::Comma) {
            break;
        }
    }
    stage.finish()?;
    Ok(Box::new(Rename::new(renames)))
}
