use logq_commands::commands::{Lookup, LookupOutput};

use super::Parsed;
use crate::error::RegistrationError;
use crate::lexer::TokenKind;
use crate::syntax::{QueryParser, Stage, Syntax};

pub struct LookupParser;

impl QueryParser for LookupParser {
    fn name(&self) -> &'static str {
        "lookup"
    }

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError> {
        syntax.add("lookup", parse)
    }
}

/// `lookup <name> <src> [as <key>] output <field> [as <alias>][, ...]`
fn parse(stage: &mut Stage<'_>) -> Parsed {
    let table = stage.expect_value("lookup table name")?;
    let src = stage.expect_word("source field")?;
    let key = if stage.eat_word("as") {
        Some(stage.expect_word("key field")?.text)
    } else {
        None
    };
    if !stage.eat_word("output") {
        return Err(stage.error_here("expected 'output'"));
    }
    let mut outputs = Vec::new();
    loop {
        let field = stage.expect_word("output field")?.text;
        let alias = if stage.eat_word("as") {
            stage.expect_word("alias")?.text
        } else {
            field.clone()
        };
        outputs.push(LookupOutput { field, alias });
        if !stage.eat(TokenKind::Comma) {
            break;
        }
    }
    stage.finish()?;
    Ok(Box::new(Lookup::new(table.text, src.text, key, outputs)))
}
