use logq_commands::commands::Fields;

use super::Parsed;
use crate::error::RegistrationError;
use crate::syntax::{QueryParser, Stage, Syntax};

pub struct FieldsParser;

impl QueryParser for FieldsParser {
    fn name(&self) -> &'static str {
        "fields"
    }

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError> {
        syntax.add("fields", parse)
    }
}

/// `fields [-] f1, f2, ...`
fn parse(stage: &mut Stage<'_>) -> Parsed {
    let remove = stage.eat_word("-");
    let names: Vec<String> = stage
        .word_list("field name")?
        .into_iter()
        .map(|t| t.text)
        .collect();
    stage.finish()?;
    Ok(Box::new(if remove {
        Fields::remove(names)
    } else {
        Fields::keep(names)
    }))
}
