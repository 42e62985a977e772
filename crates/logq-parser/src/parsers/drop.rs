use logq_commands::commands::DropCmd;

use super::Parsed;
use crate::error::RegistrationError;
use crate::syntax::{QueryParser, Stage, Syntax};

pub struct DropParser;

impl QueryParser for DropParser {
    fn name(&self) -> &'static str {
        "drop"
    }

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError> {
        syntax.add("drop", parse)
    }
}

fn parse(stage: &mut Stage<'_>) -> Parsed {
    stage.finish()?;
    Ok(Box::new(DropCmd::new()))
}
