use std::collections::BTreeMap;

use logq_commands::commands::OptionCmd;

use super::Parsed;
use crate::error::RegistrationError;
use crate::syntax::{QueryParser, Stage, Syntax};

pub struct OptionParser;

impl QueryParser for OptionParser {
    fn name(&self) -> &'static str {
        "option"
    }

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError> {
        syntax.add("option", parse)
    }
}

/// `option k=v [k=v]...`; keys are lower-cased.
fn parse(stage: &mut Stage<'_>) -> Parsed {
    let mut options = BTreeMap::new();
    loop {
        let key = stage.expect_word("option name")?;
        let eq = stage.next_token();
        if !eq.as_ref().is_some_and(|t| t.is_op("=")) {
            let at = eq.map_or(key.offset + key.text.len(), |t| t.offset);
            return Err(stage.error_at(at, "expected '='"));
        }
        let value = stage.expect_value(&format!("value for {}", key.text))?;
        let name = key.text.to_ascii_lowercase();
        if options.insert(name.clone(), value.text).is_some() {
            return Err(stage.error_at(key.offset, format!("duplicate option '{name}'")));
        }
        if stage.at_end() {
            break;
        }
    }
    Ok(Box::new(OptionCmd::new(options)))
}
