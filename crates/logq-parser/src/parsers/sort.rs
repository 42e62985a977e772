use logq_commands::commands::{Sort, SortKey};

use super::{limit_option, Parsed};
use crate::error::RegistrationError;
use crate::syntax::{QueryParser, Stage, Syntax};

pub struct SortParser;

impl QueryParser for SortParser {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError> {
        syntax.add("sort", parse)
    }
}

/// `sort [limit=N] [-]f1, [-]f2, ...`
fn parse(stage: &mut Stage<'_>) -> Parsed {
    let options = stage.options(&["limit"])?;
    let limit = limit_option(stage, &options)?;
    let mut keys = Vec::new();
    for tok in stage.word_list("sort key")? {
        let key = SortKey::parse(&tok.text);
        if key.field.is_empty() {
            return Err(stage.error_at(tok.offset, "sort key needs a field name"));
        }
        keys.push(key);
    }
    stage.finish()?;
    Ok(Box::new(Sort::new(keys, limit)))
}
