use logq_commands::commands::Table;

use super::{limit_option, Parsed};
use crate::error::RegistrationError;
use crate::syntax::{QueryParser, Stage, Syntax};

pub struct TableParser;

impl QueryParser for TableParser {
    fn name(&self) -> &'static str {
        "table"
    }

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError> {
        syntax.add("table", parse)
    }
}

/// `table [offset=N] [limit=N] <name>`
fn parse(stage: &mut Stage<'_>) -> Parsed {
    let options = stage.options(&["offset", "limit"])?;
    let limit = limit_option(stage, &options)?;
    let offset = match options.get("offset") {
        Some(tok) => tok.text.parse::<u64>().map_err(|_| {
            stage.error_at(
                tok.offset,
                format!("offset must be a non-negative integer, got '{}'", tok.text),
            )
        })?,
        None => 0,
    };
    let name = stage.expect_value("table name")?;
    stage.finish()?;
    Ok(Box::new(
        Table::new(name.text).with_offset(offset).with_limit(limit),
    ))
}

#[cfg(test)]
mod tests {
    use logq_commands::commands::Table;

    use super::super::testing::one;

    #[test]
    fn options_then_name() {
        let cmd = one("table offset=2 limit=10 events").unwrap();
        assert!(cmd.is::<Table>());
        assert_eq!(cmd.describe(), "table offset=2 limit=10 events");
        assert_eq!(one("table \"web logs\"").unwrap().describe(), "table web logs");
    }

    #[test]
    fn rejects_bad_options() {
        assert_eq!(one("table limit=0 events").unwrap_err().position, 12);
        assert!(one("table offset=-1 events").is_err());
        assert_eq!(one("table").unwrap_err().message, "expected table name");
        assert_eq!(one("table a b").unwrap_err().position, 8);
    }
}
