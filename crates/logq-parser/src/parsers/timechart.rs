use logq_commands::commands::Timechart;

use super::stats::agg_list;
use super::Parsed;
use crate::error::RegistrationError;
use crate::syntax::{QueryParser, Stage, Syntax};

pub struct TimechartParser;

impl QueryParser for TimechartParser {
    fn name(&self) -> &'static str {
        "timechart"
    }

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError> {
        syntax.add("timechart", parse)
    }
}

/// `timechart span=<N><s|m|h|d> agg[, agg]... [by f]`
fn parse(stage: &mut Stage<'_>) -> Parsed {
    let options = stage.options(&["span"])?;
    let span = options
        .get("span")
        .cloned()
        .ok_or_else(|| stage.error_here("expected span=<duration>"))?;
    let aggs = agg_list(stage)?;
    let by = if stage.eat_word("by") {
        Some(stage.expect_word("group field")?.text)
    } else {
        None
    };
    stage.finish()?;
    let chart = Timechart::new(&span.text, aggs, by)
        .map_err(|e| stage.rejected(span.offset, e))?;
    Ok(Box::new(chart))
}

#[cfg(test)]
mod tests {
    use logq_commands::commands::Timechart;

    use super::super::testing::one;

    #[test]
    fn span_aggs_and_by() {
        let cmd = one("timechart span=1m count, sum(bytes) by host").unwrap();
        assert!(cmd.is::<Timechart>());
        assert_eq!(cmd.describe(), "timechart span=1m count, sum(bytes) by host");
    }

    #[test]
    fn span_is_required_and_checked() {
        assert_eq!(one("timechart count").unwrap_err().message, "expected span=<duration>");
        assert_eq!(one("timechart span=0s count").unwrap_err().position, 15);
        assert!(one("timechart span=5x count").is_err());
        // a single group field only
        assert!(one("timechart span=1h count by a, b").is_err());
    }
}
