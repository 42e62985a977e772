use logq_commands::commands::{AggFunc, AggSpec, Stats};

use super::Parsed;
use crate::error::{QuerySyntaxError, RegistrationError};
use crate::lexer::TokenKind;
use crate::syntax::{QueryParser, Stage, Syntax};

pub struct StatsParser;

impl QueryParser for StatsParser {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError> {
        syntax.add("stats", parse)
    }
}

/// `stats agg[, agg]... [by f1, f2]`
fn parse(stage: &mut Stage<'_>) -> Parsed {
    let aggs = agg_list(stage)?;
    let by = if stage.eat_word("by") {
        stage.word_list("group field")?.into_iter().map(|t| t.text).collect()
    } else {
        Vec::new()
    };
    stage.finish()?;
    Ok(Box::new(Stats::new(aggs, by)))
}

/// `name[(field)] [as alias]`, comma separated. Shared with `timechart`.
pub(super) fn agg_list(stage: &mut Stage<'_>) -> Result<Vec<AggSpec>, QuerySyntaxError> {
    let mut aggs = vec![agg(stage)?];
    while stage.eat(TokenKind::Comma) {
        aggs.push(agg(stage)?);
    }
    Ok(aggs)
}

fn agg(stage: &mut Stage<'_>) -> Result<AggSpec, QuerySyntaxError> {
    let name = stage.expect_word("aggregation")?;
    let func = AggFunc::from_name(&name.text).ok_or_else(|| {
        stage.error_at(name.offset, format!("unknown aggregation '{}'", name.text))
    })?;
    let field = if stage.eat(TokenKind::LParen) {
        let field = stage.expect_word("field name")?;
        stage.expect(TokenKind::RParen, "')'")?;
        Some(field.text)
    } else {
        None
    };
    let alias = if stage.eat_word("as") {
        Some(stage.expect_word("alias")?.text)
    } else {
        None
    };
    AggSpec::new(func, field, alias).map_err(|e| stage.rejected(name.offset, e))
}

#[cfg(test)]
mod tests {
    use logq_commands::commands::{AggFunc, Stats};

    use super::super::testing::one;

    #[test]
    fn aggs_and_groups() {
        let cmd = one("stats count, avg(latency) as lat, MAX(bytes) by host, status").unwrap();
        assert!(cmd.is_reducer());
        let stats = cmd.downcast_ref::<Stats>().unwrap();
        let funcs: Vec<_> = stats.aggs().iter().map(|a| a.func).collect();
        assert_eq!(funcs, vec![AggFunc::Count, AggFunc::Avg, AggFunc::Max]);
        assert_eq!(stats.aggs()[1].alias, "lat");
        assert_eq!(stats.by(), ["host", "status"]);
    }

    #[test]
    fn bad_aggregations() {
        let err = one("stats median(x)").unwrap_err();
        assert_eq!(err.position, 6);
        assert_eq!(err.message, "unknown aggregation 'median'");
        // only count may omit its field
        let err = one("stats count, sum").unwrap_err();
        assert_eq!(err.position, 13);
        assert_eq!(err.message, "sum needs a field");
        assert_eq!(one("stats sum(x").unwrap_err().message, "expected ')'");
        assert!(one("stats count by").is_err());
    }
}
