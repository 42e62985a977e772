use logq_commands::commands::{CompareOp, Condition, Search};
use logq_core::value::Value;

use super::{limit_option, Parsed};
use crate::error::{QuerySyntaxError, RegistrationError};
use crate::lexer::TokenKind;
use crate::syntax::{QueryParser, Stage, Syntax};

pub struct SearchParser;

impl QueryParser for SearchParser {
    fn name(&self) -> &'static str {
        "search"
    }

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError> {
        syntax.add("search", parse)
    }
}

/// `search [limit=N] <field> <op> <literal> [and ...]`
fn parse(stage: &mut Stage<'_>) -> Parsed {
    let options = stage.options(&["limit"])?;
    let limit = limit_option(stage, &options)?;
    let mut conditions = vec![condition(stage)?];
    while stage.eat_word("and") {
        conditions.push(condition(stage)?);
    }
    stage.finish()?;
    Ok(Box::new(Search::new(conditions, limit)))
}

fn condition(stage: &mut Stage<'_>) -> Result<Condition, QuerySyntaxError> {
    let field = stage.expect_word("field name")?;
    let op = match stage.next_token() {
        Some(tok) => match tok.kind {
            TokenKind::Op(op) => CompareOp::TOKENS
                .iter()
                .find(|(text, _)| *text == op)
                .map(|(_, op)| *op)
                .ok_or_else(|| stage.error_at(tok.offset, format!("unknown operator '{op}'")))?,
            _ => return Err(stage.error_at(tok.offset, "expected comparison operator")),
        },
        None => return Err(stage.error_here("expected comparison operator")),
    };
    let literal = stage.expect_value("literal")?;
    let value = match literal.kind {
        TokenKind::Quoted => Value::Str(literal.text),
        _ => Value::parse_literal(&literal.text),
    };
    Ok(Condition::new(field.text, op, value))
}
