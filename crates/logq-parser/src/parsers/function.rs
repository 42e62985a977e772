use logq_commands::commands::{FnArg, Function, ScalarFn};
use logq_core::value::Value;

use super::Parsed;
use crate::error::RegistrationError;
use crate::lexer::{Token, TokenKind};
use crate::syntax::{QueryParser, Stage, Syntax};

pub struct FunctionParser;

impl QueryParser for FunctionParser {
    fn name(&self) -> &'static str {
        "function"
    }

    fn add_syntax(&self, syntax: &mut Syntax) -> Result<(), RegistrationError> {
        syntax.add("function", parse)
    }
}

/// `function <fn>(<field>[, <arg>]...) as <alias>`
fn parse(stage: &mut Stage<'_>) -> Parsed {
    let name = stage.expect_word("function name")?;
    let func = ScalarFn::from_name(&name.text).ok_or_else(|| {
        stage.error_at(name.offset, format!("unknown function '{}'", name.text))
    })?;
    stage.expect(TokenKind::LParen, "'('")?;
    let field = stage.expect_word("field name")?;
    let mut args = Vec::new();
    while stage.eat(TokenKind::Comma) {
        args.push(argument(stage.expect_value("argument")?));
    }
    stage.expect(TokenKind::RParen, "')'")?;
    if !stage.eat_word("as") {
        return Err(stage.error_here("expected 'as'"));
    }
    let alias = stage.expect_word("alias")?;
    stage.finish()?;
    let function = Function::new(func, field.text, args, alias.text)
        .map_err(|e| stage.rejected(name.offset, e))?;
    Ok(Box::new(function))
}

/// Quoted strings and numbers are literals; other bare words name fields.
fn argument(tok: Token) -> FnArg {
    if tok.kind == TokenKind::Quoted {
        return FnArg::Literal(Value::Str(tok.text));
    }
    match Value::parse_literal(&tok.text) {
        v @ (Value::Int(_) | Value::Float(_)) => FnArg::Literal(v),
        _ => FnArg::Field(tok.text),
    }
}

#[cfg(test)]
mod tests {
    use logq_commands::commands::{Function, ScalarFn};

    use super::super::testing::one;

    #[test]
    fn literal_and_field_arguments() {
        let cmd = one(r#"function concat(host, ":", port) as addr"#).unwrap();
        let f = cmd.downcast_ref::<Function>().unwrap();
        assert_eq!(f.func(), ScalarFn::Concat);
        assert_eq!(f.alias(), "addr");
        assert_eq!(cmd.describe(), r#"function concat(host, ":", port) as addr"#);

        let cmd = one("function substr(msg, 0, 5) as head").unwrap();
        assert_eq!(cmd.describe(), "function substr(msg, 0, 5) as head");
    }

    #[test]
    fn shape_errors() {
        assert_eq!(one("function nope(a) as b").unwrap_err().position, 9);
        assert_eq!(one("function lower a as b").unwrap_err().message, "expected '('");
        assert_eq!(one("function lower(a)").unwrap_err().message, "expected 'as'");
        let err = one("function lower(a, b) as c").unwrap_err();
        assert_eq!(err.position, 9);
        assert!(err.message.starts_with("lower takes"));
    }
}
