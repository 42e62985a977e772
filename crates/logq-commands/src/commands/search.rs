//! `search [limit=N] <cond> [and <cond>]...`
//!
//! A condition is `field op literal` with `op` in `== != < <= > >= =`
//! (`=` is `==`). A row passes when every condition holds. An absent field
//! compares as `null`, so `f != 1` keeps rows without `f` and `f == null`
//! selects them. With `limit`, the command ends itself after N matches,
//! which stops the rest of the chain through `eof`.

use std::cmp::Ordering;
use std::fmt;

use logq_core::row::Row;
use logq_core::value::Value;

use crate::command::{Command, CommandCore};
use crate::error::Result;
use crate::status::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Longest-first so `<=` is not read as `<`.
    pub const TOKENS: [(&'static str, CompareOp); 7] = [
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        ("<=", CompareOp::Le),
        (">=", CompareOp::Ge),
        ("<", CompareOp::Lt),
        (">", CompareOp::Gt),
        ("=", CompareOp::Eq),
    ];

    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: CompareOp,
    pub literal: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: CompareOp, literal: Value) -> Self {
        Self {
            field: field.into(),
            op,
            literal,
        }
    }

    pub fn matches(&self, value: Option<&Value>) -> bool {
        let value = value.unwrap_or(&Value::Null);
        self.op.holds(value.total_cmp(&self.literal))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.literal {
            Value::Str(s) => write!(f, "{} {} \"{}\"", self.field, self.op.as_str(), s),
            other => write!(f, "{} {} {}", self.field, self.op.as_str(), other),
        }
    }
}

pub struct Search {
    core: CommandCore,
    conditions: Vec<Condition>,
    limit: Option<u64>,
    matched: u64,
}

impl Search {
    pub fn new(conditions: Vec<Condition>, limit: Option<u64>) -> Self {
        Self {
            core: CommandCore::new(),
            conditions,
            limit,
            matched: 0,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn matched(&self) -> u64 {
        self.matched
    }

    fn accepts(&self, row: &mut Row) -> bool {
        let header = self.core.header().cloned();
        self.conditions
            .iter()
            .all(|c| c.matches(row.resolve(header.as_deref(), &c.field)))
    }
}

impl Command for Search {
    fn name(&self) -> &'static str {
        "search"
    }

    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CommandCore {
        &mut self.core
    }

    fn push(&mut self, mut row: Row) -> Result<()> {
        if self.core.status() == Status::End || !self.accepts(&mut row) {
            return Ok(());
        }
        self.matched += 1;
        self.core.write(row)?;
        if self.limit.is_some_and(|limit| self.matched >= limit) {
            tracing::debug!(limit = ?self.limit, "search limit reached");
            self.eof()?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let conds: Vec<String> = self.conditions.iter().map(|c| c.to_string()).collect();
        match self.limit {
            Some(limit) => format!("search limit={limit} {}", conds.join(" and ")),
            None => format!("search {}", conds.join(" and ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::command::testing::Collect;
    use crate::context::QueryContext;
    use crate::status::StatusCell;
    use logq_core::row::header_from_logformat;

    fn cond(field: &str, op: CompareOp, lit: &str) -> Condition {
        Condition::new(field, op, Value::parse_literal(lit))
    }

    #[test]
    fn operators() {
        let v = Value::str("200");
        assert!(cond("s", CompareOp::Eq, "200").matches(Some(&v)));
        assert!(cond("s", CompareOp::Ge, "150").matches(Some(&v)));
        assert!(!cond("s", CompareOp::Lt, "150").matches(Some(&v)));
        assert!(cond("s", CompareOp::Ne, "404").matches(Some(&v)));
        assert!(cond("u", CompareOp::Eq, "\"alice\"").matches(Some(&Value::str("alice"))));
        assert!(cond("u", CompareOp::Ne, "1").matches(None));
        assert!(cond("u", CompareOp::Eq, "null").matches(None));
        assert!(!cond("u", CompareOp::Gt, "1").matches(None));
    }

    #[test]
    fn filters_raw_records_through_header() {
        let (collect, rows, _) = Collect::new();
        let mut search = Search::new(
            vec![cond("status", CompareOp::Ge, "400"), cond("host", CompareOp::Eq, "a")],
            None,
        );
        search.set_header(Some(header_from_logformat("host status")));
        search.set_next(Box::new(collect));

        for raw in ["a 200", "a 404", "b 500", "a 503"] {
            search.push(Row::from_raw(raw)).unwrap();
        }
        let rows = rows.lock().unwrap();
        let got: Vec<_> = rows.iter().map(|r| r.raw().unwrap().to_string()).collect();
        assert_eq!(got, vec!["a 404", "a 503"]);
        assert_eq!(search.core().push_count(), 2);
    }

    #[test]
    fn limit_ends_chain_and_asks_head_to_stop() {
        let ctx = Arc::new(QueryContext::in_memory());
        let head_status = StatusCell::new();
        ctx.set_head(head_status.clone());

        let (collect, rows, eofs) = Collect::new();
        let mut search = Search::new(vec![], Some(2));
        search.core_mut().set_context(ctx.clone());
        search.set_next(Box::new(collect));

        for i in 0..5i64 {
            search.push(Row::new().with("i", i)).unwrap();
        }
        assert_eq!(rows.lock().unwrap().len(), 2);
        assert_eq!(search.status(), Status::End);
        assert_eq!(eofs.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(ctx.head_eof_requested());
    }

    #[test]
    fn describe_round_trips_conditions() {
        let s = Search::new(
            vec![cond("a", CompareOp::Eq, "\"x y\""), cond("b", CompareOp::Lt, "3")],
            Some(10),
        );
        assert_eq!(s.describe(), "search limit=10 a == \"x y\" and b < 3");
    }
}
