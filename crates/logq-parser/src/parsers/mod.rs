//! Built-in grammar contributors, one per keyword.
//!
//! Each module exposes a unit struct implementing `QueryParser`; the list
//! below is the fixed set the process-wide registry is built from.

mod drop;
mod fields;
mod function;
mod lookup;
mod option;
mod rename;
mod search;
mod sort;
mod stats;
mod table;
mod timechart;

use std::collections::BTreeMap;

use logq_commands::Command;

use crate::error::QuerySyntaxError;
use crate::lexer::Token;
use crate::syntax::{QueryParser, Stage};

pub use drop::DropParser;
pub use fields::FieldsParser;
pub use function::FunctionParser;
pub use lookup::LookupParser;
pub use option::OptionParser;
pub use rename::RenameParser;
pub use search::SearchParser;
pub use sort::SortParser;
pub use stats::StatsParser;
pub use table::TableParser;
pub use timechart::TimechartParser;

pub(crate) type Parsed = Result<Box<dyn Command>, QuerySyntaxError>;

pub fn contributors() -> Vec<Box<dyn QueryParser>> {
    vec![
        Box::new(TableParser),
        Box::new(SearchParser),
        Box::new(FieldsParser),
        Box::new(RenameParser),
        Box::new(DropParser),
        Box::new(SortParser),
        Box::new(StatsParser),
        Box::new(TimechartParser),
        Box::new(FunctionParser),
        Box::new(OptionParser),
        Box::new(LookupParser),
    ]
}

/// `limit=N` from parsed options, if present.
pub(crate) fn limit_option(
    stage: &Stage<'_>,
    options: &BTreeMap<String, Token>,
) -> Result<Option<u64>, QuerySyntaxError> {
    options
        .get("limit")
        .map(|tok| stage.positive(tok, "limit"))
        .transpose()
}
