//! Built-in commands, one module per query keyword.
//!
//! `sort` lives in its own top-level module with its run generation and
//! merge code.

pub mod agg;
pub mod drop;
pub mod fields;
pub mod function;
pub mod lookup;
pub mod option;
pub mod rename;
pub mod search;
pub mod stats;
pub mod table;
pub mod timechart;

pub use agg::{AggFunc, AggSpec};
pub use drop::DropCmd;
pub use fields::Fields;
pub use function::{FnArg, Function, ScalarFn};
pub use lookup::{Lookup, LookupOutput};
pub use option::OptionCmd;
pub use rename::Rename;
pub use search::{CompareOp, Condition, Search};
pub use stats::Stats;
pub use table::Table;
pub use timechart::{parse_span, Timechart};

pub use crate::sort::{Sort, SortKey};
