//! `lookup <name> <src> [as <key>] output <field> [as <alias>][, ...]`
//!
//! For each row, the value of `src` is looked up in the `key` column of the
//! named lookup table, and each `output` column of the match is written
//! under its alias. The handler is resolved from the `LookupService` when
//! the chain is bound.

use std::sync::Arc;

use logq_core::catalog::{LookupHandler, LookupService};
use logq_core::row::Row;

use crate::command::{Command, CommandCore};
use crate::error::{CommandError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOutput {
    pub field: String,
    pub alias: String,
}

pub struct Lookup {
    core: CommandCore,
    table: String,
    src_field: String,
    key_field: String,
    outputs: Vec<LookupOutput>,
    handler: Option<Arc<dyn LookupHandler>>,
}

impl Lookup {
    pub fn new(
        table: impl Into<String>,
        src_field: impl Into<String>,
        key_field: Option<String>,
        outputs: Vec<LookupOutput>,
    ) -> Self {
        let src_field = src_field.into();
        Self {
            core: CommandCore::new(),
            table: table.into(),
            key_field: key_field.unwrap_or_else(|| src_field.clone()),
            src_field,
            outputs,
            handler: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn outputs(&self) -> &[LookupOutput] {
        &self.outputs
    }

    pub fn is_bound(&self) -> bool {
        self.handler.is_some()
    }

    /// Resolve the named lookup table.
    pub fn bind(&mut self, service: &dyn LookupService) -> Result<()> {
        let handler = service.lookup_handler(&self.table).ok_or_else(|| {
            CommandError::Exec(format!("unknown lookup table '{}'", self.table))
        })?;
        self.handler = Some(handler);
        Ok(())
    }
}

impl Command for Lookup {
    fn name(&self) -> &'static str {
        "lookup"
    }

    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CommandCore {
        &mut self.core
    }

    fn push(&mut self, mut row: Row) -> Result<()> {
        let handler = self.handler.as_ref().ok_or_else(|| {
            CommandError::Exec(format!("lookup '{}' is not bound", self.table))
        })?;
        if let Some(value) = self.core.resolve(&mut row, &self.src_field) {
            for out in &self.outputs {
                if let Some(v) = handler.lookup(&self.key_field, &out.field, &value) {
                    row.insert(out.alias.clone(), v);
                }
            }
        }
        self.core.write(row)
    }

    fn describe(&self) -> String {
        let outs: Vec<String> = self
            .outputs
            .iter()
            .map(|o| {
                if o.alias == o.field {
                    o.field.clone()
                } else {
                    format!("{} as {}", o.field, o.alias)
                }
            })
            .collect();
        let key = if self.key_field == self.src_field {
            String::new()
        } else {
            format!(" as {}", self.key_field)
        };
        format!(
            "lookup {} {}{} output {}",
            self.table,
            self.src_field,
            key,
            outs.join(", ")
        )
    }
}
