//! `fields [-] f1, f2, ...`: keep (or, with `-`, remove) the listed fields.
//!
//! Output rows carry only materialized fields; the raw record is dropped.
//! In remove mode every header field not listed is materialized first, so
//! nothing still reachable through the raw record is lost.

use logq_core::row::Row;

use crate::command::{Command, CommandCore};
use crate::error::Result;

pub struct Fields {
    core: CommandCore,
    names: Vec<String>,
    remove: bool,
}

impl Fields {
    pub fn keep(names: Vec<String>) -> Self {
        Self {
            core: CommandCore::new(),
            names,
            remove: false,
        }
    }

    pub fn remove(names: Vec<String>) -> Self {
        Self {
            remove: true,
            ..Self::keep(names)
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_remove(&self) -> bool {
        self.remove
    }

    fn project(&self, mut row: Row) -> Row {
        let header = self.core.header().cloned();
        if self.remove {
            if let Some(h) = header.as_deref() {
                for field in h.iter().filter(|f| !self.names.contains(f)) {
                    row.resolve(Some(h), field);
                }
            }
            for name in &self.names {
                row.remove(name);
            }
            row.set_raw(None);
            row
        } else {
            let mut out = Row::new();
            for name in &self.names {
                if let Some(v) = row.resolve_cloned(header.as_deref(), name) {
                    out.insert(name.clone(), v);
                }
            }
            out
        }
    }
}

impl Command for Fields {
    fn name(&self) -> &'static str {
        "fields"
    }

    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CommandCore {
        &mut self.core
    }

    fn push(&mut self, row: Row) -> Result<()> {
        let row = self.project(row);
        self.core.write(row)
    }

    fn describe(&self) -> String {
        let sign = if self.remove { "- " } else { "" };
        format!("fields {sign}{}", self.names.join(", "))
    }
}
