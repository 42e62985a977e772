//! `rename a as b[, c as d]...`
//!
//! The old name is materialized and moved to the new one. Renaming a header
//! field materializes the rest of the header and drops the raw record, so
//! the old name cannot be extracted again downstream.

use logq_core::row::Row;

use crate::command::{Command, CommandCore};
use crate::error::Result;

pub struct Rename {
    core: CommandCore,
    renames: Vec<(String, String)>,
}

impl Rename {
    pub fn new(renames: Vec<(String, String)>) -> Self {
        Self {
            core: CommandCore::new(),
            renames,
        }
    }

    pub fn renames(&self) -> &[(String, String)] {
        &self.renames
    }

    /// Materialize every header field and drop the raw record.
    fn detach_raw(&self, row: &mut Row) {
        if let Some(header) = self.core.header() {
            for field in header.iter() {
                row.resolve(Some(&header[..]), field);
            }
        }
        row.set_raw(None);
    }
}

impl Command for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CommandCore {
        &mut self.core
    }

    fn push(&mut self, mut row: Row) -> Result<()> {
        let shadows_header = row.raw().is_some()
            && self
                .core
                .header()
                .is_some_and(|h| self.renames.iter().any(|(from, _)| h.contains(from)));
        if shadows_header {
            self.detach_raw(&mut row);
        }
        for (from, to) in &self.renames {
            if let Some(v) = self.core.resolve(&mut row, from) {
                row.remove(from);
                row.insert(to.clone(), v);
            }
        }
        self.core.write(row)
    }

    fn describe(&self) -> String {
        let parts: Vec<String> = self
            .renames
            .iter()
            .map(|(a, b)| format!("{a} as {b}"))
            .collect();
        format!("rename {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::Collect;
    use logq_core::row::header_from_logformat;
    use logq_core::value::Value;

    #[test]
    fn moves_values_and_ignores_absent_fields() {
        let (collect, out, _) = Collect::new();
        let mut rename = Rename::new(vec![
            ("user".into(), "actor".into()),
            ("nope".into(), "still_nope".into()),
        ]);
        rename.set_next(Box::new(collect));
        rename
            .push(Row::new().with("ts", 100i64).with("user", "a"))
            .unwrap();

        let out = out.lock().unwrap();
        assert_eq!(out[0].get("actor"), Some(&Value::str("a")));
        assert!(!out[0].contains("user"));
        assert!(!out[0].contains("still_nope"));
        assert_eq!(out[0].get("ts"), Some(&Value::Int(100)));
    }

    #[test]
    fn renamed_header_field_is_not_extracted_again() {
        let (collect, out, _) = Collect::new();
        let mut rename = Rename::new(vec![("user".into(), "actor".into())]);
        rename.set_header(Some(header_from_logformat("ts user action")));
        rename.set_next(Box::new(collect));
        rename.push(Row::from_raw("100 alice login")).unwrap();

        let mut out = out.lock().unwrap();
        let row = &mut out[0];
        assert!(row.raw().is_none());
        assert_eq!(row.get("actor"), Some(&Value::str("alice")));
        assert_eq!(row.get("action"), Some(&Value::str("login")));
        assert_eq!(row.get("ts"), Some(&Value::str("100")));
        let header = header_from_logformat("ts user action");
        assert!(row.resolve(Some(&header[..]), "user").is_none());
    }
}
