//! `option k=v ...`: pass-through stage carrying query options.

use std::collections::BTreeMap;

use logq_core::row::Row;

use crate::command::{Command, CommandCore};
use crate::error::Result;

/// Option key that turns timeline reporting off when set to `false`.
pub const TIMELINE_OPTION: &str = "timeline";

#[derive(Default)]
pub struct OptionCmd {
    core: CommandCore,
    options: BTreeMap<String, String>,
}

impl OptionCmd {
    pub fn new(options: BTreeMap<String, String>) -> Self {
        Self {
            core: CommandCore::new(),
            options,
        }
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(|s| s.as_str())
    }

    /// Whether this stage leaves timeline reporting on (default: yes).
    pub fn timeline(&self) -> bool {
        !matches!(self.get(TIMELINE_OPTION), Some(v) if v.eq_ignore_ascii_case("false"))
    }
}

impl Command for OptionCmd {
    fn name(&self) -> &'static str {
        "option"
    }

    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CommandCore {
        &mut self.core
    }

    fn push(&mut self, row: Row) -> Result<()> {
        self.core.write(row)
    }

    fn describe(&self) -> String {
        let opts: Vec<String> = self.options.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("option {}", opts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_flag() {
        let mut opts = BTreeMap::new();
        assert!(OptionCmd::new(opts.clone()).timeline());
        opts.insert("timeline".to_string(), "FALSE".to_string());
        let cmd = OptionCmd::new(opts);
        assert!(!cmd.timeline());
        assert_eq!(cmd.describe(), "option timeline=FALSE");
    }
}
