use super::{display_path, summary, write_dependencies, Formatter};
use crate::errors::*;
use crate::report::Vulnerabilities;
use colored::Colorize;
use std::io::Write;

/// Plain report without banner or disclaimer
pub struct Simple;

impl Formatter for Simple {
    fn display(&self, w: &mut dyn Write, lock_path: &str, vulns: &Vulnerabilities) -> Result<()> {
        let deps = vulns.dependencies()?;
        writeln!(
            w,
            "Security Check Report: {}",
            display_path(lock_path).yellow()
        )?;

        let count = deps.len();
        let status = if count == 0 {
            format!("[OK] {}", summary(count)).green()
        } else {
            format!("[CRITICAL] {}", summary(count)).white().on_red()
        };
        writeln!(w, "{}", status)?;

        if count != 0 {
            writeln!(w)?;
            write_dependencies(w, &deps)?;
        }

        Ok(())
    }
}
