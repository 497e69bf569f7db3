use super::Formatter;
use crate::errors::*;
use crate::report::Vulnerabilities;
use std::io::Write;

/// Writes the service report back out unchanged
pub struct Json {
    pub pretty: bool,
}

impl Default for Json {
    fn default() -> Self {
        Json { pretty: true }
    }
}

impl Formatter for Json {
    fn display(&self, w: &mut dyn Write, _lock_path: &str, vulns: &Vulnerabilities) -> Result<()> {
        let written = if self.pretty {
            serde_json::to_writer_pretty(&mut *w, vulns.raw())
        } else {
            serde_json::to_writer(&mut *w, vulns.raw())
        };
        written.map_err(|err| Error::runtime(format!("Failed to write report: {}", err)))?;
        writeln!(w)?;
        Ok(())
    }
}
