pub mod json;
pub mod simple;
pub mod text;

use crate::errors::*;
use crate::format::Format;
use crate::manifest::INLINE_PREFIX;
use crate::report::{Dependency, Entries, Vulnerabilities};
use colored::Colorize;
use std::fs;
use std::io::Write;

pub use self::json::Json;
pub use self::simple::Simple;
pub use self::text::Text;

const NO_CVE: &str = "(no CVE ID)";

pub trait Formatter {
    /// Write the report for the lock file at `lock_path`
    fn display(&self, w: &mut dyn Write, lock_path: &str, vulns: &Vulnerabilities) -> Result<()>;
}

/// Local renderer for a format, `None` if the service renders it
pub fn for_format(format: Format) -> Option<Box<dyn Formatter>> {
    match format {
        Format::Json => Some(Box::new(Json::default())),
        Format::Simple => Some(Box::new(Simple)),
        Format::Text => Some(Box::new(Text)),
        Format::Markdown | Format::Yaml | Format::Ansi => None,
    }
}

fn display_path(lock_path: &str) -> String {
    if lock_path.starts_with(INLINE_PREFIX) {
        return "(inline lock file)".to_string();
    }
    fs::canonicalize(lock_path)
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| lock_path.to_string())
}

fn summary(count: usize) -> String {
    let noun = if count == 1 {
        "package has"
    } else {
        "packages have"
    };
    format!("{} {} known vulnerabilities", count, noun)
}

fn write_dependencies(w: &mut dyn Write, deps: &Entries<Dependency>) -> Result<()> {
    for (name, dependency) in deps.iter() {
        let full_name = format!("{} ({})", name, dependency.version);
        writeln!(w, "{}", full_name.green())?;
        writeln!(w, "{}", "-".repeat(full_name.chars().count()).green())?;
        writeln!(w)?;

        for advisory in dependency.advisories.values() {
            let cve = advisory
                .cve
                .as_deref()
                .filter(|cve| !cve.is_empty())
                .unwrap_or(NO_CVE);
            writeln!(w, " * {}: {}", cve.yellow(), advisory.title)?;
            if !advisory.link.is_empty() {
                writeln!(w, "   {}", advisory.link)?;
            }
            writeln!(w)?;
        }
    }
    Ok(())
}
