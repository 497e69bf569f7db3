use super::{display_path, summary, write_dependencies, Formatter};
use crate::errors::*;
use crate::report::Vulnerabilities;
use colored::{ColoredString, Colorize};
use std::io::{self, Write};

const DISCLAIMER: &[(&str, &str)] = &[
    (
        "            ",
        "This checker can only detect vulnerabilities that are referenced",
    ),
    (
        " Disclaimer ",
        "in the security advisories database. Execute this",
    ),
    (
        "            ",
        "command regularly to check the newly discovered vulnerabilities.",
    ),
];

/// Full report with banner, status block and disclaimer
pub struct Text;

fn write_block(w: &mut dyn Write, lines: &[String], ok: bool) -> io::Result<()> {
    let style = |s: &str| -> ColoredString {
        if ok {
            s.white().on_green()
        } else {
            s.white().on_red()
        }
    };

    let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let padding = " ".repeat(width + 4);

    writeln!(w, "{}", style(&padding))?;
    for line in lines {
        writeln!(w, "{}", style(&format!("  {:<width$}  ", line, width = width)))?;
    }
    writeln!(w, "{}", style(&padding))
}

impl Formatter for Text {
    fn display(&self, w: &mut dyn Write, lock_path: &str, vulns: &Vulnerabilities) -> Result<()> {
        let deps = vulns.dependencies()?;

        writeln!(w)?;
        writeln!(w, "{}", "Security Check Report".blue())?;
        writeln!(w, "{}", "~~~~~~~~~~~~~~~~~~~~~".blue())?;
        writeln!(w)?;
        writeln!(w, "Checked file: {}", display_path(lock_path).yellow())?;
        writeln!(w)?;

        let count = deps.len();
        let status = if count == 0 { "[OK]" } else { "[CRITICAL]" };
        write_block(w, &[status.to_string(), summary(count)], count == 0)?;
        writeln!(w)?;

        if count != 0 {
            write_dependencies(w, &deps)?;
        }

        for (label, line) in DISCLAIMER {
            writeln!(w, "{} {}", label.white().on_yellow(), line)?;
        }
        writeln!(w)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatters::tests::{bullets, one_dependency_two_advisories, render};

    #[test]
    fn test_text_ok() {
        let out = render(&Text, &Vulnerabilities::default());
        assert!(out.starts_with("\nSecurity Check Report\n~~~~~~~~~~~~~~~~~~~~~\n\n"));
        assert!(out.contains("Checked file: /nonexistent/composer.lock\n"));
        assert!(out.contains(&format!("  {:<37}  \n", "[OK]")));
        assert!(out.contains("  0 packages have known vulnerabilities  \n"));
        assert_eq!(bullets(&out), 0);
        assert!(!out.contains(" (1.0.0)"));
        assert!(out.contains(" Disclaimer  in the security advisories database."));
    }

    #[test]
    fn test_text_critical() {
        let out = render(&Text, &one_dependency_two_advisories());
        assert!(out.contains("[CRITICAL]"));
        assert!(out.contains("1 package has known vulnerabilities"));
        assert_eq!(out.matches("acme/foo (1.0.0)\n----------------\n").count(), 1);
        assert_eq!(bullets(&out), 2);
        assert!(out.contains(" * CVE-2020-1: Remote code execution\n   https://example.com/1\n"));
        assert!(out.contains(" * (no CVE ID): Information leak\n"));
    }

    #[test]
    fn test_block_is_padded() {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        write_block(&mut buf, &["[OK]".to_string(), "abcdef".to_string()], true).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "          \n  [OK]    \n  abcdef  \n          \n"
        );
    }
}
