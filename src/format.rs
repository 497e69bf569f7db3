use crate::errors::*;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

/// Output formats understood by the advisory service
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumVariantNames, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Format {
    #[default]
    Text,
    Simple,
    Markdown,
    Yaml,
    Json,
    Ansi,
}

impl Format {
    /// Parse a format name, anything unknown is treated as text
    pub fn from_name(name: &str) -> Format {
        Format::from_str(name).unwrap_or_else(|_| {
            warn!("Unknown format {:?}, falling back to text", name);
            Format::Text
        })
    }

    /// Media type sent in the `Accept` header
    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Text => "text/plain",
            Format::Simple => "text/plain",
            Format::Markdown => "text/markdown",
            Format::Yaml => "text/yaml",
            Format::Json => "application/json",
            Format::Ansi => "text/plain+ansi",
        }
    }

    /// Formats we render ourselves from a json report
    pub fn renders_locally(&self) -> bool {
        matches!(self, Format::Text | Format::Simple | Format::Json)
    }

    /// Format to request from the service when displaying `self`
    pub fn wire_format(&self) -> Format {
        if self.renders_locally() {
            Format::Json
        } else {
            *self
        }
    }
}
