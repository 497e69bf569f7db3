use crate::errors::*;
use crate::format::Format;
use crate::transport::RawResponse;

/// Header carrying the number of vulnerable packages
pub const ALERTS_HEADER: &str = "X-Alerts";

/// Outcome of a successful check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    count: u64,
    body: String,
    format: Format,
}

impl CheckResult {
    pub fn new(count: u64, body: String, format: Format) -> CheckResult {
        CheckResult {
            count,
            body,
            format,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn into_body(self) -> String {
        self.body
    }
}

pub fn decode(response: &RawResponse, format: Format) -> Result<CheckResult> {
    let count = response
        .header(ALERTS_HEADER)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .ok_or_else(|| Error::runtime("The web service did not return alerts count."))?;
    debug!("Service reported {} alerts", count);

    Ok(CheckResult::new(count, response.body.clone(), format))
}
