use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use security_checker::args::{Args, Check, SubCommand};
use security_checker::checker::Checker;
use security_checker::errors::{debug, info};
use security_checker::format::Format;
use security_checker::formatters;
use security_checker::report::Vulnerabilities;
use security_checker::transport::TransportConfig;
use std::io::{self, Write};
use std::process;
use std::time::Duration;
use strum::IntoEnumIterator;

fn parse_header(header: &str) -> Result<(String, String)> {
    let (key, value) = header
        .split_once(':')
        .with_context(|| anyhow!("Invalid header, expected \"Name: Value\": {:?}", header))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

async fn run_check(check: Check) -> Result<u64> {
    let mut checker = Checker::from_env(TransportConfig::default());
    if let Some(end_point) = check.end_point {
        checker.set_endpoint(end_point);
    }
    if let Some(timeout) = check.timeout {
        checker.set_timeout(Duration::from_secs(timeout));
    }
    if let Some(token) = &check.token {
        checker.set_token(token);
    }
    debug!("Using {:?} transport", checker.backend());

    let headers = check
        .headers
        .iter()
        .map(|header| parse_header(header))
        .collect::<Result<Vec<_>>>()?;

    let format = Format::from_name(&check.format);
    let result = checker
        .check(&check.lock, format.wire_format(), &headers)
        .await?;
    info!("Found {} vulnerable packages", result.count());

    let mut stdout = io::stdout().lock();
    if let Some(formatter) = formatters::for_format(format) {
        let vulns = Vulnerabilities::from_json(result.body())?;
        formatter.display(&mut stdout, &check.lock, &vulns)?;
    } else {
        stdout.write_all(result.body().as_bytes())?;
    }
    stdout.flush()?;

    Ok(result.count())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::init_from_env(Env::default().default_filter_or(log_level));

    match args.subcommand {
        SubCommand::Check(check) => {
            let count = run_check(check).await?;
            if count > 0 {
                process::exit(1);
            }
        }
        SubCommand::SupportedFormats => {
            for format in Format::iter() {
                println!("{:<10} {}", format.to_string(), format.content_type());
            }
        }
    }

    Ok(())
}
