use crate::format::Format;
use crate::manifest::LOCK_FILE;
use clap::{builder::PossibleValuesParser, ArgAction, Parser, Subcommand};
use strum::VariantNames;

#[derive(Debug, Parser)]
#[command(version, about = "Checks security issues in your project dependencies")]
pub struct Args {
    /// Turn debugging information on
    #[arg(short, long, global = true, action(ArgAction::Count))]
    pub verbose: u8,
    #[command(subcommand)]
    pub subcommand: SubCommand,
}

#[derive(Debug, Subcommand)]
pub enum SubCommand {
    Check(Check),
    SupportedFormats,
}

#[derive(Debug, Parser)]
pub struct Check {
    /// Path to a composer.lock, its directory, or an inline data://text/plain;base64, payload
    #[arg(default_value = LOCK_FILE)]
    pub lock: String,
    /// The output format
    #[arg(
        long,
        default_value = "text",
        value_parser(PossibleValuesParser::new(Format::VARIANTS))
    )]
    pub format: String,
    /// The security checker server URL
    #[arg(long, value_name = "URL")]
    pub end_point: Option<String>,
    /// The HTTP timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
    /// The server token
    #[arg(long)]
    pub token: Option<String>,
    /// Additional header sent with the request (eg. "X-Project: demo")
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,
}
