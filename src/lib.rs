pub mod args;
pub mod checker;
pub mod errors;
pub mod format;
pub mod formatters;
pub mod manifest;
pub mod report;
pub mod response;
pub mod transport;
