use crate::constants::{DEFAULT_FIELD, DEFAULT_MAX_SIZE, DEFAULT_NAME_PATTERN};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate files and store them under timestamp-based names.
    Upload(UploadArgs),
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// One or more files or glob patterns, submitted in the given order.
    #[arg(required = true, value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Directory receiving accepted files; created if missing.
    #[arg(long, env = "UPSTAMP_ROOT", value_name = "DIR")]
    pub root: PathBuf,

    /// Maximum size of a single file in bytes.
    #[arg(long = "max-size", env = "UPSTAMP_MAX_SIZE", value_name = "BYTES", default_value_t = DEFAULT_MAX_SIZE)]
    pub max_size: u64,

    /// strftime pattern used to name stored files, e.g. %Y%m%d%H%M%S.
    #[arg(long, env = "UPSTAMP_PATTERN", value_name = "FMT", default_value = DEFAULT_NAME_PATTERN)]
    pub pattern: String,

    /// Allowed extension (repeatable or comma separated). The leading dot is optional.
    #[arg(long = "ext", env = "UPSTAMP_EXTS", value_name = "EXT", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Form field the files are attached to.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_FIELD)]
    pub field: String,

    /// Check every file before storing any of them.
    #[arg(long = "validate-first")]
    pub validate_first: bool,
}
