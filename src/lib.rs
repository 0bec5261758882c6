pub mod cli;
pub mod constants;
pub mod error;
pub mod form;
pub mod logging;
pub mod naming;
pub mod upload;
pub mod uploader;

pub use error::UploadError;
pub use form::{FileHandle, FileStat, FormEntry, FormFile, MultipartForm, UploadForm};
pub use naming::{Clock, FixedClock, SystemClock};
pub use uploader::{BatchMode, Uploader, UploaderConfig, WatermarkKind};

use clap::Parser;
use cli::{Cli, Commands};
use upload::{UploadRequest, UploadService};

#[derive(Debug)]
pub enum AppError {
    Logging(String),
    Upload(upload::CommandError),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Logging(message) => write!(f, "Failed to initialise logging: {message}"),
            AppError::Upload(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Logging(_) => None,
            AppError::Upload(err) => Some(err),
        }
    }
}

pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    logging::init_logging().map_err(|err| AppError::Logging(err.to_string()))?;
    match cli.command {
        Commands::Upload(args) => {
            let request = UploadRequest::from(args);
            UploadService
                .execute(&request)
                .map(|outcome| {
                    for name in &outcome.stored {
                        println!("{name}");
                    }
                    println!(
                        "Stored {} file(s) in {}",
                        outcome.stored.len(),
                        outcome.root.display()
                    );
                })
                .map_err(AppError::Upload)
        }
    }
}
