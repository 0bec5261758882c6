use crate::cli::UploadArgs;
use crate::error::UploadError;
use crate::form::{FormFile, UploadForm};
use crate::naming;
use crate::uploader::{BatchMode, Uploader};
use glob::{glob, GlobError, PatternError};
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub patterns: Vec<String>,
    pub root: PathBuf,
    pub max_size: u64,
    pub name_pattern: String,
    pub extensions: Vec<String>,
    pub field: String,
    pub batch_mode: BatchMode,
}

impl From<UploadArgs> for UploadRequest {
    fn from(args: UploadArgs) -> Self {
        UploadRequest {
            patterns: args.patterns,
            root: args.root,
            max_size: args.max_size,
            name_pattern: args.pattern,
            extensions: args.extensions,
            field: args.field,
            batch_mode: if args.validate_first {
                BatchMode::ValidateFirst
            } else {
                BatchMode::Sequential
            },
        }
    }
}

#[derive(Debug)]
pub struct UploadOutcome {
    pub root: PathBuf,
    pub stored: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidGlobPattern {
        pattern: String,
        #[source]
        source: PatternError,
    },
    #[error("No files matched pattern '{0}'")]
    NoMatches(String),
    #[error("Failed to read glob matches: {0}")]
    GlobIteration(#[from] GlobError),
    #[error("Upload failed: {0}")]
    Upload(#[from] UploadError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Submits local files to an [`Uploader`] as entries of a single form field.
#[derive(Default)]
pub struct UploadService;

impl UploadService {
    pub fn execute(&self, request: &UploadRequest) -> Result<UploadOutcome, CommandError> {
        let uploader = Uploader::new(
            &request.root,
            request.max_size,
            &request.name_pattern,
            &request.extensions,
        )?
        .with_batch_mode(request.batch_mode);

        let paths = collect_paths(&request.patterns)?;
        let form = build_form(&uploader, &request.field, &paths, UploadForm::new())?;
        let stored = uploader.process(&request.field, &form)?;
        Ok(UploadOutcome {
            root: uploader.config().root_dir().to_path_buf(),
            stored,
        })
    }
}

/// Attach every path to `field` in order. Files the uploader is bound to
/// reject are attached empty so their content is never copied; the pipeline
/// still rejects them at their position in the batch.
fn build_form(
    uploader: &Uploader,
    field: &str,
    paths: &[PathBuf],
    mut form: UploadForm,
) -> Result<UploadForm, CommandError> {
    for path in paths {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if will_be_rejected(uploader, &filename, path)? {
            form.push(field, FormFile::in_memory(filename, Vec::new()));
        } else {
            form.attach(field, filename, File::open(path)?)?;
        }
    }
    Ok(form)
}

fn will_be_rejected(
    uploader: &Uploader,
    filename: &str,
    path: &Path,
) -> Result<bool, CommandError> {
    if !uploader.check_extension(naming::extension_of(filename)) {
        return Ok(true);
    }
    Ok(std::fs::metadata(path)?.len() > uploader.config().max_size())
}

fn collect_paths(patterns: &[String]) -> Result<Vec<PathBuf>, CommandError> {
    let mut collected = Vec::new();
    for pattern in patterns {
        let mut matches_found = false;
        let entries = glob(pattern).map_err(|err| CommandError::InvalidGlobPattern {
            pattern: pattern.clone(),
            source: err,
        })?;
        for entry in entries {
            let path = entry?;
            if path.is_file() {
                matches_found = true;
                collected.push(path);
            }
        }

        if !matches_found {
            return Err(CommandError::NoMatches(pattern.clone()));
        }
    }
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FileHandle, FormEntry};
    use assert_fs::prelude::*;

    fn sample_request(temp: &assert_fs::TempDir, patterns: Vec<String>) -> UploadRequest {
        UploadRequest {
            patterns,
            root: temp.path().join("store"),
            max_size: 1024,
            name_pattern: "%Y%m%d%H%M%S".to_string(),
            extensions: vec!["png".to_string(), "jpg".to_string()],
            field: "file".to_string(),
            batch_mode: BatchMode::Sequential,
        }
    }

    #[test]
    fn expands_patterns_in_order() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("in/b.png").write_str("b").unwrap();
        temp.child("in/a.png").write_str("a").unwrap();
        temp.child("in/z.jpg").write_str("z").unwrap();
        temp.child("in/sub").create_dir_all().unwrap();

        let paths = collect_paths(&[
            temp.path().join("in/z.jpg").to_string_lossy().into_owned(),
            temp.path().join("in/*.png").to_string_lossy().into_owned(),
        ])
        .unwrap();
        let names: Vec<String> = paths
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["z.jpg", "a.png", "b.png"]);
    }

    #[test]
    fn rejected_files_are_not_buffered() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("ok.png").write_binary(&[1u8; 100]).unwrap();
        temp.child("huge.png").write_binary(&[2u8; 4096]).unwrap();
        temp.child("doc.pdf").write_binary(&[3u8; 100]).unwrap();
        let uploader = Uploader::new(temp.path().join("store"), 1024, "%Y", ["png"]).unwrap();
        let paths = vec![
            temp.path().join("ok.png"),
            temp.path().join("huge.png"),
            temp.path().join("doc.pdf"),
        ];

        let form = build_form(&uploader, "file", &paths, UploadForm::new().with_max_memory(16))
            .unwrap();
        let files = form.files("file");
        let names: Vec<&str> = files.iter().map(|file| file.filename()).collect();
        assert_eq!(names, vec!["ok.png", "huge.png", "doc.pdf"]);

        assert!(files[0].is_spilled());
        for rejected in &files[1..] {
            assert!(!rejected.is_spilled());
            assert_eq!(rejected.open().unwrap().size(), Some(0));
        }
    }

    #[test]
    fn rejected_files_fail_at_their_position() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("ok.png").write_str("fine").unwrap();
        temp.child("huge.png").write_binary(&[2u8; 4096]).unwrap();

        let request = sample_request(
            &temp,
            vec![
                temp.path().join("ok.png").to_string_lossy().into_owned(),
                temp.path().join("huge.png").to_string_lossy().into_owned(),
            ],
        );
        let result = UploadService.execute(&request);
        assert!(matches!(
            result,
            Err(CommandError::Upload(UploadError::NotAllowSize))
        ));
        // Sequential batches keep what was stored before the failure
        assert_eq!(std::fs::read_dir(temp.path().join("store")).unwrap().count(), 1);
    }

    #[test]
    fn pattern_without_files_is_an_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let pattern = temp.path().join("*.png").to_string_lossy().into_owned();
        let result = collect_paths(&[pattern]);
        assert!(matches!(result, Err(CommandError::NoMatches(_))));
    }

    #[test]
    fn stores_matched_files_under_root() {
        let temp = assert_fs::TempDir::new().unwrap();
        let input = temp.child("photo.png");
        input.write_binary(&[5u8; 500]).unwrap();

        let request = sample_request(&temp, vec![input.path().to_string_lossy().into_owned()]);
        let outcome = UploadService.execute(&request).unwrap();

        assert_eq!(outcome.stored.len(), 1);
        assert!(outcome.stored[0].ends_with(".png"));
        let stored = std::fs::read(outcome.root.join(&outcome.stored[0])).unwrap();
        assert_eq!(stored, vec![5u8; 500]);
    }

    #[test]
    fn validate_first_stores_nothing_when_a_file_is_rejected() {
        let temp = assert_fs::TempDir::new().unwrap();
        let mut request = sample_request(&temp, Vec::new());
        request.batch_mode = BatchMode::ValidateFirst;

        temp.child("ok.png").write_str("fine").unwrap();
        temp.child("bad.gif").write_str("nope").unwrap();
        request.patterns = vec![
            temp.path().join("ok.png").to_string_lossy().into_owned(),
            temp.path().join("bad.gif").to_string_lossy().into_owned(),
        ];
        let result = UploadService.execute(&request);
        assert!(matches!(
            result,
            Err(CommandError::Upload(UploadError::NotAllowExt))
        ));
        assert_eq!(std::fs::read_dir(temp.path().join("store")).unwrap().count(), 0);
    }
}
