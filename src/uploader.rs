#[cfg(unix)]
use crate::constants::DEFAULT_DIR_MODE;
use crate::error::UploadError;
use crate::form::{FileHandle, FormEntry, MultipartForm};
use crate::naming::{self, Clock, SystemClock};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Immutable settings shared by every batch an [`Uploader`] processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderConfig {
    root_dir: PathBuf,
    max_size: u64,
    name_pattern: String,
    allowed_extensions: Vec<String>,
}

impl UploaderConfig {
    /// Root directory, always ending with a path separator.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn name_pattern(&self) -> &str {
        &self.name_pattern
    }

    /// Allowed extensions, each with a leading dot.
    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }
}

/// How a batch treats entries after the first rejection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BatchMode {
    /// Validate and persist one entry at a time. Files written before a
    /// rejection stay on disk.
    #[default]
    Sequential,
    /// Validate every entry before persisting any of them.
    ValidateFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkKind {
    Text,
    Image,
}

impl FromStr for WatermarkKind {
    type Err = UploadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "text" => Ok(WatermarkKind::Text),
            "image" => Ok(WatermarkKind::Image),
            other => Err(UploadError::UnsupportedWatermarkType(other.to_string())),
        }
    }
}

/// Validates uploaded files and stores the accepted ones under a root
/// directory with timestamp-based names.
#[derive(Debug, Clone)]
pub struct Uploader {
    config: UploaderConfig,
    clock: Arc<dyn Clock>,
    batch_mode: BatchMode,
}

impl Uploader {
    /// Build an uploader, creating `root_dir` if it does not exist yet.
    ///
    /// Extensions without a leading dot get one. An empty extension list
    /// accepts nothing.
    pub fn new<I, S>(
        root_dir: impl AsRef<Path>,
        max_size: u64,
        name_pattern: &str,
        extensions: I,
    ) -> Result<Self, UploadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_extensions = extensions
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        naming::validate_pattern(name_pattern)?;
        let root_dir = normalize_root(root_dir.as_ref())?;
        ensure_directory(&root_dir.components().collect::<PathBuf>())?;

        debug!(
            root = %root_dir.display(),
            max_size,
            pattern = name_pattern,
            extensions = ?allowed_extensions,
            "uploader configured"
        );

        Ok(Uploader {
            config: UploaderConfig {
                root_dir,
                max_size,
                name_pattern: name_pattern.to_string(),
                allowed_extensions,
            },
            clock: Arc::new(SystemClock),
            batch_mode: BatchMode::default(),
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_batch_mode(mut self, batch_mode: BatchMode) -> Self {
        self.batch_mode = batch_mode;
        self
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    pub fn batch_mode(&self) -> BatchMode {
        self.batch_mode
    }

    /// Files without an extension are never accepted; everything else must
    /// match an allowed extension exactly.
    pub fn check_extension(&self, ext: &str) -> bool {
        !ext.is_empty()
            && self
                .config
                .allowed_extensions
                .iter()
                .any(|allowed| allowed == ext)
    }

    /// True when the handle reports `0 < size <= max_size`.
    pub fn check_size(&self, handle: &dyn FileHandle) -> Result<bool, UploadError> {
        let size = match (handle.stat(), handle.size()) {
            (Some(stat), _) => stat?.len,
            (None, Some(size)) => size,
            (None, None) => return Err(UploadError::UnknownFileSize),
        };
        Ok(size > 0 && size <= self.config.max_size)
    }

    /// Watermarking is not implemented. Recognized modes are accepted and
    /// ignored; uploaded content is never altered.
    pub fn set_watermark(&self, source: &str, mode: &str) -> Result<WatermarkKind, UploadError> {
        let kind = mode.parse::<WatermarkKind>()?;
        debug!(source, ?kind, "watermark requested; content is stored unchanged");
        Ok(kind)
    }

    /// Validate and store every file attached to `field`.
    ///
    /// Returns the generated names relative to the root directory in
    /// submission order. The first failure aborts the batch.
    pub fn process(
        &self,
        field: &str,
        form: &dyn MultipartForm,
    ) -> Result<Vec<String>, UploadError> {
        let entries = form.entries(field);
        if self.batch_mode == BatchMode::ValidateFirst {
            for entry in &entries {
                self.open_validated(*entry)?;
            }
        }

        let mut stored = Vec::new();
        for entry in entries {
            let (mut handle, ext) = self.open_validated(entry)?;
            let name = naming::generate_name(&self.config.name_pattern, ext, self.clock.now())?;
            let destination = self.config.root_dir.join(&name);
            let mut file = File::create(&destination)?;
            let written = io::copy(&mut handle, &mut file)?;
            debug!(
                filename = entry.filename(),
                stored = %destination.display(),
                bytes = written,
                "stored upload"
            );
            stored.push(name);
        }

        info!(field, count = stored.len(), "upload batch stored");
        Ok(stored)
    }

    fn open_validated<'a>(
        &self,
        entry: &'a dyn FormEntry,
    ) -> Result<(Box<dyn FileHandle + 'a>, &'a str), UploadError> {
        let filename = entry.filename();
        let handle = entry.open().map_err(|source| UploadError::OpenFailed {
            filename: filename.to_string(),
            source,
        })?;

        let ext = naming::extension_of(filename);
        if !self.check_extension(ext) {
            warn!(filename, ext, "rejected upload: extension not allowed");
            return Err(UploadError::NotAllowExt);
        }
        if !self.check_size(&*handle)? {
            warn!(
                filename,
                max_size = self.config.max_size,
                "rejected upload: size not allowed"
            );
            return Err(UploadError::NotAllowSize);
        }
        Ok((handle, ext))
    }
}

fn normalize_extension(ext: &str) -> Result<String, UploadError> {
    if ext.is_empty() {
        return Err(UploadError::EmptyExtension);
    }
    if ext.starts_with('.') {
        Ok(ext.to_string())
    } else {
        Ok(format!(".{ext}"))
    }
}

fn normalize_root(root_dir: &Path) -> Result<PathBuf, UploadError> {
    let raw = root_dir.as_os_str();
    if raw.is_empty() {
        return Err(UploadError::EmptyRootDir);
    }
    let text = raw.to_string_lossy();
    if text.ends_with('/') || text.ends_with(MAIN_SEPARATOR) {
        return Ok(root_dir.to_path_buf());
    }
    let mut normalized = OsString::from(raw);
    normalized.push(MAIN_SEPARATOR.to_string());
    Ok(PathBuf::from(normalized))
}

fn ensure_directory(root_dir: &Path) -> Result<(), UploadError> {
    let metadata = match fs::metadata(root_dir) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            create_root(root_dir)?;
            fs::metadata(root_dir)?
        }
        Err(err) => return Err(err.into()),
    };
    if !metadata.is_dir() {
        return Err(UploadError::NotADirectory(root_dir.to_path_buf()));
    }
    Ok(())
}

#[cfg(unix)]
fn create_root(root_dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(DEFAULT_DIR_MODE)
        .create(root_dir)
}

#[cfg(not(unix))]
fn create_root(root_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(root_dir)
}
