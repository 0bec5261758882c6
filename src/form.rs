//! Multipart form entries as seen by the upload pipeline.
//!
//! Parsing the HTTP body is left to the surrounding server; it hands the
//! pipeline something implementing [`MultipartForm`]. [`UploadForm`] is the
//! in-process implementation: small parts stay in memory, large parts are
//! spilled to temporary files, so an opened entry reports its size either
//! directly or through a stat of the backing file.

use crate::constants::DEFAULT_MAX_MEMORY;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

/// Structured size descriptor returned by a stat probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
}

/// Content stream of an uploaded file.
///
/// A handle may offer a stat probe, a raw size probe, both, or neither. Both
/// default to `None`.
pub trait FileHandle: Read {
    fn stat(&self) -> Option<io::Result<FileStat>> {
        None
    }

    fn size(&self) -> Option<u64> {
        None
    }
}

impl FileHandle for File {
    fn stat(&self) -> Option<io::Result<FileStat>> {
        Some(self.metadata().map(|metadata| FileStat {
            len: metadata.len(),
        }))
    }
}

impl<T: AsRef<[u8]>> FileHandle for Cursor<T> {
    fn size(&self) -> Option<u64> {
        Some(self.get_ref().as_ref().len() as u64)
    }
}

/// One file attached to a form field.
pub trait FormEntry {
    /// Filename as submitted by the client.
    fn filename(&self) -> &str;

    fn open(&self) -> io::Result<Box<dyn FileHandle + '_>>;
}

/// A parsed multipart form.
pub trait MultipartForm {
    /// Files attached to `field`, in submission order.
    fn entries(&self, field: &str) -> Vec<&dyn FormEntry>;
}

#[derive(Debug)]
enum Content {
    Memory(Vec<u8>),
    Spilled(NamedTempFile),
}

#[derive(Debug)]
pub struct FormFile {
    filename: String,
    content: Content,
}

impl FormFile {
    pub fn in_memory(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        FormFile {
            filename: filename.into(),
            content: Content::Memory(bytes),
        }
    }

    pub fn is_spilled(&self) -> bool {
        matches!(self.content, Content::Spilled(_))
    }
}

impl FormEntry for FormFile {
    fn filename(&self) -> &str {
        &self.filename
    }

    fn open(&self) -> io::Result<Box<dyn FileHandle + '_>> {
        match &self.content {
            Content::Memory(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            Content::Spilled(temp) => Ok(Box::new(temp.reopen()?)),
        }
    }
}

/// In-process multipart form. Spilled parts are deleted when the form drops.
#[derive(Debug)]
pub struct UploadForm {
    max_memory: u64,
    fields: BTreeMap<String, Vec<FormFile>>,
}

impl Default for UploadForm {
    fn default() -> Self {
        UploadForm::new()
    }
}

impl UploadForm {
    pub fn new() -> Self {
        UploadForm {
            max_memory: DEFAULT_MAX_MEMORY,
            fields: BTreeMap::new(),
        }
    }

    /// Bytes a single part may occupy in memory before it goes to disk.
    pub fn with_max_memory(mut self, max_memory: u64) -> Self {
        self.max_memory = max_memory;
        self
    }

    /// Read `reader` to the end and attach it to `field` as `filename`.
    pub fn attach<R: Read>(
        &mut self,
        field: &str,
        filename: impl Into<String>,
        mut reader: R,
    ) -> io::Result<()> {
        let mut buffered = Vec::new();
        reader
            .by_ref()
            .take(self.max_memory.saturating_add(1))
            .read_to_end(&mut buffered)?;

        let content = if buffered.len() as u64 > self.max_memory {
            let mut temp = NamedTempFile::new()?;
            temp.write_all(&buffered)?;
            io::copy(&mut reader, &mut temp)?;
            temp.flush()?;
            temp.as_file_mut().seek(SeekFrom::Start(0))?;
            Content::Spilled(temp)
        } else {
            Content::Memory(buffered)
        };

        self.push(
            field,
            FormFile {
                filename: filename.into(),
                content,
            },
        );
        Ok(())
    }

    pub fn push(&mut self, field: &str, file: FormFile) {
        self.fields.entry(field.to_string()).or_default().push(file);
    }

    pub fn files(&self, field: &str) -> &[FormFile] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl MultipartForm for UploadForm {
    fn entries(&self, field: &str) -> Vec<&dyn FormEntry> {
        self.files(field)
            .iter()
            .map(|file| file as &dyn FormEntry)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_parts_stay_in_memory_and_report_size() {
        let mut form = UploadForm::new().with_max_memory(16);
        form.attach("file", "a.txt", &b"hello"[..]).unwrap();

        let file = &form.files("file")[0];
        assert!(!file.is_spilled());
        let handle = file.open().unwrap();
        assert_eq!(handle.size(), Some(5));
        assert!(handle.stat().is_none());
    }

    #[test]
    fn large_parts_spill_to_disk_and_report_stat() {
        let payload = vec![7u8; 64];
        let mut form = UploadForm::new().with_max_memory(16);
        form.attach("file", "b.bin", payload.as_slice()).unwrap();

        let file = &form.files("file")[0];
        assert!(file.is_spilled());
        let mut handle = file.open().unwrap();
        assert!(handle.size().is_none());
        assert_eq!(handle.stat().unwrap().unwrap(), FileStat { len: 64 });

        let mut read_back = Vec::new();
        handle.read_to_end(&mut read_back).unwrap();
        assert_eq!(read_back, payload);
    }

    #[test]
    fn part_at_threshold_is_not_spilled() {
        let mut form = UploadForm::new().with_max_memory(4);
        form.attach("file", "c.txt", &b"four"[..]).unwrap();
        assert!(!form.files("file")[0].is_spilled());
    }

    #[test]
    fn entries_preserve_submission_order_per_field() {
        let mut form = UploadForm::new();
        form.push("file", FormFile::in_memory("first.png", vec![1]));
        form.push("other", FormFile::in_memory("elsewhere.png", vec![2]));
        form.push("file", FormFile::in_memory("second.png", vec![3]));

        let names: Vec<&str> = form
            .entries("file")
            .into_iter()
            .map(|entry| entry.filename())
            .collect();
        assert_eq!(names, vec!["first.png", "second.png"]);
        assert!(form.entries("missing").is_empty());
    }
}
