//! Destination names: a strftime pattern rendered at upload time plus the
//! validated extension.

use crate::error::UploadError;
use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::fmt::{Debug, Write};

/// Source of the wall-clock time used for generated names.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Always reports the same instant. Pins generated names in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Render `pattern` at `time` and append `ext`.
///
/// Two calls within the same pattern resolution produce the same name; no
/// collision detection happens here or when the file is written.
pub fn generate_name(
    pattern: &str,
    ext: &str,
    time: NaiveDateTime,
) -> Result<String, UploadError> {
    let mut name = String::new();
    write!(name, "{}", time.format_with_items(StrftimeItems::new(pattern)))
        .map_err(|_| UploadError::InvalidNamePattern(pattern.to_string()))?;
    name.push_str(ext);
    Ok(name)
}

/// Reject patterns chrono cannot render, or that would render to nothing or
/// to a nested path.
pub fn validate_pattern(pattern: &str) -> Result<(), UploadError> {
    let invalid = || UploadError::InvalidNamePattern(pattern.to_string());
    if pattern.is_empty() || StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(invalid());
    }

    let sample = NaiveDate::from_ymd_opt(2006, 1, 2)
        .and_then(|date| date.and_hms_opt(15, 4, 5))
        .ok_or_else(invalid)?;
    let rendered = generate_name(pattern, "", sample)?;
    if rendered.is_empty() || rendered.contains(['/', '\\']) {
        return Err(invalid());
    }
    Ok(())
}

/// Extension of a submitted filename: everything from the last `.` of the
/// final path component, dot included. Empty when there is no dot.
pub fn extension_of(filename: &str) -> &str {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    match name.rfind('.') {
        Some(idx) => &name[idx..],
        None => "",
    }
}
