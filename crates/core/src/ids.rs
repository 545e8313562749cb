#![forbid(unsafe_code)]

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostId(String);

impl PostId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, RecordIdError> {
        let value = value.into();
        let trimmed = validate_record_id(&value)?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn from_seq(seq: i64) -> Self {
        Self(format!("POST-{seq:06}"))
    }

    /// Wraps an id read from a table this crate does not own. Such ids predate the
    /// validation rules and are carried as-is.
    pub fn from_foreign(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, RecordIdError> {
        let value = value.into();
        let trimmed = validate_record_id(&value)?;
        Ok(Self(trimmed.to_string()))
    }

    pub fn from_seq(seq: i64) -> Self {
        Self(format!("DTASK-{seq:06}"))
    }

    /// Wraps an id read from a table this crate does not own. Such ids predate the
    /// validation rules and are carried as-is.
    pub fn from_foreign(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable incident number shown to operators (`INC-0042`).
pub fn post_number_from_seq(seq: i64) -> String {
    format!("INC-{seq:04}")
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordIdError {
    Empty,
    TooLong,
    ContainsControl,
}

impl RecordIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "id must not be empty",
            Self::TooLong => "id is too long",
            Self::ContainsControl => "id contains control characters",
        }
    }
}

fn validate_record_id(value: &str) -> Result<&str, RecordIdError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecordIdError::Empty);
    }
    if trimmed.len() > 128 {
        return Err(RecordIdError::TooLong);
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(RecordIdError::ContainsControl);
    }
    Ok(trimmed)
}

/// Short department code (`QUAL`, `SAFE`, `MAINT`). Stored upper-case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepartmentCode(String);

impl DepartmentCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn try_new(value: impl AsRef<str>) -> Result<Self, DepartmentCodeError> {
        let normalized = value.as_ref().trim().to_ascii_uppercase();
        validate_department_code(&normalized)?;
        Ok(Self(normalized))
    }

    /// Built-in registry codes are known-good literals.
    pub(crate) fn from_static(value: &'static str) -> Self {
        Self(value.to_string())
    }

    /// Display name for the well-known plant departments; unknown codes echo the code.
    pub fn display_name(&self) -> String {
        let known = match self.0.as_str() {
            "QUAL" => "Quality",
            "SAFE" => "Safety",
            "SANI" => "Sanitation",
            "MAINT" => "Maintenance",
            "PROD" => "Production",
            "WH" => "Warehouse",
            "HR" => "Human Resources",
            "ENV" => "Environmental",
            "PURCH" => "Purchasing",
            _ => return self.0.clone(),
        };
        known.to_string()
    }
}

impl fmt::Display for DepartmentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DepartmentCodeError {
    TooShort,
    TooLong,
    InvalidChar { ch: char, index: usize },
}

impl DepartmentCodeError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::TooShort => "department code must be at least 2 characters",
            Self::TooLong => "department code must be at most 16 characters",
            Self::InvalidChar { .. } => "department code allows only A-Z, 0-9 and '_'",
        }
    }
}

fn validate_department_code(value: &str) -> Result<(), DepartmentCodeError> {
    if value.len() < 2 {
        return Err(DepartmentCodeError::TooShort);
    }
    if value.len() > 16 {
        return Err(DepartmentCodeError::TooLong);
    }
    for (index, ch) in value.chars().enumerate() {
        if ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_' {
            continue;
        }
        return Err(DepartmentCodeError::InvalidChar { ch, index });
    }
    Ok(())
}
