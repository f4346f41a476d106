use std::collections::BTreeMap;
use std::str::FromStr;

use crate::core::error::{AppError, Result};
use crate::modules::staging::StagedFile;

/// Text fields of a request, already parsed by the HTTP layer
#[derive(Debug, Default, Clone)]
pub struct FormFields(BTreeMap<String, String>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Trimmed value, `None` when absent or blank
    pub fn text(&self, name: &str) -> Option<String> {
        self.0
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn required(&self, name: &str) -> Result<String> {
        self.text(name)
            .ok_or_else(|| AppError::Validation(format!("Field '{}' is required", name)))
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.text(name) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                AppError::Validation(format!("Field '{}' has an invalid value '{}'", name, raw))
            }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.text(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Everything a request submitted: text fields plus staged files keyed by
/// form field name. Dropping the intake releases every staged file.
#[derive(Debug, Default)]
pub struct UploadIntake {
    pub fields: FormFields,
    files: Vec<(String, StagedFile)>,
}

impl UploadIntake {
    pub fn new(fields: FormFields) -> Self {
        Self {
            fields,
            files: Vec::new(),
        }
    }

    /// Attach a staged file. A second file for the same field replaces the
    /// first, which is released on drop.
    pub fn add_file(&mut self, field: impl Into<String>, file: StagedFile) {
        let field = field.into();
        self.files.retain(|(name, _)| *name != field);
        self.files.push((field, file));
    }

    pub fn with_file(mut self, field: impl Into<String>, file: StagedFile) -> Self {
        self.add_file(field, file);
        self
    }

    pub fn file(&self, field: &str) -> Option<&StagedFile> {
        self.files
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, file)| file)
    }

    pub fn has_file(&self, field: &str) -> bool {
        self.file(field).is_some()
    }

    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|(name, _)| name.as_str())
    }

    pub fn into_parts(self) -> (FormFields, Vec<(String, StagedFile)>) {
        (self.fields, self.files)
    }
}
