use std::env;
use std::path::{Path, PathBuf};

pub fn normalize_env_path(value: Option<String>) -> Option<PathBuf> {
    let raw = value?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    if lowered == "undefined" || lowered == "null" {
        return None;
    }
    Some(PathBuf::from(trimmed))
}

fn resolve_entry_dir() -> Option<PathBuf> {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
}

/// Directory holding the files shipped with the workflow definition, next to the step executable.
pub fn resolve_supporting_files_dir() -> PathBuf {
    if let Some(path) = normalize_env_path(
        env::var(crate::constants::env::SUPPORTING_FILES_DIR).ok(),
    ) {
        return path;
    }
    resolve_entry_dir().unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathForm {
    Absolute,
    Filename,
    Relative,
}

impl PathForm {
    pub fn of(path: &Path) -> Self {
        if path.is_absolute() {
            PathForm::Absolute
        } else if path.components().count() <= 1 {
            PathForm::Filename
        } else {
            PathForm::Relative
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            PathForm::Absolute => "absolute file path",
            PathForm::Filename => "filename",
            PathForm::Relative => "relative file path",
        }
    }
}

/// Absolute paths are returned as-is; anything else is joined to `base`.
pub fn resolve_against(base: &Path, reference: &Path) -> PathBuf {
    if reference.is_absolute() {
        reference.to_path_buf()
    } else {
        base.join(reference)
    }
}
