use std::env;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::Store;

const DATA_FILE_NAME: &str = ".revisit_calendar.json";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::JsonDecode(err) => write!(f, "failed to parse data file: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode data file: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

pub fn load_store(path: &Path) -> Result<Store, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Store::default()),
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(Store::default());
    }

    serde_json::from_str(&raw).map_err(StorageError::JsonDecode)
}

pub fn save_store(path: &Path, store: &Store) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
    }

    let blob = serde_json::to_string_pretty(store).map_err(StorageError::JsonEncode)?;
    fs::write(path, blob).map_err(StorageError::Io)
}

pub fn data_file_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }

    if let Some(path) = env::var_os("REVISIT_CALENDAR_FILE") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    home_dir().join(DATA_FILE_NAME)
}

fn home_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(path) = env::var_os("USERPROFILE") {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = env::var_os("HOME") {
        return PathBuf::from(path);
    }

    PathBuf::from(".")
}
