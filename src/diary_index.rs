use crate::error::{DiaryError, Result};
use indexmap::IndexMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Title -> document location, in the order titles were added.
pub type TitleIndex = IndexMap<String, String>;

/// The local index file. Load and save only, callers own the mutations.
#[derive(Debug, Clone)]
pub struct DiaryIndex {
    path: PathBuf,
}

impl DiaryIndex {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DiaryIndex { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty index.
    pub fn load(&self) -> Result<TitleIndex> {
        let serialized = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(TitleIndex::new()),
            Err(source) => {
                return Err(DiaryError::IndexRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&serialized).map_err(|source| DiaryError::CorruptIndex {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the whole file. Written to a sibling temp file first, then renamed.
    pub fn save(&self, index: &TitleIndex) -> Result<()> {
        let write_err = |source: std::io::Error| DiaryError::IndexWrite {
            path: self.path.clone(),
            source,
        };
        let serialized = serde_json::to_string_pretty(index)
            .map_err(|e| write_err(std::io::Error::new(ErrorKind::InvalidData, e)))?;

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        fs::write(&tmp_path, serialized).map_err(write_err)?;
        fs::rename(&tmp_path, &self.path).map_err(write_err)?;
        Ok(())
    }
}
