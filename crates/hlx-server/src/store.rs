//! Configuration backing store.
//!
//! One JSON document holding the serialized amplifier model. Loads fall
//! back to factory defaults when the file does not exist yet; saves go
//! through a temporary file and an atomic rename so a crash mid-write
//! never corrupts the previous state.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use hlx_model::AmplifierModel;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O: {0}")]
    Io(#[from] io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Store {
        Store { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted model, or factory defaults when no file exists.
    /// Foreign documents are normalized back to the hardware shape.
    pub fn load(&self) -> Result<AmplifierModel, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no configuration file, using defaults");
                return Ok(AmplifierModel::default());
            }
            Err(error) => return Err(error.into()),
        };
        let mut model: AmplifierModel = serde_json::from_str(&text)?;
        model.normalize();
        info!(path = %self.path.display(), "configuration loaded");
        Ok(model)
    }

    pub fn save(&self, model: &AmplifierModel) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(model)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hlx_proto::Kind;

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("hlxsimd.json"));
        let model = store.load().unwrap();
        assert_eq!(model, AmplifierModel::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("hlxsimd.json"));
        let mut model = AmplifierModel::default();
        let z3 = Kind::Zone.checked(3).unwrap();
        model.zone_mut(z3).unwrap().set_volume(-20).unwrap();
        model.zone_mut(z3).unwrap().set_name("Den").unwrap();
        store.save(&model).unwrap();

        let back = store.load().unwrap();
        assert_eq!(back, model);
        assert_eq!(back.zone(z3).unwrap().name(), "Den");
    }

    #[test]
    fn corrupt_documents_error_rather_than_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hlxsimd.json");
        std::fs::write(&path, "not json").unwrap();
        let store = Store::new(path);
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
    }
}
