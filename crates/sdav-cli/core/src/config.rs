use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SdavError;
use crate::topology::Topology;

pub const DEFAULT_CONFIG_PATH: &str = "src/config.json";
pub const USER_CONFIG_PATH: &str = "user-config.json";

/// The topology configuration of a project: the shipped defaults plus the
/// user's override file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    default_path: PathBuf,
    user_path: PathBuf,
}

impl ConfigStore {
    pub fn new(default_path: PathBuf, user_path: PathBuf) -> Self {
        ConfigStore { default_path, user_path }
    }

    pub fn for_project(project_dir: &Path) -> Self {
        ConfigStore::new(
            project_dir.join(DEFAULT_CONFIG_PATH),
            project_dir.join(USER_CONFIG_PATH),
        )
    }

    /// Effective configuration: the user file when it holds anything,
    /// otherwise the defaults.
    pub fn load(&self) -> Result<Map<String, Value>, SdavError> {
        let user = read_object(&self.user_path)?;
        if !user.is_empty() {
            return Ok(user);
        }
        read_object(&self.default_path)
    }

    pub fn topology(&self) -> Result<Topology, SdavError> {
        Topology::from_config(&Value::Object(self.load()?))
    }

    /// Merge top-level keys of `patch` into the user file.
    ///
    /// The first write seeds the user file from the defaults.
    pub fn write(&self, patch: Map<String, Value>) -> Result<(), SdavError> {
        let mut config = if self.user_path.exists() {
            read_object(&self.user_path)?
        } else {
            read_object(&self.default_path)?
        };

        for (key, value) in patch {
            config.insert(key, value);
        }

        if let Some(parent) = self.user_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        Value::Object(config).serialize(&mut serializer)?;

        fs::write(&self.user_path, out).map_err(|e| {
            SdavError::Config(format!("Failed to write {}: {}", self.user_path.display(), e))
        })?;
        tracing::debug!(path = %self.user_path.display(), "configuration written");
        Ok(())
    }
}

/// Read a JSON object, treating a missing file as empty.
fn read_object(path: &Path) -> Result<Map<String, Value>, SdavError> {
    if !path.exists() {
        return Ok(Map::new());
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SdavError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;

    match serde_json::from_str(&contents)? {
        Value::Object(map) => Ok(map),
        _ => Err(SdavError::Config(format!("{} must hold a JSON object", path.display()))),
    }
}
