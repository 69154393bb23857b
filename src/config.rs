use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::{validation::messages::MessageCatalog, Error, InternalResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpreterConfig {
    /// Condition groups nested deeper than this evaluate to `false`.
    #[serde(default = "default_max_condition_depth")]
    pub max_condition_depth: usize,

    /// Upper bound on conditions and groups visited for a single rule.
    #[serde(default = "default_max_condition_nodes")]
    pub max_condition_nodes: usize,

    #[serde(default)]
    pub messages: MessageCatalog,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_condition_depth: default_max_condition_depth(),
            max_condition_nodes: default_max_condition_nodes(),
            messages: MessageCatalog::default(),
        }
    }
}

impl InterpreterConfig {
    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| Error::Config(format!("Failed to open {}: {}", path.display(), e)))?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config =
        serde_json::from_str(s).map_err(|e| Error::Config(format!("Failed to parse: {}", e)))?;
    Ok(config)
}

fn default_max_condition_depth() -> usize {
    16
}

fn default_max_condition_nodes() -> usize {
    256
}
