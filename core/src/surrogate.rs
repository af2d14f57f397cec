//! Textual surrogates: the per-image descriptions used for scoring.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurrogateRecord {
    /// Filled from the key of the enclosing JSON object.
    #[serde(skip)]
    pub image_id: String,
    /// Non-string values (null, numbers, arrays...) and absence all load as "".
    #[serde(default, deserialize_with = "text_or_empty")]
    pub textual_surrogate: String,
    /// Coerced like `textual_surrogate`; scoring never reads it.
    #[serde(default, deserialize_with = "text_or_empty")]
    pub url: String,
}

fn text_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

/// Read-only map from image id to its surrogate, loaded once per search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurrogateTable {
    records: HashMap<String, SurrogateRecord>,
}

impl SurrogateTable {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let raw: HashMap<String, SurrogateRecord> = serde_json::from_reader(reader)
            .map_err(|e| SearchError::SurrogateSourceUnavailable(e.to_string()))?;
        Ok(Self::from_map(raw))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_reader(json.as_bytes())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .map_err(|e| SearchError::SurrogateSourceUnavailable(format!("{}: {e}", path.display())))?;
        Self::from_reader(BufReader::new(f)).map_err(|e| match e {
            SearchError::SurrogateSourceUnavailable(msg) => {
                SearchError::SurrogateSourceUnavailable(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    fn from_map(raw: HashMap<String, SurrogateRecord>) -> Self {
        let records = raw
            .into_iter()
            .map(|(image_id, mut record)| {
                record.image_id = image_id.clone();
                (image_id, record)
            })
            .collect();
        Self { records }
    }

    pub fn get(&self, image_id: &str) -> Option<&SurrogateRecord> {
        self.records.get(image_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SurrogateRecord> {
        self.records.values()
    }
}

impl FromIterator<SurrogateRecord> for SurrogateTable {
    fn from_iter<I: IntoIterator<Item = SurrogateRecord>>(iter: I) -> Self {
        Self { records: iter.into_iter().map(|r| (r.image_id.clone(), r)).collect() }
    }
}

/// Where a search gets its surrogate table from.
pub trait SurrogateSource {
    fn load(&self) -> Result<SurrogateTable>;
}

/// A surrogate JSON file, re-read on every search.
#[derive(Debug, Clone)]
pub struct SurrogateFile {
    path: PathBuf,
}

impl SurrogateFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl SurrogateSource for SurrogateFile {
    fn load(&self) -> Result<SurrogateTable> {
        SurrogateTable::load(&self.path)
    }
}

impl SurrogateSource for SurrogateTable {
    fn load(&self) -> Result<SurrogateTable> {
        Ok(self.clone())
    }
}
