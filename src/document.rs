use crate::items::Item;
use crate::utils::DOCUMENT_FILE;
use eyre::{Context, Result};
use serde::Serialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Flat key → value record written as one `info.yaml` per item.
///
/// Keys are kept sorted. Inserting an existing key replaces its value, which
/// is what gives the merge its last-write-wins behaviour.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Document(BTreeMap<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The base attributes every document carries. `ref` starts out as the
    /// item key and is overwritten once the citation key is known.
    pub fn from_item(item: &Item) -> Self {
        let mut doc = Self::new();
        doc.insert("ref", item.key.as_str());
        doc.insert("type", item.item_type.as_str());
        doc.insert("created", item.created.as_str());
        doc.insert("modified", item.modified.as_str());
        doc.insert("modified.client", item.modified_client.as_str());
        doc
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    #[cfg(test)]
    fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    #[cfg(test)]
    fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Write the document into `dir`, creating the directory if needed and
    /// replacing any document already there.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("Failed to create item directory: {}", dir.display()))?;

        let path = dir.join(DOCUMENT_FILE);
        let file = File::create(&path)
            .wrap_err_with(|| format!("Failed to create: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_yaml::to_writer(&mut writer, self)
            .wrap_err_with(|| format!("Failed to serialize: {}", path.display()))?;
        writer.flush().wrap_err("Failed to flush document")?;
        Ok(path)
    }

    #[cfg(test)]
    fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read: {}", path.display()))?;
        let map = serde_yaml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse: {}", path.display()))?;
        Ok(Self(map))
    }
}

impl<K: Into<String>, V: Into<Value>> Extend<(K, V)> for Document {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

/// Map a SQLite value onto the document value it is stored as. Blobs have
/// no sensible representation in the document and yield `None`.
pub fn sql_to_value(value: rusqlite::types::Value) -> Option<Value> {
    use rusqlite::types::Value as Sql;
    match value {
        Sql::Null => Some(Value::Null),
        Sql::Integer(i) => Some(Value::from(i)),
        Sql::Real(f) => Some(Value::from(f)),
        Sql::Text(s) => Some(Value::String(s)),
        Sql::Blob(_) => None,
    }
}
