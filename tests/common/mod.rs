#![allow(dead_code)]

use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The subset of the Zotero schema the importer reads.
const SCHEMA: &str = "
CREATE TABLE itemTypes (itemTypeID INTEGER PRIMARY KEY, typeName TEXT);
CREATE TABLE items (
    itemID INTEGER PRIMARY KEY,
    itemTypeID INT NOT NULL,
    dateAdded TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    dateModified TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    clientDateModified TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    libraryID INT NOT NULL DEFAULT 1,
    key TEXT NOT NULL
);
CREATE TABLE fields (fieldID INTEGER PRIMARY KEY, fieldName TEXT);
CREATE TABLE itemDataValues (valueID INTEGER PRIMARY KEY, value UNIQUE);
CREATE TABLE itemData (
    itemID INT, fieldID INT, valueID INT,
    PRIMARY KEY (itemID, fieldID)
);
CREATE TABLE creators (creatorID INTEGER PRIMARY KEY, firstName TEXT, lastName TEXT, fieldMode INT);
CREATE TABLE creatorTypes (creatorTypeID INTEGER PRIMARY KEY, creatorType TEXT);
CREATE TABLE itemCreators (
    itemID INT NOT NULL, creatorID INT NOT NULL, creatorTypeID INT NOT NULL DEFAULT 1,
    orderIndex INT NOT NULL DEFAULT 0,
    PRIMARY KEY (itemID, creatorID, creatorTypeID, orderIndex)
);
CREATE TABLE tags (tagID INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE);
CREATE TABLE itemTags (itemID INT NOT NULL, tagID INT NOT NULL, type INT NOT NULL DEFAULT 0,
    PRIMARY KEY (itemID, tagID));
CREATE TABLE collections (collectionID INTEGER PRIMARY KEY, collectionName TEXT NOT NULL, key TEXT);
CREATE TABLE collectionItems (collectionID INT NOT NULL, itemID INT NOT NULL, orderIndex INT NOT NULL DEFAULT 0,
    PRIMARY KEY (collectionID, itemID));
CREATE TABLE itemAttachments (
    itemID INTEGER PRIMARY KEY, parentItemID INT, linkMode INT,
    contentType TEXT, charsetID INT, path TEXT
);
";

/// A throwaway Zotero data folder: `zotero.sqlite` plus `storage/`, with an
/// output folder next to it.
pub struct Library {
    pub dir: TempDir,
    pub conn: Connection,
}

impl Library {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("zotero/storage")).unwrap();
        let conn = Connection::open(dir.path().join("zotero/zotero.sqlite")).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        Self { dir, conn }
    }

    pub fn input_dir(&self) -> PathBuf {
        self.dir.path().join("zotero")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("papis")
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn id_for(&self, table: &str, id_col: &str, name_col: &str, name: &str) -> i64 {
        let existing = self
            .conn
            .query_row(
                &format!("SELECT {id_col} FROM {table} WHERE {name_col} = ?1"),
                [name],
                |r| r.get(0),
            )
            .ok();
        if let Some(id) = existing {
            return id;
        }
        self.conn
            .execute(&format!("INSERT INTO {table} ({name_col}) VALUES (?1)"), [name])
            .unwrap();
        self.conn.last_insert_rowid()
    }

    pub fn add_item(&self, id: i64, type_name: &str, key: &str) {
        let type_id = self.id_for("itemTypes", "itemTypeID", "typeName", type_name);
        self.conn
            .execute(
                "INSERT INTO items (itemID, itemTypeID, key, dateAdded, dateModified, clientDateModified)
                 VALUES (?1, ?2, ?3, '2019-03-01 10:00:00', '2019-03-02 10:00:00', '2019-03-03 10:00:00')",
                params![id, type_id, key],
            )
            .unwrap();
    }

    pub fn set_field(&self, item_id: i64, name: &str, value: &str) {
        let field_id = self.id_for("fields", "fieldID", "fieldName", name);
        self.conn
            .execute("INSERT OR IGNORE INTO itemDataValues (value) VALUES (?1)", [value])
            .unwrap();
        let value_id: i64 = self
            .conn
            .query_row("SELECT valueID FROM itemDataValues WHERE value = ?1", [value], |r| {
                r.get(0)
            })
            .unwrap();
        self.conn
            .execute(
                "INSERT INTO itemData (itemID, fieldID, valueID) VALUES (?1, ?2, ?3)",
                params![item_id, field_id, value_id],
            )
            .unwrap();
    }

    pub fn add_creator(&self, item_id: i64, role: &str, given: &str, surname: &str, order: i64) {
        let type_id = self.id_for("creatorTypes", "creatorTypeID", "creatorType", role);
        self.conn
            .execute(
                "INSERT INTO creators (firstName, lastName, fieldMode) VALUES (?1, ?2, 0)",
                params![given, surname],
            )
            .unwrap();
        let creator_id = self.conn.last_insert_rowid();
        self.conn
            .execute(
                "INSERT INTO itemCreators (itemID, creatorID, creatorTypeID, orderIndex)
                 VALUES (?1, ?2, ?3, ?4)",
                params![item_id, creator_id, type_id, order],
            )
            .unwrap();
    }

    pub fn add_tag(&self, item_id: i64, name: &str) {
        let tag_id = self.id_for("tags", "tagID", "name", name);
        self.conn
            .execute(
                "INSERT INTO itemTags (itemID, tagID) VALUES (?1, ?2)",
                params![item_id, tag_id],
            )
            .unwrap();
    }

    pub fn add_to_collection(&self, item_id: i64, collection: &str) {
        let collection_id = self.id_for("collections", "collectionID", "collectionName", collection);
        self.conn
            .execute(
                "INSERT INTO collectionItems (collectionID, itemID) VALUES (?1, ?2)",
                params![collection_id, item_id],
            )
            .unwrap();
    }

    /// Adds the attachment as its own item, the way Zotero does.
    pub fn add_attachment(
        &self,
        id: i64,
        parent_id: i64,
        key: &str,
        path: Option<&str>,
        content_type: &str,
    ) {
        self.add_item(id, "attachment", key);
        self.conn
            .execute(
                "INSERT INTO itemAttachments (itemID, parentItemID, linkMode, contentType, path)
                 VALUES (?1, ?2, 0, ?3, ?4)",
                params![id, parent_id, content_type, path],
            )
            .unwrap();
    }

    /// Puts a blob where a `storage:<name>` path of attachment `key` points.
    pub fn store_blob(&self, key: &str, name: &str, content: &[u8]) -> PathBuf {
        let dir = self.input_dir().join("storage").join(key);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_file(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }
}

pub fn read_document(output_dir: &Path, key: &str) -> serde_yaml::Mapping {
    let content = fs::read_to_string(output_dir.join(key).join("info.yaml")).unwrap();
    serde_yaml::from_str(&content).unwrap()
}

pub fn get<'a>(doc: &'a serde_yaml::Mapping, key: &str) -> &'a serde_yaml::Value {
    doc.get(key)
        .unwrap_or_else(|| panic!("document has no {key:?}: {doc:?}"))
}
