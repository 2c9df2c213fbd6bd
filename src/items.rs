use crate::query::InClause;
use eyre::{Context, Result};
use rusqlite::{Connection, params_from_iter};

/// Attachments are exported as files of their parent, never as items.
pub const ATTACHMENT_TYPE: &str = "attachment";

/// Zotero type names that papis spells differently.
const TRANSLATED_TYPES: &[(&str, &str)] = &[("journalArticle", "article")];

pub fn translate_type(type_name: &str) -> &str {
    TRANSLATED_TYPES
        .iter()
        .find(|(zotero, _)| *zotero == type_name)
        .map(|(_, papis)| *papis)
        .unwrap_or(type_name)
}

/// One exportable row of the `items` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: i64,
    /// Already translated to the papis type name.
    pub item_type: String,
    pub key: String,
    pub created: String,
    pub modified: String,
    pub modified_client: String,
}

/// Walks the non-excluded items in ascending id order while counting
/// progress against the total.
pub struct ItemEnumerator {
    items: std::vec::IntoIter<Item>,
    total: u64,
    position: u64,
}

impl ItemEnumerator {
    pub fn load(conn: &Connection, excluded_types: &[String]) -> Result<Self> {
        let excluded = exclusion_clause(excluded_types);

        let total: i64 = conn
            .query_row(
                &format!(
                    "SELECT COUNT(item.itemID)
                     FROM items item
                     JOIN itemTypes itemType ON itemType.itemTypeID = item.itemTypeID
                     WHERE itemType.typeName NOT IN {}",
                    excluded.sql()
                ),
                params_from_iter(excluded.values()),
                |row| row.get(0),
            )
            .wrap_err("Failed to count items")?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT item.itemID, itemType.typeName, item.key,
                        item.dateAdded, item.dateModified, item.clientDateModified
                 FROM items item
                 JOIN itemTypes itemType ON itemType.itemTypeID = item.itemTypeID
                 WHERE itemType.typeName NOT IN {}
                 ORDER BY item.itemID",
                excluded.sql()
            ))
            .wrap_err("Failed to prepare item query")?;

        let items = stmt
            .query_map(params_from_iter(excluded.values()), |row| {
                let type_name: String = row.get(1)?;
                Ok(Item {
                    id: row.get(0)?,
                    item_type: translate_type(&type_name).to_string(),
                    key: row.get(2)?,
                    created: row.get(3)?,
                    modified: row.get(4)?,
                    modified_client: row.get(5)?,
                })
            })
            .wrap_err("Failed to query items")?
            .collect::<Result<Vec<_>, _>>()
            .wrap_err("Failed to read item row")?;

        Ok(Self {
            items: items.into_iter(),
            total: total as u64,
            position: 0,
        })
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of items handed out so far.
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl Iterator for ItemEnumerator {
    type Item = Item;

    fn next(&mut self) -> Option<Item> {
        let item = self.items.next()?;
        self.position += 1;
        Some(item)
    }
}

fn exclusion_clause(excluded_types: &[String]) -> InClause {
    let mut types: Vec<&str> = excluded_types.iter().map(String::as_str).collect();
    if !types.contains(&ATTACHMENT_TYPE) {
        types.push(ATTACHMENT_TYPE);
    }
    InClause::new(types, 1)
}
