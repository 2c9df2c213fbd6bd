use crate::document::sql_to_value;
use eyre::{Context, Result};
use rusqlite::Connection;
use serde_yaml::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Zotero field names that papis spells differently.
const TRANSLATED_FIELDS: &[(&str, &str)] = &[("DOI", "doi")];

pub fn translate_field(field_name: &str) -> &str {
    TRANSLATED_FIELDS
        .iter()
        .find(|(zotero, _)| *zotero == field_name)
        .map(|(_, papis)| *papis)
        .unwrap_or(field_name)
}

/// All flat fields of an item, keyed by their translated name.
pub fn get_fields(conn: &Connection, item_id: i64) -> Result<BTreeMap<String, Value>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT fields.fieldName, itemDataValues.value
             FROM itemData
             JOIN fields ON fields.fieldID = itemData.fieldID
             JOIN itemDataValues ON itemDataValues.valueID = itemData.valueID
             WHERE itemData.itemID = ?1
             ORDER BY itemData.fieldID",
        )
        .wrap_err("Failed to prepare field query")?;

    let mut rows = stmt
        .query([item_id])
        .wrap_err_with(|| format!("Failed to query fields of item {}", item_id))?;

    let mut fields = BTreeMap::new();
    while let Some(row) = rows.next().wrap_err("Failed to read field row")? {
        let name: String = row.get(0)?;
        let raw: rusqlite::types::Value = row.get(1)?;
        let name = translate_field(&name).to_string();

        let Some(value) = sql_to_value(raw) else {
            debug!(item_id, field = %name, "skipping binary field value");
            continue;
        };
        if let Some(previous) = fields.insert(name.clone(), value) {
            warn!(item_id, field = %name, ?previous, "field recorded twice, keeping the later value");
        }
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doi_is_lowercased() {
        assert_eq!(translate_field("DOI"), "doi");
        assert_eq!(translate_field("title"), "title");
        assert_eq!(translate_field("extra"), "extra");
    }
}
