use eyre::{Context, Result};
use rusqlite::Connection;

/// Tags end up in a single string, joined by this delimiter and a space.
pub const TAG_DELIMITER: &str = ",";

pub fn join_tags<I, S>(tags: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let separator = format!("{} ", TAG_DELIMITER);
    let mut joined = String::new();
    for tag in tags {
        if !joined.is_empty() {
            joined.push_str(&separator);
        }
        joined.push_str(tag.as_ref());
    }
    joined
}

/// The item's tags as one delimited string; empty when it has none.
pub fn get_tags(conn: &Connection, item_id: i64) -> Result<String> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT tags.name
             FROM itemTags
             JOIN tags ON tags.tagID = itemTags.tagID
             WHERE itemTags.itemID = ?1",
        )
        .wrap_err("Failed to prepare tag query")?;

    let tags = stmt
        .query_map([item_id], |row| row.get::<_, String>(0))
        .wrap_err_with(|| format!("Failed to query tags of item {}", item_id))?
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("Failed to read tag row")?;

    Ok(join_tags(tags))
}

/// Names of the collections containing the item.
pub fn get_collections(conn: &Connection, item_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT collections.collectionName
             FROM collectionItems
             JOIN collections ON collections.collectionID = collectionItems.collectionID
             WHERE collectionItems.itemID = ?1",
        )
        .wrap_err("Failed to prepare collection query")?;

    let collections = stmt
        .query_map([item_id], |row| row.get::<_, String>(0))
        .wrap_err_with(|| format!("Failed to query collections of item {}", item_id))?
        .collect::<Result<Vec<_>, _>>()
        .wrap_err("Failed to read collection row")?;

    Ok(collections)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_join_with_comma_space() {
        assert_eq!(join_tags(["a", "b"]), "a, b");
        assert_eq!(join_tags(["solo"]), "solo");
    }

    #[test]
    fn no_tags_is_empty_string() {
        assert_eq!(join_tags(Vec::<String>::new()), "");
    }
}
