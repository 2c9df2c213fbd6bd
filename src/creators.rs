use eyre::{Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Separator between creators of the same role in the joined string.
pub const CREATOR_SEPARATOR: &str = " and ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorName {
    pub given: String,
    pub surname: String,
}

impl CreatorName {
    /// `Surname, Given`, or just `Surname` for single-field names.
    pub fn display(&self) -> String {
        if self.given.is_empty() {
            self.surname.clone()
        } else {
            format!("{}, {}", self.surname, self.given)
        }
    }
}

/// Creators of one role, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCreators {
    pub joined: String,
    pub names: Vec<CreatorName>,
}

/// Creators of an item grouped by role (`author`, `editor`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreatorMap {
    roles: BTreeMap<String, RoleCreators>,
}

impl CreatorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a creator to its role. Rows must arrive in role order index
    /// order for the joined string to be correct.
    pub fn push(&mut self, role: &str, name: CreatorName) {
        let entry = self.roles.entry(role.to_string()).or_default();
        if !entry.joined.is_empty() {
            entry.joined.push_str(CREATOR_SEPARATOR);
        }
        entry.joined.push_str(&name.display());
        entry.names.push(name);
    }

    #[cfg(test)]
    fn role(&self, role: &str) -> Option<&RoleCreators> {
        self.roles.get(role)
    }

    /// `<role>` → joined string and `<role>_list` → structured names, for
    /// every role present. Absent roles produce nothing.
    pub fn into_entries(self) -> Result<Vec<(String, Value)>> {
        let mut entries = Vec::with_capacity(self.roles.len() * 2);
        for (role, creators) in self.roles {
            let list = serde_yaml::to_value(&creators.names)
                .wrap_err_with(|| format!("Failed to encode {} list", role))?;
            entries.push((format!("{}_list", role), list));
            entries.push((role, Value::String(creators.joined)));
        }
        Ok(entries)
    }
}

pub fn get_creators(conn: &Connection, item_id: i64) -> Result<CreatorMap> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT creatorTypes.creatorType, creators.firstName, creators.lastName
             FROM itemCreators
             JOIN creatorTypes ON creatorTypes.creatorTypeID = itemCreators.creatorTypeID
             JOIN creators ON creators.creatorID = itemCreators.creatorID
             WHERE itemCreators.itemID = ?1
             ORDER BY creatorTypes.creatorType, itemCreators.orderIndex",
        )
        .wrap_err("Failed to prepare creator query")?;

    let mut rows = stmt
        .query([item_id])
        .wrap_err_with(|| format!("Failed to query creators of item {}", item_id))?;

    let mut creators = CreatorMap::new();
    while let Some(row) = rows.next().wrap_err("Failed to read creator row")? {
        let role: String = row.get(0)?;
        let given: Option<String> = row.get(1)?;
        let surname: Option<String> = row.get(2)?;
        creators.push(
            &role,
            CreatorName {
                given: given.unwrap_or_default(),
                surname: surname.unwrap_or_default(),
            },
        );
    }
    Ok(creators)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(given: &str, surname: &str) -> CreatorName {
        CreatorName {
            given: given.into(),
            surname: surname.into(),
        }
    }

    #[test]
    fn same_role_accumulates() {
        let mut map = CreatorMap::new();
        map.push("author", name("Jane", "Doe"));
        map.push("author", name("John", "Roe"));

        let authors = map.role("author").unwrap();
        assert_eq!(authors.joined, "Doe, Jane and Roe, John");
        assert_eq!(authors.names, vec![name("Jane", "Doe"), name("John", "Roe")]);
        assert_eq!(
            authors.names.len(),
            authors.joined.matches(CREATOR_SEPARATOR).count() + 1
        );
    }

    #[test]
    fn roles_are_kept_apart() {
        let mut map = CreatorMap::new();
        map.push("author", name("Jane", "Doe"));
        map.push("editor", name("Ed", "Itor"));

        let entries: BTreeMap<_, _> = map.into_entries().unwrap().into_iter().collect();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries["author"], Value::String("Doe, Jane".into()));
        assert_eq!(entries["editor"], Value::String("Itor, Ed".into()));

        let editors: Vec<CreatorName> =
            serde_yaml::from_value(entries["editor_list"].clone()).unwrap();
        assert_eq!(editors, vec![name("Ed", "Itor")]);
        assert!(!entries.contains_key("translator"));
    }

    #[test]
    fn single_field_names_have_no_comma() {
        assert_eq!(name("", "World Health Organization").display(), "World Health Organization");
    }

    #[test]
    fn no_creators_no_entries() {
        assert!(CreatorMap::new().into_entries().unwrap().is_empty());
    }
}
