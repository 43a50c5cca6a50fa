//! # Name/uid tables
//!
//! A [`Table`] is a registry that maps unique names to stable [`Uid`]s. Each
//! entry also carries a usage counter (how many items reference it) and a
//! free-form attribute map.
//!
//! Two tables exist in a store:
//!
//! - [`TagTable`]: tag names, no attributes.
//! - [`FieldTable`]: field definitions, with a single `sensitive` attribute.
//!
//! ## Invariants
//!
//! - name ↔ uid is a bijection.
//! - An entry cannot be removed while its count is non-zero.
//! - Failed operations leave the table unchanged.
//!
//! Entries are addressed by name or uid through [`TableKey`]; both `&str` and
//! [`Uid`] convert into it, so `table.count("work")` and `table.count(10)` both
//! work.

use crate::error::{PwdbError, Result};
use crate::uid::{Uid, UidAllocator, FIRST_FIELD_DEF_UID, FIRST_TAG_UID};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::Deref;

pub const SENSITIVE_ATTR: &str = "sensitive";

pub type Attributes = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    pub name: String,
    pub uid: Uid,
    pub count: u64,
    pub attributes: Attributes,
}

/// Exported form of a table entry: `{name, uid, count, ...attributes}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRecord {
    pub name: String,
    pub uid: Uid,
    pub count: u64,
    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKey<'a> {
    Name(&'a str),
    Uid(Uid),
}

impl<'a> From<&'a str> for TableKey<'a> {
    fn from(name: &'a str) -> Self {
        TableKey::Name(name)
    }
}

impl<'a> From<&'a String> for TableKey<'a> {
    fn from(name: &'a String) -> Self {
        TableKey::Name(name.as_str())
    }
}

impl From<Uid> for TableKey<'_> {
    fn from(uid: Uid) -> Self {
        TableKey::Uid(uid)
    }
}

impl fmt::Display for TableKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKey::Name(name) => write!(f, "'{}'", name),
            TableKey::Uid(uid) => write!(f, "uid {}", uid),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    label: &'static str,
    entries: HashMap<Uid, TableEntry>,
    names: HashMap<String, Uid>,
    uids: UidAllocator,
}

impl Table {
    /// Creates an empty table. `label` is the singular noun used in error
    /// messages ("tag", "field").
    pub fn new(label: &'static str, first_uid: Uid) -> Self {
        Self {
            label,
            entries: HashMap::new(),
            names: HashMap::new(),
            uids: UidAllocator::new(first_uid),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn has_uid(&self, uid: Uid) -> bool {
        self.entries.contains_key(&uid)
    }

    /// Adds a new entry and returns its uid.
    ///
    /// When `uid` is `None` a fresh one is allocated; otherwise the supplied
    /// uid is registered with the allocator so it is never handed out again.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        uid: Option<Uid>,
        attributes: Attributes,
    ) -> Result<Uid> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(PwdbError::DuplicateName(format!("{} '{}'", self.label, name)));
        }
        let uid = match uid {
            Some(uid) => {
                self.uids.register(uid)?;
                uid
            }
            None => self.uids.next()?,
        };

        self.names.insert(name.clone(), uid);
        self.entries.insert(
            uid,
            TableEntry {
                name,
                uid,
                count: 0,
                attributes,
            },
        );
        Ok(uid)
    }

    pub fn entry<'a>(&self, key: impl Into<TableKey<'a>>) -> Result<&TableEntry> {
        let key = key.into();
        let uid = self.resolve(key)?;
        self.entries.get(&uid).ok_or_else(|| self.not_found(key))
    }

    fn entry_mut<'a>(&mut self, key: impl Into<TableKey<'a>>) -> Result<&mut TableEntry> {
        let key = key.into();
        let uid = self.resolve(key)?;
        let label = self.label;
        self.entries
            .get_mut(&uid)
            .ok_or_else(|| PwdbError::NotFound(format!("{} {}", label, key)))
    }

    fn resolve(&self, key: TableKey<'_>) -> Result<Uid> {
        match key {
            TableKey::Name(name) => self
                .names
                .get(name)
                .copied()
                .ok_or_else(|| self.not_found(key)),
            TableKey::Uid(uid) if self.entries.contains_key(&uid) => Ok(uid),
            TableKey::Uid(_) => Err(self.not_found(key)),
        }
    }

    fn not_found(&self, key: TableKey<'_>) -> PwdbError {
        PwdbError::NotFound(format!("{} {}", self.label, key))
    }

    /// Removes an entry. Fails with `InUse` while anything references it.
    pub fn remove<'a>(&mut self, key: impl Into<TableKey<'a>>) -> Result<TableEntry> {
        let entry = self.entry(key)?;
        if entry.count != 0 {
            return Err(PwdbError::InUse {
                name: entry.name.clone(),
                count: entry.count,
            });
        }
        let uid = entry.uid;
        let entry = self
            .entries
            .remove(&uid)
            .ok_or_else(|| self.not_found(TableKey::Uid(uid)))?;
        self.names.remove(&entry.name);
        Ok(entry)
    }

    /// Renames an entry, keeping its uid. Renaming to the current name is a no-op.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<Uid> {
        let uid = self.get_uid(old_name)?;
        if old_name == new_name {
            return Ok(uid);
        }
        if self.names.contains_key(new_name) {
            return Err(PwdbError::DuplicateName(format!(
                "{} '{}'",
                self.label, new_name
            )));
        }
        self.names.remove(old_name);
        self.names.insert(new_name.to_string(), uid);
        if let Some(entry) = self.entries.get_mut(&uid) {
            entry.name = new_name.to_string();
        }
        Ok(uid)
    }

    pub fn get_name(&self, uid: Uid) -> Result<&str> {
        Ok(self.entry(uid)?.name.as_str())
    }

    pub fn get_uid(&self, name: &str) -> Result<Uid> {
        self.resolve(TableKey::Name(name))
    }

    pub fn count<'a>(&self, key: impl Into<TableKey<'a>>) -> Result<u64> {
        Ok(self.entry(key)?.count)
    }

    /// Adds `n` to the usage counter and returns the new value.
    pub fn increment<'a>(&mut self, key: impl Into<TableKey<'a>>, n: u64) -> Result<u64> {
        let entry = self.entry_mut(key)?;
        entry.count += n;
        Ok(entry.count)
    }

    /// Subtracts `n` from the usage counter; the counter never goes negative.
    pub fn decrement<'a>(&mut self, key: impl Into<TableKey<'a>>, n: u64) -> Result<u64> {
        let entry = self.entry_mut(key)?;
        let Some(count) = entry.count.checked_sub(n) else {
            return Err(PwdbError::CountUnderflow {
                name: entry.name.clone(),
                count: entry.count,
                by: n,
            });
        };
        entry.count = count;
        Ok(count)
    }

    /// Zeroes every usage counter. Used before counts are rebuilt from items.
    pub fn reset_counts(&mut self) {
        for entry in self.entries.values_mut() {
            entry.count = 0;
        }
    }

    pub fn attributes<'a>(&self, key: impl Into<TableKey<'a>>) -> Result<&Attributes> {
        Ok(&self.entry(key)?.attributes)
    }

    /// Entries sorted by name.
    ///
    /// The sort runs on every call (O(n log n)); the returned iterator can be
    /// dropped and re-requested at any time.
    pub fn iter(&self) -> impl Iterator<Item = &TableEntry> {
        let mut entries: Vec<&TableEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.into_iter()
    }

    /// Name-ascending list of `{name, uid, count, ...attributes}`.
    pub fn export(&self) -> Vec<TableRecord> {
        self.iter()
            .map(|entry| TableRecord {
                name: entry.name.clone(),
                uid: entry.uid,
                count: entry.count,
                attributes: entry.attributes.clone(),
            })
            .collect()
    }
}

/// Registry of tag names.
#[derive(Debug, Clone)]
pub struct TagTable(Table);

impl Default for TagTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TagTable {
    pub fn new() -> Self {
        Self(Table::new("tag", FIRST_TAG_UID))
    }

    pub fn add(&mut self, name: impl Into<String>, uid: Option<Uid>) -> Result<Uid> {
        self.0.add(name, uid, Attributes::new())
    }

    pub fn remove<'a>(&mut self, key: impl Into<TableKey<'a>>) -> Result<TableEntry> {
        self.0.remove(key)
    }

    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<Uid> {
        self.0.rename(old_name, new_name)
    }

    pub fn increment<'a>(&mut self, key: impl Into<TableKey<'a>>, n: u64) -> Result<u64> {
        self.0.increment(key, n)
    }

    pub fn decrement<'a>(&mut self, key: impl Into<TableKey<'a>>, n: u64) -> Result<u64> {
        self.0.decrement(key, n)
    }

    pub fn reset_counts(&mut self) {
        self.0.reset_counts()
    }
}

impl Deref for TagTable {
    type Target = Table;

    fn deref(&self) -> &Table {
        &self.0
    }
}

/// Registry of field definitions. Every entry carries a boolean `sensitive`
/// attribute that decides whether new field instances with that name are
/// encrypted at rest.
#[derive(Debug, Clone)]
pub struct FieldTable(Table);

impl Default for FieldTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldTable {
    pub fn new() -> Self {
        Self(Table::new("field", FIRST_FIELD_DEF_UID))
    }

    pub fn add(&mut self, name: impl Into<String>, sensitive: bool, uid: Option<Uid>) -> Result<Uid> {
        let mut attributes = Attributes::new();
        attributes.insert(SENSITIVE_ATTR.to_string(), Value::Bool(sensitive));
        self.0.add(name, uid, attributes)
    }

    pub fn is_sensitive<'a>(&self, key: impl Into<TableKey<'a>>) -> Result<bool> {
        Ok(self
            .0
            .attributes(key)?
            .get(SENSITIVE_ATTR)
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    pub fn remove<'a>(&mut self, key: impl Into<TableKey<'a>>) -> Result<TableEntry> {
        self.0.remove(key)
    }

    pub fn increment<'a>(&mut self, key: impl Into<TableKey<'a>>, n: u64) -> Result<u64> {
        self.0.increment(key, n)
    }

    pub fn decrement<'a>(&mut self, key: impl Into<TableKey<'a>>, n: u64) -> Result<u64> {
        self.0.decrement(key, n)
    }

    pub fn reset_counts(&mut self) {
        self.0.reset_counts()
    }
}

impl Deref for FieldTable {
    type Target = Table;

    fn deref(&self) -> &Table {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new("entry", 0);
        table.add("one", None, Attributes::new()).unwrap();
        table.add("two", Some(2000), Attributes::new()).unwrap();
        table.add("three", Some(3000), Attributes::new()).unwrap();
        let mut attrs = Attributes::new();
        attrs.insert("value".to_string(), Value::from(4));
        table.add("four", Some(4000), attrs).unwrap();
        table
    }

    #[test]
    fn name_uid_roundtrip() {
        let table = sample();
        for name in ["one", "two", "three", "four"] {
            let uid = table.get_uid(name).unwrap();
            assert_eq!(table.get_name(uid).unwrap(), name);
        }
        assert_eq!(table.get_uid("two").unwrap(), 2000);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn duplicate_name_is_rejected_without_side_effects() {
        let mut table = sample();
        let err = table.add("one", Some(9999), Attributes::new()).unwrap_err();
        assert!(matches!(err, PwdbError::DuplicateName(_)));
        assert!(!table.has_uid(9999));
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn duplicate_uid_is_rejected() {
        let mut table = sample();
        let err = table.add("five", Some(2000), Attributes::new()).unwrap_err();
        assert!(matches!(err, PwdbError::DuplicateIdentifier(2000)));
        assert!(!table.has_name("five"));
    }

    #[test]
    fn allocated_uid_skips_registered_ones() {
        let mut table = sample();
        let uid = table.add("five", None, Attributes::new()).unwrap();
        assert_eq!(uid, 4001);
    }

    #[test]
    fn remove_by_name_and_uid() {
        let mut table = sample();
        table.remove(2000u64).unwrap();
        assert!(!table.has_uid(2000));
        assert!(!table.has_name("two"));
        table.remove("three").unwrap();
        assert_eq!(table.len(), 2);
        assert!(matches!(
            table.remove("five"),
            Err(PwdbError::NotFound(_))
        ));
    }

    #[test]
    fn remove_in_use_fails_until_released() {
        let mut table = sample();
        table.increment("one", 2).unwrap();
        assert!(matches!(
            table.remove("one"),
            Err(PwdbError::InUse { count: 2, .. })
        ));
        table.decrement("one", 1).unwrap();
        assert!(table.remove("one").is_err());
        table.decrement("one", 1).unwrap();
        table.remove("one").unwrap();
    }

    #[test]
    fn decrement_below_zero_fails() {
        let mut table = sample();
        assert!(matches!(
            table.decrement("one", 1),
            Err(PwdbError::CountUnderflow { .. })
        ));
        assert_eq!(table.count("one").unwrap(), 0);
    }

    #[test]
    fn rename_keeps_uid() {
        let mut table = sample();
        table.rename("three", "zero").unwrap();
        assert!(!table.has_name("three"));
        assert_eq!(table.get_uid("zero").unwrap(), 3000);
        assert_eq!(table.get_name(3000).unwrap(), "zero");
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let mut table = sample();
        assert_eq!(table.rename("one", "one").unwrap(), 0);
        assert_eq!(table.get_uid("one").unwrap(), 0);
        assert_eq!(table.get_name(0).unwrap(), "one");
    }

    #[test]
    fn rename_errors() {
        let mut table = sample();
        assert!(matches!(
            table.rename("five", "six"),
            Err(PwdbError::NotFound(_))
        ));
        assert!(matches!(
            table.rename("one", "two"),
            Err(PwdbError::DuplicateName(_))
        ));
        assert_eq!(table.get_uid("one").unwrap(), 0);
    }

    #[test]
    fn attributes_by_name_and_uid() {
        let table = sample();
        let expected = Value::from(4);
        assert_eq!(table.attributes("four").unwrap().get("value"), Some(&expected));
        assert_eq!(table.attributes(4000u64).unwrap().get("value"), Some(&expected));
        assert!(table.attributes(1u64).is_err());
    }

    #[test]
    fn export_is_sorted_and_stable() {
        let mut table = sample();
        table.increment("two", 3).unwrap();
        let first = table.export();
        let names: Vec<_> = first.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["four", "one", "three", "two"]);
        assert_eq!(first[3].count, 3);
        assert_eq!(first, table.export());
    }

    #[test]
    fn iter_is_restartable() {
        let table = sample();
        let a: Vec<_> = table.iter().map(|e| e.uid).collect();
        let b: Vec<_> = table.iter().map(|e| e.uid).collect();
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn field_table_sensitivity() {
        let mut fields = FieldTable::new();
        let pw = fields.add("password", true, None).unwrap();
        fields.add("url", false, None).unwrap();
        assert_eq!(pw, FIRST_FIELD_DEF_UID);
        assert!(fields.is_sensitive(pw).unwrap());
        assert!(!fields.is_sensitive("url").unwrap());
        assert!(fields.is_sensitive("missing").is_err());

        let record = &fields.export()[0];
        assert_eq!(record.attributes.get(SENSITIVE_ATTR), Some(&Value::Bool(true)));
    }

    #[test]
    fn tag_table_starts_at_offset() {
        let mut tags = TagTable::new();
        assert_eq!(tags.add("abc", None).unwrap(), FIRST_TAG_UID);
        tags.add("cdf", Some(1234)).unwrap();
        tags.increment("abc", 2).unwrap();
        assert_eq!(tags.count(FIRST_TAG_UID).unwrap(), 2);
        assert_eq!(tags.add("xyz", None).unwrap(), 1235);
    }
}
