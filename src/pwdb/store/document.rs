//! On-disk records.
//!
//! The database file is one JSON object with `tags`, `fields` and `items`.
//! Items and their fields are maps keyed by the decimal uid; the key must
//! agree with the `uid` inside the record.

use crate::collection::{FieldCollection, ItemCollection};
use crate::error::{LoadStage, PwdbError, Result};
use crate::model::{Field, FieldValue, Item};
use crate::table::{FieldTable, TableRecord, TagTable, SENSITIVE_ATTR};
use crate::uid::{Uid, UidAllocator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    pub value: FieldValue,
    pub sensitive: bool,
    pub uid: Uid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub name: String,
    pub tags: Vec<Uid>,
    #[serde(default)]
    pub note: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub uid: Uid,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldRecord>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub tags: Vec<TableRecord>,
    pub fields: Vec<TableRecord>,
    pub items: BTreeMap<String, ItemRecord>,
}

impl From<&Field> for FieldRecord {
    fn from(field: &Field) -> Self {
        Self {
            name: field.name.clone(),
            value: field.value.clone(),
            sensitive: field.sensitive,
            uid: field.uid,
        }
    }
}

impl From<&Item> for ItemRecord {
    fn from(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            tags: item.tags.clone(),
            note: item.note.clone(),
            timestamp: item.created_at,
            uid: item.uid,
            fields: item
                .iter_fields()
                .map(|f| (f.uid.to_string(), FieldRecord::from(f)))
                .collect(),
        }
    }
}

/// Everything a document populates, validated and with ids registered.
#[derive(Debug)]
pub struct Contents {
    pub tags: TagTable,
    pub fields: FieldTable,
    pub items: ItemCollection,
    pub item_uids: UidAllocator,
    pub field_uids: UidAllocator,
}

impl Document {
    /// Builds a document from store contents. `items` should already hold the
    /// values that are meant to land on disk (sealed or plaintext).
    pub fn assemble(tags: &TagTable, fields: &FieldTable, items: &[Item]) -> Self {
        Self {
            tags: tags.export(),
            fields: fields.export(),
            items: items
                .iter()
                .map(|item| (item.uid.to_string(), ItemRecord::from(item)))
                .collect(),
        }
    }

    /// Populates tables then items, in that order. The first failure is
    /// wrapped with the stage it happened in.
    pub fn populate(
        self,
        mut item_uids: UidAllocator,
        mut field_uids: UidAllocator,
    ) -> Result<Contents> {
        let mut tags = TagTable::new();
        for record in self.tags {
            tags.add(record.name, Some(record.uid))
                .map_err(|e| PwdbError::corrupt(LoadStage::Tags, e))?;
        }

        let mut fields = FieldTable::new();
        for record in self.fields {
            let sensitive = record
                .attributes
                .get(SENSITIVE_ATTR)
                .and_then(|v| v.as_bool())
                .ok_or_else(|| {
                    PwdbError::corrupt(
                        LoadStage::Fields,
                        PwdbError::MalformedDocument(format!(
                            "field '{}' has no boolean '{}' flag",
                            record.name, SENSITIVE_ATTR
                        )),
                    )
                })?;
            fields
                .add(record.name, sensitive, Some(record.uid))
                .map_err(|e| PwdbError::corrupt(LoadStage::Fields, e))?;
        }

        let mut items = ItemCollection::new();
        for (key, record) in self.items {
            let item = load_item(&key, record, &mut item_uids, &mut field_uids)
                .map_err(|e| PwdbError::corrupt(LoadStage::Items, e))?;
            items
                .add(item)
                .map_err(|e| PwdbError::corrupt(LoadStage::Items, e))?;
        }

        Ok(Contents {
            tags,
            fields,
            items,
            item_uids,
            field_uids,
        })
    }
}

fn check_key(key: &str, uid: Uid, what: &str) -> Result<()> {
    match key.parse::<Uid>() {
        Ok(parsed) if parsed == uid => Ok(()),
        _ => Err(PwdbError::MalformedDocument(format!(
            "{} key '{}' does not match uid {}",
            what, key, uid
        ))),
    }
}

fn load_item(
    key: &str,
    record: ItemRecord,
    item_uids: &mut UidAllocator,
    field_uids: &mut UidAllocator,
) -> Result<Item> {
    check_key(key, record.uid, "item")?;
    item_uids.register(record.uid)?;

    let mut fields = FieldCollection::new();
    for (field_key, field) in record.fields {
        check_key(&field_key, field.uid, "field")?;
        field_uids.register(field.uid)?;
        fields.add(Field::new(field.name, field.value, field.sensitive, field.uid))?;
    }

    // tags have set semantics
    let mut tags: Vec<Uid> = Vec::with_capacity(record.tags.len());
    for tag in record.tags {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    Ok(Item::new(
        record.name,
        tags,
        record.note,
        record.timestamp,
        record.uid,
        fields,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uid::{FIRST_FIELD_UID, FIRST_ITEM_UID};

    fn allocators() -> (UidAllocator, UidAllocator) {
        (
            UidAllocator::new(FIRST_ITEM_UID),
            UidAllocator::new(FIRST_FIELD_UID),
        )
    }

    const SAMPLE: &str = r#"{
      "tags": [{"name": "work", "uid": 10, "count": 1}],
      "fields": [{"name": "password", "uid": 100, "count": 1, "sensitive": true}],
      "items": {
        "1000": {"name": "Mail", "tags": [10, 10], "note": "n",
                 "timestamp": 1700000000, "uid": 1000,
                 "fields": {"5000": {"name": "password", "value": "x",
                                     "sensitive": true, "uid": 5000},
                            "5001": {"name": "port", "value": 993,
                                     "sensitive": false, "uid": 5001}}}
      }
    }"#;

    #[test]
    fn populates_sample_document() {
        let doc: Document = serde_json::from_str(SAMPLE).unwrap();
        let (items, fields) = allocators();
        let contents = doc.populate(items, fields).unwrap();

        assert_eq!(contents.tags.get_uid("work").unwrap(), 10);
        assert!(contents.fields.is_sensitive("password").unwrap());

        let item = contents.items.get(1000).unwrap();
        assert_eq!(item.name, "Mail");
        assert_eq!(item.tags, vec![10]);
        assert_eq!(item.created_at.timestamp(), 1_700_000_000);
        assert_eq!(
            item.field_by_name("port").unwrap().value,
            FieldValue::Integer(993)
        );

        assert!(contents.item_uids.is_issued(1000));
        assert!(contents.field_uids.is_issued(5001));
        assert_eq!(contents.field_uids.peek(), 5002);
    }

    #[test]
    fn mismatched_item_key_is_corrupt() {
        let json = SAMPLE.replace("\"1000\": {", "\"1001\": {");
        let doc: Document = serde_json::from_str(&json).unwrap();
        let (items, fields) = allocators();
        let err = doc.populate(items, fields).unwrap_err();
        assert!(matches!(
            err,
            PwdbError::CorruptDatabase {
                stage: LoadStage::Items,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_tag_is_corrupt() {
        let json = SAMPLE.replace(
            r#"[{"name": "work", "uid": 10, "count": 1}]"#,
            r#"[{"name": "work", "uid": 10, "count": 1}, {"name": "home", "uid": 10, "count": 0}]"#,
        );
        let doc: Document = serde_json::from_str(&json).unwrap();
        let (items, fields) = allocators();
        let err = doc.populate(items, fields).unwrap_err();
        assert!(matches!(
            err,
            PwdbError::CorruptDatabase {
                stage: LoadStage::Tags,
                ..
            }
        ));
    }

    #[test]
    fn largest_tag_uid_is_corrupt() {
        let json = r#"{"tags":[{"name":"x","uid":18446744073709551615,"count":0}],"fields":[],"items":{}}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        let (items, fields) = allocators();
        let err = doc.populate(items, fields).unwrap_err();
        match err {
            PwdbError::CorruptDatabase { stage, source } => {
                assert_eq!(stage, LoadStage::Tags);
                assert!(matches!(*source, PwdbError::UidOverflow(u64::MAX)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn field_definition_without_flag_is_corrupt() {
        let json = SAMPLE.replace(r#", "sensitive": true}]"#, "}]");
        let doc: Document = serde_json::from_str(&json).unwrap();
        let (items, fields) = allocators();
        let err = doc.populate(items, fields).unwrap_err();
        assert!(matches!(
            err,
            PwdbError::CorruptDatabase {
                stage: LoadStage::Fields,
                ..
            }
        ));
    }

    #[test]
    fn assemble_keys_items_by_uid() {
        let doc: Document = serde_json::from_str(SAMPLE).unwrap();
        let (items, fields) = allocators();
        let contents = doc.populate(items, fields).unwrap();
        let list: Vec<Item> = contents.items.iter().cloned().collect();
        let rebuilt = Document::assemble(&contents.tags, &contents.fields, &list);
        assert!(rebuilt.items.contains_key("1000"));
        assert_eq!(rebuilt.items["1000"].fields.len(), 2);
        assert_eq!(rebuilt.fields[0].name, "password");
    }
}
