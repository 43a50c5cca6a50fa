//! Database statistics and the human-readable dump.

use crate::collection::ItemCollection;
use crate::model::Item;
use crate::table::{FieldTable, Table, TagTable};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub items: usize,
    pub tags: usize,
    pub field_definitions: usize,
    pub sensitive_definitions: usize,
    pub field_instances: usize,
    pub sensitive_instances: usize,
    pub unused_tags: Vec<String>,
    pub unused_fields: Vec<String>,
    pub dangling_tag_refs: usize,
}

impl Report {
    pub fn build(tags: &TagTable, fields: &FieldTable, items: &ItemCollection) -> Self {
        let mut report = Report {
            items: items.len(),
            tags: tags.len(),
            field_definitions: fields.len(),
            ..Default::default()
        };

        for entry in fields.iter() {
            if fields.is_sensitive(entry.uid).unwrap_or(false) {
                report.sensitive_definitions += 1;
            }
            if entry.count == 0 {
                report.unused_fields.push(entry.name.clone());
            }
        }
        report.unused_tags = tags
            .iter()
            .filter(|e| e.count == 0)
            .map(|e| e.name.clone())
            .collect();

        for item in items.iter() {
            report.field_instances += item.fields.len();
            report.sensitive_instances += item.iter_fields().filter(|f| f.sensitive).count();
            report.dangling_tag_refs += item.tags.iter().filter(|t| !tags.has_uid(**t)).count();
        }
        report
    }
}

/// Replaces control characters (anything but plain spaces among whitespace)
/// with `<code>` so multi-line notes fit on one dump line.
pub fn escape_control(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == ' ' || !(c.is_control() || c.is_whitespace()) {
            out.push(c);
        } else {
            out.push_str(&format!("<{}>", c as u32));
        }
    }
    out
}

pub fn dump_table(table: &Table) -> Vec<String> {
    table
        .iter()
        .map(|entry| {
            let attrs: Vec<String> = entry
                .attributes
                .iter()
                .map(|(k, v)| format!(", {}={}", k, v))
                .collect();
            format!(
                "{}: name={}, uid={}, count={}{}",
                table.label(),
                entry.name,
                entry.uid,
                entry.count,
                attrs.concat()
            )
        })
        .collect()
}

/// Sensitive values are replaced by `mask`; dumps never decrypt.
pub fn dump_item(item: &Item, tags: &TagTable, mask: &str, indent: usize) -> Vec<String> {
    let margin = "  ".repeat(indent);
    let tag_names: Vec<String> = item
        .tags
        .iter()
        .map(|uid| match tags.get_name(*uid) {
            Ok(name) => name.to_string(),
            Err(_) => format!("?{}", uid),
        })
        .collect();

    let mut lines = vec![
        format!("{}item: uid={}, name={}", margin, item.uid, item.name),
        format!(
            "{}  created={}, tags=[{}]",
            margin,
            item.created_at.format("%Y-%m-%d %H:%M:%S"),
            tag_names.join(", ")
        ),
        format!("{}  note={}", margin, escape_control(&item.note)),
    ];
    for field in item.iter_fields() {
        let value = if field.sensitive {
            mask.to_string()
        } else {
            field.value.to_string()
        };
        lines.push(format!(
            "{}  field: name={}, value={}, sensitive={}, uid={}",
            margin, field.name, value, field.sensitive, field.uid
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::FieldCollection;
    use crate::model::{Field, FieldValue};
    use chrono::Utc;

    #[test]
    fn escapes_newlines_and_tabs() {
        assert_eq!(escape_control("a b\nc\td"), "a b<10>c<9>d");
    }

    #[test]
    fn report_counts() {
        let mut tags = TagTable::new();
        let work = tags.add("work", None).unwrap();
        tags.add("spare", None).unwrap();
        tags.increment(work, 1).unwrap();

        let mut fields = FieldTable::new();
        fields.add("password", true, None).unwrap();
        fields.add("url", false, None).unwrap();
        fields.increment("password", 1).unwrap();

        let mut fc = FieldCollection::new();
        fc.add(Field::new("password", FieldValue::from("x"), true, 5000))
            .unwrap();
        fc.add(Field::new("note", FieldValue::from("y"), false, 5001))
            .unwrap();
        let mut items = ItemCollection::new();
        items
            .add(Item::new("Mail", vec![work, 77], "", Utc::now(), 1000, fc))
            .unwrap();

        let report = Report::build(&tags, &fields, &items);
        assert_eq!(report.items, 1);
        assert_eq!(report.tags, 2);
        assert_eq!(report.field_definitions, 2);
        assert_eq!(report.sensitive_definitions, 1);
        assert_eq!(report.field_instances, 2);
        assert_eq!(report.sensitive_instances, 1);
        assert_eq!(report.unused_tags, vec!["spare"]);
        assert_eq!(report.unused_fields, vec!["url"]);
        assert_eq!(report.dangling_tag_refs, 1);
    }

    #[test]
    fn item_dump_masks_sensitive_values() {
        let mut fc = FieldCollection::new();
        fc.add(Field::new("pin", FieldValue::from("1234"), true, 5000))
            .unwrap();
        let item = Item::new("Phone", vec![3], "line1\nline2", Utc::now(), 1000, fc);
        let lines = dump_item(&item, &TagTable::new(), "***", 0);
        assert!(lines[1].contains("tags=[?3]"));
        assert!(lines[2].ends_with("line1<10>line2"));
        assert!(lines[3].contains("value=***"));
        assert!(!lines.concat().contains("1234"));
    }
}
