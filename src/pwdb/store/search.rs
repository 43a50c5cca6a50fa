use crate::collection::ItemCollection;
use crate::error::Result;
use crate::model::Item;
use crate::table::TagTable;
use regex::{Regex, RegexBuilder};

/// Which parts of an item a search looks at. Names are always searched;
/// the other flags add axes on top of them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchFlags {
    pub name: bool,
    pub tag: bool,
    pub field_name: bool,
    pub field_value: bool,
    pub note: bool,
}

impl SearchFlags {
    fn effective(self) -> Self {
        Self { name: true, ..self }
    }
}

pub fn compile(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

fn matches(re: &Regex, item: &Item, tags: &TagTable, flags: SearchFlags) -> bool {
    if flags.name && re.is_match(&item.name) {
        return true;
    }
    if flags.note && re.is_match(&item.note) {
        return true;
    }
    if flags.tag
        && item
            .tags
            .iter()
            .filter_map(|uid| tags.get_name(*uid).ok())
            .any(|name| re.is_match(name))
    {
        return true;
    }
    if flags.field_name && item.iter_fields().any(|f| re.is_match(&f.name)) {
        return true;
    }
    flags.field_value
        && item
            .iter_fields()
            .any(|f| re.is_match(&f.value.to_string()))
}

/// Items matching `pattern` (case-insensitive regex) on any selected axis,
/// in collection order. Each item appears at most once.
pub fn search<'a>(
    items: &'a ItemCollection,
    tags: &TagTable,
    pattern: &str,
    flags: SearchFlags,
) -> Result<Vec<&'a Item>> {
    let re = compile(pattern)?;
    let flags = flags.effective();
    Ok(items
        .iter()
        .filter(|item| matches(&re, item, tags, flags))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::FieldCollection;
    use crate::error::PwdbError;
    use crate::model::{Field, FieldValue};
    use chrono::Utc;

    fn fixture() -> (ItemCollection, TagTable) {
        let mut tags = TagTable::new();
        let work = tags.add("work", None).unwrap();
        let mut items = ItemCollection::new();

        let mut fields = FieldCollection::new();
        fields
            .add(Field::new("login", FieldValue::from("alice@example.com"), false, 5000))
            .unwrap();
        items
            .add(Item::new("Mail", vec![work], "", Utc::now(), 1000, fields))
            .unwrap();
        items
            .add(Item::new(
                "Alice Bank",
                vec![],
                "branch downtown",
                Utc::now(),
                1001,
                FieldCollection::new(),
            ))
            .unwrap();
        items
            .add(Item::new(
                "Phone",
                vec![99],
                "",
                Utc::now(),
                1002,
                FieldCollection::new(),
            ))
            .unwrap();
        (items, tags)
    }

    fn names(found: Vec<&Item>) -> Vec<String> {
        found.into_iter().map(|i| i.name.clone()).collect()
    }

    #[test]
    fn default_searches_names_case_insensitively() {
        let (items, tags) = fixture();
        let found = search(&items, &tags, "alice", SearchFlags::default()).unwrap();
        assert_eq!(names(found), vec!["Alice Bank"]);
    }

    #[test]
    fn field_value_flag_adds_matches() {
        let (items, tags) = fixture();
        let flags = SearchFlags {
            name: true,
            field_value: true,
            ..Default::default()
        };
        let found = search(&items, &tags, "alice", flags).unwrap();
        assert_eq!(names(found), vec!["Alice Bank", "Mail"]);
    }

    #[test]
    fn extra_axis_keeps_name_matches() {
        let (items, tags) = fixture();
        let flags = SearchFlags {
            field_value: true,
            ..Default::default()
        };
        let found = search(&items, &tags, "alice", flags).unwrap();
        assert_eq!(names(found), vec!["Alice Bank", "Mail"]);
    }

    #[test]
    fn tag_flag_resolves_names_and_skips_dangling() {
        let (items, tags) = fixture();
        let flags = SearchFlags {
            tag: true,
            ..Default::default()
        };
        assert_eq!(names(search(&items, &tags, "^WORK$", flags).unwrap()), vec!["Mail"]);
        assert!(search(&items, &tags, "99", flags).unwrap().is_empty());
    }

    #[test]
    fn note_and_field_name_flags() {
        let (items, tags) = fixture();
        let note = SearchFlags {
            note: true,
            ..Default::default()
        };
        assert_eq!(names(search(&items, &tags, "down", note).unwrap()), vec!["Alice Bank"]);
        let field_name = SearchFlags {
            field_name: true,
            ..Default::default()
        };
        assert_eq!(names(search(&items, &tags, "log", field_name).unwrap()), vec!["Mail"]);
    }

    #[test]
    fn item_listed_once_when_several_axes_match() {
        let (items, tags) = fixture();
        let all = SearchFlags {
            name: true,
            tag: true,
            field_name: true,
            field_value: true,
            note: true,
        };
        let found = search(&items, &tags, "a", all).unwrap();
        assert_eq!(names(found), vec!["Alice Bank", "Mail"]);
    }

    #[test]
    fn bad_pattern_is_reported() {
        let (items, tags) = fixture();
        assert!(matches!(
            search(&items, &tags, "(", SearchFlags::default()),
            Err(PwdbError::InvalidPattern(_))
        ));
    }
}
