//! # Store
//!
//! A [`Store`] is one loaded database: the tag table, the field table, the
//! item collection and the allocators for item and field-instance ids. It is
//! bound to the file it was created from or read from.
//!
//! ## Persistence
//!
//! The file holds a JSON [`Document`]. With a cipher the whole document is
//! encrypted; sensitive field values are additionally sealed one by one when
//! they are stored, so they stay encrypted in memory and in plaintext-free
//! dumps. `export_plaintext` is the only path that writes decrypted values.
//!
//! Writes never modify the existing file in place: see [`fs::write_atomic`].
//!
//! ## Usage counts
//!
//! Tag and field-definition counts track references from items. Items hold
//! each tag once, and every field instance whose name is a registered
//! definition counts once. Counts are rebuilt from the items on load.

pub mod document;
pub mod fs;
pub mod report;
pub mod search;

use crate::cipher::Cipher;
use crate::collection::{FieldCollection, ItemCollection};
use crate::error::{PwdbError, Result};
use crate::model::{Field, FieldValue, Item};
use crate::table::{FieldTable, TableEntry, TagTable};
use crate::uid::{Uid, UidAllocator, FIRST_FIELD_UID, FIRST_ITEM_UID};
use chrono::{SubsecRound, Utc};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use document::Document;
pub use report::Report;
pub use search::SearchFlags;

/// The requested changes for an item create, edit or add.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemChanges {
    pub name: Option<String>,
    /// Replaces the tag list when non-empty.
    pub tags: Vec<String>,
    /// Set or append, in order.
    pub fields: Vec<(String, FieldValue)>,
    pub deleted_fields: Vec<String>,
    pub note: Option<String>,
}

struct Draft {
    name: String,
    tags: Vec<Uid>,
    note: String,
    fields: FieldCollection,
}

#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    cipher: Option<Arc<dyn Cipher>>,
    tags: TagTable,
    fields: FieldTable,
    items: ItemCollection,
    item_uids: UidAllocator,
    field_uids: UidAllocator,
}

impl Store {
    /// An empty store bound to `path`. Nothing is written.
    pub fn new(path: impl Into<PathBuf>, cipher: Option<Arc<dyn Cipher>>) -> Self {
        Self {
            path: path.into(),
            cipher,
            tags: TagTable::new(),
            fields: FieldTable::new(),
            items: ItemCollection::new(),
            item_uids: UidAllocator::new(FIRST_ITEM_UID),
            field_uids: UidAllocator::new(FIRST_FIELD_UID),
        }
    }

    /// Creates an empty database file. Refuses to touch an existing path.
    pub fn create(path: impl Into<PathBuf>, cipher: Option<Arc<dyn Cipher>>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            return Err(PwdbError::AlreadyExists(path));
        }
        let store = Self::new(path, cipher);
        store.write()?;
        info!(
            "event=db_create module=store status=ok path={} encrypted={}",
            store.path.display(),
            store.is_encrypted()
        );
        Ok(store)
    }

    /// Loads a database file. Nothing is kept on failure.
    pub fn read(path: impl Into<PathBuf>, cipher: Option<Arc<dyn Cipher>>) -> Result<Self> {
        let path = path.into();
        debug!("event=db_read module=store status=start path={}", path.display());

        let bytes = std::fs::read(&path)?;
        let plain = match &cipher {
            Some(cipher) => cipher.decrypt(&bytes)?,
            None => bytes,
        };
        let document: Document = serde_json::from_slice(&plain)
            .map_err(|e| PwdbError::MalformedDocument(e.to_string()))?;
        let contents = document.populate(
            UidAllocator::new(FIRST_ITEM_UID),
            UidAllocator::new(FIRST_FIELD_UID),
        )?;

        let mut store = Self {
            path,
            cipher,
            tags: contents.tags,
            fields: contents.fields,
            items: contents.items,
            item_uids: contents.item_uids,
            field_uids: contents.field_uids,
        };
        store.recount()?;
        info!(
            "event=db_read module=store status=ok path={} items={} tags={} fields={}",
            store.path.display(),
            store.items.len(),
            store.tags.len(),
            store.fields.len()
        );
        Ok(store)
    }

    /// Saves to the bound path, encrypting when a cipher is configured.
    pub fn write(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.document(false)?)?;
        let bytes = match &self.cipher {
            Some(cipher) => cipher.encrypt(&json)?,
            None => json,
        };
        let backup = fs::write_atomic(&self.path, &bytes)?;
        info!(
            "event=db_write module=store status=ok path={} items={} backup={}",
            self.path.display(),
            self.items.len(),
            backup
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        Ok(())
    }

    /// Writes an unencrypted copy with every sensitive value decrypted.
    pub fn export_plaintext(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.document(true)?)?;
        fs::write_atomic(path, &json)?;
        info!(
            "event=db_export module=store status=ok path={} items={}",
            path.display(),
            self.items.len()
        );
        Ok(())
    }

    /// The on-disk form of the store. `decrypt` unseals sensitive values.
    pub fn document(&self, decrypt: bool) -> Result<Document> {
        let cipher = if decrypt { self.cipher() } else { None };
        let items = self.items.export(cipher)?;
        Ok(Document::assemble(&self.tags, &self.fields, &items))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn cipher(&self) -> Option<&dyn Cipher> {
        self.cipher.as_deref()
    }

    pub fn tags(&self) -> &TagTable {
        &self.tags
    }

    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    pub fn items(&self) -> &ItemCollection {
        &self.items
    }

    pub fn item(&self, uid: Uid) -> Result<&Item> {
        self.items
            .get(uid)
            .map_err(|_| PwdbError::NotFound(format!("item {}", uid)))
    }

    pub fn report(&self) -> Report {
        Report::build(&self.tags, &self.fields, &self.items)
    }

    pub fn search(&self, pattern: &str, flags: SearchFlags) -> Result<Vec<&Item>> {
        search::search(&self.items, &self.tags, pattern, flags)
    }

    /// Field definitions whose name matches `pattern`.
    pub fn search_fields(&self, pattern: &str) -> Result<Vec<&TableEntry>> {
        let re = search::compile(pattern)?;
        Ok(self.fields.iter().filter(|e| re.is_match(&e.name)).collect())
    }

    // ---- tags and field definitions ----

    pub fn add_tag(&mut self, name: &str) -> Result<Uid> {
        let uid = self.tags.add(name, None)?;
        self.recount()?;
        Ok(uid)
    }

    pub fn rename_tag(&mut self, old_name: &str, new_name: &str) -> Result<Uid> {
        self.tags.rename(old_name, new_name)
    }

    pub fn delete_tag(&mut self, name: &str) -> Result<()> {
        self.tags.remove(name).map(|_| ())
    }

    /// Registers a field definition. Existing instances with that name start
    /// counting towards it; their sensitivity is left as it was.
    pub fn add_field(&mut self, name: &str, sensitive: bool) -> Result<Uid> {
        let uid = self.fields.add(name, sensitive, None)?;
        self.recount()?;
        Ok(uid)
    }

    pub fn delete_field(&mut self, name: &str) -> Result<()> {
        self.fields.remove(name).map(|_| ())
    }

    // ---- items ----

    pub fn create_item(&mut self, changes: &ItemChanges) -> Result<Uid> {
        let draft = self.compose(None, changes)?;
        let uid = self.item_uids.next()?;
        self.insert(draft, uid)
    }

    /// Stores a copy of item `uid`, with `changes` applied, as a new item.
    pub fn add_item_from(&mut self, uid: Uid, changes: &ItemChanges) -> Result<Uid> {
        let base = self.item(uid)?.clone();
        let mut draft = self.compose(Some(&base), changes)?;
        draft.fields = self.remint(draft.fields)?;
        let new_uid = self.item_uids.next()?;
        self.insert(draft, new_uid)
    }

    /// Rebuilds item `uid` with `changes` applied. Uid and creation time are
    /// preserved.
    pub fn edit_item(&mut self, uid: Uid, changes: &ItemChanges) -> Result<()> {
        let old = self.item(uid)?.clone();
        let draft = self.compose(Some(&old), changes)?;
        let item = Item::new(
            draft.name,
            draft.tags,
            draft.note,
            old.created_at,
            uid,
            draft.fields,
        );

        release(&mut self.tags, &mut self.fields, &old)?;
        retain(&mut self.tags, &mut self.fields, &item)?;
        self.items.update(item)?;
        info!("event=item_edit module=store status=ok uid={}", uid);
        Ok(())
    }

    pub fn delete_item(&mut self, uid: Uid) -> Result<Item> {
        let item = self
            .items
            .remove(uid)
            .map_err(|_| PwdbError::NotFound(format!("item {}", uid)))?;
        release(&mut self.tags, &mut self.fields, &item)?;
        info!("event=item_delete module=store status=ok uid={}", uid);
        Ok(item)
    }

    fn insert(&mut self, draft: Draft, uid: Uid) -> Result<Uid> {
        let item = Item::new(
            draft.name,
            draft.tags,
            draft.note,
            Utc::now().trunc_subsecs(0),
            uid,
            draft.fields,
        );
        retain(&mut self.tags, &mut self.fields, &item)?;
        self.items.add(item)?;
        info!("event=item_add module=store status=ok uid={}", uid);
        Ok(uid)
    }

    /// Validates `changes` against the tables and builds the new item state.
    /// Nothing outside the field-id allocator is touched.
    fn compose(&mut self, base: Option<&Item>, changes: &ItemChanges) -> Result<Draft> {
        let tags = if changes.tags.is_empty() {
            base.map(|b| b.tags.clone()).unwrap_or_default()
        } else {
            let mut resolved = Vec::with_capacity(changes.tags.len());
            for name in &changes.tags {
                let uid = self.tags.get_uid(name)?;
                if !resolved.contains(&uid) {
                    resolved.push(uid);
                }
            }
            resolved
        };

        for name in &changes.deleted_fields {
            if base.and_then(|b| b.field_by_name(name)).is_none() {
                return Err(PwdbError::NotFound(format!("field '{}' in item", name)));
            }
        }

        let mut working: Vec<Field> = base
            .map(|b| {
                b.iter_fields()
                    .filter(|f| !changes.deleted_fields.contains(&f.name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        for (name, value) in &changes.fields {
            let mut updated = false;
            for field in working.iter_mut().filter(|f| &f.name == name) {
                field.value = self.seal(value, field.sensitive)?;
                updated = true;
            }
            if !updated {
                let sensitive = self.fields.has_name(name) && self.fields.is_sensitive(name)?;
                let uid = self.field_uids.next()?;
                working.push(Field::new(
                    name.clone(),
                    self.seal(value, sensitive)?,
                    sensitive,
                    uid,
                ));
            }
        }

        let mut fields = FieldCollection::new();
        for field in working {
            fields.add(field)?;
        }

        Ok(Draft {
            name: changes
                .name
                .clone()
                .or_else(|| base.map(|b| b.name.clone()))
                .unwrap_or_default(),
            tags,
            note: changes
                .note
                .clone()
                .or_else(|| base.map(|b| b.note.clone()))
                .unwrap_or_default(),
            fields,
        })
    }

    /// Gives every field a fresh instance id.
    fn remint(&mut self, fields: FieldCollection) -> Result<FieldCollection> {
        let mut out = FieldCollection::new();
        for field in fields.iter() {
            out.add(Field {
                uid: self.field_uids.next()?,
                ..field.clone()
            })?;
        }
        Ok(out)
    }

    fn seal(&self, value: &FieldValue, sensitive: bool) -> Result<FieldValue> {
        match self.cipher() {
            Some(cipher) if sensitive => value.seal(cipher),
            _ => Ok(value.clone()),
        }
    }

    fn recount(&mut self) -> Result<()> {
        let Store {
            tags,
            fields,
            items,
            ..
        } = self;
        tags.reset_counts();
        fields.reset_counts();
        for item in items.iter() {
            retain(tags, fields, item)?;
        }
        Ok(())
    }
}

fn retain(tags: &mut TagTable, fields: &mut FieldTable, item: &Item) -> Result<()> {
    for tag in &item.tags {
        if tags.has_uid(*tag) {
            tags.increment(*tag, 1)?;
        }
    }
    for field in item.iter_fields() {
        if fields.has_name(&field.name) {
            fields.increment(&field.name, 1)?;
        }
    }
    Ok(())
}

fn release(tags: &mut TagTable, fields: &mut FieldTable, item: &Item) -> Result<()> {
    for tag in &item.tags {
        if tags.has_uid(*tag) {
            tags.decrement(*tag, 1)?;
        }
    }
    for field in item.iter_fields() {
        if fields.has_name(&field.name) {
            fields.decrement(&field.name, 1)?;
        }
    }
    Ok(())
}
