//! Uid-keyed collections of fields and items.
//!
//! Lookups are by uid; iteration is by display name (ties broken by uid), which
//! is the order every `list` command shows.

use crate::cipher::Cipher;
use crate::error::{PwdbError, Result};
use crate::model::{Field, Item};
use crate::uid::Uid;
use std::collections::HashMap;

/// Something that can be stored in a [`Collection`].
pub trait Element: Clone {
    fn uid(&self) -> Uid;
    fn display_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Collection<T: Element> {
    elements: HashMap<Uid, T>,
}

pub type FieldCollection = Collection<Field>;
pub type ItemCollection = Collection<Item>;

impl<T: Element> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> Collection<T> {
    pub fn new() -> Self {
        Self {
            elements: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, uid: Uid) -> bool {
        self.elements.contains_key(&uid)
    }

    pub fn add(&mut self, element: T) -> Result<()> {
        let uid = element.uid();
        if self.elements.contains_key(&uid) {
            return Err(PwdbError::DuplicateId(uid));
        }
        self.elements.insert(uid, element);
        Ok(())
    }

    pub fn remove(&mut self, uid: Uid) -> Result<T> {
        self.elements
            .remove(&uid)
            .ok_or_else(|| PwdbError::NotFound(format!("uid {}", uid)))
    }

    pub fn get(&self, uid: Uid) -> Result<&T> {
        self.elements
            .get(&uid)
            .ok_or_else(|| PwdbError::NotFound(format!("uid {}", uid)))
    }

    /// Replaces the element with the same uid. Not an upsert.
    pub fn update(&mut self, element: T) -> Result<T> {
        match self.elements.get_mut(&element.uid()) {
            Some(slot) => Ok(std::mem::replace(slot, element)),
            None => Err(PwdbError::NotFound(format!("uid {}", element.uid()))),
        }
    }

    /// Elements sorted by display name, then uid. Sorted afresh on each call.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let mut elements: Vec<&T> = self.elements.values().collect();
        elements.sort_by(|a, b| {
            a.display_name()
                .cmp(b.display_name())
                .then(a.uid().cmp(&b.uid()))
        });
        elements.into_iter()
    }
}

impl FieldCollection {
    /// Copies the fields, decrypting sensitive values when a cipher is given.
    pub fn export(&self, cipher: Option<&dyn Cipher>) -> Result<Vec<Field>> {
        self.iter()
            .map(|field| {
                Ok(Field {
                    value: field.decrypted_value(cipher)?,
                    ..field.clone()
                })
            })
            .collect()
    }
}

impl ItemCollection {
    /// Copies the items, decrypting sensitive field values when a cipher is
    /// given. Only the plaintext export passes a cipher here.
    pub fn export(&self, cipher: Option<&dyn Cipher>) -> Result<Vec<Item>> {
        self.iter()
            .map(|item| {
                let mut fields = FieldCollection::new();
                for field in item.fields.export(cipher)? {
                    fields.add(field)?;
                }
                Ok(Item {
                    fields,
                    ..item.clone()
                })
            })
            .collect()
    }
}
