use crate::cipher::{decrypt_text, encrypt_text, Cipher};
use crate::collection::{Element, FieldCollection};
use crate::error::{PwdbError, Result};
use crate::uid::Uid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The value held by a field. Numbers keep their type through a save/load
/// cycle; dates are kept as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Encrypts the value. The result is always text (base64 ciphertext of the
    /// JSON encoding, so the original type survives decryption).
    pub fn seal(&self, cipher: &dyn Cipher) -> Result<FieldValue> {
        let json = serde_json::to_string(self)?;
        Ok(FieldValue::Text(encrypt_text(cipher, &json)?))
    }

    /// Reverses [`seal`](Self::seal).
    pub fn unseal(&self, cipher: &dyn Cipher) -> Result<FieldValue> {
        let FieldValue::Text(encoded) = self else {
            return Err(PwdbError::Decryption);
        };
        let json = decrypt_text(cipher, encoded)?;
        serde_json::from_str(&json).map_err(|_| PwdbError::Decryption)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Float(x) => write!(f, "{:?}", x),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

/// A named value owned by exactly one [`Item`].
///
/// When `sensitive` is set and the store has a cipher, `value` holds the
/// ciphertext; use [`decrypted_value`](Self::decrypted_value) to read it.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
    pub sensitive: bool,
    pub uid: Uid,
}

impl Field {
    pub fn new(name: impl Into<String>, value: FieldValue, sensitive: bool, uid: Uid) -> Self {
        Self {
            name: name.into(),
            value,
            sensitive,
            uid,
        }
    }

    /// Returns the plaintext value when the field is sensitive and a cipher is
    /// given, otherwise the stored value as-is.
    pub fn decrypted_value(&self, cipher: Option<&dyn Cipher>) -> Result<FieldValue> {
        match cipher {
            Some(cipher) if self.sensitive => self.value.unseal(cipher),
            _ => Ok(self.value.clone()),
        }
    }
}

impl Element for Field {
    fn uid(&self) -> Uid {
        self.uid
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

/// A stored credential.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub name: String,
    pub tags: Vec<Uid>,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub uid: Uid,
    pub fields: FieldCollection,
}

impl Item {
    pub fn new(
        name: impl Into<String>,
        tags: Vec<Uid>,
        note: impl Into<String>,
        created_at: DateTime<Utc>,
        uid: Uid,
        fields: FieldCollection,
    ) -> Self {
        Self {
            name: name.into(),
            tags,
            note: note.into(),
            created_at,
            uid,
            fields,
        }
    }

    /// Fields in collection order (by name).
    pub fn iter_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn get_decrypted_value(
        &self,
        field: &Field,
        cipher: Option<&dyn Cipher>,
    ) -> Result<FieldValue> {
        field.decrypted_value(cipher)
    }

    pub fn has_tag(&self, tag: Uid) -> bool {
        self.tags.contains(&tag)
    }
}

impl Element for Item {
    fn uid(&self) -> Uid {
        self.uid
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}
