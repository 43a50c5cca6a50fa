//! # Command layer
//!
//! A [`Session`] holds the loaded database (if any) and executes parsed
//! [`Command`]s against it. Every command returns a [`CmdResult`]: plain data
//! plus messages, with no terminal assumptions. The CLI decides how to show
//! it.
//!
//! The only input a command may need after parsing (a multi-line note, an
//! overwrite confirmation) is requested through the [`Console`] trait.

use crate::cipher::Cipher;
use crate::error::{PwdbError, Result};
use crate::parser::{parse, Command};
use crate::store::{Report, Store};
use crate::uid::Uid;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

pub mod database;
pub mod field;
pub mod item;
pub mod tag;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// One line of an item listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSummary {
    pub uid: Uid,
    pub name: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldView {
    pub name: String,
    pub value: String,
    pub sensitive: bool,
    /// `value` is the mask, not the real value.
    pub masked: bool,
}

/// A fully rendered item, as shown by `item print`.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub uid: Uid,
    pub name: String,
    pub tags: Vec<String>,
    pub note: String,
    pub created_at: DateTime<Utc>,
    pub fields: Vec<FieldView>,
}

/// One tag or field definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub name: String,
    pub uid: Uid,
    pub count: u64,
    /// `None` for tags.
    pub sensitive: Option<bool>,
}

#[derive(Debug, Default)]
pub struct CmdResult {
    pub listed_items: Vec<ItemSummary>,
    pub item: Option<ItemView>,
    pub table_rows: Vec<TableRow>,
    pub report: Option<Report>,
    /// Preformatted text (dumps).
    pub lines: Vec<String>,
    pub messages: Vec<CmdMessage>,
    pub quit: bool,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_message(mut self, message: CmdMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_listed_items(mut self, items: Vec<ItemSummary>) -> Self {
        self.listed_items = items;
        self
    }

    pub fn with_item(mut self, item: ItemView) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_table_rows(mut self, rows: Vec<TableRow>) -> Self {
        self.table_rows = rows;
        self
    }

    pub fn with_report(mut self, report: Report) -> Self {
        self.report = Some(report);
        self
    }

    pub fn with_lines(mut self, lines: Vec<String>) -> Self {
        self.lines = lines;
        self
    }
}

/// Interactive input a command may ask for.
pub trait Console {
    /// Reads a note of any number of lines, ended by a line holding `.`.
    fn read_note(&mut self) -> Result<String>;

    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Session settings that come from configuration.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Used by `new` and `read` when no file name is given.
    pub default_database: PathBuf,
    /// Shown in place of sensitive values.
    pub mask: String,
}

#[derive(Debug)]
pub struct Session {
    store: Option<Store>,
    cipher: Option<Arc<dyn Cipher>>,
    options: SessionOptions,
    modified: bool,
}

impl Session {
    pub fn new(cipher: Option<Arc<dyn Cipher>>, options: SessionOptions) -> Self {
        Self {
            store: None,
            cipher,
            options,
            modified: false,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_some()
    }

    /// True when the loaded database has changes that were not written.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn store(&self) -> Result<&Store> {
        self.store.as_ref().ok_or(PwdbError::NotLoaded)
    }

    pub(crate) fn store_mut(&mut self) -> Result<&mut Store> {
        self.store.as_mut().ok_or(PwdbError::NotLoaded)
    }

    pub(crate) fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Parses and runs one line of input.
    pub fn execute(&mut self, line: &str, console: &mut dyn Console) -> Result<CmdResult> {
        let command = parse(line)?;
        let result = self.run(command, console);
        if let Err(e) = &result {
            warn!("event=command module=commands status=error error={}", e);
        }
        result
    }

    pub fn run(&mut self, command: Command, console: &mut dyn Console) -> Result<CmdResult> {
        match command {
            Command::Empty => Ok(CmdResult::default()),
            Command::Item(cmd) => item::run(self, cmd, console),
            Command::Field(cmd) => field::run(self, cmd),
            Command::Tag(cmd) => tag::run(self, cmd),
            Command::Database(cmd) => database::run(self, cmd, console),
            Command::Report => Ok(CmdResult::default().with_report(self.store()?.report())),
            Command::Quit => Ok(self.quit()),
        }
    }

    fn quit(&mut self) -> CmdResult {
        info!(
            "event=session_quit module=commands status=ok unsaved={}",
            self.modified
        );
        let mut result = CmdResult {
            quit: true,
            ..Default::default()
        };
        if self.modified {
            result.add_message(CmdMessage::warning(
                "Unsaved changes were discarded (use 'write' before quitting to keep them).",
            ));
        }
        result
    }

    /// Asks before a loaded database with unsaved changes is replaced.
    fn may_replace(&self, console: &mut dyn Console) -> Result<bool> {
        if self.store.is_none() || !self.modified {
            return Ok(true);
        }
        console.confirm("The database in memory has unsaved changes. Discard them?")
    }

    fn replace_store(&mut self, store: Option<Store>) {
        self.store = store;
        self.modified = false;
    }
}
