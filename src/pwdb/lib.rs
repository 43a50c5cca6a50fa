//! # pwdb Architecture
//!
//! pwdb is a local, single-user credential store. Items (named records with
//! tags, typed fields and a note) live in one JSON document that is encrypted
//! as a whole when a password is available. Fields declared sensitive are also
//! sealed value by value, so they stay unreadable in memory and in dumps.
//!
//! Everything is driven by a small command language (`item create -n Bank -t
//! finance -f login bob`), read line by line from a shell.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Arguments, config, logging bootstrap, the line loop      │
//! │  - The ONLY place that knows about stdin/stdout/stderr      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  lines of text
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Language (lexer.rs, parser.rs)                             │
//! │  - Text → tokens → typed Command, or a Lex/Parse error      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  Command
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Session state (loaded store, unsaved changes)            │
//! │  - Returns CmdResult data, never prints                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/, table.rs, collection.rs, model.rs)  │
//! │  - Tables, items, usage counts, search, on-disk document    │
//! │  - Encryption through the Cipher trait (cipher.rs)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identifiers
//!
//! Every tag, field definition, item and field instance gets a numeric
//! [`uid::Uid`] from an allocator owned by its table or store. The ranges
//! start at different values (tags 10, field definitions 100, items 1000,
//! field instances 5000) so ids are recognisable in dumps. Ids loaded from
//! disk are registered so new ones never collide.
//!
//! ## Testing Strategy
//!
//! 1. **Storage and language**: unit tests next to the code, with `tempfile`
//!    for anything that touches disk.
//! 2. **Commands**: scripted sessions (`commands::test_utils`) that run
//!    command lines and inspect the returned `CmdResult`.
//! 3. **Binary**: `tests/cli.rs` drives the executable through stdin and `-c`.
//!
//! ## Module Overview
//!
//! - [`uid`]: Identifier allocator
//! - [`table`]: Name/uid tables for tags and field definitions
//! - [`model`]: `Field`, `Item` and field values
//! - [`collection`]: Generic uid-keyed collections
//! - [`store`]: The loaded database, persistence, search and reports
//! - [`cipher`]: The `Cipher` trait and the password-based implementation
//! - [`lexer`], [`parser`]: The command language
//! - [`commands`]: Session and command execution
//! - [`config`]: `config.json` settings
//! - [`logging`]: Logger bootstrap
//! - [`error`]: Error types

pub mod cipher;
pub mod collection;
pub mod commands;
pub mod config;
pub mod error;
pub mod lexer;
pub mod logging;
pub mod model;
pub mod parser;
pub mod store;
pub mod table;
pub mod uid;
