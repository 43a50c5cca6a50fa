//! # Parser
//!
//! Recursive descent over the token stream of one line:
//!
//! ```text
//! command   := item_cmd | field_cmd | tag_cmd | db_cmd | REPORT | QUIT | <empty>
//! item_cmd  := ITEM ( LIST | COUNT | PRINT uid [-s] | DUMP uid | DELETE uid
//!                   | SEARCH string flag* | CREATE item_opt* | ADD uid item_opt*
//!                   | EDIT uid item_opt* )
//! item_opt  := -n string | -t name | -f name value | -d name | -no text | -m
//! flag      := -n | -t | -fn | -fv | -no
//! field_cmd := FIELD ( LIST | COUNT | DUMP | SEARCH string | ADD name [-s] | DELETE name )
//! tag_cmd   := TAG ( LIST | COUNT | DUMP | ADD name | RENAME name name | DELETE name )
//! db_cmd    := [DATABASE] ( NEW | CREATE | READ ) [filename] | WRITE | EXPORT filename | DUMP
//! ```
//!
//! The whole line must be consumed. A command is only returned once it parsed
//! completely, so a bad line never executes anything.

use crate::error::{PwdbError, Result};
use crate::lexer::{tokenize, Keyword, Literal, Switch, Token};
use crate::model::FieldValue;
use crate::store::{ItemChanges, SearchFlags};
use crate::uid::Uid;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Item(ItemCommand),
    Field(FieldCommand),
    Tag(TagCommand),
    Database(DatabaseCommand),
    Report,
    Quit,
    Empty,
}

/// Options shared by `item create`, `item add` and `item edit`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemOptions {
    pub changes: ItemChanges,
    /// `-m`: ask the shell for a multi-line note.
    pub prompt_note: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemCommand {
    List,
    Count,
    Print { uid: Uid, show_sensitive: bool },
    Dump(Uid),
    Delete(Uid),
    Search { pattern: String, flags: SearchFlags },
    Create(ItemOptions),
    Add { uid: Uid, options: ItemOptions },
    Edit { uid: Uid, options: ItemOptions },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldCommand {
    List,
    Count,
    Dump,
    Search(String),
    Add { name: String, sensitive: bool },
    Delete(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagCommand {
    List,
    Count,
    Dump,
    Add(String),
    Rename { old: String, new: String },
    Delete(String),
}

/// `None` file names fall back to the configured default database.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseCommand {
    New(Option<String>),
    Read(Option<String>),
    Write,
    Export(String),
    Dump,
}

/// Parses one input line.
pub fn parse(input: &str) -> Result<Command> {
    let mut parser = Parser::new(tokenize(input)?);
    let command = parser.command()?;
    parser.expect_eos()?;
    Ok(command)
}

static EOS: Token = Token::Eos;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&EOS)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect_eos(&mut self) -> Result<()> {
        match self.advance() {
            Token::Eos => Ok(()),
            other => Err(PwdbError::Parse(format!("unexpected {} after command", other))),
        }
    }

    fn command(&mut self) -> Result<Command> {
        match self.advance() {
            Token::Eos => Ok(Command::Empty),
            Token::Keyword(Keyword::Item) => Ok(Command::Item(self.item_command()?)),
            Token::Keyword(Keyword::Field) => Ok(Command::Field(self.field_command()?)),
            Token::Keyword(Keyword::Tag) => Ok(Command::Tag(self.tag_command()?)),
            Token::Keyword(Keyword::Report) => Ok(Command::Report),
            Token::Keyword(Keyword::Quit) => Ok(Command::Quit),
            Token::Keyword(Keyword::Database) => {
                let keyword = match self.advance() {
                    Token::Keyword(k) => k,
                    other => {
                        return Err(PwdbError::Parse(format!(
                            "expected a database command, found {}",
                            other
                        )))
                    }
                };
                self.database_command(keyword)
                    .map(|command| command.map(Command::Database))
                    .ok_or_else(|| {
                        PwdbError::Parse(format!("'{}' is not a database command", keyword))
                    })?
            }
            Token::Keyword(keyword) => match self.database_command(keyword) {
                Some(command) => Ok(Command::Database(command?)),
                None => Err(PwdbError::Parse(format!("unknown command '{}'", keyword))),
            },
            other => Err(PwdbError::Parse(format!("unknown command {}", other))),
        }
    }

    fn database_command(&mut self, keyword: Keyword) -> Option<Result<DatabaseCommand>> {
        let command = match keyword {
            Keyword::New | Keyword::Create => self.optional_filename().map(DatabaseCommand::New),
            Keyword::Read => self.optional_filename().map(DatabaseCommand::Read),
            Keyword::Write => Ok(DatabaseCommand::Write),
            Keyword::Export => self.filename().map(DatabaseCommand::Export),
            Keyword::Dump => Ok(DatabaseCommand::Dump),
            _ => return None,
        };
        Some(command)
    }

    fn subcommand(&mut self, what: &str) -> Result<Keyword> {
        match self.advance() {
            Token::Keyword(k) => Ok(k),
            other => Err(PwdbError::Parse(format!(
                "expected a {} subcommand, found {}",
                what, other
            ))),
        }
    }

    fn invalid_subcommand(what: &str, keyword: Keyword) -> PwdbError {
        PwdbError::Parse(format!("invalid {} subcommand '{}'", what, keyword))
    }

    fn item_command(&mut self) -> Result<ItemCommand> {
        let keyword = self.subcommand("item")?;
        let command = match keyword {
            Keyword::List => ItemCommand::List,
            Keyword::Count => ItemCommand::Count,
            Keyword::Print => {
                let uid = self.uid()?;
                let show_sensitive = self.eat_switch(Switch::Sensitive);
                ItemCommand::Print {
                    uid,
                    show_sensitive,
                }
            }
            Keyword::Dump => ItemCommand::Dump(self.uid()?),
            Keyword::Delete => ItemCommand::Delete(self.uid()?),
            Keyword::Search => {
                let pattern = self.string("search pattern")?;
                let flags = self.search_flags()?;
                ItemCommand::Search { pattern, flags }
            }
            Keyword::Create => {
                let options = self.item_options()?;
                if options.changes.name.is_none() {
                    return Err(PwdbError::Parse(
                        "item create needs a name (-n)".to_string(),
                    ));
                }
                ItemCommand::Create(options)
            }
            Keyword::Add => {
                let uid = self.uid()?;
                let options = self.item_options()?;
                ItemCommand::Add { uid, options }
            }
            Keyword::Edit => {
                let uid = self.uid()?;
                let options = self.item_options()?;
                ItemCommand::Edit { uid, options }
            }
            other => return Err(Self::invalid_subcommand("item", other)),
        };
        Ok(command)
    }

    fn field_command(&mut self) -> Result<FieldCommand> {
        let keyword = self.subcommand("field")?;
        let command = match keyword {
            Keyword::List => FieldCommand::List,
            Keyword::Count => FieldCommand::Count,
            Keyword::Dump => FieldCommand::Dump,
            Keyword::Search => FieldCommand::Search(self.string("search pattern")?),
            Keyword::Add => {
                let name = self.identifier("field name")?;
                let sensitive = self.eat_switch(Switch::Sensitive);
                FieldCommand::Add { name, sensitive }
            }
            Keyword::Delete => FieldCommand::Delete(self.identifier("field name")?),
            other => return Err(Self::invalid_subcommand("field", other)),
        };
        Ok(command)
    }

    fn tag_command(&mut self) -> Result<TagCommand> {
        let keyword = self.subcommand("tag")?;
        let command = match keyword {
            Keyword::List => TagCommand::List,
            Keyword::Count => TagCommand::Count,
            Keyword::Dump => TagCommand::Dump,
            Keyword::Add => TagCommand::Add(self.identifier("tag name")?),
            Keyword::Rename => {
                let old = self.identifier("tag name")?;
                let new = self.identifier("new tag name")?;
                TagCommand::Rename { old, new }
            }
            Keyword::Delete => TagCommand::Delete(self.identifier("tag name")?),
            other => return Err(Self::invalid_subcommand("tag", other)),
        };
        Ok(command)
    }

    fn item_options(&mut self) -> Result<ItemOptions> {
        let mut options = ItemOptions::default();
        let changes = &mut options.changes;
        loop {
            let switch = match self.peek() {
                Token::Eos => break,
                Token::Switch(s) => *s,
                other => {
                    return Err(PwdbError::Parse(format!(
                        "expected an item option, found {}",
                        other
                    )))
                }
            };
            self.advance();
            match switch {
                Switch::Name => changes.name = Some(self.string("item name")?),
                Switch::Tag => changes.tags.push(self.identifier("tag name")?),
                Switch::Field => {
                    let name = self.identifier("field name")?;
                    let value = self.value()?;
                    changes.fields.push((name, value));
                }
                Switch::DeleteField => changes.deleted_fields.push(self.identifier("field name")?),
                Switch::Note => changes.note = Some(self.value()?.to_string()),
                Switch::MultilineNote => options.prompt_note = true,
                other => {
                    return Err(PwdbError::Parse(format!(
                        "'{}' is not an item option",
                        other.as_str()
                    )))
                }
            }
        }
        if options.prompt_note && options.changes.note.is_some() {
            return Err(PwdbError::Parse("-no and -m cannot be combined".to_string()));
        }
        Ok(options)
    }

    fn search_flags(&mut self) -> Result<SearchFlags> {
        let mut flags = SearchFlags::default();
        loop {
            match self.peek() {
                Token::Eos => break,
                Token::Switch(Switch::Name) => flags.name = true,
                Token::Switch(Switch::Tag) => flags.tag = true,
                Token::Switch(Switch::FieldName) => flags.field_name = true,
                Token::Switch(Switch::FieldValue) => flags.field_value = true,
                Token::Switch(Switch::Note) => flags.note = true,
                other => {
                    return Err(PwdbError::Parse(format!(
                        "expected a search flag, found {}",
                        other
                    )))
                }
            }
            self.advance();
        }
        Ok(flags)
    }

    fn eat_switch(&mut self, switch: Switch) -> bool {
        if self.peek() == &Token::Switch(switch) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn uid(&mut self) -> Result<Uid> {
        match self.advance() {
            Token::Value(Literal::Integer(n)) if n >= 0 => Ok(n as Uid),
            other => Err(PwdbError::Parse(format!("expected a uid, found {}", other))),
        }
    }

    /// STRING, NAME or a bare file-like word.
    fn string(&mut self, what: &str) -> Result<String> {
        match self.advance() {
            Token::Str(s) | Token::Name(s) | Token::File(s) => Ok(s),
            other => Err(PwdbError::Parse(format!("expected {}, found {}", what, other))),
        }
    }

    /// Field and tag names: NAME or a quoted STRING.
    fn identifier(&mut self, what: &str) -> Result<String> {
        match self.advance() {
            Token::Name(s) | Token::Str(s) => Ok(s),
            other => Err(PwdbError::Parse(format!("expected {}, found {}", what, other))),
        }
    }

    fn value(&mut self) -> Result<FieldValue> {
        match self.advance() {
            Token::Str(s) | Token::Name(s) | Token::File(s) => Ok(FieldValue::Text(s)),
            Token::Value(Literal::Integer(n)) => Ok(FieldValue::Integer(n)),
            Token::Value(Literal::Float(x)) => Ok(FieldValue::Float(x)),
            Token::Value(Literal::Date(d)) => Ok(FieldValue::Text(d)),
            other => Err(PwdbError::Parse(format!("expected a value, found {}", other))),
        }
    }

    fn filename(&mut self) -> Result<String> {
        self.string("a file name")
    }

    fn optional_filename(&mut self) -> Result<Option<String>> {
        match self.peek() {
            Token::Eos => Ok(None),
            _ => self.filename().map(Some),
        }
    }
}
