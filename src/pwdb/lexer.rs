//! # Lexer
//!
//! Splits a command line into [`Token`]s with a three-state machine:
//!
//! - `Start`: skip whitespace; a quote opens a string, anything else a word.
//! - `Word`: collect until whitespace, then classify the word.
//! - `Quoted(delim)`: collect until the same delimiter. Whitespace and the
//!   other quote character are kept.
//!
//! Words are classified against anchored patterns in a fixed order: keywords,
//! switches, dates, floats, integers, file names, names. Anything else is
//! [`Token::Invalid`].

use crate::error::{PwdbError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Item,
    Field,
    Tag,
    Database,
    New,
    Create,
    Read,
    Write,
    Export,
    Dump,
    Report,
    Quit,
    List,
    Count,
    Print,
    Search,
    Add,
    Rename,
    Delete,
    Edit,
}

impl Keyword {
    fn lookup(word: &str) -> Option<Self> {
        let keyword = match word {
            "item" => Keyword::Item,
            "field" => Keyword::Field,
            "tag" => Keyword::Tag,
            "database" | "db" => Keyword::Database,
            "new" => Keyword::New,
            "create" => Keyword::Create,
            "read" => Keyword::Read,
            "write" | "save" => Keyword::Write,
            "export" => Keyword::Export,
            "dump" => Keyword::Dump,
            "report" => Keyword::Report,
            "quit" | "exit" | "bye" => Keyword::Quit,
            "list" => Keyword::List,
            "count" => Keyword::Count,
            "print" => Keyword::Print,
            "search" => Keyword::Search,
            "add" => Keyword::Add,
            "rename" | "ren" => Keyword::Rename,
            "delete" | "del" => Keyword::Delete,
            "edit" => Keyword::Edit,
            _ => return None,
        };
        Some(keyword)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = format!("{:?}", self).to_lowercase();
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    /// `-s`
    Sensitive,
    /// `-n`
    Name,
    /// `-t`
    Tag,
    /// `-fn`
    FieldName,
    /// `-fv`
    FieldValue,
    /// `-no`
    Note,
    /// `-f`
    Field,
    /// `-d`
    DeleteField,
    /// `-m`
    MultilineNote,
}

impl Switch {
    fn lookup(word: &str) -> Option<Self> {
        let switch = match word {
            "-s" => Switch::Sensitive,
            "-n" => Switch::Name,
            "-t" => Switch::Tag,
            "-fn" => Switch::FieldName,
            "-fv" => Switch::FieldValue,
            "-no" => Switch::Note,
            "-f" => Switch::Field,
            "-d" => Switch::DeleteField,
            "-m" => Switch::MultilineNote,
            _ => return None,
        };
        Some(switch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Switch::Sensitive => "-s",
            Switch::Name => "-n",
            Switch::Tag => "-t",
            Switch::FieldName => "-fn",
            Switch::FieldValue => "-fv",
            Switch::Note => "-no",
            Switch::Field => "-f",
            Switch::DeleteField => "-d",
            Switch::MultilineNote => "-m",
        }
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    /// `mm/yy`, `dd/mm/yy` or `dd/mm/yyyy`, kept as written.
    Date(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Date(d) => write!(f, "{}", d),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Keyword(Keyword),
    Switch(Switch),
    Value(Literal),
    Name(String),
    File(String),
    Str(String),
    Eos,
    Invalid(String),
    /// A quoted string with no closing delimiter; holds what was read.
    Unterminated(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => write!(f, "keyword '{}'", k),
            Token::Switch(s) => write!(f, "switch '{}'", s.as_str()),
            Token::Value(v) => write!(f, "value '{}'", v),
            Token::Name(n) => write!(f, "name '{}'", n),
            Token::File(p) => write!(f, "file name '{}'", p),
            Token::Str(s) => write!(f, "string \"{}\"", s),
            Token::Eos => write!(f, "end of input"),
            Token::Invalid(w) => write!(f, "invalid token '{}'", w),
            Token::Unterminated(s) => write!(f, "unterminated string \"{}\"", s),
        }
    }
}

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d\d/\d\d(/\d\d(\d\d)?)?$").expect("valid date pattern"));
static FLOAT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d*\.\d+$").expect("valid float pattern"));
static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("valid int pattern"));
static FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_~./\-]*\.[A-Za-z0-9_\-]+$").expect("valid file pattern")
});
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid name pattern"));

/// Classifies a bare (unquoted) word.
pub fn classify(word: &str) -> Token {
    if let Some(keyword) = Keyword::lookup(word) {
        return Token::Keyword(keyword);
    }
    if let Some(switch) = Switch::lookup(word) {
        return Token::Switch(switch);
    }
    if DATE_RE.is_match(word) {
        return Token::Value(Literal::Date(word.to_string()));
    }
    if FLOAT_RE.is_match(word) {
        return match word.parse() {
            Ok(x) => Token::Value(Literal::Float(x)),
            Err(_) => Token::Invalid(word.to_string()),
        };
    }
    if INT_RE.is_match(word) {
        return match word.parse() {
            Ok(n) => Token::Value(Literal::Integer(n)),
            Err(_) => Token::Invalid(word.to_string()),
        };
    }
    if FILE_RE.is_match(word) {
        return Token::File(word.to_string());
    }
    if NAME_RE.is_match(word) {
        return Token::Name(word.to_string());
    }
    Token::Invalid(word.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Word,
    Quoted(char),
}

fn is_delimiter(c: char) -> bool {
    c == '\'' || c == '"'
}

pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.trim().chars().peekable(),
            finished: false,
        }
    }

    /// Returns the next token; [`Token::Eos`] once the input is exhausted.
    pub fn next_token(&mut self) -> Token {
        let mut state = State::Start;
        let mut word = String::new();

        while let Some(c) = self.chars.next() {
            match state {
                State::Start => {
                    if c.is_whitespace() {
                        continue;
                    }
                    if is_delimiter(c) {
                        state = State::Quoted(c);
                    } else {
                        word.push(c);
                        state = State::Word;
                    }
                }
                State::Word => {
                    if c.is_whitespace() {
                        return classify(&word);
                    }
                    word.push(c);
                }
                State::Quoted(delim) => {
                    if c == delim {
                        return Token::Str(word);
                    }
                    word.push(c);
                }
            }
        }

        match state {
            State::Start => Token::Eos,
            State::Word => classify(&word),
            State::Quoted(_) => Token::Unterminated(word),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields every token up to and including [`Token::Eos`].
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token == Token::Eos {
            self.finished = true;
        }
        Some(token)
    }
}

/// Tokenizes a whole line. The result always ends with [`Token::Eos`].
/// Invalid or unterminated input is a [`PwdbError::Lex`].
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    for token in Lexer::new(input) {
        match token {
            Token::Invalid(word) => {
                return Err(PwdbError::Lex(format!("invalid token '{}'", word)));
            }
            Token::Unterminated(text) => {
                let preview: String = text.chars().take(10).collect();
                return Err(PwdbError::Lex(format!(
                    "unterminated string [{}...]",
                    preview
                )));
            }
            other => tokens.push(other),
        }
    }
    Ok(tokens)
}
