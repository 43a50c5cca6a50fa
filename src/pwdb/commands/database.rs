use super::{CmdMessage, CmdResult, Console, Session};
use crate::error::Result;
use crate::parser::DatabaseCommand;
use crate::store::report::{dump_item, dump_table};
use crate::store::Store;
use log::{info, warn};
use std::path::PathBuf;

pub fn run(
    session: &mut Session,
    command: DatabaseCommand,
    console: &mut dyn Console,
) -> Result<CmdResult> {
    match command {
        DatabaseCommand::New(file) => {
            let path = target(session, file);
            if !session.may_replace(console)? {
                return Ok(cancelled());
            }
            let store = Store::create(&path, session.cipher.clone())?;
            session.replace_store(Some(store));
            Ok(CmdResult::default().with_message(CmdMessage::success(format!(
                "Created database {}",
                path.display()
            ))))
        }
        DatabaseCommand::Read(file) => {
            let path = target(session, file);
            if !session.may_replace(console)? {
                return Ok(cancelled());
            }
            match Store::read(&path, session.cipher.clone()) {
                Ok(store) => {
                    let count = store.items().len();
                    session.replace_store(Some(store));
                    Ok(CmdResult::default().with_message(CmdMessage::success(format!(
                        "Read {} item(s) from {}",
                        count,
                        path.display()
                    ))))
                }
                Err(e) => {
                    warn!(
                        "event=db_read module=commands status=error path={} error={}",
                        path.display(),
                        e
                    );
                    session.replace_store(None);
                    Err(e)
                }
            }
        }
        DatabaseCommand::Write => {
            let path = {
                let store = session.store()?;
                store.write()?;
                store.path().to_path_buf()
            };
            session.modified = false;
            Ok(CmdResult::default().with_message(CmdMessage::success(format!(
                "Wrote {}",
                path.display()
            ))))
        }
        DatabaseCommand::Export(file) => {
            let path = PathBuf::from(file);
            session.store()?.export_plaintext(&path)?;
            Ok(CmdResult::default()
                .with_message(CmdMessage::success(format!("Exported to {}", path.display())))
                .with_message(CmdMessage::warning(
                    "The exported file is not encrypted and holds every sensitive value.",
                )))
        }
        DatabaseCommand::Dump => {
            let store = session.store()?;
            let mask = &session.options().mask;
            let mut lines = vec![format!(
                "database: file={}, encrypted={}, modified={}",
                store.path().display(),
                store.is_encrypted(),
                session.is_modified()
            )];
            lines.extend(dump_table(store.tags()));
            lines.extend(dump_table(store.fields()));
            for item in store.items().iter() {
                lines.extend(dump_item(item, store.tags(), mask, 0));
            }
            Ok(CmdResult::default().with_lines(lines))
        }
    }
}

fn target(session: &Session, file: Option<String>) -> PathBuf {
    file.map(PathBuf::from)
        .unwrap_or_else(|| session.options().default_database.clone())
}

fn cancelled() -> CmdResult {
    info!("event=db_replace module=commands status=cancelled");
    CmdResult::default().with_message(CmdMessage::info("Cancelled; unsaved changes kept."))
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use crate::cipher::{Cipher, PasswordCipher};
    use crate::commands::{Session, SessionOptions};
    use crate::error::PwdbError;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn second_create_leaves_file_alone() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());
        run_all(&mut session, &["new", "tag add x", "write"]);
        let before = fs::read(dir.path().join("pw.db")).unwrap();

        let mut console = ScriptedConsole::default();
        assert!(matches!(
            session.execute("new", &mut console),
            Err(PwdbError::AlreadyExists(_))
        ));
        assert_eq!(fs::read(dir.path().join("pw.db")).unwrap(), before);
        assert!(session.store().unwrap().tags().has_name("x"));
    }

    #[test]
    fn write_then_read_round_trip() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());
        run_all(
            &mut session,
            &[
                "new",
                "tag add work",
                "field add password -s",
                "item create -n Mail -t work -f password hunter2 -f port 993",
                "write",
            ],
        );
        assert!(!session.is_modified());

        let mut fresh = super::super::test_utils::session(dir.path());
        let results = run_all(&mut fresh, &["read", "item list", "tag list"]);
        assert_eq!(results[0].messages[0].content, format!(
            "Read 1 item(s) from {}",
            dir.path().join("pw.db").display()
        ));
        assert_eq!(results[1].listed_items[0].name, "Mail");
        assert_eq!(results[2].table_rows[0].count, 1);
    }

    #[test]
    fn replacing_unsaved_changes_asks_first() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());
        run_all(&mut session, &["new", "write", "tag add pending"]);

        let mut refuse = ScriptedConsole::default().with_answer(false);
        let result = session.execute("read", &mut refuse).unwrap();
        assert!(result.messages[0].content.starts_with("Cancelled"));
        assert!(session.store().unwrap().tags().has_name("pending"));

        let mut accept = ScriptedConsole::default().with_answer(true);
        session.execute("read", &mut accept).unwrap();
        assert!(!session.store().unwrap().tags().has_name("pending"));
        assert!(!session.is_modified());
    }

    #[test]
    fn failed_read_unloads() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());
        run_all(&mut session, &["new"]);
        let bad = dir.path().join("bad.db");
        fs::write(&bad, b"not json").unwrap();

        let mut console = ScriptedConsole::default();
        let line = format!("read {}", bad.display());
        assert!(matches!(
            session.execute(&line, &mut console),
            Err(PwdbError::MalformedDocument(_))
        ));
        assert!(!session.is_loaded());
    }

    #[test]
    fn wrong_password_is_a_decryption_error() {
        let dir = tempdir().unwrap();
        let options = SessionOptions {
            default_database: dir.path().join("pw.db"),
            mask: "*".to_string(),
        };
        let right: Arc<dyn Cipher> = Arc::new(PasswordCipher::with_params("right", 64, 1).unwrap());
        let wrong: Arc<dyn Cipher> = Arc::new(PasswordCipher::with_params("wrong", 64, 1).unwrap());

        let mut session = Session::new(Some(right), options.clone());
        run_all(&mut session, &["new", "item create -n A"]);
        run_all(&mut session, &["write"]);

        let mut other = Session::new(Some(wrong), options);
        let mut console = ScriptedConsole::default();
        assert!(matches!(
            other.execute("read", &mut console),
            Err(PwdbError::Decryption)
        ));
    }

    #[test]
    fn export_writes_plaintext() {
        let dir = tempdir().unwrap();
        let cipher: Arc<dyn Cipher> = Arc::new(PasswordCipher::with_params("pw", 64, 1).unwrap());
        let mut session = Session::new(
            Some(cipher),
            SessionOptions {
                default_database: dir.path().join("pw.db"),
                mask: "*".to_string(),
            },
        );
        let out = dir.path().join("plain.json");
        let export = format!("export {}", out.display());
        let results = run_all(
            &mut session,
            &["new", "field add pin -s", "item create -n Phone -f pin 2468", export.as_str()],
        );
        assert_eq!(results[3].messages.len(), 2);
        let text = fs::read_to_string(&out).unwrap();
        assert!(text.contains("2468"));
        assert!(!fs::read(dir.path().join("pw.db")).unwrap().starts_with(b"{"));
    }

    #[test]
    fn dump_covers_everything() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());
        let results = run_all(
            &mut session,
            &["new", "tag add t", "field add f", "item create -n I -t t -f f v", "dump"],
        );
        let lines = &results[4].lines;
        assert!(lines[0].starts_with("database: "));
        assert!(lines.iter().any(|l| l.starts_with("tag: name=t")));
        assert!(lines.iter().any(|l| l.starts_with("field: name=f")));
        assert!(lines.iter().any(|l| l.starts_with("item: ")));
    }
}
