use super::{CmdMessage, CmdResult, Session, TableRow};
use crate::error::Result;
use crate::parser::TagCommand;
use crate::store::report::dump_table;

pub fn run(session: &mut Session, command: TagCommand) -> Result<CmdResult> {
    match command {
        TagCommand::List => {
            let rows = session
                .store()?
                .tags()
                .iter()
                .map(|e| TableRow {
                    name: e.name.clone(),
                    uid: e.uid,
                    count: e.count,
                    sensitive: None,
                })
                .collect();
            Ok(CmdResult::default().with_table_rows(rows))
        }
        TagCommand::Count => {
            let count = session.store()?.tags().len();
            Ok(CmdResult::default().with_message(CmdMessage::info(format!("{} tag(s)", count))))
        }
        TagCommand::Dump => {
            let lines = dump_table(session.store()?.tags());
            Ok(CmdResult::default().with_lines(lines))
        }
        TagCommand::Add(name) => {
            let uid = session.store_mut()?.add_tag(&name)?;
            session.mark_modified();
            Ok(CmdResult::default()
                .with_message(CmdMessage::success(format!("Added tag '{}' ({})", name, uid))))
        }
        TagCommand::Rename { old, new } => {
            session.store_mut()?.rename_tag(&old, &new)?;
            if old != new {
                session.mark_modified();
            }
            Ok(CmdResult::default().with_message(CmdMessage::success(format!(
                "Renamed tag '{}' to '{}'",
                old, new
            ))))
        }
        TagCommand::Delete(name) => {
            session.store_mut()?.delete_tag(&name)?;
            session.mark_modified();
            Ok(CmdResult::default()
                .with_message(CmdMessage::success(format!("Deleted tag '{}'", name))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use crate::error::PwdbError;
    use tempfile::tempdir;

    #[test]
    fn rename_keeps_item_references() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());
        let results = run_all(
            &mut session,
            &[
                "new",
                "tag add fin",
                "item create -n Bank -t fin",
                "tag ren fin finance",
                "item list",
                "tag list",
            ],
        );
        assert_eq!(results[4].listed_items[0].tags, vec!["finance"]);
        assert_eq!(results[5].table_rows[0].name, "finance");
        assert_eq!(results[5].table_rows[0].count, 1);
        assert_eq!(results[5].table_rows[0].sensitive, None);
    }

    #[test]
    fn delete_only_when_unused() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());
        run_all(&mut session, &["new", "tag add work", "item create -n Mail -t work"]);
        let mut console = ScriptedConsole::default();
        assert!(matches!(
            session.execute("tag del work", &mut console),
            Err(PwdbError::InUse { .. })
        ));

        let uid = session.store().unwrap().items().iter().next().unwrap().uid;
        let delete = format!("item delete {}", uid);
        let results = run_all(&mut session, &[delete.as_str(), "tag del work", "tag count"]);
        assert_eq!(results[2].messages[0].content, "0 tag(s)");
    }

    #[test]
    fn rename_to_same_name_changes_nothing() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());
        run_all(&mut session, &["new", "tag add home", "write"]);
        let results = run_all(&mut session, &["tag rename home home", "tag list"]);
        assert_eq!(results[0].messages[0].content, "Renamed tag 'home' to 'home'");
        assert!(!session.is_modified());
        assert_eq!(results[1].table_rows[0].name, "home");
    }

    #[test]
    fn unknown_tag_errors() {
        let dir = tempdir().unwrap();
        let mut session = session(dir.path());
        run_all(&mut session, &["new", "tag add a", "tag add b"]);
        let mut console = ScriptedConsole::default();
        assert!(matches!(
            session.execute("tag rename missing x", &mut console),
            Err(PwdbError::NotFound(_))
        ));
        assert!(matches!(
            session.execute("tag rename a b", &mut console),
            Err(PwdbError::DuplicateName(_))
        ));
        assert!(matches!(
            session.execute("item create -n X -t nope", &mut console),
            Err(PwdbError::NotFound(_))
        ));
        assert!(session.store().unwrap().items().is_empty());
    }
}
