use super::{CmdMessage, CmdResult, Session, TableRow};
use crate::error::Result;
use crate::parser::FieldCommand;
use crate::store::report::dump_table;
use crate::table::{FieldTable, TableEntry};

pub fn run(session: &mut Session, command: FieldCommand) -> Result<CmdResult> {
    match command {
        FieldCommand::List => {
            let fields = session.store()?.fields();
            let rows = fields.iter().map(|e| row(fields, e)).collect();
            Ok(CmdResult::default().with_table_rows(rows))
        }
        FieldCommand::Count => {
            let count = session.store()?.fields().len();
            Ok(CmdResult::default()
                .with_message(CmdMessage::info(format!("{} field(s)", count))))
        }
        FieldCommand::Dump => {
            let lines = dump_table(session.store()?.fields());
            Ok(CmdResult::default().with_lines(lines))
        }
        FieldCommand::Search(pattern) => {
            let store = session.store()?;
            let rows = store
                .search_fields(&pattern)?
                .into_iter()
                .map(|e| row(store.fields(), e))
                .collect();
            Ok(CmdResult::default().with_table_rows(rows))
        }
        FieldCommand::Add { name, sensitive } => {
            let uid = session.store_mut()?.add_field(&name, sensitive)?;
            session.mark_modified();
            let kind = if sensitive { "sensitive field" } else { "field" };
            Ok(CmdResult::default().with_message(CmdMessage::success(format!(
                "Added {} '{}' ({})",
                kind, name, uid
            ))))
        }
        FieldCommand::Delete(name) => {
            session.store_mut()?.delete_field(&name)?;
            session.mark_modified();
            Ok(CmdResult::default()
                .with_message(CmdMessage::success(format!("Deleted field '{}'", name))))
        }
    }
}

fn row(fields: &FieldTable, entry: &TableEntry) -> TableRow {
    TableRow {
        name: entry.name.clone(),
        uid: entry.uid,
        count: entry.count,
        sensitive: fields.is_sensitive(entry.uid).ok(),
    }
}
