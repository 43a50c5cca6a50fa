use super::{CmdMessage, CmdResult, Console, FieldView, ItemSummary, ItemView, Session};
use crate::error::Result;
use crate::model::Item;
use crate::parser::{ItemCommand, ItemOptions};
use crate::store::report::dump_item;
use crate::store::{ItemChanges, Store};

pub fn run(
    session: &mut Session,
    command: ItemCommand,
    console: &mut dyn Console,
) -> Result<CmdResult> {
    match command {
        ItemCommand::List => {
            let store = session.store()?;
            let items = store.items().iter().map(|i| summary(store, i)).collect();
            Ok(CmdResult::default().with_listed_items(items))
        }
        ItemCommand::Count => {
            let count = session.store()?.items().len();
            Ok(CmdResult::default()
                .with_message(CmdMessage::info(format!("{} item(s)", count))))
        }
        ItemCommand::Print {
            uid,
            show_sensitive,
        } => {
            let store = session.store()?;
            let view = view(store, store.item(uid)?, show_sensitive, &session.options().mask)?;
            Ok(CmdResult::default().with_item(view))
        }
        ItemCommand::Dump(uid) => {
            let store = session.store()?;
            let lines = dump_item(store.item(uid)?, store.tags(), &session.options().mask, 0);
            Ok(CmdResult::default().with_lines(lines))
        }
        ItemCommand::Delete(uid) => {
            let item = session.store_mut()?.delete_item(uid)?;
            session.mark_modified();
            Ok(CmdResult::default().with_message(CmdMessage::success(format!(
                "Deleted item {} ({})",
                uid, item.name
            ))))
        }
        ItemCommand::Search { pattern, flags } => {
            let store = session.store()?;
            let items = store
                .search(&pattern, flags)?
                .into_iter()
                .map(|i| summary(store, i))
                .collect();
            Ok(CmdResult::default().with_listed_items(items))
        }
        ItemCommand::Create(options) => {
            let changes = resolve_note(options, console)?;
            let uid = session.store_mut()?.create_item(&changes)?;
            session.mark_modified();
            Ok(CmdResult::default()
                .with_message(CmdMessage::success(format!("Created item {}", uid))))
        }
        ItemCommand::Add { uid, options } => {
            let changes = resolve_note(options, console)?;
            let new_uid = session.store_mut()?.add_item_from(uid, &changes)?;
            session.mark_modified();
            Ok(CmdResult::default().with_message(CmdMessage::success(format!(
                "Created item {} from item {}",
                new_uid, uid
            ))))
        }
        ItemCommand::Edit { uid, options } => {
            let changes = resolve_note(options, console)?;
            session.store_mut()?.edit_item(uid, &changes)?;
            session.mark_modified();
            Ok(CmdResult::default()
                .with_message(CmdMessage::success(format!("Updated item {}", uid))))
        }
    }
}

fn resolve_note(options: ItemOptions, console: &mut dyn Console) -> Result<ItemChanges> {
    let mut changes = options.changes;
    if options.prompt_note {
        changes.note = Some(console.read_note()?);
    }
    Ok(changes)
}

fn tag_names(store: &Store, item: &Item) -> Vec<String> {
    item.tags
        .iter()
        .filter_map(|uid| store.tags().get_name(*uid).ok())
        .map(str::to_string)
        .collect()
}

fn summary(store: &Store, item: &Item) -> ItemSummary {
    ItemSummary {
        uid: item.uid,
        name: item.name.clone(),
        tags: tag_names(store, item),
        created_at: item.created_at,
    }
}

fn view(store: &Store, item: &Item, show_sensitive: bool, mask: &str) -> Result<ItemView> {
    let mut fields = Vec::with_capacity(item.fields.len());
    for field in item.iter_fields() {
        let masked = field.sensitive && !show_sensitive;
        let value = if masked {
            mask.to_string()
        } else {
            item.get_decrypted_value(field, store.cipher())?.to_string()
        };
        fields.push(FieldView {
            name: field.name.clone(),
            value,
            sensitive: field.sensitive,
            masked,
        });
    }
    Ok(ItemView {
        uid: item.uid,
        name: item.name.clone(),
        tags: tag_names(store, item),
        note: item.note.clone(),
        created_at: item.created_at,
        fields,
    })
}
