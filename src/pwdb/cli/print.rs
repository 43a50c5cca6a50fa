use chrono::{DateTime, Utc};
use colored::Colorize;
use pwdb::commands::{CmdMessage, CmdResult, ItemSummary, ItemView, MessageLevel, TableRow};
use pwdb::store::Report;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 100;
const UID_WIDTH: usize = 6;
const TIME_WIDTH: usize = 14;

pub(super) fn print_result(result: &CmdResult) {
    if !result.listed_items.is_empty() {
        print_items(&result.listed_items);
    }
    if let Some(item) = &result.item {
        print_item(item);
    }
    if !result.table_rows.is_empty() {
        print_table_rows(&result.table_rows);
    }
    if let Some(report) = &result.report {
        print_report(report);
    }
    for line in &result.lines {
        println!("{}", line);
    }
    print_messages(&result.messages);
}

fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => println!("{}", message.content.green()),
            MessageLevel::Warning => println!("{}", message.content.yellow()),
            MessageLevel::Error => println!("{}", message.content.red()),
        }
    }
}

fn print_items(items: &[ItemSummary]) {
    for item in items {
        let uid = format!("{:>width$}  ", item.uid, width = UID_WIDTH);
        let tags = if item.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", item.tags.join(", "))
        };

        let available = LINE_WIDTH.saturating_sub(uid.width() + TIME_WIDTH);
        let name = truncate_to_width(&item.name, available.saturating_sub(tags.width()));
        let tags = truncate_to_width(&tags, available.saturating_sub(name.width()));
        let padding = available.saturating_sub(name.width() + tags.width());

        println!(
            "{}{}{}{}{}",
            uid.yellow(),
            name,
            tags.cyan(),
            " ".repeat(padding),
            format_time_ago(item.created_at).dimmed()
        );
    }
}

fn print_item(item: &ItemView) {
    println!("{} {}", item.uid.to_string().yellow(), item.name.bold());
    println!(
        "{}",
        format!(
            "created {} ({})",
            item.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            format_time_ago(item.created_at).trim_start()
        )
        .dimmed()
    );
    if !item.tags.is_empty() {
        println!("tags: {}", item.tags.join(", ").cyan());
    }

    let name_width = item.fields.iter().map(|f| f.name.width()).max().unwrap_or(0);
    for field in &item.fields {
        let padding = " ".repeat(name_width.saturating_sub(field.name.width()));
        let value = if field.masked {
            field.value.dimmed()
        } else if field.sensitive {
            field.value.red()
        } else {
            field.value.normal()
        };
        println!("  {}{}  {}", field.name, padding, value);
    }

    if !item.note.is_empty() {
        println!("--------------------------------");
        println!("{}", item.note);
    }
}

fn print_table_rows(rows: &[TableRow]) {
    let name_width = rows.iter().map(|r| r.name.width()).max().unwrap_or(0);
    for row in rows {
        let padding = " ".repeat(name_width.saturating_sub(row.name.width()));
        let marker = match row.sensitive {
            Some(true) => " sensitive".red().to_string(),
            _ => String::new(),
        };
        let uid = format!("{:>width$}", row.uid, width = UID_WIDTH);
        println!(
            "{}  {}{}  {}{}",
            uid.yellow(),
            row.name,
            padding,
            format!("used {}", row.count).dimmed(),
            marker
        );
    }
}

fn print_report(report: &Report) {
    println!("items:              {}", report.items);
    println!(
        "tags:               {} ({} unused)",
        report.tags,
        report.unused_tags.len()
    );
    println!(
        "field definitions:  {} ({} sensitive, {} unused)",
        report.field_definitions,
        report.sensitive_definitions,
        report.unused_fields.len()
    );
    println!(
        "field instances:    {} ({} sensitive)",
        report.field_instances, report.sensitive_instances
    );
    if !report.unused_tags.is_empty() {
        println!("unused tags:        {}", report.unused_tags.join(", "));
    }
    if !report.unused_fields.is_empty() {
        println!("unused fields:      {}", report.unused_fields.join(", "));
    }
    if report.dangling_tag_refs > 0 {
        println!(
            "{}",
            format!("dangling tag refs:  {}", report.dangling_tag_refs).red()
        );
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut current_width = 0;
    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }
    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let time_str = Formatter::new().convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
        assert_eq!(truncate_to_width("日本語テキスト", 5), "日本…");
    }

    #[test]
    fn time_ago_is_right_aligned() {
        let formatted = format_time_ago(Utc::now() - Duration::hours(3));
        assert_eq!(formatted.width(), TIME_WIDTH);
        assert!(formatted.ends_with("3 hours ago"));
    }
}
