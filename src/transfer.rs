// JSON/CSV export and JSON import for the task collection

use crate::error::{Result, StoreError};
use crate::models::Task;
use serde_json::Value;

/// Download name for JSON exports.
pub const JSON_EXPORT_NAME: &str = "tarefas.json";
/// Download name for CSV exports.
pub const CSV_EXPORT_NAME: &str = "tarefas.csv";

const CSV_HEADER: &str = "id,text,completed,category,priority,dueDate,createdAt";

/// Serialize the full collection as pretty-printed JSON.
pub fn to_json(tasks: &[Task]) -> Result<String> {
    Ok(serde_json::to_string_pretty(tasks)?)
}

/// Serialize the full collection as CSV.
///
/// Only `text` is quoted, with embedded double quotes doubled; the other
/// columns never contain commas. An absent due date becomes an empty field.
pub fn to_csv(tasks: &[Task]) -> Result<String> {
    if tasks.is_empty() {
        return Err(StoreError::EmptyExport);
    }

    let mut lines = vec![CSV_HEADER.to_string()];
    for task in tasks {
        let text = format!("\"{}\"", task.text.replace('"', "\"\""));
        let due = task
            .due_date
            .map(|d| d.to_string())
            .unwrap_or_default();
        lines.push(format!(
            "{},{},{},{},{},{},{}",
            task.id,
            text,
            task.completed,
            task.category.as_str(),
            task.priority.as_str(),
            due,
            task.created_at.to_rfc3339(),
        ));
    }

    Ok(lines.join("\n"))
}

/// Parse an imported JSON payload into task records.
///
/// The top-level value must be a sequence; anything else (or an element that
/// is not task-shaped) is an `ImportFormat` error and nothing is applied.
/// Field contents are not validated, and records may omit fields, including
/// `id` — callers assign fresh ids to records that arrive without one.
pub fn parse_import(raw: &str) -> Result<Vec<Task>> {
    let value: Value = serde_json::from_str(raw).map_err(|_| StoreError::ImportFormat)?;

    let Value::Array(items) = value else {
        return Err(StoreError::ImportFormat);
    };

    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|_| StoreError::ImportFormat))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Priority};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample_task() -> Task {
        Task {
            id: 1700000000000,
            text: "Comprar leite".to_string(),
            completed: false,
            category: Category::Personal,
            priority: Priority::High,
            due_date: None,
            created_at: Utc.with_ymd_and_hms(2026, 8, 1, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_csv_header_and_row() {
        let mut task = sample_task();
        task.due_date = NaiveDate::from_ymd_opt(2026, 9, 1);

        let csv = to_csv(&[task]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,text,completed,category,priority,dueDate,createdAt"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1700000000000,\"Comprar leite\",false,personal,high,2026-09-01,2026-08-01T09:30:00+00:00"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_doubles_embedded_quotes() {
        let mut task = sample_task();
        task.text = "He said \"hi\"".to_string();

        let csv = to_csv(&[task]).unwrap();
        assert!(csv.contains("\"He said \"\"hi\"\"\""));
    }

    #[test]
    fn test_csv_empty_due_date_is_empty_field() {
        let csv = to_csv(&[sample_task()]).unwrap();
        assert!(csv.contains(",high,,2026-"));
    }

    #[test]
    fn test_csv_empty_collection_rejected() {
        assert!(matches!(to_csv(&[]), Err(StoreError::EmptyExport)));
    }

    #[test]
    fn test_json_export_has_no_empty_guard() {
        assert_eq!(to_json(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_import_round_trip() {
        let tasks = vec![sample_task()];
        let json = to_json(&tasks).unwrap();

        let imported = parse_import(&json).unwrap();
        assert_eq!(imported, tasks);
    }

    #[test]
    fn test_import_rejects_non_sequence() {
        assert!(matches!(
            parse_import(r#"{"text":"not a list"}"#),
            Err(StoreError::ImportFormat)
        ));
        assert!(matches!(parse_import("not json"), Err(StoreError::ImportFormat)));
        assert!(matches!(parse_import("42"), Err(StoreError::ImportFormat)));
    }

    #[test]
    fn test_import_accepts_records_without_id() {
        let imported = parse_import(r#"[{"text":"sem id"}]"#).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].id, 0);
        assert_eq!(imported[0].text, "sem id");
    }

    #[test]
    fn test_import_rejects_non_object_element() {
        assert!(matches!(
            parse_import(r#"["apenas texto"]"#),
            Err(StoreError::ImportFormat)
        ));
    }
}
