//! PostgreSQL statement text for the papers table.
//!
//! Array columns (`part_a_article`, `part_a_discussion_points`) are `text[]`,
//! `part_b_questions` is `jsonb`.

use crate::domain::model::Record;
use serde_json::Value;

const INSERT_COLUMNS: &str = "id, year, paper_number, paper_id, topic, part_a_title, part_a_source, \
part_a_article, part_a_discussion_points, part_b_questions, created_at, updated_at";

/// 單引號字串常值，None 為 NULL
pub fn quote(value: Option<&str>) -> String {
    match value {
        Some(s) => format!("'{}'", s.replace('\'', "''")),
        None => "NULL".to_string(),
    }
}

/// E'' 字串常值 (反斜線需跳脫)
pub fn quote_escaped(value: &str) -> String {
    format!("E'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

pub fn text_array(items: &[String]) -> String {
    if items.is_empty() {
        return "'{}'::text[]".to_string();
    }
    let elements: Vec<String> = items
        .iter()
        .map(|item| {
            let escaped = item
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\'', "''");
            format!("\"{}\"", escaped)
        })
        .collect();
    format!("'{{{}}}'::text[]", elements.join(","))
}

pub fn jsonb(value: &Value) -> String {
    format!("{}::jsonb", quote(Some(value.to_string().as_str())))
}

fn payload_strings(record: &Record, key: &str) -> Vec<String> {
    match record.payload.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

pub fn insert_statement(table: &str, record: &Record) -> String {
    let questions = record
        .payload
        .get("part_b_questions")
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));

    format!(
        "INSERT INTO {} ({}) VALUES ({}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {})",
        table,
        INSERT_COLUMNS,
        quote(record.id.as_deref()),
        record.year,
        quote(Some(record.paper_number.as_str())),
        quote(Some(record.paper_id.as_str())),
        quote(Some(record.topic.as_str())),
        quote(Some(record.payload_str("part_a_title").unwrap_or(""))),
        quote(Some(record.payload_str("part_a_source").unwrap_or(""))),
        text_array(&payload_strings(record, "part_a_article")),
        text_array(&payload_strings(record, "part_a_discussion_points")),
        jsonb(&questions),
        quote(record.payload_str("created_at")),
        quote(record.payload_str("updated_at")),
    )
}

/// 包在單一交易中的 INSERT
pub fn insert_transaction<'a, I>(table: &str, records: I) -> String
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut sql = String::from("BEGIN;\n");
    for record in records {
        sql.push_str(&insert_statement(table, record));
        sql.push_str(";\n");
    }
    sql.push_str("COMMIT;\n");
    sql
}

pub fn page_images_update(table: &str, db_id: &str, urls: &[String]) -> String {
    let array: Vec<String> = urls.iter().map(|url| quote_escaped(url)).collect();
    format!(
        "UPDATE {} SET page_images = ARRAY[{}] WHERE id = {};",
        table,
        array.join(", "),
        quote(Some(db_id))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_escapes_single_quotes() {
        assert_eq!(quote(Some("it's")), "'it''s'");
        assert_eq!(quote(None), "NULL");
        assert_eq!(quote_escaped(r"a\b'c"), r"E'a\\b''c'");
    }

    #[test]
    fn test_text_array() {
        assert_eq!(text_array(&[]), "'{}'::text[]");
        assert_eq!(
            text_array(&["say \"hi\"".to_string(), "it's".to_string()]),
            r#"'{"say \"hi\"","it''s"}'::text[]"#
        );
    }

    #[test]
    fn test_insert_statement() {
        let record: Record = serde_json::from_value(json!({
            "id": "uuid-1",
            "year": 2016,
            "paper_number": "4.1",
            "paper_id": "2016-4.1",
            "topic": "Teens' health",
            "part_a_title": "Title",
            "part_a_article": ["para 1", "para 2"],
            "part_b_questions": [{"number": 1, "text": "Why?"}],
            "created_at": "2024-05-01T08:00:00+00:00",
            "updated_at": "2024-05-01T08:00:00+00:00"
        }))
        .unwrap();

        let sql = insert_statement("pastpaper_papers", &record);
        assert!(sql.starts_with("INSERT INTO pastpaper_papers (id, year,"));
        assert!(sql.contains("'uuid-1', 2016, '4.1', '2016-4.1', 'Teens'' health', 'Title', ''"));
        assert!(sql.contains(r#"'{"para 1","para 2"}'::text[], '{}'::text[]"#));
        assert!(sql.contains(r#"'[{"number":1,"text":"Why?"}]'::jsonb"#));
        assert!(sql.ends_with("'2024-05-01T08:00:00+00:00')"));

        let tx = insert_transaction("pastpaper_papers", [&record]);
        assert!(tx.starts_with("BEGIN;\nINSERT INTO"));
        assert!(tx.ends_with(");\nCOMMIT;\n"));
    }

    #[test]
    fn test_page_images_update() {
        let sql = page_images_update(
            "pastpaper_papers",
            "uuid-1",
            &["/paper-images/2016/page-01.webp".to_string()],
        );
        assert_eq!(
            sql,
            "UPDATE pastpaper_papers SET page_images = ARRAY[E'/paper-images/2016/page-01.webp'] WHERE id = 'uuid-1';"
        );
    }
}
