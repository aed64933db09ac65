use serde::Serialize;
use serde_json::{Map, Value};

use crate::cli::OutputFormat;
use crate::ui;

pub mod table;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => render_table(value),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

fn table_options() -> table::TableOptions {
    let prefs = ui::prefs();
    table::TableOptions {
        max_width: prefs.term_width,
        color: prefs.table_color,
    }
}

fn render_table<T: Serialize>(value: &T) -> anyhow::Result<String> {
    match serde_json::to_value(value)? {
        Value::Array(items) => Ok(render_array_table(&items)),
        Value::Object(map) => {
            let mut rows = Vec::new();
            flatten_into("", &map, &mut rows);
            Ok(table::render_entity_table(&["key", "value"], &rows, table_options()))
        }
        scalar => Ok(table::render_entity_table(
            &["value"],
            &[vec![value_to_cell(&scalar)]],
            table_options(),
        )),
    }
}

/// Nested objects become dotted keys; arrays collapse to their length.
fn flatten_into(prefix: &str, map: &Map<String, Value>, rows: &mut Vec<Vec<String>>) {
    for (key, value) in map {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(&key, inner, rows),
            Value::Array(items) => rows.push(vec![key, format!("[{} items]", items.len())]),
            other => rows.push(vec![key, value_to_cell(other)]),
        }
    }
}

/// Render a list of objects, one row each. `columns` fixes the column order;
/// when empty, the union of keys is used, sorted.
pub fn render_array_table_with(items: &[Value], columns: &[&str]) -> String {
    if items.is_empty() {
        return String::from("(no rows)");
    }

    if !items.iter().all(Value::is_object) {
        let rows = items
            .iter()
            .map(|item| vec![value_to_cell(item)])
            .collect::<Vec<_>>();
        return table::render_entity_table(&["value"], &rows, table_options());
    }

    let headers: Vec<String> = if columns.is_empty() {
        let mut headers = Vec::<String>::new();
        for map in items.iter().filter_map(Value::as_object) {
            for key in map.keys() {
                if !headers.contains(key) {
                    headers.push(key.clone());
                }
            }
        }
        headers.sort();
        headers
    } else {
        columns.iter().map(ToString::to_string).collect()
    };

    if headers.is_empty() {
        return String::from("(no columns)");
    }

    let header_refs = headers.iter().map(String::as_str).collect::<Vec<_>>();
    let rows = items
        .iter()
        .filter_map(Value::as_object)
        .map(|map| {
            headers
                .iter()
                .map(|header| {
                    map.get(header)
                        .map_or_else(|| String::from("-"), value_to_cell)
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    table::render_entity_table(&header_refs, &rows, table_options())
}

fn render_array_table(items: &[Value]) -> String {
    render_array_table_with(items, &[])
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => v.clone(),
        Value::Array(items) => format!("[{} items]", items.len()),
        other => serde_json::to_string(other).unwrap_or_else(|_| String::from("<invalid-json>")),
    }
}

#[cfg(test)]
mod tests {
    use serde::Serialize;
    use serde_json::json;

    use super::{render, render_array_table_with};
    use crate::cli::OutputFormat;

    #[derive(Serialize)]
    struct Totals {
        inserted: u32,
        updated: u32,
    }

    #[derive(Serialize)]
    struct Example {
        mode: &'static str,
        totals: Totals,
        files: Vec<u32>,
    }

    fn example() -> Example {
        Example {
            mode: "full",
            totals: Totals {
                inserted: 3,
                updated: 1,
            },
            files: vec![1, 2],
        }
    }

    #[test]
    fn json_render_is_valid_json() {
        let out = render(&example(), OutputFormat::Json).expect("json render should work");
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("json should parse");
        assert_eq!(parsed["mode"], "full");
        assert_eq!(parsed["totals"]["inserted"], 3);
    }

    #[test]
    fn raw_render_is_single_line_json() {
        let out = render(&example(), OutputFormat::Raw).expect("raw render should work");
        assert!(!out.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("json should parse");
        assert_eq!(parsed["totals"]["updated"], 1);
    }

    #[test]
    fn table_render_flattens_nested_counts() {
        let out = render(&example(), OutputFormat::Table).expect("table render should work");
        assert!(out.lines().next().is_some_and(|line| line.contains("key")));
        assert!(out.contains("totals.inserted"));
        assert!(out.contains("totals.updated"));
        assert!(out.contains("[2 items]"));
    }

    #[test]
    fn array_table_respects_column_order() {
        let items = vec![
            json!({"file": "20250928.xlsx", "status": "committed", "inserted": 3}),
            json!({"file": "20250929.xlsx", "status": "failed", "inserted": 0}),
        ];
        let out = render_array_table_with(&items, &["file", "status", "inserted"]);
        let header = out.lines().next().unwrap();
        let file_at = header.find("file").unwrap();
        let status_at = header.find("status").unwrap();
        let inserted_at = header.find("inserted").unwrap();
        assert!(file_at < status_at && status_at < inserted_at);
        assert_eq!(out.lines().count(), 4);
    }

    #[test]
    fn empty_array_has_placeholder() {
        assert_eq!(render_array_table_with(&[], &[]), "(no rows)");
    }
}
