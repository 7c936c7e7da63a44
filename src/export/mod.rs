use crate::date;
use crate::store::Document;
use serde_json::{json, Map, Value};
use time::macros::format_description;
use time::Date;

pub const CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Renders uniform records as CSV. The header is taken from the keys of the first record,
/// values missing from later records are left empty. Returns `None` for empty input.
pub fn to_csv(records: &[Map<String, Value>]) -> Option<String> {
    let headers: Vec<&String> = records.first()?.keys().collect();
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|it| escape(it))
            .collect::<Vec<_>>()
            .join(","),
    );
    for record in records {
        let cells: Vec<String> = headers
            .iter()
            .map(|header| record.get(header.as_str()).map(cell).unwrap_or_default())
            .collect();
        lines.push(cells.join(","));
    }
    Some(lines.join("\n"))
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => escape(s),
        Value::Number(_) | Value::Bool(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => escape(&value.to_string()),
    }
}

fn escape(text: &str) -> String {
    if text.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

pub fn filename(name: &str, today: Date) -> String {
    let date = today
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| today.to_string());
    format!("{name}_{date}.csv")
}

/// Flattens documents into exportable records, id first. Children get their age in full
/// years next to the stored fields.
pub fn records(collection: &str, documents: &[Document], today: Date) -> Vec<Map<String, Value>> {
    documents
        .iter()
        .map(|doc| {
            let mut record = Map::new();
            record.insert("id".into(), json!(doc.id));
            // the document id wins over a stored field of the same name
            for (key, value) in doc.fields.iter().filter(|(key, _)| key.as_str() != "id") {
                record.insert(key.clone(), value.clone());
            }
            if collection == "children" {
                let age = doc
                    .fields
                    .get("dateOfBirth")
                    .and_then(date::normalize)
                    .map(|dob| json!(date::age_in_years(dob.date(), today)))
                    .unwrap_or(Value::Null);
                record.insert("age".into(), age);
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod test {
    use crate::store::Document;
    use serde_json::{json, Map, Value};
    use time::macros::date;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn to_csv() {
        let csv = super::to_csv(&[record(json!({"name": "A,B", "age": 5}))]);
        assert_eq!(Some("name,age\n\"A,B\",5".to_string()), csv);
    }

    #[test]
    fn quotes_are_doubled() {
        let csv = super::to_csv(&[record(json!({"quote": "He said \"hi\""}))]);
        assert_eq!(Some("quote\n\"He said \"\"hi\"\"\"".to_string()), csv);
    }

    #[test]
    fn empty_input_produces_nothing() {
        assert_eq!(None, super::to_csv(&[]));
    }

    #[test]
    fn header_comes_from_first_record() {
        let csv = super::to_csv(&[
            record(json!({"a": 1, "b": true})),
            record(json!({"b": null, "c": "x"})),
            record(json!({"a": [1, 2], "b": "line\nbreak"})),
        ]);
        assert_eq!(
            Some("a,b\n1,true\n,\n\"[1,2]\",\"line\nbreak\"".to_string()),
            csv
        );
    }

    #[test]
    fn filename() {
        assert_eq!(
            "children_2024-03-05.csv",
            super::filename("children", date!(2024 - 03 - 05))
        );
    }

    #[test]
    fn children_get_an_age() {
        let docs = vec![
            Document::mock("children", "c1", json!({"name": "Asha", "dateOfBirth": "2020-06-01"})),
            Document::mock("children", "c2", json!({"name": "Ravi"})),
        ];
        let records = super::records("children", &docs, date!(2024 - 03 - 05));
        assert_eq!(json!("c1"), records[0]["id"]);
        assert_eq!(json!(3), records[0]["age"]);
        assert_eq!(Value::Null, records[1]["age"]);
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(vec!["id", "name", "dateOfBirth", "age"], keys);
        let records = super::records("facilities", &docs, date!(2024 - 03 - 05));
        assert!(!records[0].contains_key("age"));
    }

    #[test]
    fn stored_id_field_does_not_replace_document_id() {
        let docs = vec![Document::mock(
            "facilities",
            "f1",
            json!({"name": "North", "id": "legacy-7"}),
        )];
        let records = super::records("facilities", &docs, date!(2024 - 03 - 05));
        assert_eq!(json!("f1"), records[0]["id"]);
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(vec!["id", "name"], keys);
    }
}
