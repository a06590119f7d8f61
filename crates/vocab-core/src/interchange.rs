//! Bulk import payloads, export rendering and dictionary conversion

use std::io::Read;

use serde_json::{Map, Value};

use crate::error::{Result, VocabError};
use crate::model::{Dictionary, WordRecord};

const UTF8_BOM: &str = "\u{feff}";

/// Export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

/// Items of a JSON import payload. The payload must be an array.
pub fn parse_json_payload(bytes: &[u8]) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| VocabError::BadRequest(format!("invalid JSON: {}", e)))?;
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(VocabError::BadRequest("JSON payload must be a list".to_string())),
    }
}

/// Rows of a CSV import payload as JSON objects keyed by header name.
/// All values stay strings; the merge engine coerces counters.
pub fn parse_csv_payload(bytes: &[u8]) -> Result<Vec<Value>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| VocabError::BadRequest(format!("CSV is not UTF-8: {}", e)))?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| VocabError::BadRequest(format!("invalid CSV header: {}", e)))?
        .clone();

    let mut items = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| VocabError::BadRequest(format!("invalid CSV row: {}", e)))?;
        let obj: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(k, v)| (k.trim().to_string(), Value::String(v.to_string())))
            .collect();
        items.push(Value::Object(obj));
    }
    Ok(items)
}

/// Render the full record set as pretty JSON.
pub fn export_json(records: &[WordRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).map_err(|e| VocabError::Encoding(e.to_string()))
}

/// Render the full record set as CSV with a BOM for spreadsheet tools.
pub fn export_csv(records: &[WordRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(UTF8_BOM.as_bytes().to_vec());
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| VocabError::Encoding(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| VocabError::Encoding(e.to_string()))
}

/// Build the reference dictionary from an ECDICT-style CSV with `word` and
/// `translation` columns.
pub fn convert_dictionary_csv<R: Read>(reader: R) -> Result<Dictionary> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = reader
        .headers()
        .map_err(|e| VocabError::BadRequest(format!("invalid CSV header: {}", e)))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let word_col = column("word")
        .ok_or_else(|| VocabError::BadRequest("missing 'word' column".to_string()))?;
    let translation_col = column("translation");

    let mut dict = Dictionary::new();
    let mut skipped = 0usize;
    for row in reader.records() {
        let row = row.map_err(|e| VocabError::BadRequest(format!("invalid CSV row: {}", e)))?;
        let word = clean_headword(row.get(word_col).unwrap_or_default());
        let translation = translation_col
            .and_then(|i| row.get(i))
            .unwrap_or_default()
            .trim();
        if word.is_empty() || translation.is_empty() {
            skipped += 1;
            continue;
        }
        dict.insert(word, clean_translation(translation));
    }

    tracing::info!("Converted {} dictionary entries ({} skipped)", dict.len(), skipped);
    Ok(dict)
}

fn clean_headword(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .trim_matches('\'')
        .trim_matches('"')
        .to_string()
}

fn clean_translation(raw: &str) -> String {
    let joined = raw.replace('\n', "；").replace('\r', "");
    let joined = joined.trim();
    joined.strip_suffix('；').unwrap_or(joined).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ADDED_BY_BATCH, ADDED_BY_MANUAL};

    #[test]
    fn test_json_payload_must_be_a_list() {
        assert_eq!(parse_json_payload(br#"[{"word": "cat"}]"#).unwrap().len(), 1);
        assert!(matches!(
            parse_json_payload(br#"{"word": "cat"}"#),
            Err(VocabError::BadRequest(_))
        ));
        assert!(matches!(parse_json_payload(b"[{"), Err(VocabError::BadRequest(_))));
    }

    #[test]
    fn test_csv_payload_rows_become_objects() {
        let csv = "\u{feff}word,definition,count\ncat,貓,3\ndog,,\n";
        let items = parse_csv_payload(csv.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["word"], "cat");
        assert_eq!(items[0]["definition"], "貓");
        assert_eq!(items[0]["count"], "3");
        assert_eq!(items[1]["definition"], "");
    }

    #[test]
    fn test_csv_payload_rejects_invalid_utf8() {
        assert!(matches!(
            parse_csv_payload(&[0xff, 0xfe, 0x00]),
            Err(VocabError::BadRequest(_))
        ));
    }

    #[test]
    fn test_export_csv_has_bom_and_header() {
        let records = vec![
            WordRecord::new("cat", "貓", ADDED_BY_MANUAL),
            WordRecord::new("dog", "a, b", ADDED_BY_BATCH),
        ];
        let bytes = export_csv(&records).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "\u{feff}word,definition,reviewed,count,added_by\ncat,貓,0,1,manual\ndog,\"a, b\",0,1,batch\n"
        );
    }

    #[test]
    fn test_export_csv_round_trips_through_import_parser() {
        let records = vec![WordRecord::new("cat", "貓", ADDED_BY_MANUAL)];
        let items = parse_csv_payload(&export_csv(&records).unwrap()).unwrap();
        assert_eq!(items[0]["word"], "cat");
        assert_eq!(items[0]["reviewed"], "0");
    }

    #[test]
    fn test_convert_dictionary_csv() {
        let csv = "word,phonetic,translation\n\
                   'Apple',,\"n. 蘋果\nn. 蘋果樹\n\"\n\
                   banana,,\n\
                   ,,n. 空\n\
                   \"Cherry\",,n. 櫻桃\r\n";
        let dict = convert_dictionary_csv(csv.as_bytes()).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict["apple"], "n. 蘋果；n. 蘋果樹");
        assert_eq!(dict["cherry"], "n. 櫻桃");
    }

    #[test]
    fn test_convert_requires_word_column() {
        let err = convert_dictionary_csv("term,translation\na,b\n".as_bytes()).unwrap_err();
        assert!(matches!(err, VocabError::BadRequest(_)));
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!(ExportFormat::parse("CSV"), Some(ExportFormat::Csv));
        assert_eq!(ExportFormat::parse("json"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("xml"), None);
    }
}
