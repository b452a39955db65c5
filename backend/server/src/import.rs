//! # CSV Bulk Import
//!
//! Operators export spreadsheets from older tooling and upload them here to seed or refresh a table.
//!
//! ## Parsing
//! - First row is the header
//! - Rows may have more or fewer cells than the header
//! - Stray quotes inside unquoted cells are kept as text
//! - Cells are read as UTF-8, invalid bytes are replaced rather than failing the row
//! - A row the reader cannot decode at all is skipped and logged
//!
//! ## Mapping
//! - Each column is looked up by its name, then by its aliases (e.g. `youtubeLink`, `youtube_link`, `url`)
//! - The first of those headers holding a non-empty cell wins
//! - Empty cells and the literal `NULL` become null
//! - A column with none of its headers present is left out of the row, so an upsert keeps the stored value
//! - An `id` cell makes the row an update of that record when it exists, otherwise the store assigns an id
//!
//! No per-row validation runs here. Missing required columns are caught by the store's not-null
//! rule, which rejects the whole batch.
use std::collections::HashMap;

use csv::{ByteRecord, ReaderBuilder, Trim};
use tracing::{info, warn};

use crate::{
    database::Store,
    error::StoreError,
    schema::{ID, Resource, Row},
    table::MAX_ID,
};

pub const NULL_CELL: &str = "NULL";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedCsv {
    pub rows: Vec<Row>,
    pub skipped: usize,
}

pub fn parse_rows(resource: Resource, bytes: &[u8]) -> ParsedCsv {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(bytes);

    let headers: HashMap<String, usize> = match reader.byte_headers() {
        Ok(headers) => headers
            .iter()
            .enumerate()
            .map(|(index, name)| (String::from_utf8_lossy(name).into_owned(), index))
            .collect(),
        Err(e) => {
            warn!("Unreadable CSV header for {resource}: {e}");
            return ParsedCsv::default();
        }
    };

    let mut parsed = ParsedCsv::default();
    let mut record = ByteRecord::new();

    loop {
        match reader.read_byte_record(&mut record) {
            Ok(true) => {
                if record.iter().all(|cell| cell.is_empty()) {
                    continue;
                }
                parsed.rows.push(map_row(resource, &headers, &record));
            }
            Ok(false) => break,
            Err(e) => {
                warn!("Skipping malformed CSV row for {resource}: {e}");
                parsed.skipped += 1;
            }
        }
    }

    parsed
}

fn cell(headers: &HashMap<String, usize>, record: &ByteRecord, column: &str) -> Option<String> {
    let index = *headers.get(column)?;
    let value = String::from_utf8_lossy(record.get(index)?).into_owned();

    (!value.is_empty() && value != NULL_CELL).then_some(value)
}

fn map_row(resource: Resource, headers: &HashMap<String, usize>, record: &ByteRecord) -> Row {
    let mut row = Row {
        id: None,
        fields: Default::default(),
    };

    if let Some(raw) = cell(headers, record, ID) {
        match raw.trim().parse::<u64>() {
            Ok(id) if (1..=MAX_ID).contains(&id) => row.id = Some(id),
            _ => warn!("Ignoring invalid id {raw:?} in {resource} import, inserting as new"),
        }
    }

    for field in resource.fields() {
        let columns = std::iter::once(field.name).chain(field.aliases.iter().copied());
        let mut present = false;
        let mut value = None;

        for column in columns {
            if headers.contains_key(column) {
                present = true;
                value = cell(headers, record, column);
                if value.is_some() {
                    break;
                }
            }
        }

        if present {
            row.fields.insert(field.name.to_string(), value);
        }
    }

    row
}

pub struct Importer<'a> {
    store: &'a dyn Store,
}

impl<'a> Importer<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Parses and upserts the upload. Returns the number of rows written.
    pub async fn import(&self, resource: Resource, bytes: &[u8]) -> Result<usize, StoreError> {
        let parsed = parse_rows(resource, bytes);
        if parsed.skipped > 0 {
            warn!("{} rows skipped in {resource} import", parsed.skipped);
        }

        let written = self.store.upsert(resource, parsed.rows).await?;
        info!("Imported {written} rows into {}", resource.table());

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{memory::MemoryStore, schema::Record};

    #[test]
    fn test_null_cells_become_null() {
        let csv = "lead_type,name,email,phone,course,message\n\
                   Walk-in,Asha,asha@example.com,NULL,NEET,\n";
        let parsed = parse_rows(Resource::Inquiry, csv.as_bytes());

        let row = &parsed.rows[0];
        assert_eq!(row.fields.get("phone"), Some(&None));
        assert_eq!(row.fields.get("message"), Some(&None));
        assert_eq!(row.fields.get("course"), Some(&Some("NEET".into())));
        assert!(!row.fields.contains_key("created_at"));
    }

    #[test]
    fn test_alias_columns() {
        let csv = "chapter,youtube_link,category\nAtoms,https://youtu.be/abc,Chemistry\n";
        let parsed = parse_rows(Resource::RecordedVideo, csv.as_bytes());

        let row = &parsed.rows[0];
        assert_eq!(row.fields.get("chapterName"), Some(&Some("Atoms".into())));
        assert_eq!(
            row.fields.get("youtubeLink"),
            Some(&Some("https://youtu.be/abc".into()))
        );
    }

    #[test]
    fn test_primary_column_wins_over_alias() {
        let csv = "youtubeLink,url,chapterName\nhttps://youtu.be/a,https://example.com,Cells\n";
        let parsed = parse_rows(Resource::RecordedVideo, csv.as_bytes());

        assert_eq!(
            parsed.rows[0].fields.get("youtubeLink"),
            Some(&Some("https://youtu.be/a".into()))
        );
    }

    #[test]
    fn test_ragged_rows_and_stray_quotes() {
        let csv = "id,name,description,category\n\
                   1,Physics 12\"th,Mechanics\n\
                   2,Chemistry,Organic,NEET,extra\n\
                   \n";
        let parsed = parse_rows(Resource::Course, csv.as_bytes());

        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].id, Some(1));
        assert_eq!(
            parsed.rows[0].fields.get("name"),
            Some(&Some("Physics 12\"th".into()))
        );
        assert_eq!(parsed.rows[0].fields.get("category"), Some(&None));
        assert_eq!(parsed.rows[1].fields.get("category"), Some(&Some("NEET".into())));
    }

    #[test]
    fn test_invalid_id_is_treated_as_new() {
        let csv = "id,name,description,category\nabc,Maths,Algebra,JEE\n";
        let parsed = parse_rows(Resource::Course, csv.as_bytes());
        assert_eq!(parsed.rows[0].id, None);
    }

    #[test]
    fn test_id_beyond_bigint_is_treated_as_new() {
        let csv = "id,name\n9223372036854775808,A\n9223372036854775807,B\n";
        let parsed = parse_rows(Resource::Course, csv.as_bytes());

        assert_eq!(parsed.rows[0].id, None);
        assert_eq!(parsed.rows[1].id, Some(MAX_ID));
    }

    #[tokio::test]
    async fn test_huge_id_does_not_break_the_store() {
        let store = MemoryStore::new();
        let csv = "id,name,description,category\n\
                   18446744073709551615,A,d,NEET\n\
                   ,B,d,NEET\n";
        let written = Importer::new(&store)
            .import(Resource::Course, csv.as_bytes())
            .await
            .unwrap();
        assert_eq!(written, 2);

        let ids: Vec<u64> = store
            .select(Resource::Course)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_exhausted_ids_refuse_the_batch() {
        let store = MemoryStore::new();
        let csv = format!("id,name,description,category\n{MAX_ID},A,d,NEET\n,B,d,NEET\n");
        let result = Importer::new(&store)
            .import(Resource::Course, csv.as_bytes())
            .await;
        assert!(result.is_err());

        assert!(store.select(Resource::Course).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_by_id_updates_in_place() {
        let store = MemoryStore::new();
        let fields = [("name", "Old"), ("description", "d"), ("category", "NEET")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect();
        store
            .insert(Resource::Course, Record { id: 3, fields })
            .await
            .unwrap();

        let csv = "id,name\n3,New\n,Fresh\n";
        let result = Importer::new(&store).import(Resource::Course, csv.as_bytes()).await;

        // The second row has no description or category, so the batch is refused.
        assert!(result.is_err());

        let csv = "id,name\n3,New\n";
        let written = Importer::new(&store)
            .import(Resource::Course, csv.as_bytes())
            .await
            .unwrap();
        assert_eq!(written, 1);

        let records = store.select(Resource::Course).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 3);
        assert_eq!(records[0].get("name"), Some("New"));
        assert_eq!(records[0].get("category"), Some("NEET"));
    }

    #[tokio::test]
    async fn test_import_stores_null_not_string() {
        let store = MemoryStore::new();
        let csv = "name,email,phone\nRavi,ravi@example.com,NULL\n";
        Importer::new(&store)
            .import(Resource::Inquiry, csv.as_bytes())
            .await
            .unwrap();

        let records = store.select(Resource::Inquiry).await.unwrap();
        assert_eq!(records[0].fields.get("phone"), Some(&None));
    }
}
