//! # Table Model
//!
//! In-process view of one table with the same write rules the hosted relational store enforces.
//! Both store backends funnel their writes through here so they reject the same payloads with the
//! same messages.
//!
//! ## Rules
//! - Unknown columns are rejected.
//! - Required columns may not be null once the write is applied.
//! - Inserting an id that already exists is a unique-key violation.
//! - `created_at` columns default to the current UTC time on insert. Supplied values must parse as
//!   a timestamp and are stored as UTC RFC 3339, so they sort by instant.
//! - Ids are positive and at most [`MAX_ID`], the largest bigint key.
//! - Upsert rows without an id are assigned `max(id) + 1` here, not by the caller.
//! - An upsert batch applies entirely or not at all.
use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{
    error::StoreError,
    schema::{FieldKind, Fields, ID, Record, Resource, Row},
};

pub const MAX_ID: u64 = i64::MAX as u64;

/// Postgres style `2025-03-01 06:00:00+00`, accepted next to RFC 3339.
const SQL_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S%.f%#z";

#[derive(Debug, Clone)]
pub struct Table {
    resource: Resource,
    rows: BTreeMap<u64, Fields>,
}

impl Table {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            rows: BTreeMap::new(),
        }
    }

    pub fn from_records(resource: Resource, records: impl IntoIterator<Item = Record>) -> Self {
        Self {
            resource,
            rows: records.into_iter().map(|r| (r.id, r.fields)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn max_id(&self) -> Option<u64> {
        self.rows.keys().next_back().copied()
    }

    pub fn get(&self, id: u64) -> Option<Record> {
        self.rows.get(&id).map(|fields| Record {
            id,
            fields: fields.clone(),
        })
    }

    /// All records in the resource's list order.
    pub fn records(&self) -> Vec<Record> {
        let mut records: Vec<Record> = self
            .rows
            .iter()
            .map(|(id, fields)| Record {
                id: *id,
                fields: fields.clone(),
            })
            .collect();

        self.resource.order().sort(&mut records);
        records
    }

    pub fn insert(&mut self, mut record: Record) -> Result<Record, StoreError> {
        if record.id == 0 || record.id > MAX_ID {
            return Err(StoreError::Rejected(format!(
                "id {} is out of range for relation \"{}\"",
                record.id,
                self.resource.table()
            )));
        }

        if self.rows.contains_key(&record.id) {
            return Err(StoreError::Rejected(format!(
                "duplicate key value violates unique constraint \"{}_pkey\"",
                self.resource.table()
            )));
        }

        self.check_columns(&record.fields)?;
        self.apply_defaults(&mut record.fields)?;
        self.check_not_null(&record.fields)?;

        self.rows.insert(record.id, record.fields.clone());
        Ok(record)
    }

    /// Replaces only the supplied columns.
    pub fn update(&mut self, id: u64, mut fields: Fields) -> Result<Record, StoreError> {
        self.check_columns(&fields)?;
        self.normalize_timestamps(&mut fields)?;

        let mut merged = self
            .rows
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                table: self.resource.table(),
                id,
            })?;
        merged.extend(fields);
        self.check_not_null(&merged)?;

        self.rows.insert(id, merged.clone());
        Ok(Record { id, fields: merged })
    }

    pub fn delete(&mut self, id: u64) -> Option<Record> {
        self.rows.remove(&id).map(|fields| Record { id, fields })
    }

    /// Applies the batch to a scratch copy and swaps it in only if every row succeeds. Returns the
    /// records as written.
    pub fn upsert(&mut self, rows: Vec<Row>) -> Result<Vec<Record>, StoreError> {
        let mut scratch = self.clone();
        let mut written = Vec::with_capacity(rows.len());

        for row in rows {
            let record = match row.id {
                Some(id) if scratch.rows.contains_key(&id) => scratch.update(id, row.fields)?,
                Some(id) => scratch.insert(Record {
                    id,
                    fields: row.fields,
                })?,
                None => {
                    let id = next_id(scratch.max_id())?;
                    scratch.insert(Record {
                        id,
                        fields: row.fields,
                    })?
                }
            };
            written.push(record);
        }

        *self = scratch;
        Ok(written)
    }

    fn check_columns(&self, fields: &Fields) -> Result<(), StoreError> {
        match fields
            .keys()
            .find(|name| name.as_str() == ID || self.resource.field(name).is_none())
        {
            Some(name) if name == ID => Err(StoreError::Rejected(format!(
                "column \"{ID}\" of relation \"{}\" cannot be written as a field",
                self.resource.table()
            ))),
            Some(name) => Err(StoreError::Rejected(format!(
                "column \"{name}\" of relation \"{}\" does not exist",
                self.resource.table()
            ))),
            None => Ok(()),
        }
    }

    fn apply_defaults(&self, fields: &mut Fields) -> Result<(), StoreError> {
        for field in self.resource.fields() {
            if field.kind == FieldKind::CreatedAt {
                let value = fields.entry(field.name.to_string()).or_insert(None);
                if value.is_none() {
                    *value = Some(format_timestamp(Utc::now()));
                }
            }
        }

        self.normalize_timestamps(fields)
    }

    fn normalize_timestamps(&self, fields: &mut Fields) -> Result<(), StoreError> {
        for field in self.resource.fields() {
            if field.kind != FieldKind::CreatedAt {
                continue;
            }
            let Some(Some(raw)) = fields.get_mut(field.name) else {
                continue;
            };

            let parsed = parse_timestamp(raw).ok_or_else(|| {
                StoreError::Rejected(format!(
                    "invalid input syntax for type timestamp with time zone: \"{raw}\""
                ))
            })?;
            *raw = format_timestamp(parsed);
        }

        Ok(())
    }

    fn check_not_null(&self, fields: &Fields) -> Result<(), StoreError> {
        let missing = self
            .resource
            .fields()
            .iter()
            .filter(|field| field.required)
            .find(|field| !matches!(fields.get(field.name), Some(Some(_))));

        match missing {
            Some(field) => Err(StoreError::Rejected(format!(
                "null value in column \"{}\" of relation \"{}\" violates not-null constraint",
                field.name,
                self.resource.table()
            ))),
            None => Ok(()),
        }
    }
}

/// Next identifier after the current maximum, starting at 1.
pub fn next_id(max_id: Option<u64>) -> Result<u64, StoreError> {
    match max_id {
        None => Ok(1),
        Some(id) => id
            .checked_add(1)
            .filter(|next| *next <= MAX_ID)
            .ok_or_else(|| StoreError::Rejected(format!("no id left after {id}"))),
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, SQL_TIMESTAMP))
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Fixed-width UTC form, so string order is time order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
