use std::collections::HashMap;

use super::RowSink;
use crate::rows::Record;

#[derive(Debug, Default)]
struct MemoryTable {
    /// First spelling of each column, by its ASCII-lowercase name.
    spellings: HashMap<String, String>,
    rows: Vec<Record>,
}

impl MemoryTable {
    fn spelling(&self, name: &str) -> Option<&String> {
        self.spellings.get(&name.to_ascii_lowercase())
    }

    /// `record` with its keys renamed to the stored spelling. Of keys that
    /// differ only in case the first one wins.
    fn fold(&mut self, record: &Record) -> Record {
        let mut folded = Record::new();
        for (name, value) in record {
            let spelling = self
                .spellings
                .entry(name.to_ascii_lowercase())
                .or_insert_with(|| name.clone())
                .clone();
            folded.entry(spelling).or_insert_with(|| value.clone());
        }
        folded
    }
}

/// Keeps saved tables in memory. Column names match ignoring ASCII case,
/// as in SQLite.
#[derive(Debug, Default)]
pub struct MemorySink {
    tables: HashMap<String, MemoryTable>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of `table_name`, empty when nothing was saved to it.
    pub fn table(&self, table_name: &str) -> &[Record] {
        self.tables
            .get(table_name)
            .map(|table| table.rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_table(&self, table_name: &str) -> bool {
        self.tables.contains_key(table_name)
    }
}

impl RowSink for MemorySink {
    fn drop_table(&mut self, table_name: &str) -> anyhow::Result<()> {
        self.tables.remove(table_name);
        Ok(())
    }

    fn save(&mut self, unique_keys: &[&str], records: &[Record], table_name: &str) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let table = self.tables.entry(table_name.to_string()).or_default();
        for record in records {
            let record = table.fold(record);
            let keys: Vec<String> = unique_keys
                .iter()
                .filter_map(|key| table.spelling(key).cloned())
                .collect();
            let existing = if keys.is_empty() {
                None
            } else {
                table
                    .rows
                    .iter()
                    .position(|row| keys.iter().all(|key| row.get(key) == record.get(key)))
            };
            match existing {
                Some(position) => table.rows[position] = record,
                None => table.rows.push(record),
            }
        }
        Ok(())
    }
}
