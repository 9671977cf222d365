use std::path::Path;

use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use indicatif::ProgressBar;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};

use super::RowSink;
use crate::rows::{Record, Scalar};

impl ToSql for Scalar {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Scalar::Null => ToSqlOutput::Owned(Value::Null),
            Scalar::Integer(value) => ToSqlOutput::Owned(Value::Integer(*value)),
            Scalar::Float(value) => ToSqlOutput::Owned(Value::Real(*value)),
            Scalar::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
        })
    }
}

impl FromSql for Scalar {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Scalar::Null,
            ValueRef::Integer(value) => Scalar::Integer(value),
            ValueRef::Real(value) => Scalar::Float(value),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                Scalar::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        })
    }
}

static NULL: Scalar = Scalar::Null;

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

struct Column {
    name: String,
    sql_type: Option<&'static str>,
}

/// SQLite matches column names ignoring ASCII case.
fn column_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Columns over all records in order of first appearance, keyed by
/// `column_key`. A column keeps its first spelling and the declared type of
/// its first non-null value.
fn get_columns(records: &[Record]) -> IndexMap<String, Column> {
    let mut columns: IndexMap<String, Column> = IndexMap::new();
    for record in records {
        for (name, value) in record {
            let column = columns.entry(column_key(name)).or_insert_with(|| Column {
                name: name.clone(),
                sql_type: None,
            });
            if column.sql_type.is_none() {
                column.sql_type = value.sql_type();
            }
        }
    }
    columns
}

/// Values of `record` in column order. Of keys that differ only in case the
/// first one wins.
fn row_values<'a>(record: &'a Record, columns: &IndexMap<String, Column>) -> Vec<&'a Scalar> {
    let mut values = vec![&NULL; columns.len()];
    for (name, value) in record.iter().rev() {
        if let Some(index) = columns.get_index_of(&column_key(name)) {
            values[index] = value;
        }
    }
    values
}

fn column_definition(name: &str, sql_type: Option<&str>) -> String {
    match sql_type {
        Some(sql_type) => format!("{} {}", quote_identifier(name), sql_type),
        None => quote_identifier(name),
    }
}

/// Writes tables into an SQLite database.
pub struct SqliteSink {
    connection: rusqlite::Connection,
}

impl SqliteSink {
    pub fn open(filepath: &Path) -> anyhow::Result<Self> {
        let connection = rusqlite::Connection::open(filepath)
            .with_context(|| format!("Opening SQLite database {:?}", filepath))?;
        Ok(Self { connection })
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            connection: rusqlite::Connection::open_in_memory()?,
        })
    }

    fn existing_columns(&self, table_name: &str) -> anyhow::Result<Vec<String>> {
        let mut statement = self
            .connection
            .prepare(&format!("PRAGMA table_info({})", quote_identifier(table_name)))?;
        let names = statement
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Create `table_name` or add the columns it lacks.
    fn ensure_table(&self, table_name: &str, columns: &IndexMap<String, Column>) -> anyhow::Result<()> {
        let existing = self.existing_columns(table_name)?;
        if existing.is_empty() {
            let definitions: Vec<String> = columns
                .values()
                .map(|column| column_definition(&column.name, column.sql_type))
                .collect();
            self.connection.execute(
                &format!(
                    "CREATE TABLE {} ({})",
                    quote_identifier(table_name),
                    definitions.join(", ")
                ),
                [],
            )?;
            return Ok(());
        }
        for column in columns.values() {
            if existing.iter().any(|name| name.eq_ignore_ascii_case(&column.name)) {
                continue;
            }
            log::debug!("Adding column {} to table {}", column.name, table_name);
            self.connection.execute(
                &format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    quote_identifier(table_name),
                    column_definition(&column.name, column.sql_type)
                ),
                [],
            )?;
        }
        Ok(())
    }

    fn ensure_unique_index(&self, table_name: &str, unique_keys: &[&str]) -> anyhow::Result<()> {
        let index_name = format!("{}_{}_unique", table_name, unique_keys.join("_"));
        let key_columns: Vec<String> = unique_keys
            .iter()
            .map(|key| quote_identifier(key))
            .collect();
        self.connection.execute(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
                quote_identifier(&index_name),
                quote_identifier(table_name),
                key_columns.join(", ")
            ),
            [],
        )?;
        Ok(())
    }

    /// All rows of `table_name` in insertion order.
    pub fn read_table(&self, table_name: &str) -> anyhow::Result<Vec<Record>> {
        let columns = self.existing_columns(table_name)?;
        if columns.is_empty() {
            return Err(anyhow!("Table {} does not exist", table_name));
        }
        let mut statement = self.connection.prepare(&format!(
            "SELECT * FROM {} ORDER BY rowid",
            quote_identifier(table_name)
        ))?;
        let records = statement
            .query_map([], |row| {
                let mut record = Record::new();
                for (index, name) in columns.iter().enumerate() {
                    record.insert(name.clone(), row.get::<_, Scalar>(index)?);
                }
                Ok(record)
            })?
            .collect::<rusqlite::Result<Vec<Record>>>()?;
        Ok(records)
    }
}

impl RowSink for SqliteSink {
    fn drop_table(&mut self, table_name: &str) -> anyhow::Result<()> {
        self.connection.execute(
            &format!("DROP TABLE IF EXISTS {}", quote_identifier(table_name)),
            [],
        )?;
        Ok(())
    }

    fn save(&mut self, unique_keys: &[&str], records: &[Record], table_name: &str) -> anyhow::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let columns = get_columns(records);
        if columns.is_empty() {
            log::warn!("Records for table {} have no columns, nothing written", table_name);
            return Ok(());
        }
        for key in unique_keys {
            if !columns.contains_key(&column_key(key)) {
                return Err(anyhow!("Unique key {} is not a column of {}", key, table_name));
            }
        }
        self.ensure_table(table_name, &columns)
            .with_context(|| format!("Preparing table {}", table_name))?;
        let verb = if unique_keys.is_empty() {
            "INSERT"
        } else {
            self.ensure_unique_index(table_name, unique_keys)?;
            "INSERT OR REPLACE"
        };

        let column_names: Vec<String> = columns
            .values()
            .map(|column| quote_identifier(&column.name))
            .collect();
        let placeholders = vec!["?"; column_names.len()].join(", ");
        let sql = format!(
            "{} INTO {} ({}) VALUES ({})",
            verb,
            quote_identifier(table_name),
            column_names.join(", "),
            placeholders
        );

        log::info!("Writing {} rows to table {}", records.len(), table_name);
        // One transaction for all rows, like a bulk load.
        let transaction = self.connection.transaction()?;
        {
            let mut statement = transaction.prepare(&sql)?;
            let bar = ProgressBar::new(records.len() as u64);
            for record in records {
                statement.execute(rusqlite::params_from_iter(row_values(record, &columns)))?;
                bar.inc(1);
            }
            bar.finish_and_clear();
        }
        transaction.commit()?;
        Ok(())
    }
}
