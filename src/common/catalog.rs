use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{Arc, RwLock},
};

use log::info;

use crate::{
    common::Database,
    error::DbError,
    heap::HeapTable,
    storage::schema::{FieldItem, Schema, Type},
    types::Pod,
    utils::HandyRwLock,
};

type TableID = u32;
type TableRC = Pod<HeapTable>;

/// Registry of the tables the engine knows about, keyed by table id.
pub struct Catalog {
    tables: HashMap<TableID, TableRC>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    pub fn add_table(&mut self, table_rc: TableRC) -> TableID {
        let id = table_rc.rl().get_id();
        self.tables.insert(id, table_rc);
        id
    }

    pub fn get_table(&self, table_id: &TableID) -> Option<TableRC> {
        self.tables.get(table_id).cloned()
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<TableRC> {
        self.tables
            .values()
            .find(|t| t.rl().name == name)
            .cloned()
    }

    pub fn get_schema(&self, table_id: &TableID) -> Option<Schema> {
        self.tables
            .get(table_id)
            .map(|t| t.rl().get_schema().clone())
    }

    pub fn table_ids(&self) -> Vec<TableID> {
        self.tables.keys().cloned().collect()
    }

    /// Load table definitions from a schema file and register them.
    ///
    /// One table per line:
    ///
    /// ```text
    /// path/to/data.db | id int, name string | id
    /// ```
    ///
    /// The third segment names the primary-key column and may be
    /// omitted. Returns the ids of the registered tables.
    pub fn load_schema<P: AsRef<Path>>(
        db: &Database,
        schema_path: P,
    ) -> Result<Vec<TableID>, DbError> {
        let content = fs::read_to_string(&schema_path)?;

        let mut table_ids = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let segments: Vec<&str> = line.split('|').map(str::trim).collect();
            if segments.len() < 2 {
                return Err(DbError::IllegalArgument(format!(
                    "malformed schema line: {}",
                    line
                )));
            }

            let file_path = segments[0];
            let schema = parse_schema_spec(segments[1])?;
            let pkey = segments.get(2).copied().unwrap_or("");

            let name = Path::new(file_path)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| file_path.to_string());

            let table = HeapTable::new(file_path, &name, &schema, pkey)?;
            info!("loaded table {} ({}) from {}", name, table.get_id(), file_path);

            let id = db
                .mut_catalog()
                .add_table(Arc::new(RwLock::new(table)));
            table_ids.push(id);
        }

        Ok(table_ids)
    }
}

// schema spec: comma-separated `name type` pairs, type in {int, string}
fn parse_schema_spec(spec: &str) -> Result<Schema, DbError> {
    let mut fields = Vec::new();
    for part in spec.split(',') {
        let mut words = part.split_whitespace();
        let name = words.next().ok_or_else(|| {
            DbError::IllegalArgument(format!("missing field name in: {}", spec))
        })?;
        let type_word = words.next().ok_or_else(|| {
            DbError::IllegalArgument(format!("missing field type in: {}", spec))
        })?;

        fields.push(FieldItem::new(name, Type::parse(type_word)?));
    }
    Ok(Schema::new(fields))
}
