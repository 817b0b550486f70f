use std::sync::Arc;

use crate::{
    common::Database,
    error::DbError,
    heap::{HeapTable, HeapTableIterator},
    operator::{check_open, OpIterator},
    storage::{
        schema::{FieldItem, Schema},
        tuple::Tuple,
    },
    transaction::Transaction,
    types::{DbResult, Pod},
    utils::HandyRwLock,
};

/// Sequential scan over a heap table, a thin wrapper around the
/// table's page-by-page iterator. Field names in the output schema
/// are prefixed with the table alias.
pub struct SeqScan {
    db: Arc<Database>,
    tx: Transaction,
    table: Pod<HeapTable>,
    alias: String,

    iter: Option<HeapTableIterator>,
}

impl SeqScan {
    pub fn new(
        db: Arc<Database>,
        tx: &Transaction,
        table_id: u32,
        alias: &str,
    ) -> Result<Self, DbError> {
        let table = db.catalog().get_table(&table_id).ok_or_else(|| {
            DbError::InvalidRecord(format!("table {} not found", table_id))
        })?;

        Ok(Self {
            db,
            tx: *tx,
            table,
            alias: alias.to_string(),
            iter: None,
        })
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> DbResult {
        self.iter = Some(HeapTableIterator::new(
            self.db.clone(),
            &self.tx,
            self.table.clone(),
        ));
        Ok(())
    }

    fn close(&mut self) -> DbResult {
        self.iter = None;
        Ok(())
    }

    fn rewind(&mut self) -> DbResult {
        match self.iter.as_mut() {
            Some(iter) => {
                iter.rewind();
                Ok(())
            }
            None => check_open(false),
        }
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, DbError> {
        match self.iter.as_mut() {
            Some(iter) => iter.next_tuple(),
            None => {
                check_open(false)?;
                Ok(None)
            }
        }
    }

    fn tuple_desc(&self) -> Schema {
        let schema = self.table.rl().get_schema().clone();
        let fields = schema
            .fields
            .iter()
            .map(|f| FieldItem {
                field_type: f.field_type,
                field_name: format!("{}.{}", self.alias, f.field_name),
            })
            .collect();
        Schema::new(fields)
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        Vec::new()
    }

    fn set_children(&mut self, _children: Vec<Box<dyn OpIterator>>) -> Vec<Box<dyn OpIterator>> {
        Vec::new()
    }
}
