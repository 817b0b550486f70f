use std::sync::Arc;

use crate::{
    common::Database,
    error::DbError,
    operator::{check_open, OpIterator},
    storage::{
        schema::{FieldItem, Schema, Type},
        tuple::{Cell, Tuple},
    },
    transaction::Transaction,
    types::DbResult,
};

/// Drains the child into the target table through the buffer pool,
/// then yields a single tuple holding the number of inserted rows.
pub struct Insert {
    db: Arc<Database>,
    tx: Transaction,
    child: Box<dyn OpIterator>,
    table_id: u32,

    done: bool,
    opened: bool,
}

impl Insert {
    pub fn new(
        db: Arc<Database>,
        tx: &Transaction,
        child: Box<dyn OpIterator>,
        table_id: u32,
    ) -> Result<Self, DbError> {
        let table_schema = db.catalog().get_schema(&table_id).ok_or_else(|| {
            DbError::InvalidRecord(format!("table {} not found", table_id))
        })?;
        if table_schema != child.tuple_desc() {
            return Err(DbError::TypeMismatch(format!(
                "child schema does not match table {}",
                table_id
            )));
        }

        Ok(Self {
            db,
            tx: *tx,
            child,
            table_id,
            done: false,
            opened: false,
        })
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> DbResult {
        self.child.open()?;
        self.done = false;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> DbResult {
        self.opened = false;
        self.child.close()
    }

    fn rewind(&mut self) -> DbResult {
        check_open(self.opened)?;
        self.child.rewind()?;
        self.done = false;
        Ok(())
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, DbError> {
        check_open(self.opened)?;

        if self.done {
            return Ok(None);
        }

        let mut count = 0;
        while let Some(tuple) = self.child.fetch_next()? {
            let mut tuple = tuple;
            self.db
                .buffer_pool()
                .insert_tuple(&self.db, &self.tx, self.table_id, &mut tuple)?;
            count += 1;
        }

        self.done = true;
        Ok(Some(Tuple::new(&self.tuple_desc(), &[Cell::Int(count)])))
    }

    fn tuple_desc(&self) -> Schema {
        Schema::new(vec![FieldItem::new("count", Type::Int)])
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        vec![self.child.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) -> Vec<Box<dyn OpIterator>> {
        match children.pop() {
            Some(child) => {
                let old = std::mem::replace(&mut self.child, child);
                vec![old]
            }
            None => Vec::new(),
        }
    }
}
