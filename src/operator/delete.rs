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

/// Deletes every child tuple through the buffer pool (the tuples must
/// carry record ids, as scan output does), then yields a single tuple
/// holding the number of deleted rows.
pub struct Delete {
    db: Arc<Database>,
    tx: Transaction,
    child: Box<dyn OpIterator>,

    done: bool,
    opened: bool,
}

impl Delete {
    pub fn new(db: Arc<Database>, tx: &Transaction, child: Box<dyn OpIterator>) -> Self {
        Self {
            db,
            tx: *tx,
            child,
            done: false,
            opened: false,
        }
    }
}

impl OpIterator for Delete {
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
            self.db
                .buffer_pool()
                .delete_tuple(&self.db, &self.tx, &tuple)?;
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
