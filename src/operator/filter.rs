use crate::{
    error::DbError,
    operator::{check_open, OpIterator},
    predicate::Predicate,
    storage::{schema::Schema, tuple::Tuple},
    types::DbResult,
};

/// Yields every child tuple the predicate accepts.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
    opened: bool,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        Self {
            predicate,
            child,
            opened: false,
        }
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> DbResult {
        self.child.open()?;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> DbResult {
        self.opened = false;
        self.child.close()
    }

    fn rewind(&mut self) -> DbResult {
        check_open(self.opened)?;
        self.child.rewind()
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, DbError> {
        check_open(self.opened)?;

        while let Some(tuple) = self.child.fetch_next()? {
            if self.predicate.filter(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn tuple_desc(&self) -> Schema {
        self.child.tuple_desc()
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
