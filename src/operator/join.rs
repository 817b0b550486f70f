use crate::{
    error::DbError,
    operator::{check_open, OpIterator},
    predicate::JoinPredicate,
    storage::{schema::Schema, tuple::Tuple},
    types::DbResult,
};

/// Nested-loop join. For each left tuple the whole right child is
/// replayed, so output order is lexicographic in (left, right)
/// iteration order.
pub struct Join {
    predicate: JoinPredicate,
    left: Box<dyn OpIterator>,
    right: Box<dyn OpIterator>,

    // left cursor position between fetch_next calls
    cur_left: Option<Tuple>,
    opened: bool,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        left: Box<dyn OpIterator>,
        right: Box<dyn OpIterator>,
    ) -> Self {
        Self {
            predicate,
            left,
            right,
            cur_left: None,
            opened: false,
        }
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> DbResult {
        self.left.open()?;
        self.right.open()?;
        self.cur_left = None;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> DbResult {
        self.opened = false;
        self.cur_left = None;
        self.left.close()?;
        self.right.close()
    }

    fn rewind(&mut self) -> DbResult {
        check_open(self.opened)?;
        self.left.rewind()?;
        self.right.rewind()?;
        self.cur_left = None;
        Ok(())
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, DbError> {
        check_open(self.opened)?;

        let mut left_tuple = match self.cur_left.take() {
            Some(t) => t,
            None => match self.left.fetch_next()? {
                Some(t) => t,
                None => return Ok(None),
            },
        };

        loop {
            while let Some(right_tuple) = self.right.fetch_next()? {
                if self.predicate.filter(&left_tuple, &right_tuple) {
                    let joined = Tuple::merge(&left_tuple, &right_tuple);
                    self.cur_left = Some(left_tuple);
                    return Ok(Some(joined));
                }
            }

            // right side exhausted: advance the left cursor and replay
            match self.left.fetch_next()? {
                Some(t) => {
                    left_tuple = t;
                    self.right.rewind()?;
                }
                None => return Ok(None),
            }
        }
    }

    fn tuple_desc(&self) -> Schema {
        Schema::merge(&self.left.tuple_desc(), &self.right.tuple_desc())
    }

    fn children(&self) -> Vec<&dyn OpIterator> {
        vec![self.left.as_ref(), self.right.as_ref()]
    }

    fn set_children(&mut self, mut children: Vec<Box<dyn OpIterator>>) -> Vec<Box<dyn OpIterator>> {
        let mut old = Vec::new();
        if let Some(right) = children.pop() {
            old.push(std::mem::replace(&mut self.right, right));
        }
        if let Some(left) = children.pop() {
            old.push(std::mem::replace(&mut self.left, left));
        }
        old.reverse();
        old
    }
}
