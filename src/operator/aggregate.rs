use std::{collections::BTreeMap, fmt};

use crate::{
    error::DbError,
    operator::{check_open, OpIterator},
    storage::{
        schema::{FieldItem, Schema, Type},
        tuple::{Cell, Tuple},
    },
    types::DbResult,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AggOp::Min => "min",
            AggOp::Max => "max",
            AggOp::Sum => "sum",
            AggOp::Avg => "avg",
            AggOp::Count => "count",
        };
        write!(f, "{}", name)
    }
}

/// Accumulates child tuples group by group, then emits one result
/// tuple per group. With grouping the key is `Some(cell)` and the
/// ordered map yields groups in ascending key order; without grouping
/// everything lands under the single `None` key.
trait Aggregator {
    fn merge_tuple(&mut self, tuple: &Tuple) -> DbResult;
    fn output(&self, desc: &Schema) -> Vec<Tuple>;
}

#[derive(Default, Clone, Copy)]
struct IntAggState {
    count: i64,
    sum: i64,
    min: i32,
    max: i32,
}

struct IntAggregator {
    group_field: Option<usize>,
    agg_field: usize,
    op: AggOp,
    groups: BTreeMap<Option<Cell>, IntAggState>,
}

impl IntAggregator {
    fn new(group_field: Option<usize>, agg_field: usize, op: AggOp) -> Self {
        Self {
            group_field,
            agg_field,
            op,
            groups: BTreeMap::new(),
        }
    }
}

impl Aggregator for IntAggregator {
    fn merge_tuple(&mut self, tuple: &Tuple) -> DbResult {
        let value = match tuple.get_cell(self.agg_field) {
            Cell::Int(v) => v,
            other => {
                return Err(DbError::TypeMismatch(format!(
                    "integer aggregate over non-integer cell {}",
                    other
                )))
            }
        };

        let key = self.group_field.map(|g| tuple.get_cell(g));
        let state = self.groups.entry(key).or_insert(IntAggState {
            count: 0,
            sum: 0,
            min: i32::MAX,
            max: i32::MIN,
        });

        state.count += 1;
        state.sum += value as i64;
        state.min = state.min.min(value);
        state.max = state.max.max(value);
        Ok(())
    }

    fn output(&self, desc: &Schema) -> Vec<Tuple> {
        self.groups
            .iter()
            .map(|(key, state)| {
                let value = match self.op {
                    AggOp::Min => state.min,
                    AggOp::Max => state.max,
                    AggOp::Sum => state.sum as i32,
                    AggOp::Avg => {
                        if state.count == 0 {
                            0
                        } else {
                            (state.sum / state.count) as i32
                        }
                    }
                    AggOp::Count => state.count as i32,
                };

                let cells = match key {
                    Some(group) => vec![group.clone(), Cell::Int(value)],
                    None => vec![Cell::Int(value)],
                };
                Tuple::new(desc, &cells)
            })
            .collect()
    }
}

/// Counts are the only aggregate defined over strings.
struct StringAggregator {
    group_field: Option<usize>,
    groups: BTreeMap<Option<Cell>, i64>,
}

impl StringAggregator {
    fn new(group_field: Option<usize>, op: AggOp) -> Result<Self, DbError> {
        if op != AggOp::Count {
            return Err(DbError::IllegalArgument(format!(
                "{} is not supported over string fields",
                op
            )));
        }
        Ok(Self {
            group_field,
            groups: BTreeMap::new(),
        })
    }
}

impl Aggregator for StringAggregator {
    fn merge_tuple(&mut self, tuple: &Tuple) -> DbResult {
        let key = self.group_field.map(|g| tuple.get_cell(g));
        *self.groups.entry(key).or_insert(0) += 1;
        Ok(())
    }

    fn output(&self, desc: &Schema) -> Vec<Tuple> {
        self.groups
            .iter()
            .map(|(key, count)| {
                let cells = match key {
                    Some(group) => vec![group.clone(), Cell::Int(*count as i32)],
                    None => vec![Cell::Int(*count as i32)],
                };
                Tuple::new(desc, &cells)
            })
            .collect()
    }
}

/// Grouped or scalar aggregation over one child column.
///
/// `open` drains the child completely, then serves results from an
/// immutable snapshot, which makes `rewind` a cursor reset.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggOp,

    desc: Schema,
    results: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggOp,
    ) -> Result<Self, DbError> {
        let child_desc = child.tuple_desc();
        if agg_field >= child_desc.fields_count() {
            return Err(DbError::IllegalArgument(format!(
                "aggregate field {} out of range",
                agg_field
            )));
        }
        if let Some(g) = group_field {
            if g >= child_desc.fields_count() {
                return Err(DbError::IllegalArgument(format!(
                    "group field {} out of range",
                    g
                )));
            }
        }
        if child_desc.get_field_type(agg_field) == Type::Str && op != AggOp::Count {
            return Err(DbError::IllegalArgument(format!(
                "{} is not supported over string fields",
                op
            )));
        }

        let agg_item = FieldItem::new(
            &format!("{}({})", op, child_desc.fields[agg_field].field_name),
            Type::Int,
        );
        let desc = match group_field {
            Some(g) => Schema::new(vec![child_desc.fields[g].clone(), agg_item]),
            None => Schema::new(vec![agg_item]),
        };

        Ok(Self {
            child,
            agg_field,
            group_field,
            op,
            desc,
            results: Vec::new(),
            cursor: 0,
            opened: false,
        })
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> DbResult {
        self.child.open()?;

        let child_desc = self.child.tuple_desc();
        let mut aggregator: Box<dyn Aggregator> =
            match child_desc.get_field_type(self.agg_field) {
                Type::Int => Box::new(IntAggregator::new(
                    self.group_field,
                    self.agg_field,
                    self.op,
                )),
                Type::Str => Box::new(StringAggregator::new(self.group_field, self.op)?),
            };

        while let Some(tuple) = self.child.fetch_next()? {
            aggregator.merge_tuple(&tuple)?;
        }

        self.results = aggregator.output(&self.desc);
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) -> DbResult {
        self.opened = false;
        self.results.clear();
        self.cursor = 0;
        self.child.close()
    }

    fn rewind(&mut self) -> DbResult {
        check_open(self.opened)?;
        self.cursor = 0;
        Ok(())
    }

    fn fetch_next(&mut self) -> Result<Option<Tuple>, DbError> {
        check_open(self.opened)?;

        if self.cursor < self.results.len() {
            let tuple = self.results[self.cursor].clone();
            self.cursor += 1;
            return Ok(Some(tuple));
        }
        Ok(None)
    }

    fn tuple_desc(&self) -> Schema {
        self.desc.clone()
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
