use std::{collections::HashMap, sync::Arc};

use itertools::Itertools;
use log::debug;

use crate::{
    common::Database,
    error::DbError,
    heap::HeapTableIterator,
    optimizer::histogram::IntHistogram,
    predicate::Op,
    storage::{
        schema::Type,
        tuple::Cell,
    },
    transaction::Transaction,
    utils::HandyRwLock,
};

pub const NUM_HIST_BINS: usize = 100;

/// Selectivity assumed for predicates we keep no statistics about
/// (string columns).
pub const DEFAULT_SELECTIVITY: f64 = 0.1;

/// Per-table statistics: tuple and page counts plus one histogram per
/// integer column, collected with a single scan.
pub struct TableStats {
    io_cost_per_page: usize,
    total_tuples: usize,
    num_pages: u32,
    int_hists: HashMap<usize, IntHistogram>,
}

impl TableStats {
    pub fn new(
        db: &Arc<Database>,
        tx: &Transaction,
        table_id: u32,
        io_cost_per_page: usize,
    ) -> Result<Self, DbError> {
        let table_rc = db.catalog().get_table(&table_id).ok_or_else(|| {
            DbError::InvalidRecord(format!("table {} not found", table_id))
        })?;

        let (schema, num_pages) = {
            let table = table_rc.rl();
            (table.get_schema().clone(), table.num_pages()?)
        };

        let int_fields: Vec<usize> = schema
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.field_type == Type::Int)
            .map(|(i, _)| i)
            .collect();

        // buffer the integer columns so min/max is known before the
        // histograms are sized
        let mut columns: HashMap<usize, Vec<i32>> =
            int_fields.iter().map(|i| (*i, Vec::new())).collect();

        let mut total_tuples = 0;
        let mut iter = HeapTableIterator::new(db.clone(), tx, table_rc.clone());
        while let Some(tuple) = iter.next_tuple()? {
            total_tuples += 1;
            for field in &int_fields {
                if let Cell::Int(v) = tuple.get_cell(*field) {
                    if let Some(column) = columns.get_mut(field) {
                        column.push(v);
                    }
                }
            }
        }

        let mut int_hists = HashMap::new();
        for (field, values) in columns {
            let (min, max) = match values.iter().minmax().into_option() {
                Some((min, max)) => (*min, *max),
                None => continue,
            };

            let mut hist = IntHistogram::new(NUM_HIST_BINS, min, max);
            for v in &values {
                hist.add_value(*v);
            }
            int_hists.insert(field, hist);
        }

        debug!(
            "collected stats for table {}: {} tuples, {} pages, {} histograms",
            table_id,
            total_tuples,
            num_pages,
            int_hists.len()
        );

        Ok(Self {
            io_cost_per_page,
            total_tuples,
            num_pages,
            int_hists,
        })
    }

    /// Cost of a full sequential scan of the table.
    pub fn estimate_scan_cost(&self) -> f64 {
        self.num_pages as f64 * self.io_cost_per_page as f64
    }

    /// Expected output cardinality of a scan with the given predicate
    /// selectivity.
    pub fn estimate_table_cardinality(&self, selectivity: f64) -> usize {
        (self.total_tuples as f64 * selectivity) as usize
    }

    /// Estimated fraction of tuples matching `field op constant`.
    pub fn estimate_selectivity(&self, field: usize, op: Op, constant: &Cell) -> f64 {
        match (self.int_hists.get(&field), constant) {
            (Some(hist), Cell::Int(v)) => hist.estimate_selectivity(op, *v),
            _ => DEFAULT_SELECTIVITY,
        }
    }

    pub fn total_tuples(&self) -> usize {
        self.total_tuples
    }
}
