use std::{cmp::Ordering, fmt, io::Read};

use crate::{
    heap::HeapPageID,
    io::{read_exact, Decodeable, Encodeable},
    storage::schema::{get_string_len, Schema, Type},
};

/// Stable location of a tuple: owning page plus slot index. Assigned
/// when the tuple is inserted and valid until its slot is freed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub pid: HeapPageID,
    pub slot: usize,
}

impl RecordId {
    pub fn new(pid: HeapPageID, slot: usize) -> Self {
        Self { pid, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_slot_{}", self.pid, self.slot)
    }
}

#[derive(Debug, Clone)]
pub enum Cell {
    Int(i32),
    Str(String),
}

impl Cell {
    pub fn read_from<R: Read>(reader: &mut R, t: &Type) -> Self {
        match t {
            Type::Int => Cell::Int(i32::decode_from(reader)),
            Type::Str => {
                let declared = u32::decode_from(reader) as usize;
                let payload = read_exact(reader, get_string_len());
                let len = declared.min(payload.len());
                let s = String::from_utf8_lossy(&payload[..len]).to_string();
                Cell::Str(s)
            }
        }
    }

    pub fn get_type(&self) -> Type {
        match self {
            Cell::Int(_) => Type::Int,
            Cell::Str(_) => Type::Str,
        }
    }
}

impl Encodeable for Cell {
    fn encode(&self) -> Vec<u8> {
        match self {
            Cell::Int(v) => v.encode(),
            Cell::Str(v) => {
                let cap = get_string_len();
                let mut payload = v.as_bytes().to_vec();
                payload.truncate(cap);

                let mut buf = (payload.len() as u32).encode();
                payload.resize(cap, 0);
                buf.extend_from_slice(&payload);
                buf
            }
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Cell::Int(a), Cell::Int(b)) => a.cmp(b),
            (Cell::Str(a), Cell::Str(b)) => a.cmp(b),
            // cells of different types never live in one column; give
            // them a stable order anyway so ordered maps stay total
            (Cell::Int(_), Cell::Str(_)) => Ordering::Less,
            (Cell::Str(_), Cell::Int(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Str(v) => write!(f, "{:?}", v),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Tuple {
    schema: Schema,
    cells: Vec<Cell>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(schema: &Schema, cells: &[Cell]) -> Tuple {
        Tuple {
            schema: schema.clone(),
            cells: cells.to_vec(),
            record_id: None,
        }
    }

    pub fn read_from<R: Read>(reader: &mut R, schema: &Schema) -> Tuple {
        let mut cells: Vec<Cell> = Vec::new();
        for field in &schema.fields {
            cells.push(Cell::read_from(reader, &field.field_type));
        }
        Tuple {
            schema: schema.clone(),
            cells,
            record_id: None,
        }
    }

    /// All-zero tuple of the given schema, the content of an unused slot.
    pub fn new_default(schema: &Schema) -> Tuple {
        let cells = schema
            .fields
            .iter()
            .map(|f| match f.field_type {
                Type::Int => Cell::Int(0),
                Type::Str => Cell::Str(String::new()),
            })
            .collect();
        Tuple {
            schema: schema.clone(),
            cells,
            record_id: None,
        }
    }

    pub fn new_int_tuple(value: i32, width: usize) -> Tuple {
        let schema = crate::storage::schema::simple_int_schema(width, "");
        let cells = vec![Cell::Int(value); width];
        Tuple::new(&schema, &cells)
    }

    pub fn merge(left: &Tuple, right: &Tuple) -> Tuple {
        let schema = Schema::merge(&left.schema, &right.schema);
        let mut cells = left.cells.clone();
        cells.extend(right.cells.clone());
        Tuple {
            schema,
            cells,
            record_id: None,
        }
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_cell(&self, i: usize) -> Cell {
        self.cells[i].clone()
    }

    pub fn set_cell(&mut self, i: usize, c: Cell) {
        self.cells[i] = c;
    }

    pub fn get_record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }

    pub fn equal_cells(&self, expect: &[i32]) -> bool {
        if self.cells.len() != expect.len() {
            return false;
        }
        for (i, cell) in self.cells.iter().enumerate() {
            match cell {
                Cell::Int(v) if *v == expect[i] => {}
                _ => return false,
            }
        }
        true
    }
}

impl Encodeable for Tuple {
    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for cell in &self.cells {
            bytes.extend_from_slice(&cell.encode());
        }
        bytes
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use itertools::Itertools;
        write!(f, "{{{}}}", self.cells.iter().format(", "))
    }
}
