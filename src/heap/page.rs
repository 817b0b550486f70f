use bit_vec::BitVec;

use crate::{
    error::DbError,
    heap::{buffer_pool::BufferPool, page_id::HeapPageID},
    io::{DbWriter, Encodeable},
    storage::{
        schema::Schema,
        tuple::{RecordId, Tuple},
    },
    transaction::TransactionID,
    types::DbResult,
};

/// In-memory image of one disk page.
///
/// Layout on disk: a slot-occupancy bitmap (one bit per slot, bit `i`
/// stored at position `i % 8` of header byte `i / 8`), followed by
/// `slot_count` fixed-size tuple records, followed by zero padding.
/// The bitmap is authoritative: record bytes of a free slot are
/// ignored on read and written as zeros, so serialization is
/// deterministic and round-trips byte-exactly.
pub struct HeapPage {
    pid: HeapPageID,
    schema: Schema,

    slot_count: usize,

    // indicate slots' status: true means occupied, false means empty
    header: BitVec,

    // all tuples (include empty slots)
    tuples: Vec<Tuple>,

    // page image as of the last commit point
    before_image: Vec<u8>,

    dirtier: Option<TransactionID>,
}

impl HeapPage {
    pub fn new(pid: &HeapPageID, bytes: &[u8], schema: &Schema) -> Result<Self, DbError> {
        let page_size = BufferPool::get_page_size();
        if bytes.len() != page_size {
            return Err(DbError::IllegalArgument(format!(
                "page image must be {} bytes, got {}",
                page_size,
                bytes.len()
            )));
        }

        let slot_count = Self::calculate_slots_count(schema);
        let header_size = Self::calculate_header_size(slot_count);

        let mut header = BitVec::from_elem(slot_count, false);
        for i in 0..slot_count {
            if bytes[i / 8] & (1 << (i % 8)) != 0 {
                header.set(i, true);
            }
        }

        let tuple_size = schema.get_size();
        let mut tuples = Vec::with_capacity(slot_count);
        for i in 0..slot_count {
            if header[i] {
                let start = header_size + i * tuple_size;
                let end = start + tuple_size;
                let mut reader = &bytes[start..end];
                let mut tuple = Tuple::read_from(&mut reader, schema);
                tuple.set_record_id(Some(RecordId::new(*pid, i)));
                tuples.push(tuple);
            } else {
                tuples.push(Tuple::new_default(schema));
            }
        }

        Ok(Self {
            pid: *pid,
            schema: schema.clone(),
            slot_count,
            header,
            tuples,
            before_image: bytes.to_vec(),
            dirtier: None,
        })
    }

    pub fn empty_page_data() -> Vec<u8> {
        vec![0; BufferPool::get_page_size()]
    }

    /// Retrieve the maximum number of tuples this page can hold: each
    /// slot costs one header bit on top of its record bytes.
    pub fn calculate_slots_count(schema: &Schema) -> usize {
        (BufferPool::get_page_size() * 8) / (schema.get_size() * 8 + 1)
    }

    pub fn calculate_header_size(slot_count: usize) -> usize {
        (slot_count + 7) / 8
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_slots_count(&self) -> usize {
        self.slot_count
    }

    pub fn empty_slots_count(&self) -> usize {
        self.header.iter().filter(|used| !used).count()
    }

    pub fn tuples_count(&self) -> usize {
        self.slot_count - self.empty_slots_count()
    }

    pub fn is_slot_used(&self, slot_index: usize) -> bool {
        self.header[slot_index]
    }

    pub fn mark_slot_status(&mut self, slot_index: usize, used: bool) {
        self.header.set(slot_index, used);
    }

    /// Store the tuple in the lowest-indexed empty slot and stamp its
    /// record id.
    pub fn insert_tuple(&mut self, tuple: &mut Tuple) -> DbResult {
        if &self.schema != tuple.get_schema() {
            return Err(DbError::TypeMismatch(format!(
                "tuple schema does not match page {}",
                self.pid
            )));
        }

        let slot = match (0..self.slot_count).find(|i| !self.header[*i]) {
            Some(i) => i,
            None => return Err(DbError::PageFull),
        };

        tuple.set_record_id(Some(RecordId::new(self.pid, slot)));
        self.tuples[slot] = tuple.clone();
        self.mark_slot_status(slot, true);
        Ok(())
    }

    /// Free the slot named by the tuple's record id.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> DbResult {
        let rid = match tuple.get_record_id() {
            Some(rid) => rid,
            None => {
                return Err(DbError::InvalidRecord(
                    "tuple has no record id".to_string(),
                ))
            }
        };

        if rid.pid != self.pid {
            return Err(DbError::InvalidRecord(format!(
                "record {} does not live on page {}",
                rid, self.pid
            )));
        }
        if rid.slot >= self.slot_count || !self.header[rid.slot] {
            return Err(DbError::InvalidRecord(format!("slot {} is empty", rid)));
        }

        self.tuples[rid.slot] = Tuple::new_default(&self.schema);
        self.mark_slot_status(rid.slot, false);
        Ok(())
    }

    /// Reconstruct the byte image of the page. Free slots are written
    /// as zeros so the result only depends on the live content.
    pub fn get_page_data(&self) -> Vec<u8> {
        let header_size = Self::calculate_header_size(self.slot_count);
        let tuple_size = self.schema.get_size();

        let mut header_bytes = vec![0u8; header_size];
        for i in 0..self.slot_count {
            if self.header[i] {
                header_bytes[i / 8] |= 1 << (i % 8);
            }
        }

        let mut writer = DbWriter::new();
        writer.write(&header_bytes.as_slice());
        let empty_record = vec![0u8; tuple_size];
        for i in 0..self.slot_count {
            if self.header[i] {
                writer.write(&self.tuples[i].encode().as_slice());
            } else {
                writer.write(&empty_record.as_slice());
            }
        }

        writer.to_padded_bytes(BufferPool::get_page_size())
    }

    pub fn mark_dirty(&mut self, dirty: bool, tid: TransactionID) {
        if dirty {
            self.dirtier = Some(tid);
        } else {
            self.dirtier = None;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirtier.is_some()
    }

    pub fn dirtier(&self) -> Option<TransactionID> {
        self.dirtier
    }

    /// Pristine copy of the page as of the last commit point, used as
    /// the UNDO side of update log records.
    pub fn get_before_image(&self) -> Result<HeapPage, DbError> {
        HeapPage::new(&self.pid, &self.before_image, &self.schema)
    }

    pub fn before_image_data(&self) -> Vec<u8> {
        self.before_image.clone()
    }

    /// Snapshot the current state as the new rollback point. Called
    /// when the dirtying transaction commits.
    pub fn set_before_image(&mut self) {
        self.before_image = self.get_page_data();
    }

    pub fn iter(&self) -> HeapPageIterator<'_> {
        HeapPageIterator {
            page: self,
            cursor: 0,
        }
    }
}

/// Live tuples in slot order, each carrying its record id.
pub struct HeapPageIterator<'page> {
    page: &'page HeapPage,
    cursor: usize,
}

impl<'page> Iterator for HeapPageIterator<'page> {
    type Item = Tuple;

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor < self.page.slot_count {
            let cursor = self.cursor;
            self.cursor += 1;

            if self.page.is_slot_used(cursor) {
                return Some(self.page.tuples[cursor].clone());
            }
        }
        None
    }
}
