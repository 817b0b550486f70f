use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use log::debug;

use crate::{
    common::Database,
    error::DbError,
    heap::{
        buffer_pool::BufferPool,
        page::HeapPage,
        page_id::HeapPageID,
    },
    storage::{schema::Schema, tuple::Tuple},
    transaction::{Permission, Transaction},
    types::{DbResult, Pod},
    utils::HandyRwLock,
    io::DbFile,
};

/// One table stored as a heap file: a numbered sequence of pages
/// persisted back to back in a single OS file.
///
/// The table itself does no locking; every page access from the
/// operator layer goes through the buffer pool, which consults the
/// lock manager first.
pub struct HeapTable {
    pub name: String,
    pub schema: Schema,

    /// Name of the primary-key column, empty when the table has none.
    /// Advisory only; the heap neither builds nor uses an index.
    pub pkey: String,

    path: PathBuf,
    file: DbFile,
    table_id: u32,
}

impl HeapTable {
    pub fn new<P: AsRef<Path>>(
        file_path: P,
        name: &str,
        schema: &Schema,
        pkey: &str,
    ) -> Result<Self, DbError> {
        if schema.fields.is_empty() {
            return Err(DbError::IllegalArgument(
                "table schema must have at least one field".to_string(),
            ));
        }

        let file = DbFile::open(&file_path)?;

        // Canonicalization makes the id independent of how the caller
        // spelled the path, so two handles to one file agree.
        let path = file_path.as_ref().canonicalize()?;
        let table_id = stable_table_id(&path);

        Ok(Self {
            name: name.to_string(),
            schema: schema.clone(),
            pkey: pkey.to_string(),
            path,
            file,
            table_id,
        })
    }

    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn num_pages(&self) -> Result<u32, DbError> {
        let size = self.file.get_size()?;
        Ok((size / BufferPool::get_page_size() as u64) as u32)
    }

    /// Read one page image from disk. Reading at or past the end of
    /// the file is an error; appending goes through `write_page` with
    /// a fresh page instead.
    pub fn read_page(&self, pid: &HeapPageID) -> Result<HeapPage, DbError> {
        if pid.table_id != self.table_id {
            return Err(DbError::InvalidRecord(format!(
                "page {} does not belong to table {}",
                pid, self.table_id
            )));
        }
        if pid.page_index >= self.num_pages()? {
            return Err(DbError::io(&format!(
                "read of page {} beyond end of file",
                pid
            )));
        }

        let page_size = BufferPool::get_page_size();
        let offset = pid.page_index as u64 * page_size as u64;
        let buf = self.file.read_at(offset, page_size)?;

        debug!(
            "read page {} from {:?}, header: {}",
            pid,
            self.path,
            hex::encode(&buf[..8.min(buf.len())])
        );

        HeapPage::new(pid, &buf, &self.schema)
    }

    /// Write one page image to disk, growing the file when the page
    /// lies one past the current end.
    pub fn write_page(&self, page: &HeapPage) -> DbResult {
        let pid = page.get_pid();
        let page_size = BufferPool::get_page_size();
        let offset = pid.page_index as u64 * page_size as u64;
        self.file.write_at(offset, &page.get_page_data())
    }

    /// Find a page with a free slot, walking pages in order under
    /// X-locks, and insert there; append a fresh page when every
    /// existing one is full. Returns the modified pages (always
    /// exactly one).
    pub fn insert_tuple(
        &self,
        db: &Database,
        tx: &Transaction,
        tuple: &mut Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, DbError> {
        let page_count = self.num_pages()?;
        for page_index in 0..page_count {
            let pid = HeapPageID::new(self.table_id, page_index);
            let page_rc = db
                .buffer_pool()
                .get_page(db, tx, Permission::ReadWrite, &pid)?;

            let has_room = page_rc.rl().empty_slots_count() > 0;
            if has_room {
                page_rc.wl().insert_tuple(tuple)?;
                return Ok(vec![page_rc]);
            }
        }

        // every page is full: extend the file with an empty page,
        // then lock and fill it through the buffer pool
        let pid = self.append_empty_page()?;
        debug!("table {} grows to {} pages", self.table_id, pid.page_index + 1);

        let page_rc = db
            .buffer_pool()
            .get_page(db, tx, Permission::ReadWrite, &pid)?;
        page_rc.wl().insert_tuple(tuple)?;
        Ok(vec![page_rc])
    }

    // Appends a zeroed page at the current end of the file. The page
    // number is read under the file mutex, so two growing transactions
    // get distinct pages.
    fn append_empty_page(&self) -> Result<HeapPageID, DbError> {
        use std::io::{Seek, SeekFrom, Write};

        let mut file = self.file.get_file();
        let len = file.metadata()?.len();
        let page_index = (len / BufferPool::get_page_size() as u64) as u32;

        file.seek(SeekFrom::Start(len))?;
        file.write_all(&HeapPage::empty_page_data())?;
        file.flush()?;

        Ok(HeapPageID::new(self.table_id, page_index))
    }

    /// Remove the tuple from the page named by its record id.
    pub fn delete_tuple(
        &self,
        db: &Database,
        tx: &Transaction,
        tuple: &Tuple,
    ) -> Result<Pod<HeapPage>, DbError> {
        let rid = match tuple.get_record_id() {
            Some(rid) => rid,
            None => {
                return Err(DbError::InvalidRecord(
                    "tuple has no record id".to_string(),
                ))
            }
        };
        if rid.pid.table_id != self.table_id {
            return Err(DbError::InvalidRecord(format!(
                "record {} does not belong to table {}",
                rid, self.table_id
            )));
        }

        let page_rc = db
            .buffer_pool()
            .get_page(db, tx, Permission::ReadWrite, &rid.pid)?;
        page_rc.wl().delete_tuple(tuple)?;
        Ok(page_rc)
    }
}

fn stable_table_id(path: &Path) -> u32 {
    // polynomial hash of the canonical path; deterministic across
    // process restarts, unlike the std hasher
    let mut h: u32 = 0;
    for b in path.to_string_lossy().as_bytes() {
        h = h.wrapping_mul(31).wrapping_add(*b as u32);
    }
    h
}

/// Pull iterator over the live tuples of a table, pages in order,
/// slots in order. Pages are fetched through the buffer pool under
/// S-locks, one page of tuples buffered at a time.
pub struct HeapTableIterator {
    db: Arc<Database>,
    tx: Transaction,
    table: Pod<HeapTable>,

    next_page_index: u32,
    buffer: Vec<Tuple>,
    cursor: usize,
}

impl HeapTableIterator {
    pub fn new(db: Arc<Database>, tx: &Transaction, table: Pod<HeapTable>) -> Self {
        Self {
            db,
            tx: *tx,
            table,
            next_page_index: 0,
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    pub fn rewind(&mut self) {
        self.next_page_index = 0;
        self.buffer.clear();
        self.cursor = 0;
    }

    pub fn next_tuple(&mut self) -> Result<Option<Tuple>, DbError> {
        loop {
            if self.cursor < self.buffer.len() {
                let tuple = self.buffer[self.cursor].clone();
                self.cursor += 1;
                return Ok(Some(tuple));
            }

            let (table_id, page_count) = {
                let table = self.table.rl();
                (table.get_id(), table.num_pages()?)
            };
            if self.next_page_index >= page_count {
                return Ok(None);
            }

            let pid = HeapPageID::new(table_id, self.next_page_index);
            let page_rc =
                self.db
                    .buffer_pool()
                    .get_page(&self.db, &self.tx, Permission::ReadOnly, &pid)?;

            self.buffer = page_rc.rl().iter().collect();
            self.cursor = 0;
            self.next_page_index += 1;
        }
    }
}
