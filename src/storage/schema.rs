use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::DbError;

pub const DEFAULT_STRING_LEN: usize = 128;

static STRING_LEN: AtomicUsize = AtomicUsize::new(DEFAULT_STRING_LEN);

/// Payload size of string fields, fixed per database instance.
pub fn set_string_len(len: usize) {
    STRING_LEN.store(len, Ordering::Relaxed);
}

pub fn get_string_len() -> usize {
    STRING_LEN.load(Ordering::Relaxed)
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Type {
    Int,
    Str,
}

impl Type {
    /// Get the on-disk size of the type in bytes.
    ///
    /// Strings are stored as a 4-byte length prefix followed by a
    /// zero-padded payload of `get_string_len()` bytes.
    pub fn size(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::Str => 4 + get_string_len(),
        }
    }

    pub fn parse(s: &str) -> Result<Type, DbError> {
        match s {
            "int" => Ok(Type::Int),
            "string" => Ok(Type::Str),
            _ => Err(DbError::IllegalArgument(format!(
                "unknown field type: {}",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldItem {
    pub field_type: Type,
    pub field_name: String,
}

impl FieldItem {
    pub fn new(field_name: &str, field_type: Type) -> Self {
        Self {
            field_type,
            field_name: field_name.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub fields: Vec<FieldItem>,
}

impl Schema {
    pub fn new(fields: Vec<FieldItem>) -> Schema {
        Schema { fields }
    }

    pub fn merge(scheme1: &Schema, scheme2: &Schema) -> Schema {
        let mut fields = scheme1.fields.clone();
        fields.extend(scheme2.fields.clone());
        Schema { fields }
    }

    pub fn fields_count(&self) -> usize {
        self.fields.len()
    }

    pub fn get_field_type(&self, i: usize) -> Type {
        self.fields[i].field_type
    }

    pub fn get_field_pos(&self, field_name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.field_name == field_name)
    }

    /// Get tuple size in bytes.
    pub fn get_size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.size()).sum()
    }
}

impl Default for Schema {
    fn default() -> Schema {
        Schema { fields: Vec::new() }
    }
}

// Two schemas are interchangeable when their field types line up;
// field names are advisory.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

pub fn simple_int_schema(width: usize, name_prefix: &str) -> Schema {
    let mut fields: Vec<FieldItem> = Vec::new();
    for i in 0..width {
        let field = FieldItem {
            field_name: format!("{}-{}", name_prefix, i),
            field_type: Type::Int,
        };
        fields.push(field);
    }

    Schema { fields }
}
