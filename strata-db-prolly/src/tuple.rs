//! Packed typed tuples and their descriptors.
//!
//! A [`Tuple`] is one contiguous buffer; a [`TupleDesc`] carries the
//! per-field types and implements the comparator. Fields are addressed
//! positionally and may be NULL (tracked in a bitmap, distinct from a
//! zero-length value). NULLs order after every non-NULL value.
//!
//! ## Layout (parsed from the tail)
//!
//! ```text
//! [value items][null bitmap ceil(n/8)][(n-1) × u16 end offsets][count u8]
//! ```
//!
//! The first field starts at 0; offset `i` is the END of field `i`; the last
//! field ends where the bitmap begins. NULL fields occupy zero item bytes.

use bytes::Bytes;
use std::cmp::Ordering;
use strata_db_core::{Error, Result};

use crate::tree::KeyOrder;
use crate::zorder::CELL_LEN;

/// Maximum fields per tuple (count is one byte).
pub const MAX_TUPLE_FIELDS: usize = u8::MAX as usize;

/// Field type tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeTag {
    /// Signed 64-bit integer, 8 bytes little-endian.
    Int64,
    /// Unsigned 64-bit integer, 8 bytes little-endian.
    Uint64,
    /// IEEE 754 double, 8 bytes little-endian, total order.
    Float64,
    /// Single byte, 0 or 1.
    Bool,
    /// Raw bytes, lexicographic.
    Bytes,
    /// UTF-8 text, lexicographic over the encoded bytes.
    Text,
    /// Spatial cell: level byte + 16-byte Z-value (see [`crate::zorder`]).
    Cell,
}

/// One column of a tuple: a type and its nullability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldType {
    pub tag: TypeTag,
    pub nullable: bool,
}

impl FieldType {
    /// A non-nullable field of `tag`.
    pub fn new(tag: TypeTag) -> FieldType {
        FieldType {
            tag,
            nullable: false,
        }
    }

    /// A nullable field of `tag`.
    pub fn nullable(tag: TypeTag) -> FieldType {
        FieldType {
            tag,
            nullable: true,
        }
    }
}

// ============================================================================
// Raw layout accessors
// ============================================================================

fn field_count(raw: &[u8]) -> usize {
    raw.last().copied().unwrap_or(0) as usize
}

/// Extract field `i` from a packed tuple, `None` when NULL.
pub fn raw_field(raw: &[u8], i: usize) -> Option<&[u8]> {
    let n = field_count(raw);
    if n == 0 {
        return None;
    }
    debug_assert!(i < n, "field index {i} out of bounds for {n}-field tuple");
    let bitmap_len = n.div_ceil(8);
    let off_table = raw.len() - 1 - (n - 1) * 2;
    let bitmap = off_table - bitmap_len;

    if raw[bitmap + i / 8] & (1 << (i % 8)) != 0 {
        return None;
    }
    let start = if i == 0 {
        0
    } else {
        u16::from_le_bytes([raw[off_table + (i - 1) * 2], raw[off_table + (i - 1) * 2 + 1]])
            as usize
    };
    let end = if i == n - 1 {
        bitmap
    } else {
        u16::from_le_bytes([raw[off_table + i * 2], raw[off_table + i * 2 + 1]]) as usize
    };
    Some(&raw[start..end])
}

// ============================================================================
// Tuple
// ============================================================================

/// An owned packed tuple.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tuple {
    data: Bytes,
}

impl Tuple {
    /// Wrap already-encoded tuple bytes.
    pub fn from_bytes(data: impl Into<Bytes>) -> Tuple {
        Tuple { data: data.into() }
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        field_count(&self.data)
    }

    /// Field `i`, `None` when NULL.
    pub fn get_field(&self, i: usize) -> Option<&[u8]> {
        raw_field(&self.data, i)
    }

    /// The encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The encoded bytes, owned.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl AsRef<[u8]> for Tuple {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

// ============================================================================
// TupleBuilder
// ============================================================================

/// Builds tuples field by field against a descriptor.
#[derive(Clone, Debug)]
pub struct TupleBuilder {
    desc: TupleDesc,
    fields: Vec<Option<Vec<u8>>>,
}

impl TupleBuilder {
    /// Create a builder with every field unset (NULL).
    pub fn new(desc: TupleDesc) -> TupleBuilder {
        let n = desc.field_count();
        TupleBuilder {
            desc,
            fields: vec![None; n],
        }
    }

    fn put_raw(&mut self, i: usize, tag: TypeTag, value: Vec<u8>) -> &mut Self {
        debug_assert_eq!(self.desc.fields[i].tag, tag, "type mismatch at field {i}");
        self.fields[i] = Some(value);
        self
    }

    pub fn put_int64(&mut self, i: usize, v: i64) -> &mut Self {
        self.put_raw(i, TypeTag::Int64, v.to_le_bytes().to_vec())
    }

    pub fn put_uint64(&mut self, i: usize, v: u64) -> &mut Self {
        self.put_raw(i, TypeTag::Uint64, v.to_le_bytes().to_vec())
    }

    pub fn put_float64(&mut self, i: usize, v: f64) -> &mut Self {
        self.put_raw(i, TypeTag::Float64, v.to_le_bytes().to_vec())
    }

    pub fn put_bool(&mut self, i: usize, v: bool) -> &mut Self {
        self.put_raw(i, TypeTag::Bool, vec![v as u8])
    }

    pub fn put_bytes(&mut self, i: usize, v: &[u8]) -> &mut Self {
        self.put_raw(i, TypeTag::Bytes, v.to_vec())
    }

    pub fn put_text(&mut self, i: usize, v: &str) -> &mut Self {
        self.put_raw(i, TypeTag::Text, v.as_bytes().to_vec())
    }

    pub fn put_cell(&mut self, i: usize, v: [u8; CELL_LEN]) -> &mut Self {
        self.put_raw(i, TypeTag::Cell, v.to_vec())
    }

    /// Explicitly set a field NULL.
    pub fn put_null(&mut self, i: usize) -> &mut Self {
        self.fields[i] = None;
        self
    }

    /// Build, requiring every non-nullable field to be set.
    pub fn build(&mut self) -> Result<Tuple> {
        for (i, field) in self.fields.iter().enumerate() {
            if field.is_none() && !self.desc.fields[i].nullable {
                return Err(Error::invariant(format!(
                    "field {i} is not nullable and was not set"
                )));
            }
        }
        self.encode()
    }

    /// Build, permitting NULL in non-nullable fields.
    ///
    /// Range bounds are built this way: an unbound column has no value even
    /// when the schema forbids NULL in stored rows.
    pub fn build_permissive(&mut self) -> Result<Tuple> {
        self.encode()
    }

    fn encode(&mut self) -> Result<Tuple> {
        let n = self.fields.len();
        if n > MAX_TUPLE_FIELDS {
            return Err(Error::invariant(format!("{n} fields exceeds tuple maximum")));
        }
        let items_len: usize = self.fields.iter().flatten().map(Vec::len).sum();
        if items_len > u16::MAX as usize {
            return Err(Error::invariant("tuple items exceed u16 offset range"));
        }

        let bitmap_len = n.div_ceil(8);
        let mut buf = Vec::with_capacity(items_len + bitmap_len + n * 2 + 1);
        let mut ends = Vec::with_capacity(n);
        let mut bitmap = vec![0u8; bitmap_len];
        for (i, field) in self.fields.iter().enumerate() {
            match field {
                Some(v) => buf.extend_from_slice(v),
                None => bitmap[i / 8] |= 1 << (i % 8),
            }
            ends.push(buf.len() as u16);
        }
        buf.extend_from_slice(&bitmap);
        for &end in &ends[..n.saturating_sub(1)] {
            buf.extend_from_slice(&end.to_le_bytes());
        }
        buf.push(n as u8);

        // reset for reuse
        for f in &mut self.fields {
            *f = None;
        }
        Ok(Tuple::from_bytes(buf))
    }
}

// ============================================================================
// TupleDesc
// ============================================================================

/// Field types of a tuple, plus the comparator over encoded tuples.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TupleDesc {
    fields: Vec<FieldType>,
}

impl TupleDesc {
    /// Create a descriptor from field types.
    pub fn new(fields: Vec<FieldType>) -> TupleDesc {
        TupleDesc { fields }
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// The field types.
    pub fn fields(&self) -> &[FieldType] {
        &self.fields
    }

    /// Type of field `i`.
    pub fn field(&self, i: usize) -> FieldType {
        self.fields[i]
    }

    /// Compare two encoded values of field `i`'s type.
    pub fn compare_values(&self, i: usize, a: &[u8], b: &[u8]) -> Ordering {
        compare_typed(self.fields[i].tag, a, b)
    }

    /// Compare an encoded value against field `i` of a packed tuple without
    /// decoding the rest of the tuple. NULL fields order last.
    pub fn compare_field(&self, value: &[u8], i: usize, tuple: &[u8]) -> Ordering {
        match raw_field(tuple, i) {
            Some(field) => compare_typed(self.fields[i].tag, value, field),
            None => Ordering::Less, // any value < NULL
        }
    }

    /// Render field `i` of an encoded value for diagnostics.
    pub fn format_value(&self, i: usize, value: &[u8]) -> String {
        match self.fields[i].tag {
            TypeTag::Int64 => match value.try_into() {
                Ok(b) => i64::from_le_bytes(b).to_string(),
                Err(_) => format!("{value:?}"),
            },
            TypeTag::Uint64 => match value.try_into() {
                Ok(b) => u64::from_le_bytes(b).to_string(),
                Err(_) => format!("{value:?}"),
            },
            TypeTag::Float64 => match value.try_into() {
                Ok(b) => f64::from_le_bytes(b).to_string(),
                Err(_) => format!("{value:?}"),
            },
            TypeTag::Bool => (value == [1]).to_string(),
            TypeTag::Text => String::from_utf8_lossy(value).into_owned(),
            TypeTag::Bytes | TypeTag::Cell => format!("0x{}", hex_str(value)),
        }
    }
}

fn hex_str(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn compare_typed(tag: TypeTag, a: &[u8], b: &[u8]) -> Ordering {
    match tag {
        TypeTag::Int64 => decode_i64(a).cmp(&decode_i64(b)),
        TypeTag::Uint64 => decode_u64(a).cmp(&decode_u64(b)),
        TypeTag::Float64 => decode_f64(a).total_cmp(&decode_f64(b)),
        TypeTag::Bool | TypeTag::Bytes | TypeTag::Text | TypeTag::Cell => a.cmp(b),
    }
}

fn decode_i64(v: &[u8]) -> i64 {
    let mut buf = [0u8; 8];
    let n = v.len().min(8);
    buf[..n].copy_from_slice(&v[..n]);
    i64::from_le_bytes(buf)
}

fn decode_u64(v: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = v.len().min(8);
    buf[..n].copy_from_slice(&v[..n]);
    u64::from_le_bytes(buf)
}

fn decode_f64(v: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    let n = v.len().min(8);
    buf[..n].copy_from_slice(&v[..n]);
    f64::from_le_bytes(buf)
}

impl KeyOrder for TupleDesc {
    /// Field-wise typed comparison; NULLs order after all values.
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        for i in 0..self.fields.len() {
            let fa = raw_field(a, i);
            let fb = raw_field(b, i);
            let ord = match (fa, fb) {
                (Some(va), Some(vb)) => compare_typed(self.fields[i].tag, va, vb),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}
