//! Constant pool shared by emitted chunks.
//!
//! The pool stores values referenced by bytecode operands: numeric literals
//! wider than the inline forms, string data, member hashes, type operands and
//! raw array initializer blobs.

use rustc_hash::FxHashMap;
use sable_core::{DataType, TypeHash};

/// Values stored in the constant pool.
///
/// Unsigned integers are stored by bit pattern in the signed entry of the
/// same width; the consuming instruction decides the interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolEntry {
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// 96-bit mantissa with a decimal scale.
    Decimal { mantissa: i128, scale: u8 },
    /// UTF-8 string literal bytes.
    StringData(Vec<u8>),
    /// Method, field or constructor identity.
    TypeHash(TypeHash),
    /// Type operand of `box`, `newarr`, `ldelem`, `initobj`, ...
    Type(DataType),
    /// Little-endian element data for `InitializeArray`.
    Blob(Vec<u8>),
}

/// Pool with deduplication.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<PoolEntry>,
    index: FxHashMap<PoolKey, u32>,
}

/// Hashable version of PoolEntry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    Int32(i32),
    Int64(i64),
    Float32(u32), // Bit pattern for hashing
    Float64(u64), // Bit pattern for hashing
    Decimal(i128, u8),
    StringData(Vec<u8>),
    TypeHash(TypeHash),
    Type(DataType),
    Blob(Vec<u8>),
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get existing entry, returns index.
    pub fn add(&mut self, entry: PoolEntry) -> u32 {
        let key = Self::to_key(&entry);

        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }

        let idx = self.entries.len() as u32;
        self.entries.push(entry);
        self.index.insert(key, idx);
        idx
    }

    pub fn add_type_hash(&mut self, hash: TypeHash) -> u32 {
        self.add(PoolEntry::TypeHash(hash))
    }

    pub fn add_type(&mut self, ty: DataType) -> u32 {
        self.add(PoolEntry::Type(ty))
    }

    pub fn get(&self, index: u32) -> Option<&PoolEntry> {
        self.entries.get(index as usize)
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_key(entry: &PoolEntry) -> PoolKey {
        match entry {
            PoolEntry::Int32(v) => PoolKey::Int32(*v),
            PoolEntry::Int64(v) => PoolKey::Int64(*v),
            PoolEntry::Float32(v) => PoolKey::Float32(v.to_bits()),
            PoolEntry::Float64(v) => PoolKey::Float64(v.to_bits()),
            PoolEntry::Decimal { mantissa, scale } => PoolKey::Decimal(*mantissa, *scale),
            PoolEntry::StringData(b) => PoolKey::StringData(b.clone()),
            PoolEntry::TypeHash(h) => PoolKey::TypeHash(*h),
            PoolEntry::Type(t) => PoolKey::Type(*t),
            PoolEntry::Blob(b) => PoolKey::Blob(b.clone()),
        }
    }
}
