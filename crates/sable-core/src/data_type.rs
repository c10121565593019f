//! [`DataType`]: a type identity plus the structural modifiers expressions need.
//!
//! Named types (primitives, structs, classes, enums, delegates) are identified
//! by their [`TypeHash`]. Pointers and arrays are structural: `int*` is `int`
//! with one level of indirection and `int[,]` is `int` with array rank 2, so
//! taking an address or creating an array never has to register a new type.
//!
//! ```
//! use sable_core::{DataType, primitives};
//!
//! let int = DataType::simple(primitives::INT32);
//! let ptr = int.pointer_to();
//! assert!(ptr.is_pointer());
//! assert_eq!(ptr.element_type(), Some(int));
//!
//! let grid = DataType::array_of(int, 2);
//! assert_eq!(grid.array_rank, 2);
//! assert_eq!(grid.element_type(), Some(int));
//! ```

use std::fmt;

use crate::{TypeHash, hash_constants, primitives};

/// A complete expression type.
///
/// Arrays wrap the pointer depth: `int*[]` is `{ INT32, pointer_depth: 1, array_rank: 1 }`.
/// Arrays of arrays are not representable.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    pub type_hash: TypeHash,
    /// Levels of pointer indirection.
    pub pointer_depth: u8,
    /// Array rank, 0 when this is not an array.
    pub array_rank: u8,
}

impl DataType {
    pub const VOID: DataType = DataType::simple(primitives::VOID);
    pub const BOOL: DataType = DataType::simple(primitives::BOOL);
    pub const INT32: DataType = DataType::simple(primitives::INT32);
    pub const INT64: DataType = DataType::simple(primitives::INT64);
    pub const STRING: DataType = DataType::simple(primitives::STRING);
    pub const OBJECT: DataType = DataType::simple(primitives::OBJECT);
    pub const NULL: DataType = DataType::simple(primitives::NULL);

    #[inline]
    pub const fn simple(type_hash: TypeHash) -> Self {
        Self {
            type_hash,
            pointer_depth: 0,
            array_rank: 0,
        }
    }

    /// Pointer to a value of this type.
    #[inline]
    pub const fn pointer_to(self) -> Self {
        Self {
            type_hash: self.type_hash,
            pointer_depth: self.pointer_depth + 1,
            array_rank: 0,
        }
    }

    /// Array of `element` with the given rank.
    #[inline]
    pub const fn array_of(element: DataType, rank: u8) -> Self {
        Self {
            type_hash: element.type_hash,
            pointer_depth: element.pointer_depth,
            array_rank: rank,
        }
    }

    #[inline]
    pub const fn is_array(&self) -> bool {
        self.array_rank > 0
    }

    #[inline]
    pub const fn is_pointer(&self) -> bool {
        self.array_rank == 0 && self.pointer_depth > 0
    }

    /// `void*`
    #[inline]
    pub fn is_void_pointer(&self) -> bool {
        self.array_rank == 0 && self.pointer_depth == 1 && self.type_hash == primitives::VOID
    }

    /// Neither an array nor a pointer: the named type itself.
    #[inline]
    pub const fn is_named(&self) -> bool {
        self.array_rank == 0 && self.pointer_depth == 0
    }

    /// Element type of an array, or pointee of a pointer.
    pub fn element_type(&self) -> Option<DataType> {
        if self.is_array() {
            Some(DataType {
                array_rank: 0,
                ..*self
            })
        } else if self.pointer_depth > 0 {
            Some(DataType {
                pointer_depth: self.pointer_depth - 1,
                ..*self
            })
        } else {
            None
        }
    }

    /// Identity used in member signatures: the type hash for named types,
    /// mixed with the pointer depth and array rank otherwise.
    pub fn signature_hash(&self) -> TypeHash {
        if self.is_named() {
            return self.type_hash;
        }
        let shape = ((self.pointer_depth as u64) << 8) | self.array_rank as u64;
        TypeHash(
            self.type_hash
                .0
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(shape ^ hash_constants::PARAM_MARKERS[shape as usize % 16]),
        )
    }

    /// Whether this is exactly the named type `hash`.
    #[inline]
    pub fn is(&self, hash: TypeHash) -> bool {
        self.is_named() && self.type_hash == hash
    }

    pub fn is_integral(&self) -> bool {
        self.is_named() && primitives::is_integral(self.type_hash)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_named() && primitives::is_numeric(self.type_hash)
    }

    pub fn is_floating(&self) -> bool {
        self.is_named() && primitives::is_floating(self.type_hash)
    }

    pub fn is_unsigned(&self) -> bool {
        self.is_named() && primitives::is_unsigned(self.type_hash)
    }
}

impl From<TypeHash> for DataType {
    fn from(hash: TypeHash) -> Self {
        DataType::simple(hash)
    }
}

impl fmt::Debug for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Renders the builtin keyword when there is one, the hash otherwise.
/// Diagnostics use `TypeSystem::type_name` for user types.
impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match primitives::keyword(self.type_hash) {
            Some(keyword) => f.write_str(keyword)?,
            None => write!(f, "{}", self.type_hash)?,
        }
        for _ in 0..self.pointer_depth {
            f.write_str("*")?;
        }
        if self.array_rank > 0 {
            write!(f, "[{}]", ",".repeat(self.array_rank as usize - 1))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_of_array_element() {
        let elem = DataType::simple(primitives::INT32).pointer_to();
        let arr = DataType::array_of(elem, 1);
        assert!(arr.is_array());
        assert!(!arr.is_pointer());
        assert_eq!(arr.element_type(), Some(elem));
        assert_eq!(elem.element_type(), Some(DataType::INT32));
    }

    #[test]
    fn signature_hash_distinguishes_shapes() {
        let int = DataType::INT32;
        assert_eq!(int.signature_hash(), primitives::INT32);
        assert_ne!(int.pointer_to().signature_hash(), int.signature_hash());
        assert_ne!(
            DataType::array_of(int, 1).signature_hash(),
            DataType::array_of(int, 2).signature_hash()
        );
    }

    #[test]
    fn void_pointer() {
        assert!(DataType::VOID.pointer_to().is_void_pointer());
        assert!(!DataType::INT32.pointer_to().is_void_pointer());
    }

    #[test]
    fn classification_requires_named_type() {
        assert!(DataType::INT32.is_integral());
        assert!(!DataType::INT32.pointer_to().is_integral());
        assert!(!DataType::array_of(DataType::INT32, 1).is_numeric());
    }

    #[test]
    fn display_uses_keywords() {
        assert_eq!(DataType::INT32.pointer_to().to_string(), "int*");
        assert_eq!(DataType::array_of(DataType::STRING, 2).to_string(), "string[,]");
        assert_eq!(DataType::array_of(DataType::STRING, 1).to_string(), "string[]");
    }
}
