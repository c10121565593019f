//! Deterministic identities for types and members.
//!
//! [`TypeHash`] is a 64-bit XXHash of a qualified name (types) or of an owner,
//! name and parameter list (methods, constructors, operators). Because the
//! hash is a pure function of the signature, the front end can refer to a
//! member before the type system has registered it.
//!
//! ```
//! use sable_core::{TypeHash, primitives};
//!
//! assert_eq!(TypeHash::from_name("int"), primitives::INT32);
//!
//! let point = TypeHash::from_name("Point");
//! let by_int = TypeHash::from_method(point, "Scale", &[primitives::INT32]);
//! let by_double = TypeHash::from_method(point, "Scale", &[primitives::DOUBLE]);
//! assert_ne!(by_int, by_double);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain mixing constants, one per kind of entity.
pub mod hash_constants {
    /// Separator between parameter positions.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    pub const OPERATOR: u64 = 0x3e9f5d2a8c7b1403;

    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Fields, properties, events and indexers share one domain: a type
    /// cannot declare two members with the same name.
    pub const MEMBER: u64 = 0x1a095090689d4647;

    /// Position markers so that `(int, long)` and `(long, int)` differ.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// A deterministic 64-bit identity for a type or member.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Unset identity.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Hash of a fully qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a free function (used for runtime helpers such as `Activator.CreateInstance`).
    pub fn from_function(name: &str, params: &[TypeHash]) -> Self {
        let seed = hash_constants::FUNCTION ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(seed, params))
    }

    /// Hash of a method declared on `owner`.
    pub fn from_method(owner: TypeHash, name: &str, params: &[TypeHash]) -> Self {
        let seed = hash_constants::METHOD ^ owner.0 ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(seed, params))
    }

    /// Hash of a user-defined operator (`op_Addition`, `op_Increment`, ...) on `owner`.
    ///
    /// Operators live in their own domain so a regular method that happens to
    /// be named `op_Addition` never collides with the operator.
    pub fn from_operator(owner: TypeHash, operator_name: &str, params: &[TypeHash]) -> Self {
        let seed = hash_constants::OPERATOR ^ owner.0 ^ xxh64(operator_name.as_bytes(), 0);
        TypeHash(mix_params(seed, params))
    }

    /// Hash of a user-defined conversion operator on `owner`.
    ///
    /// Conversions overload on their return type, so the target is part of
    /// the signature.
    pub fn from_conversion(owner: TypeHash, from: TypeHash, to: TypeHash, is_explicit: bool) -> Self {
        let name = if is_explicit { "op_Explicit" } else { "op_Implicit" };
        Self::from_operator(owner, name, &[from, to])
    }

    /// Hash of an instance constructor of `owner`.
    pub fn from_constructor(owner: TypeHash, params: &[TypeHash]) -> Self {
        TypeHash(mix_params(hash_constants::CONSTRUCTOR ^ owner.0, params))
    }

    /// Hash of a field, property or event named `name` on `owner`.
    pub fn from_member(owner: TypeHash, name: &str) -> Self {
        TypeHash(hash_constants::MEMBER ^ owner.0 ^ xxh64(name.as_bytes(), 0))
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

fn mix_params(seed: u64, params: &[TypeHash]) -> u64 {
    params.iter().enumerate().fold(seed, |hash, (i, param)| {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        hash.wrapping_mul(hash_constants::SEP)
            .wrapping_add(marker ^ param.0)
    })
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Pre-computed hashes of the builtin types, equal to `TypeHash::from_name(<keyword>)`.
pub mod primitives {
    use super::TypeHash;

    pub const VOID: TypeHash = TypeHash(0xe4b3797ddcf989ea);
    pub const BOOL: TypeHash = TypeHash(0x1e0c8fa4cced99c1);
    pub const CHAR: TypeHash = TypeHash(0x1262f4f62a255c69);

    /// `sbyte`
    pub const INT8: TypeHash = TypeHash(0xb899f2c751a67352);
    /// `byte`
    pub const UINT8: TypeHash = TypeHash(0xfbea3524db185ced);
    /// `short`
    pub const INT16: TypeHash = TypeHash(0x8b77a39f7b0d6cd8);
    /// `ushort`
    pub const UINT16: TypeHash = TypeHash(0xc23eed027585fcb6);
    /// `int`
    pub const INT32: TypeHash = TypeHash(0x4f5e5320cd1c92bf);
    /// `uint`
    pub const UINT32: TypeHash = TypeHash(0x543fb8f520aa3e26);
    /// `long`
    pub const INT64: TypeHash = TypeHash(0x4c4e14cbc59a4ec9);
    /// `ulong`
    pub const UINT64: TypeHash = TypeHash(0x2db4af82fdf0db31);

    pub const FLOAT: TypeHash = TypeHash(0x02d5a2fddaf5bb69);
    pub const DOUBLE: TypeHash = TypeHash(0xeb125587f6c2a79b);
    pub const DECIMAL: TypeHash = TypeHash(0xb4bcec2c3071712b);

    pub const STRING: TypeHash = TypeHash(0x7a8d5fb1ba695978);
    pub const OBJECT: TypeHash = TypeHash(0x7453af4894759ab5);

    /// Type of the `null` literal; converts to any reference or pointer type.
    pub const NULL: TypeHash = TypeHash(0x1165f1b6597b5a46);

    /// Native-sized integer used for array index temporaries.
    pub const INTPTR: TypeHash = TypeHash(0x413c84e649211e70);

    /// Base of every delegate type.
    pub const DELEGATE: TypeHash = TypeHash(0xe9fb6293fce21080);
    /// Base of every array type.
    pub const ARRAY: TypeHash = TypeHash(0xad4653788f7a1b72);
    /// Base of every struct.
    pub const VALUE_TYPE: TypeHash = TypeHash(0x5f6b552acd090876);
    /// Base of every enum.
    pub const ENUM: TypeHash = TypeHash(0xa8f66df95ce7a3ed);

    /// Integral types, narrowest first.
    pub const INTEGRALS: [TypeHash; 9] = [
        INT8, UINT8, INT16, UINT16, CHAR, INT32, UINT32, INT64, UINT64,
    ];

    pub fn is_integral(hash: TypeHash) -> bool {
        INTEGRALS.contains(&hash)
    }

    pub fn is_floating(hash: TypeHash) -> bool {
        hash == FLOAT || hash == DOUBLE
    }

    /// Integral, floating point or decimal.
    pub fn is_numeric(hash: TypeHash) -> bool {
        is_integral(hash) || is_floating(hash) || hash == DECIMAL
    }

    pub fn is_unsigned(hash: TypeHash) -> bool {
        matches!(hash, UINT8 | UINT16 | CHAR | UINT32 | UINT64)
    }

    /// Types that unary and binary promotion widen to `int` first.
    pub fn is_small_integral(hash: TypeHash) -> bool {
        matches!(hash, INT8 | UINT8 | INT16 | UINT16 | CHAR)
    }

    /// Size in bytes of a primitive, `None` for non-primitive types.
    pub fn size_of(hash: TypeHash) -> Option<u32> {
        Some(match hash {
            BOOL | INT8 | UINT8 => 1,
            INT16 | UINT16 | CHAR => 2,
            INT32 | UINT32 | FLOAT => 4,
            INT64 | UINT64 | DOUBLE | INTPTR => 8,
            DECIMAL => 16,
            _ => return None,
        })
    }

    /// The source keyword for a builtin type, if it has one.
    pub fn keyword(hash: TypeHash) -> Option<&'static str> {
        Some(match hash {
            VOID => "void",
            BOOL => "bool",
            CHAR => "char",
            INT8 => "sbyte",
            UINT8 => "byte",
            INT16 => "short",
            UINT16 => "ushort",
            INT32 => "int",
            UINT32 => "uint",
            INT64 => "long",
            UINT64 => "ulong",
            FLOAT => "float",
            DOUBLE => "double",
            DECIMAL => "decimal",
            STRING => "string",
            OBJECT => "object",
            NULL => "null",
            INTPTR => "intptr",
            _ => return None,
        })
    }
}
