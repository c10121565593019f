//! In-memory type registry.
//!
//! Stores type and member metadata keyed by [`TypeHash`] and answers the
//! [`TypeSystem`] queries expression resolution makes. Types are registered
//! through [`TypeBuilder`](crate::TypeBuilder); builtins come from
//! [`TypeRegistry::with_builtins`].

use rustc_hash::{FxHashMap, FxHashSet};
use sable_core::{
    DataType, EventInfo, FieldInfo, IndexerInfo, MemberLookup, MethodInfo, PropertyInfo, TypeHash, TypeInfo, TypeKind, TypeSystem,
};
use thiserror::Error;

use crate::builder::TypeBuilder;
use crate::hierarchy::{Hierarchy, Relation};

/// Errors raised while populating a registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    #[error("duplicate member '{member}' on type '{owner}'")]
    DuplicateMember { owner: String, member: String },

    #[error("type not found: {0}")]
    TypeNotFound(String),
}

/// A named member declared directly on one type.
#[derive(Debug, Clone)]
enum Declared {
    Field(TypeHash),
    Property(TypeHash),
    Event(TypeHash),
    Methods(Vec<TypeHash>),
    NestedType(TypeHash),
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<TypeHash, TypeInfo>,
    names: FxHashMap<String, TypeHash>,
    namespaces: FxHashSet<String>,

    methods: FxHashMap<TypeHash, MethodInfo>,
    fields: FxHashMap<TypeHash, FieldInfo>,
    properties: FxHashMap<TypeHash, PropertyInfo>,
    events: FxHashMap<TypeHash, EventInfo>,

    /// Members declared directly on a type, by simple name.
    declared: FxHashMap<TypeHash, FxHashMap<String, Declared>>,
    operators: FxHashMap<(TypeHash, String), Vec<TypeHash>>,
    constructors: FxHashMap<TypeHash, Vec<TypeHash>>,
    indexers: FxHashMap<TypeHash, Vec<IndexerInfo>>,

    hierarchy: Hierarchy,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a type. Namespace prefixes of a dotted name become namespaces.
    pub fn register_type(&mut self, info: TypeInfo) -> Result<TypeHash, RegistrationError> {
        if self.types.contains_key(&info.hash) {
            return Err(RegistrationError::DuplicateType(info.name));
        }
        let mut prefix = String::new();
        let segments: Vec<&str> = info.name.split('.').collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            if !prefix.is_empty() {
                prefix.push('.');
            }
            prefix.push_str(segment);
            self.namespaces.insert(prefix.clone());
        }
        if let Some(base) = info.base {
            self.hierarchy.add(info.hash, base, Relation::Extends);
        }
        for &iface in &info.interfaces {
            self.hierarchy.add(info.hash, iface, Relation::Implements);
        }
        if let TypeKind::TypeParameter(constraints) = &info.kind {
            for &bound in &constraints.bounds {
                self.hierarchy.add(info.hash, bound, Relation::Implements);
            }
        }
        let hash = info.hash;
        tracing::trace!(name = %info.name, %hash, "registered type");
        self.names.insert(info.name.clone(), hash);
        self.types.insert(hash, info);
        Ok(hash)
    }

    /// Start building a type with the given name and kind.
    pub fn define(&mut self, name: &str, kind: TypeKind) -> TypeBuilder<'_> {
        TypeBuilder::new(self, name, kind)
    }

    pub fn define_struct(&mut self, name: &str) -> TypeBuilder<'_> {
        self.define(name, TypeKind::Struct)
    }

    pub fn define_class(&mut self, name: &str) -> TypeBuilder<'_> {
        self.define(name, TypeKind::Class)
    }

    pub fn define_interface(&mut self, name: &str) -> TypeBuilder<'_> {
        self.define(name, TypeKind::Interface)
    }

    pub fn define_enum(&mut self, name: &str, underlying: TypeHash) -> TypeBuilder<'_> {
        self.define(name, TypeKind::Enum { underlying })
    }

    fn declare(&mut self, owner: TypeHash, name: &str, member: Declared) -> Result<(), RegistrationError> {
        let table = self.declared.entry(owner).or_default();
        match (table.get_mut(name), member) {
            (Some(Declared::Methods(existing)), Declared::Methods(added)) => {
                existing.extend(added);
                Ok(())
            }
            (Some(_), _) => Err(RegistrationError::DuplicateMember {
                owner: self
                    .types
                    .get(&owner)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| owner.to_string()),
                member: name.to_string(),
            }),
            (None, member) => {
                table.insert(name.to_string(), member);
                Ok(())
            }
        }
    }

    pub fn add_method(&mut self, method: MethodInfo) -> Result<TypeHash, RegistrationError> {
        let hash = method.hash;
        self.declare(method.owner, &method.name.clone(), Declared::Methods(vec![hash]))?;
        self.methods.insert(hash, method);
        Ok(hash)
    }

    /// Accessors are stored as methods but are not visible by name.
    pub fn add_accessor(&mut self, method: MethodInfo) -> TypeHash {
        let hash = method.hash;
        self.methods.insert(hash, method);
        hash
    }

    pub fn add_operator(&mut self, method: MethodInfo) -> TypeHash {
        let hash = method.hash;
        self.operators
            .entry((method.owner, method.name.clone()))
            .or_default()
            .push(hash);
        self.methods.insert(hash, method);
        hash
    }

    pub fn add_constructor(&mut self, method: MethodInfo) -> TypeHash {
        let hash = method.hash;
        self.constructors.entry(method.owner).or_default().push(hash);
        self.methods.insert(hash, method);
        hash
    }

    pub fn add_field(&mut self, field: FieldInfo) -> Result<TypeHash, RegistrationError> {
        let hash = field.hash;
        self.declare(field.owner, &field.name.clone(), Declared::Field(hash))?;
        self.fields.insert(hash, field);
        Ok(hash)
    }

    pub fn add_property(&mut self, property: PropertyInfo) -> Result<TypeHash, RegistrationError> {
        let hash = property.hash;
        self.declare(property.owner, &property.name.clone(), Declared::Property(hash))?;
        self.properties.insert(hash, property);
        Ok(hash)
    }

    pub fn add_event(&mut self, event: EventInfo) -> Result<TypeHash, RegistrationError> {
        let hash = event.hash;
        self.declare(event.owner, &event.name.clone(), Declared::Event(hash))?;
        self.events.insert(hash, event);
        Ok(hash)
    }

    pub fn add_indexer(&mut self, indexer: IndexerInfo) -> TypeHash {
        let hash = indexer.hash;
        self.indexers.entry(indexer.owner).or_default().push(indexer);
        hash
    }

    /// Make `nested` visible as a member of `owner` under its simple name.
    pub fn add_nested_type(&mut self, owner: TypeHash, simple_name: &str, nested: TypeHash) -> Result<(), RegistrationError> {
        self.declare(owner, simple_name, Declared::NestedType(nested))
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.values()
    }

    pub fn event(&self, hash: TypeHash) -> Option<&EventInfo> {
        self.events.get(&hash)
    }

    /// `hash` followed by its base classes, most derived first.
    pub fn base_chain(&self, hash: TypeHash) -> Vec<TypeHash> {
        let mut chain = vec![hash];
        let mut current = hash;
        while let Some(base) = self.types.get(&current).and_then(|t| t.base) {
            if chain.contains(&base) {
                break;
            }
            chain.push(base);
            current = base;
        }
        chain
    }

    /// Types searched for members of `hash`: the base chain, then for type
    /// parameters and interfaces every reachable supertype.
    fn search_order(&self, hash: TypeHash) -> Vec<TypeHash> {
        let mut order = self.base_chain(hash);
        let mut i = 0;
        while i < order.len() {
            for (sup, _) in self.hierarchy.supertypes(order[i]) {
                if !order.contains(&sup) {
                    order.push(sup);
                }
            }
            i += 1;
        }
        order
    }

    fn lookup_declared(&self, owner: TypeHash, name: &str) -> Option<MemberLookup<'_>> {
        let member = self.declared.get(&owner)?.get(name)?;
        Some(match member {
            Declared::Field(h) => MemberLookup::Field(self.fields.get(h)?),
            Declared::Property(h) => MemberLookup::Property(self.properties.get(h)?),
            Declared::Event(h) => MemberLookup::Event(self.events.get(h)?),
            Declared::Methods(hs) => MemberLookup::Methods(hs.clone()),
            Declared::NestedType(h) => MemberLookup::NestedType(*h),
        })
    }
}

impl TypeSystem for TypeRegistry {
    fn type_info(&self, hash: TypeHash) -> Option<&TypeInfo> {
        self.types.get(&hash)
    }

    fn find_type(&self, qualified_name: &str) -> Option<TypeHash> {
        self.names.get(qualified_name).copied()
    }

    fn is_namespace(&self, name: &str) -> bool {
        self.namespaces.contains(name)
    }

    fn method(&self, hash: TypeHash) -> Option<&MethodInfo> {
        self.methods.get(&hash)
    }

    fn field(&self, hash: TypeHash) -> Option<&FieldInfo> {
        self.fields.get(&hash)
    }

    fn property(&self, hash: TypeHash) -> Option<&PropertyInfo> {
        self.properties.get(&hash)
    }

    fn lookup_member(&self, owner: TypeHash, name: &str) -> Option<MemberLookup<'_>> {
        let mut methods: Vec<TypeHash> = Vec::new();
        for ty in self.search_order(owner) {
            match self.lookup_declared(ty, name) {
                Some(MemberLookup::Methods(found)) => methods.extend(found),
                // A non-method member hides everything further up the chain.
                Some(other) if methods.is_empty() => return Some(other),
                Some(_) => break,
                None => {}
            }
        }
        (!methods.is_empty()).then_some(MemberLookup::Methods(methods))
    }

    fn operators(&self, owner: TypeHash, name: &str) -> &[TypeHash] {
        self.operators
            .get(&(owner, name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn constructors(&self, owner: TypeHash) -> &[TypeHash] {
        self.constructors
            .get(&owner)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn indexers(&self, owner: TypeHash) -> Vec<&IndexerInfo> {
        let mut found = Vec::new();
        for ty in self.search_order(owner) {
            if let Some(list) = self.indexers.get(&ty) {
                for indexer in list {
                    // An override in a derived type hides the same signature above it.
                    let hidden = found.iter().any(|f: &&IndexerInfo| {
                        f.params.len() == indexer.params.len()
                            && f.params.iter().zip(&indexer.params).all(|(a, b)| a.ty == b.ty)
                    });
                    if !hidden {
                        found.push(indexer);
                    }
                }
            }
        }
        found
    }

    fn is_subtype_of(&self, derived: TypeHash, base: TypeHash) -> bool {
        self.hierarchy.is_subtype_of(derived, base)
    }
}

/// Convenience for tests and builtins: the named type's `DataType`.
pub fn ty(hash: TypeHash) -> DataType {
    DataType::simple(hash)
}
