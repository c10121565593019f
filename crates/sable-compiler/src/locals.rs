//! Local variables and parameters visible to expression resolution.
//!
//! The front end declares every local before resolving the expressions that
//! use it. Each local records where it lives ([`Storage`]) and whether it is
//! definitely assigned at the point of resolution.

use rustc_hash::FxHashMap;
use sable_core::{DataType, ParamModifier, TypeHash};

/// Identity of a declared local or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(pub u32);

/// Where a variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// A frame slot.
    Local(u16),
    /// A by-value parameter.
    Param(u16),
    /// A `ref` or `out` parameter; the argument holds the variable's address.
    RefParam { index: u16, modifier: ParamModifier },
    /// A variable captured by a nested scope: field `field` of the scope
    /// object held in local `scope`.
    Captured { scope: u16, field: TypeHash },
}

impl Storage {
    /// Whether the variable's storage cannot move while its address is held.
    pub fn is_fixed(&self) -> bool {
        matches!(self, Storage::Local(_) | Storage::Param(_))
    }

    /// Whether loads and stores go through an address.
    pub fn is_by_ref(&self) -> bool {
        matches!(self, Storage::RefParam { .. })
    }
}

#[derive(Debug, Clone)]
pub struct LocalInfo {
    pub name: String,
    pub ty: DataType,
    pub storage: Storage,
    /// Definitely assigned at the current point.
    pub assigned: bool,
}

impl LocalInfo {
    pub fn is_out_param(&self) -> bool {
        matches!(
            self.storage,
            Storage::RefParam {
                modifier: ParamModifier::Out,
                ..
            }
        )
    }
}

/// All variables of the body being compiled.
#[derive(Debug, Clone, Default)]
pub struct LocalTable {
    locals: Vec<LocalInfo>,
    by_name: FxHashMap<String, LocalId>,
    next_slot: u16,
}

impl LocalTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, info: LocalInfo) -> LocalId {
        let id = LocalId(self.locals.len() as u32);
        self.by_name.insert(info.name.clone(), id);
        self.locals.push(info);
        id
    }

    /// Declare a frame local in the next free slot. A later declaration of
    /// the same name shadows the earlier one.
    pub fn declare(&mut self, name: &str, ty: DataType, assigned: bool) -> LocalId {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.push(LocalInfo {
            name: name.to_string(),
            ty,
            storage: Storage::Local(slot),
            assigned,
        })
    }

    /// Declare a parameter at argument `index`. `out` parameters start
    /// unassigned.
    pub fn declare_param(&mut self, name: &str, ty: DataType, index: u16, modifier: ParamModifier) -> LocalId {
        let storage = if modifier.is_by_ref() {
            Storage::RefParam { index, modifier }
        } else {
            Storage::Param(index)
        };
        self.push(LocalInfo {
            name: name.to_string(),
            ty,
            storage,
            assigned: modifier != ParamModifier::Out,
        })
    }

    /// Declare a variable hoisted into a scope object.
    pub fn declare_captured(&mut self, name: &str, ty: DataType, scope: u16, field: TypeHash) -> LocalId {
        self.push(LocalInfo {
            name: name.to_string(),
            ty,
            storage: Storage::Captured { scope, field },
            assigned: true,
        })
    }

    pub fn lookup(&self, name: &str) -> Option<LocalId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: LocalId) -> Option<&LocalInfo> {
        self.locals.get(id.0 as usize)
    }

    pub fn mark_assigned(&mut self, id: LocalId) {
        if let Some(local) = self.locals.get_mut(id.0 as usize) {
            local.assigned = true;
        }
    }

    /// Frame slots used by declared locals. Temporaries are allocated above.
    pub fn slot_count(&self) -> u16 {
        self.next_slot
    }

    /// Reserve a frame slot without naming it (scope objects, front-end
    /// temporaries).
    pub fn reserve_slot(&mut self) -> u16 {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }
}
