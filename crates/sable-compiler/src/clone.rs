//! Deep copies of expression trees.
//!
//! A syntactic initializer resolved in more than one context needs its own
//! copy per context. Locals referenced by the tree may be renamed on the way
//! through a [`CloneContext`].

use rustc_hash::FxHashMap;

use crate::expr::{Expr, ExprKind};
use crate::locals::{LocalId, Storage};

/// Identity remapping applied while cloning.
#[derive(Debug, Clone, Default)]
pub struct CloneContext {
    locals: FxHashMap<LocalId, (LocalId, Option<Storage>)>,
}

impl CloneContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// References to `from` become references to `to`, keeping their storage.
    pub fn map_local(&mut self, from: LocalId, to: LocalId) -> &mut Self {
        self.locals.insert(from, (to, None));
        self
    }

    /// Like [`CloneContext::map_local`], with resolved variables moved to
    /// `storage`.
    pub fn map_variable(&mut self, from: LocalId, to: LocalId, storage: Storage) -> &mut Self {
        self.locals.insert(from, (to, Some(storage)));
        self
    }

    pub fn local(&self, id: LocalId) -> LocalId {
        self.locals.get(&id).map_or(id, |&(to, _)| to)
    }

    fn remap(&self, expr: &mut Expr) {
        match &mut expr.kind {
            ExprKind::Local(id) => *id = self.local(*id),
            ExprKind::Variable { id, storage } => {
                if let Some(&(to, moved)) = self.locals.get(id) {
                    *id = to;
                    if let Some(moved) = moved {
                        *storage = moved;
                    }
                }
            }
            _ => {}
        }
        for child in expr.children_mut() {
            self.remap(child);
        }
    }
}

impl Expr {
    /// Copy the whole tree, remapping locals through `ctx`.
    pub fn clone_with(&self, ctx: &CloneContext) -> Expr {
        let mut copy = self.clone();
        if !ctx.locals.is_empty() {
            ctx.remap(&mut copy);
        }
        copy
    }
}
