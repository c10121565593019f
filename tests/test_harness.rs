//! Shared fixtures for the end-to-end compiler tests.
//!
//! Builds a registry with a handful of user types and helpers for the
//! expression trees a front end would hand over.

#![allow(dead_code)]

use sable::compiler::expr::{Argument, Expr};
use sable::core::{DataType, Span, TypeHash};
use sable::registry::{TypeRegistry, ty};

/// A registry preloaded with the user types the scenarios need.
pub struct Fixture {
    pub types: TypeRegistry,
    /// Value type with two fields and no constructor.
    pub point: DataType,
    /// Value type with a user `++`.
    pub counter: DataType,
    /// Class with one- and two-argument indexers.
    pub table: DataType,
    /// Class with static methods that stand in for side effects.
    pub effects: DataType,
}

impl Fixture {
    pub fn new() -> Self {
        let mut types = TypeRegistry::with_builtins();

        let point = types
            .define_struct("Point")
            .field("X", DataType::INT32)
            .field("Y", DataType::INT32)
            .build()
            .expect("Point registers");

        let counter = ty(TypeHash::from_name("Counter"));
        types
            .define_struct("Counter")
            .field("Value", DataType::INT32)
            .operator("op_Increment", &[counter], counter)
            .build()
            .expect("Counter registers");

        let table = types
            .define_class("Table")
            .indexer(&[DataType::INT32], DataType::STRING, true, true)
            .indexer(&[DataType::INT32, DataType::INT32], DataType::INT32, true, true)
            .build()
            .expect("Table registers");

        let effects = types
            .define_class("Effects")
            .static_method("Fire", &[], DataType::BOOL)
            .static_method("Next", &[], DataType::INT32)
            .build()
            .expect("Effects registers");

        Self {
            types,
            point: ty(point),
            counter,
            table: ty(table),
            effects: ty(effects),
        }
    }

    /// `Effects.<method>()`
    pub fn effect(&self, method: &str) -> Expr {
        let callee = Expr::member(Expr::type_ref(self.effects, span()), method, span());
        Expr::invoke(callee, Vec::new(), span())
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

pub fn span() -> Span {
    Span::new(1, 1, 1)
}

pub fn name(text: &str) -> Expr {
    Expr::name(text, span())
}

pub fn int(value: i32) -> Expr {
    Expr::int(value, span())
}

pub fn string(text: &str) -> Expr {
    Expr::string(text, span())
}

pub fn index(target: &str, indices: Vec<Expr>) -> Expr {
    Expr::element_access(name(target), indices, span())
}

pub fn args(values: Vec<Expr>) -> Vec<Argument> {
    values.into_iter().map(Argument::value).collect()
}
