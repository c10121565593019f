//! Storage locations: loading, taking addresses and storing.
//!
//! A store runs in three steps. The target's prefix (instance, array and
//! index, address) is pushed first; for compound assignment it is
//! duplicated so the source can read the current value through
//! [`ExprKind::PreparedLoad`]. Then the source is emitted and finally the
//! store instruction or setter call consumes prefix and value.

use sable_core::{CompilationError, DataType, TypeHash, TypeSystem, primitives};

use super::{Expr, ExprKind};
use crate::bytecode::OpCode;
use crate::emit::{EmitContext, Prepared, Temp};
use crate::locals::Storage;

type Result<T> = std::result::Result<T, CompilationError>;

/// Whether values of `ty` are loaded and stored through an address with
/// `ldobj`/`stobj` rather than `ldind`/`stind`.
fn is_struct_object(ty: DataType, types: &dyn TypeSystem) -> bool {
    ty.is_named() && primitives::keyword(ty.type_hash).is_none() && !types.is_enum(ty) && types.is_value_type(ty)
}

fn load_indirect(ty: DataType, ec: &mut EmitContext<'_>) {
    let op = if is_struct_object(ty, ec.types) { OpCode::LdObj } else { OpCode::LdInd };
    ec.sink.emit_type(op, ty);
}

fn store_indirect(ty: DataType, ec: &mut EmitContext<'_>) {
    let op = if is_struct_object(ty, ec.types) { OpCode::StObj } else { OpCode::StInd };
    ec.sink.emit_type(op, ty);
}

fn call_op(virtual_call: bool) -> OpCode {
    if virtual_call { OpCode::CallVirt } else { OpCode::Call }
}

fn arg_count(count: usize) -> Result<u8> {
    u8::try_from(count).map_err(|_| CompilationError::internal("too many arguments for one call"))
}

/// Accessor methods of multi-dimensional arrays: `Get`, `Set` and
/// `Address`, taking one `int` per dimension (`Set` also the element).
pub(super) fn array_accessor(array: DataType, name: &str) -> Result<TypeHash> {
    let element = array
        .element_type()
        .ok_or_else(|| CompilationError::internal("array accessor on a non-array"))?;
    let mut params = vec![primitives::INT32; array.array_rank as usize];
    if name == "Set" {
        params.push(element.signature_hash());
    }
    Ok(TypeHash::from_method(array.signature_hash(), name, &params))
}

fn array_element(array: &Expr) -> Result<DataType> {
    array
        .data_type()
        .element_type()
        .ok_or_else(|| CompilationError::internal("element access on a non-array"))
}

/// Whether `expr` denotes storage whose address can be taken.
pub(super) fn is_addressable(expr: &Expr, types: &dyn TypeSystem) -> bool {
    match &expr.kind {
        ExprKind::Variable { .. } | ExprKind::ArrayAccess { .. } | ExprKind::Deref(_) | ExprKind::InitializerTarget => {
            true
        }
        ExprKind::This => types.is_value_type(expr.data_type()),
        ExprKind::Field { instance: None, .. } => true,
        ExprKind::Field {
            instance: Some(instance),
            ..
        } => !types.is_value_type(instance.data_type()) || is_addressable(instance, types),
        _ => false,
    }
}

/// The instance of a field access: a reference, or the address (else the
/// value) of a struct.
fn emit_field_instance(instance: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    if ec.types.is_value_type(instance.data_type()) && is_addressable(instance, ec.types) {
        emit_address(instance, ec)
    } else {
        instance.emit(ec)
    }
}

/// Push the receiver of a call to a method declared on `owner`.
///
/// Struct receivers are passed by address; a struct value that is not a
/// variable is copied into a temporary first, which the caller releases
/// after the call. Methods of reference types (`object`, interfaces) get
/// the value boxed.
pub(super) fn emit_receiver(instance: &Expr, owner: TypeHash, ec: &mut EmitContext<'_>) -> Result<Option<Temp>> {
    let ty = instance.data_type();
    if !ec.types.is_value_type(ty) || ty.is_pointer() {
        instance.emit(ec)?;
        return Ok(None);
    }
    if ec.types.is_reference_type(DataType::simple(owner)) {
        instance.emit(ec)?;
        ec.sink.emit_type(OpCode::Box, ty);
        return Ok(None);
    }
    if is_addressable(instance, ec.types) {
        emit_address(instance, ec)?;
        return Ok(None);
    }
    instance.emit(ec)?;
    let temp = ec.acquire_temp(ty);
    ec.store_temp(temp);
    ec.load_temp_address(temp);
    Ok(Some(temp))
}

fn release(temp: Option<Temp>, ec: &mut EmitContext<'_>) -> Result<()> {
    match temp {
        Some(temp) => ec.release_temp(temp),
        None => Ok(()),
    }
}

fn method_owner(method: TypeHash, ec: &EmitContext<'_>) -> TypeHash {
    ec.types.method(method).map(|m| m.owner).unwrap_or(primitives::OBJECT)
}

// ==========================================================================
// Loads
// ==========================================================================

pub(super) fn emit_load(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    let ty = expr.data_type();
    match &expr.kind {
        ExprKind::Variable { storage, .. } => {
            match *storage {
                Storage::Local(slot) => ec.sink.emit_slot(OpCode::LdLoc, slot),
                Storage::Param(index) => ec.sink.emit_slot(OpCode::LdArg, index),
                Storage::RefParam { index, .. } => {
                    ec.sink.emit_slot(OpCode::LdArg, index);
                    load_indirect(ty, ec);
                }
                Storage::Captured { scope, field } => {
                    ec.sink.emit_slot(OpCode::LdLoc, scope);
                    ec.sink.emit_member(OpCode::LdFld, field);
                }
            }
            Ok(())
        }
        ExprKind::This => {
            ec.sink.emit_slot(OpCode::LdArg, 0);
            if ec.types.is_value_type(ty) {
                load_indirect(ty, ec);
            }
            Ok(())
        }
        ExprKind::Base => {
            ec.sink.emit_slot(OpCode::LdArg, 0);
            Ok(())
        }
        ExprKind::Field { instance, field } => {
            match instance {
                None => ec.sink.emit_member(OpCode::LdSFld, *field),
                Some(instance) => {
                    emit_field_instance(instance, ec)?;
                    ec.sink.emit_member(OpCode::LdFld, *field);
                }
            }
            Ok(())
        }
        ExprKind::Property {
            instance,
            getter,
            virtual_call,
            name,
            ..
        } => {
            let getter = getter.ok_or_else(|| CompilationError::internal(format!("property '{name}' has no getter")))?;
            let temp = match instance {
                Some(instance) => emit_receiver(instance, method_owner(getter, ec), ec)?,
                None => None,
            };
            ec.sink.emit_call(call_op(*virtual_call), getter, 0);
            release(temp, ec)
        }
        ExprKind::ArrayAccess { array, indices } => {
            array.emit(ec)?;
            for index in indices {
                index.emit(ec)?;
            }
            let element = array_element(array)?;
            if indices.len() > 1 {
                let get = array_accessor(array.data_type(), "Get")?;
                ec.sink.emit_call(OpCode::Call, get, arg_count(indices.len())?);
            } else if ec.types.is_reference_type(element) {
                ec.sink.emit_type(OpCode::LdElemRef, element);
            } else {
                ec.sink.emit_type(OpCode::LdElem, element);
            }
            Ok(())
        }
        ExprKind::IndexerAccess {
            instance,
            args,
            getter,
            virtual_call,
            ..
        } => {
            let getter = getter.ok_or_else(|| CompilationError::internal("indexer has no getter"))?;
            let temp = emit_receiver(instance, method_owner(getter, ec), ec)?;
            for arg in args {
                arg.emit(ec)?;
            }
            ec.sink.emit_call(call_op(*virtual_call), getter, arg_count(args.len())?);
            release(temp, ec)
        }
        ExprKind::Deref(pointer) => {
            pointer.emit(ec)?;
            load_indirect(ty, ec);
            Ok(())
        }
        ExprKind::InitializerTarget => {
            let temp = ec.initializer_target()?;
            ec.load_temp(temp);
            Ok(())
        }
        _ => Err(CompilationError::internal("load of a non-variable")),
    }
}

/// Push the address of a variable.
pub(super) fn emit_address(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    match &expr.kind {
        ExprKind::Variable { storage, .. } => {
            match *storage {
                Storage::Local(slot) => ec.sink.emit_slot(OpCode::LdLocA, slot),
                Storage::Param(index) => ec.sink.emit_slot(OpCode::LdArgA, index),
                Storage::RefParam { index, .. } => ec.sink.emit_slot(OpCode::LdArg, index),
                Storage::Captured { scope, field } => {
                    ec.sink.emit_slot(OpCode::LdLoc, scope);
                    ec.sink.emit_member(OpCode::LdFldA, field);
                }
            }
            Ok(())
        }
        ExprKind::This if ec.types.is_value_type(expr.data_type()) => {
            ec.sink.emit_slot(OpCode::LdArg, 0);
            Ok(())
        }
        ExprKind::Field { instance, field } => {
            match instance {
                None => ec.sink.emit_member(OpCode::LdSFldA, *field),
                Some(instance) => {
                    emit_field_instance(instance, ec)?;
                    ec.sink.emit_member(OpCode::LdFldA, *field);
                }
            }
            Ok(())
        }
        ExprKind::ArrayAccess { array, indices } => {
            array.emit(ec)?;
            for index in indices {
                index.emit(ec)?;
            }
            if indices.len() > 1 {
                let address = array_accessor(array.data_type(), "Address")?;
                ec.sink.emit_call(OpCode::Call, address, arg_count(indices.len())?);
            } else {
                ec.sink.emit_type(OpCode::LdElemA, array_element(array)?);
            }
            Ok(())
        }
        ExprKind::Deref(pointer) => pointer.emit(ec),
        ExprKind::InitializerTarget => {
            let temp = ec.initializer_target()?;
            ec.load_temp_address(temp);
            Ok(())
        }
        _ => Err(CompilationError::internal("address of a non-variable")),
    }
}

/// Read the value of the target being assigned, through its prepared prefix.
pub(super) fn emit_prepared_load(expr: &Expr, ec: &mut EmitContext<'_>) -> Result<()> {
    let state = ec.current_prepared()?.clone();
    match &state.kind {
        Prepared::Local(slot) => ec.sink.emit_slot(OpCode::LdLoc, *slot),
        Prepared::Arg(index) => ec.sink.emit_slot(OpCode::LdArg, *index),
        Prepared::StaticField(field) => ec.sink.emit_member(OpCode::LdSFld, *field),
        Prepared::Address(ty) => load_indirect(*ty, ec),
        Prepared::Field(field) => ec.sink.emit_member(OpCode::LdFld, *field),
        Prepared::Accessor {
            getter, virtual_call, ..
        } => ec.sink.emit_call(call_op(*virtual_call), *getter, 0),
        Prepared::Spilled {
            temps,
            getter,
            virtual_call,
        } => {
            for temp in temps {
                ec.load_temp(*temp);
            }
            let args = arg_count(temps.len().saturating_sub(1))?;
            ec.sink.emit_call(call_op(*virtual_call), *getter, args);
        }
    }
    if state.keep_old {
        ec.sink.emit(OpCode::Dup);
        let old = ec.acquire_temp(expr.data_type());
        ec.store_temp(old);
        ec.set_kept_old(old)?;
    }
    Ok(())
}

// ==========================================================================
// Stores
// ==========================================================================

/// Where the final store goes once prefix and value are on the stack.
enum Location {
    Local(u16),
    Arg(u16),
    StaticField(TypeHash),
    Field(TypeHash),
    Address(DataType),
    Element(DataType),
    Setter {
        method: TypeHash,
        arg_count: u8,
        virtual_call: bool,
    },
}

struct Prefix {
    location: Location,
    /// How the source re-reads the target; compound assignment only.
    prepared: Option<Prepared>,
    /// Whether anything was pushed below the value.
    on_stack: bool,
    /// Temporaries to release after the store, in acquisition order.
    temps: Vec<Temp>,
}

impl Prefix {
    fn bare(location: Location, prepared: Prepared) -> Self {
        Self {
            location,
            prepared: Some(prepared),
            on_stack: false,
            temps: Vec::new(),
        }
    }
}

fn dup_if(compound: bool, ec: &mut EmitContext<'_>) {
    if compound {
        ec.sink.emit(OpCode::Dup);
    }
}

fn emit_prefix(target: &Expr, compound: bool, ec: &mut EmitContext<'_>) -> Result<Prefix> {
    let ty = target.data_type();
    let stacked = |location, prepared| Prefix {
        location,
        prepared: Some(prepared),
        on_stack: true,
        temps: Vec::new(),
    };
    match &target.kind {
        ExprKind::Variable { storage, .. } => Ok(match *storage {
            Storage::Local(slot) => Prefix::bare(Location::Local(slot), Prepared::Local(slot)),
            Storage::Param(index) => Prefix::bare(Location::Arg(index), Prepared::Arg(index)),
            Storage::RefParam { index, .. } => {
                ec.sink.emit_slot(OpCode::LdArg, index);
                dup_if(compound, ec);
                stacked(Location::Address(ty), Prepared::Address(ty))
            }
            Storage::Captured { scope, field } => {
                ec.sink.emit_slot(OpCode::LdLoc, scope);
                dup_if(compound, ec);
                stacked(Location::Field(field), Prepared::Field(field))
            }
        }),
        ExprKind::This | ExprKind::Deref(_) | ExprKind::InitializerTarget => {
            emit_address(target, ec)?;
            dup_if(compound, ec);
            Ok(stacked(Location::Address(ty), Prepared::Address(ty)))
        }
        ExprKind::Field { instance: None, field } => {
            Ok(Prefix::bare(Location::StaticField(*field), Prepared::StaticField(*field)))
        }
        ExprKind::Field {
            instance: Some(instance),
            field,
        } => {
            emit_field_instance(instance, ec)?;
            dup_if(compound, ec);
            Ok(stacked(Location::Field(*field), Prepared::Field(*field)))
        }
        ExprKind::ArrayAccess { array, indices } => {
            if compound {
                emit_address(target, ec)?;
                ec.sink.emit(OpCode::Dup);
                return Ok(stacked(Location::Address(ty), Prepared::Address(ty)));
            }
            array.emit(ec)?;
            for index in indices {
                index.emit(ec)?;
            }
            let location = if indices.len() > 1 {
                Location::Setter {
                    method: array_accessor(array.data_type(), "Set")?,
                    arg_count: arg_count(indices.len() + 1)?,
                    virtual_call: false,
                }
            } else {
                Location::Element(array_element(array)?)
            };
            Ok(Prefix {
                location,
                prepared: None,
                on_stack: true,
                temps: Vec::new(),
            })
        }
        ExprKind::Property {
            instance,
            getter,
            setter,
            virtual_call,
            name,
        } => {
            let setter = setter.ok_or_else(|| CompilationError::internal(format!("property '{name}' has no setter")))?;
            let location = Location::Setter {
                method: setter,
                arg_count: 1,
                virtual_call: *virtual_call,
            };
            let mut temps = Vec::new();
            if let Some(instance) = instance {
                temps.extend(emit_receiver(instance, method_owner(setter, ec), ec)?);
                dup_if(compound, ec);
            }
            let prepared = match (compound, getter) {
                (true, Some(getter)) => Some(Prepared::Accessor {
                    getter: *getter,
                    has_instance: instance.is_some(),
                    virtual_call: *virtual_call,
                }),
                (true, None) => return Err(CompilationError::internal(format!("property '{name}' has no getter"))),
                (false, _) => None,
            };
            Ok(Prefix {
                location,
                prepared,
                on_stack: instance.is_some(),
                temps,
            })
        }
        ExprKind::IndexerAccess {
            instance,
            args,
            getter,
            setter,
            virtual_call,
        } => {
            let setter = setter.ok_or_else(|| CompilationError::internal("indexer has no setter"))?;
            let location = Location::Setter {
                method: setter,
                arg_count: arg_count(args.len() + 1)?,
                virtual_call: *virtual_call,
            };
            let mut temps: Vec<Temp> = emit_receiver(instance, method_owner(setter, ec), ec)?.into_iter().collect();
            if !compound {
                for arg in args {
                    arg.emit(ec)?;
                }
                return Ok(Prefix {
                    location,
                    prepared: None,
                    on_stack: true,
                    temps,
                });
            }
            let getter = getter.ok_or_else(|| CompilationError::internal("indexer has no getter"))?;
            // The receiver and arguments are read twice; evaluate them once.
            let receiver_ty = if temps.is_empty() && !ec.types.is_value_type(instance.data_type()) {
                instance.data_type()
            } else {
                instance.data_type().pointer_to()
            };
            let mut spilled = Vec::with_capacity(args.len() + 1);
            let receiver = ec.acquire_temp(receiver_ty);
            ec.store_temp(receiver);
            spilled.push(receiver);
            for arg in args {
                arg.emit(ec)?;
                let temp = ec.acquire_temp(arg.data_type());
                ec.store_temp(temp);
                spilled.push(temp);
            }
            for temp in &spilled {
                ec.load_temp(*temp);
            }
            temps.extend(spilled.iter().copied());
            Ok(Prefix {
                location,
                prepared: Some(Prepared::Spilled {
                    temps: spilled,
                    getter,
                    virtual_call: *virtual_call,
                }),
                on_stack: true,
                temps,
            })
        }
        _ => Err(CompilationError::internal("store to a non-variable")),
    }
}

fn emit_store_to(location: &Location, ec: &mut EmitContext<'_>) {
    match *location {
        Location::Local(slot) => ec.sink.emit_slot(OpCode::StLoc, slot),
        Location::Arg(index) => ec.sink.emit_slot(OpCode::StArg, index),
        Location::StaticField(field) => ec.sink.emit_member(OpCode::StSFld, field),
        Location::Field(field) => ec.sink.emit_member(OpCode::StFld, field),
        Location::Address(ty) => store_indirect(ty, ec),
        Location::Element(element) => {
            let op = if ec.types.is_reference_type(element) { OpCode::StElemRef } else { OpCode::StElem };
            ec.sink.emit_type(op, element);
        }
        Location::Setter {
            method,
            arg_count,
            virtual_call,
        } => ec.sink.emit_call(call_op(virtual_call), method, arg_count),
    }
}

/// Store `source` into `target`.
///
/// With `leave_value` the assigned value (or, for `postfix`, the value
/// before the store) stays on the stack.
pub(super) fn emit_store(
    target: &Expr,
    source: &Expr,
    compound: bool,
    postfix: bool,
    leave_value: bool,
    ec: &mut EmitContext<'_>,
) -> Result<()> {
    // `s = new S()` zeroes the variable in place.
    if !compound
        && !leave_value
        && matches!(source.kind, ExprKind::NewValueType { ctor: None, .. })
        && is_addressable(target, ec.types)
    {
        emit_address(target, ec)?;
        ec.sink.emit_type(OpCode::InitObj, target.data_type());
        return Ok(());
    }

    // `v = new S(args)` runs the constructor on the variable's storage.
    if !compound && !leave_value && matches!(target.kind, ExprKind::Variable { .. }) {
        if let ExprKind::NewValueType { ctor: Some(ctor), args } = &source.kind {
            emit_address(target, ec)?;
            let argc = super::invocation::emit_args(args, ec)?;
            ec.sink.emit_call(OpCode::Call, *ctor, argc);
            return Ok(());
        }
    }

    let prefix = emit_prefix(target, compound, ec)?;
    let keep_old = compound && postfix && leave_value;
    if compound {
        let prepared = prefix
            .prepared
            .clone()
            .ok_or_else(|| CompilationError::internal("compound assignment without a prepared target"))?;
        ec.push_prepared(prepared, keep_old);
    }

    source.emit(ec)?;

    let mut copy = None;
    if leave_value && !keep_old {
        ec.sink.emit(OpCode::Dup);
        if prefix.on_stack {
            let temp = ec.acquire_temp(source.data_type());
            ec.store_temp(temp);
            copy = Some(temp);
        }
    }

    emit_store_to(&prefix.location, ec);

    if compound {
        let state = ec.pop_prepared()?;
        if let Some(old) = state.old {
            ec.load_temp(old);
            ec.release_temp(old)?;
        }
    }
    if let Some(temp) = copy {
        ec.load_temp(temp);
        ec.release_temp(temp)?;
    }
    for temp in prefix.temps.into_iter().rev() {
        ec.release_temp(temp)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::test_support::*;
    use crate::locals::LocalTable;
    use crate::operators::{BinaryOp, IncDecMode};
    use sable_core::ParamModifier;
    use sable_registry::{TypeRegistry, ty};

    #[test]
    fn ref_parameters_load_through_their_address() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare_param("r", DataType::INT32, 1, ParamModifier::Ref);
        let expr = resolve(&reg, &mut locals, Expr::name("r", span())).unwrap();
        emit_value(&reg, &locals, &expr).assert_opcodes(&[OpCode::LdArg, OpCode::LdInd]);
    }

    #[test]
    fn compound_array_element_goes_through_its_address() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("arr", DataType::array_of(DataType::INT32, 1), true);
        int_local(&mut locals, "i");
        let target = Expr::element_access(Expr::name("arr", span()), vec![Expr::name("i", span())], span());
        let expr = Expr::compound_assign(BinaryOp::Addition, target, Expr::int(1, span()), span());
        let expr = resolve(&reg, &mut locals, expr).unwrap();
        emit_statement(&reg, &locals, &expr).assert_opcodes(&[
            OpCode::LdLoc,
            OpCode::LdLoc,
            OpCode::LdElemA,
            OpCode::Dup,
            OpCode::LdInd,
            OpCode::PushOne,
            OpCode::Add,
            OpCode::StInd,
        ]);
    }

    #[test]
    fn plain_array_store_uses_stelem() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        locals.declare("names", DataType::array_of(DataType::STRING, 1), true);
        let target = Expr::element_access(Expr::name("names", span()), vec![Expr::int(0, span())], span());
        let expr = resolve(&reg, &mut locals, Expr::assign(target, Expr::string("a", span()), span())).unwrap();
        emit_statement(&reg, &locals, &expr).assert_opcodes(&[
            OpCode::LdLoc,
            OpCode::PushZero,
            OpCode::Constant,
            OpCode::StElemRef,
        ]);
    }

    #[test]
    fn postfix_value_keeps_the_old_value() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        int_local(&mut locals, "n");
        let expr = Expr::inc_dec(IncDecMode::PostIncrement, Expr::name("n", span()), span());
        let expr = resolve(&reg, &mut locals, expr).unwrap();
        emit_value(&reg, &locals, &expr).assert_opcodes(&[
            OpCode::LdLoc,
            OpCode::Dup,
            OpCode::StLoc,
            OpCode::PushOne,
            OpCode::Add,
            OpCode::StLoc,
            OpCode::LdLoc,
        ]);
    }

    #[test]
    fn assignment_as_value_duplicates() {
        let reg = TypeRegistry::with_builtins();
        let mut locals = LocalTable::new();
        int_local(&mut locals, "a");
        let expr = resolve(&reg, &mut locals, Expr::assign(Expr::name("a", span()), Expr::int(5, span()), span())).unwrap();
        emit_value(&reg, &locals, &expr).assert_opcodes(&[OpCode::Constant, OpCode::Dup, OpCode::StLoc]);
    }

    #[test]
    fn compound_indexer_spills_its_arguments() {
        let mut reg = TypeRegistry::with_builtins();
        let table = reg
            .define_class("Table")
            .indexer(&[DataType::STRING], DataType::INT32, true, true)
            .build()
            .unwrap();
        let mut locals = LocalTable::new();
        locals.declare("t", ty(table), true);
        let target = Expr::element_access(Expr::name("t", span()), vec![Expr::string("k", span())], span());
        let expr = Expr::compound_assign(BinaryOp::Addition, target, Expr::int(2, span()), span());
        let expr = resolve(&reg, &mut locals, expr).unwrap();
        let chunk = emit_statement(&reg, &locals, &expr);
        chunk.assert_opcodes(&[
            OpCode::LdLoc,    // t
            OpCode::StLoc,    // spill t
            OpCode::Constant, // "k"
            OpCode::StLoc,    // spill "k"
            OpCode::LdLoc,
            OpCode::LdLoc,
            OpCode::LdLoc,
            OpCode::LdLoc,
            OpCode::Call,
            OpCode::Constant,
            OpCode::Add,
            OpCode::Call,
        ]);
    }

    #[test]
    fn multi_dimensional_accessors_are_distinct() {
        let grid = DataType::array_of(DataType::INT32, 2);
        let get = array_accessor(grid, "Get").unwrap();
        let set = array_accessor(grid, "Set").unwrap();
        assert_ne!(get, set);
        assert!(array_accessor(DataType::INT32, "Get").is_err());
    }
}
