//! Expression nodes: resolution and emission.
//!
//! The front end builds an [`Expr`] tree from syntax. [`Expr::resolve`]
//! type-checks it bottom-up and rewrites it into resolved forms (operator
//! calls, folded constants, conversions, lvalues). Emission then walks the
//! resolved tree against an [`EmitContext`] without further checking.
//!
//! ```
//! use sable_compiler::expr::Expr;
//! use sable_compiler::operators::BinaryOp;
//! use sable_compiler::{BestMatchResolver, CompilerOptions, LocalTable, ResolveContext};
//! use sable_core::{DataType, Diagnostics, Span};
//! use sable_registry::TypeRegistry;
//!
//! let types = TypeRegistry::with_builtins();
//! let mut diagnostics = Diagnostics::new();
//! let mut locals = LocalTable::new();
//! let mut rc = ResolveContext::new(&types, &BestMatchResolver, &mut diagnostics, &mut locals, CompilerOptions::default());
//!
//! let span = Span::new(1, 1, 5);
//! let sum = Expr::binary(BinaryOp::Addition, Expr::int(1, span), Expr::int(2, span), span);
//! let folded = sum.resolve(&mut rc).unwrap();
//! assert_eq!(folded.ty, Some(DataType::INT32));
//! assert!(folded.constant().is_some());
//! ```

mod access;
mod array;
mod assign;
mod binary;
mod cast;
mod concat;
mod conditional;
mod incdec;
mod invocation;
mod literal;
mod lvalue;
mod member;
mod name;
mod new;
mod pointer;
mod type_query;
mod unary;

pub use cast::implicit_conversion;
pub use literal::default_value;

use sable_core::{CompilationError, DataType, ExprClass, ParamModifier, Span, TypeHash};

use crate::bytecode::OpCode;
use crate::constant::{ConstValue, Constant};
use crate::context::{ResolveContext, ResolveFlags};
use crate::conversion::ConversionKind;
use crate::emit::{EmitContext, Label};
use crate::locals::{LocalId, Storage};
use crate::operators::{BinaryOp, IncDecMode, UnaryOp};

type Result<T> = std::result::Result<T, CompilationError>;

/// An argument with its passing mode.
#[derive(Debug, Clone)]
pub struct Argument {
    pub expr: Expr,
    pub modifier: ParamModifier,
}

impl Argument {
    pub fn value(expr: Expr) -> Self {
        Self {
            expr,
            modifier: ParamModifier::None,
        }
    }

    pub fn by_ref(expr: Expr) -> Self {
        Self {
            expr,
            modifier: ParamModifier::Ref,
        }
    }

    pub fn out(expr: Expr) -> Self {
        Self {
            expr,
            modifier: ParamModifier::Out,
        }
    }
}

/// One element of an object or collection initializer.
#[derive(Debug, Clone)]
pub enum InitElement {
    /// `Name = value` or `Name = { ... }`.
    Member {
        name: String,
        value: InitValue,
        span: Span,
    },
    /// A collection element: the arguments of one `Add` call.
    Item { args: Vec<Expr>, span: Span },
}

#[derive(Debug, Clone)]
pub enum InitValue {
    Expr(Expr),
    Nested(Vec<InitElement>),
}

/// A (possibly nested) array initializer element.
#[derive(Debug, Clone)]
pub enum ArrayInit {
    Value(Expr),
    List(Vec<ArrayInit>, Span),
}

/// The node kinds.
///
/// The first group is built by the front end. Resolution replaces them with
/// the second group; `This`, `Base`, `TypeRef`, `Namespace` and
/// `Conditional` appear in both.
#[derive(Debug, Clone)]
pub enum ExprKind {
    // ---- front end ----
    Literal(ConstValue),
    Name(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    IncDec {
        mode: IncDecMode,
        operand: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        source: Box<Expr>,
    },
    CompoundAssign {
        op: BinaryOp,
        target: Box<Expr>,
        source: Box<Expr>,
    },
    Cast {
        target: DataType,
        operand: Box<Expr>,
    },
    MemberAccess {
        target: Box<Expr>,
        name: String,
    },
    Invocation {
        callee: Box<Expr>,
        args: Vec<Argument>,
    },
    New {
        ty: DataType,
        args: Vec<Argument>,
        initializer: Option<Vec<InitElement>>,
    },
    /// `new T[n, m] { ... }`; `element` is `None` for `new[] { ... }`.
    ArrayCreation {
        element: Option<DataType>,
        rank: u8,
        sizes: Vec<Expr>,
        initializer: Option<Vec<ArrayInit>>,
    },
    /// A bare `{ ... }` array initializer.
    ArrayInitializer(Vec<ArrayInit>),
    ElementAccess {
        target: Box<Expr>,
        indices: Vec<Expr>,
    },
    AddressOf {
        operand: Box<Expr>,
        /// Appears as the initializer of a `fixed` statement.
        in_fixed: bool,
    },
    Indirection(Box<Expr>),
    /// `checked(...)` or `unchecked(...)`.
    Checked {
        checked: bool,
        inner: Box<Expr>,
    },
    Is {
        operand: Box<Expr>,
        ty: DataType,
    },
    As {
        operand: Box<Expr>,
        ty: DataType,
    },
    TypeOf(DataType),
    SizeOf(DataType),
    Default(DataType),
    /// `stackalloc T[count]`
    StackAlloc {
        element: DataType,
        count: Box<Expr>,
    },

    Local(LocalId),

    // ---- both ----
    This,
    Base,
    TypeRef(DataType),
    Namespace(String),
    Conditional {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },

    // ---- resolved ----
    /// A local or parameter with its storage.
    Variable {
        id: LocalId,
        storage: Storage,
    },
    Constant(Constant),
    /// A constant result whose discarded operand must still run.
    SideEffectConstant {
        constant: Constant,
        side_effect: Box<Expr>,
    },
    Field {
        instance: Option<Box<Expr>>,
        field: TypeHash,
    },
    Property {
        instance: Option<Box<Expr>>,
        name: String,
        getter: Option<TypeHash>,
        setter: Option<TypeHash>,
        virtual_call: bool,
    },
    Event {
        instance: Option<Box<Expr>>,
        name: String,
        add: TypeHash,
        remove: TypeHash,
    },
    MethodGroup {
        instance: Option<Box<Expr>>,
        name: String,
        methods: Vec<TypeHash>,
        /// Bound through `base`: calls are non-virtual.
        non_virtual: bool,
        /// The instance is an implicit `this`.
        implicit: bool,
    },
    Call {
        method: TypeHash,
        instance: Option<Box<Expr>>,
        args: Vec<Expr>,
        virtual_call: bool,
    },
    /// A user-defined operator, conversion or builtin operator method.
    OperatorCall {
        method: TypeHash,
        args: Vec<Expr>,
    },
    NewObject {
        ctor: TypeHash,
        args: Vec<Expr>,
    },
    /// A value type instance; `ctor` is `None` for zero initialization.
    NewValueType {
        ctor: Option<TypeHash>,
        args: Vec<Expr>,
    },
    /// `new T()` on a type parameter.
    NewTypeParameter {
        create: TypeHash,
    },
    ObjectInitializer {
        creation: Box<Expr>,
        steps: Vec<Expr>,
    },
    /// The object an enclosing initializer is building.
    InitializerTarget,
    PredefinedUnary {
        op: UnaryOp,
        operand: Box<Expr>,
        checked: bool,
    },
    /// Both operands already converted to `operand_ty`.
    PredefinedBinary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        operand_ty: DataType,
        checked: bool,
    },
    /// Short-circuit `&&`/`||` on `bool`.
    Logical {
        is_and: bool,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Short-circuit `&&`/`||` through user `&`/`|` and `false`/`true`.
    UserLogical {
        is_and: bool,
        left: Box<Expr>,
        right: Box<Expr>,
        operator: TypeHash,
        truth: TypeHash,
    },
    StringConcat {
        parts: Vec<Expr>,
        method: TypeHash,
        /// Parts are passed packed into an array of `element`.
        array: Option<DataType>,
    },
    /// `p + n`, `n + p`, `p - n`. The offset is already converted.
    PointerOffset {
        pointer: Box<Expr>,
        offset: Box<Expr>,
        element_size: u32,
        subtract: bool,
        pointer_first: bool,
    },
    PointerDiff {
        left: Box<Expr>,
        right: Box<Expr>,
        element_size: u32,
    },
    Convert {
        operand: Box<Expr>,
        kind: ConversionKind,
        checked: bool,
    },
    /// `target = source`. For compound forms the source reads the target
    /// through `PreparedLoad`; `postfix` yields the value before the store.
    Assignment {
        target: Box<Expr>,
        source: Box<Expr>,
        compound: bool,
        postfix: bool,
    },
    /// `e += handler` / `e -= handler`.
    EventAssignment {
        event: Box<Expr>,
        handler: Box<Expr>,
        add: bool,
    },
    /// The current value of the assignment target being prepared.
    PreparedLoad,
    ArrayAccess {
        array: Box<Expr>,
        indices: Vec<Expr>,
    },
    IndexerAccess {
        instance: Box<Expr>,
        args: Vec<Expr>,
        getter: Option<TypeHash>,
        setter: Option<TypeHash>,
        virtual_call: bool,
    },
    /// `*p`
    Deref(Box<Expr>),
    /// `&v` of a variable.
    AddressOfVariable(Box<Expr>),
    /// A `ref`/`out` argument, passed by address.
    RefArgument(Box<Expr>),
    ArrayNew {
        element: DataType,
        sizes: Vec<Expr>,
        /// Row-major element values.
        elements: Option<Vec<Expr>>,
    },
    /// `default(T)` of a type with no constant default.
    DefaultValue,
    /// `e is T` decided at run time.
    TypeTest {
        operand: Box<Expr>,
        target: DataType,
    },
    /// `e as T` through `isinst`; the target is the node's type.
    TypeAs {
        operand: Box<Expr>,
    },
    /// The `Type` object of a type.
    TypeToken(DataType),
    /// `sizeof(T)` of a type without a predefined size.
    SizeOfType(DataType),
    /// `count` elements of `element` on the stack; `count` is an `int`.
    StackAllocation {
        element: DataType,
        count: Box<Expr>,
    },
}

/// An expression node.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    /// Set by resolution.
    pub ty: Option<DataType>,
    /// `Invalid` until resolved.
    pub class: ExprClass,
    pub span: Span,
}

// ==========================================================================
// Construction
// ==========================================================================

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            ty: None,
            class: ExprClass::Invalid,
            span,
        }
    }

    /// A node that is born resolved.
    pub(crate) fn resolved(kind: ExprKind, ty: DataType, class: ExprClass, span: Span) -> Self {
        Self {
            kind,
            ty: Some(ty),
            class,
            span,
        }
    }

    pub(crate) fn value(kind: ExprKind, ty: DataType, span: Span) -> Self {
        Self::resolved(kind, ty, ExprClass::Value, span)
    }

    pub(crate) fn from_constant(constant: Constant, span: Span) -> Self {
        let ty = constant.ty;
        Self::value(ExprKind::Constant(constant), ty, span)
    }

    pub fn literal(value: ConstValue, span: Span) -> Self {
        Self::new(ExprKind::Literal(value), span)
    }

    pub fn int(value: i32, span: Span) -> Self {
        Self::literal(ConstValue::Int(value), span)
    }

    pub fn bool(value: bool, span: Span) -> Self {
        Self::literal(ConstValue::Bool(value), span)
    }

    pub fn string(value: impl Into<String>, span: Span) -> Self {
        Self::literal(ConstValue::String(value.into()), span)
    }

    pub fn null(span: Span) -> Self {
        Self::literal(ConstValue::Null, span)
    }

    pub fn name(name: impl Into<String>, span: Span) -> Self {
        Self::new(ExprKind::Name(name.into()), span)
    }

    pub fn local(id: LocalId, span: Span) -> Self {
        Self::new(ExprKind::Local(id), span)
    }

    pub fn this(span: Span) -> Self {
        Self::new(ExprKind::This, span)
    }

    pub fn base(span: Span) -> Self {
        Self::new(ExprKind::Base, span)
    }

    pub fn type_ref(ty: DataType, span: Span) -> Self {
        Self::new(ExprKind::TypeRef(ty), span)
    }

    pub fn unary(op: UnaryOp, operand: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        )
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn inc_dec(mode: IncDecMode, operand: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::IncDec {
                mode,
                operand: Box::new(operand),
            },
            span,
        )
    }

    pub fn assign(target: Expr, source: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Assign {
                target: Box::new(target),
                source: Box::new(source),
            },
            span,
        )
    }

    pub fn compound_assign(op: BinaryOp, target: Expr, source: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::CompoundAssign {
                op,
                target: Box::new(target),
                source: Box::new(source),
            },
            span,
        )
    }

    pub fn cast(target: DataType, operand: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Cast {
                target,
                operand: Box::new(operand),
            },
            span,
        )
    }

    pub fn member(target: Expr, name: impl Into<String>, span: Span) -> Self {
        Self::new(
            ExprKind::MemberAccess {
                target: Box::new(target),
                name: name.into(),
            },
            span,
        )
    }

    pub fn invoke(callee: Expr, args: Vec<Argument>, span: Span) -> Self {
        Self::new(
            ExprKind::Invocation {
                callee: Box::new(callee),
                args,
            },
            span,
        )
    }

    pub fn new_object(ty: DataType, args: Vec<Argument>, initializer: Option<Vec<InitElement>>, span: Span) -> Self {
        Self::new(ExprKind::New { ty, args, initializer }, span)
    }

    pub fn new_array(element: DataType, sizes: Vec<Expr>, initializer: Option<Vec<ArrayInit>>, span: Span) -> Self {
        let rank = sizes.len().max(1) as u8;
        Self::new(
            ExprKind::ArrayCreation {
                element: Some(element),
                rank,
                sizes,
                initializer,
            },
            span,
        )
    }

    /// `new T[,] { ... }` with the rank given and sizes taken from the initializer.
    pub fn new_array_of_rank(element: DataType, rank: u8, initializer: Vec<ArrayInit>, span: Span) -> Self {
        Self::new(
            ExprKind::ArrayCreation {
                element: Some(element),
                rank,
                sizes: Vec::new(),
                initializer: Some(initializer),
            },
            span,
        )
    }

    /// `new[] { ... }`
    pub fn implicit_array(initializer: Vec<ArrayInit>, span: Span) -> Self {
        Self::new(
            ExprKind::ArrayCreation {
                element: None,
                rank: 1,
                sizes: Vec::new(),
                initializer: Some(initializer),
            },
            span,
        )
    }

    pub fn array_initializer(elements: Vec<ArrayInit>, span: Span) -> Self {
        Self::new(ExprKind::ArrayInitializer(elements), span)
    }

    pub fn element_access(target: Expr, indices: Vec<Expr>, span: Span) -> Self {
        Self::new(
            ExprKind::ElementAccess {
                target: Box::new(target),
                indices,
            },
            span,
        )
    }

    pub fn conditional(condition: Expr, when_true: Expr, when_false: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                when_true: Box::new(when_true),
                when_false: Box::new(when_false),
            },
            span,
        )
    }

    pub fn address_of(operand: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::AddressOf {
                operand: Box::new(operand),
                in_fixed: false,
            },
            span,
        )
    }

    /// `&v` as the initializer of a `fixed` statement.
    pub fn fixed_address_of(operand: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::AddressOf {
                operand: Box::new(operand),
                in_fixed: true,
            },
            span,
        )
    }

    pub fn deref(operand: Expr, span: Span) -> Self {
        Self::new(ExprKind::Indirection(Box::new(operand)), span)
    }

    pub fn checked(checked: bool, inner: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Checked {
                checked,
                inner: Box::new(inner),
            },
            span,
        )
    }

    pub fn is_type(operand: Expr, ty: DataType, span: Span) -> Self {
        Self::new(
            ExprKind::Is {
                operand: Box::new(operand),
                ty,
            },
            span,
        )
    }

    pub fn as_type(operand: Expr, ty: DataType, span: Span) -> Self {
        Self::new(
            ExprKind::As {
                operand: Box::new(operand),
                ty,
            },
            span,
        )
    }

    pub fn type_of(ty: DataType, span: Span) -> Self {
        Self::new(ExprKind::TypeOf(ty), span)
    }

    pub fn size_of(ty: DataType, span: Span) -> Self {
        Self::new(ExprKind::SizeOf(ty), span)
    }

    pub fn default_of(ty: DataType, span: Span) -> Self {
        Self::new(ExprKind::Default(ty), span)
    }

    pub fn stack_alloc(element: DataType, count: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::StackAlloc {
                element,
                count: Box::new(count),
            },
            span,
        )
    }
}

// ==========================================================================
// Queries
// ==========================================================================

impl Expr {
    /// The resolved type. Only meaningful after resolution.
    pub fn data_type(&self) -> DataType {
        self.ty.unwrap_or(DataType::VOID)
    }

    pub fn is_resolved(&self) -> bool {
        self.class.is_resolved()
    }

    pub fn constant(&self) -> Option<&Constant> {
        match &self.kind {
            ExprKind::Constant(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_null_literal(&self) -> bool {
        self.constant().is_some_and(Constant::is_null)
    }

    /// Whether evaluating the node can be observed. Constants, locals,
    /// fields and `this` cannot.
    pub fn has_side_effects(&self) -> bool {
        match &self.kind {
            ExprKind::Constant(_)
            | ExprKind::Variable { .. }
            | ExprKind::This
            | ExprKind::Base
            | ExprKind::InitializerTarget
            | ExprKind::TypeRef(_)
            | ExprKind::DefaultValue
            | ExprKind::TypeToken(_)
            | ExprKind::SizeOfType(_) => false,
            ExprKind::TypeTest { operand, .. } | ExprKind::TypeAs { operand } => operand.has_side_effects(),
            ExprKind::Field { instance, .. } => instance.as_ref().is_some_and(|i| i.has_side_effects()),
            _ => true,
        }
    }

    /// Whether both nodes denote the same variable (`x == x`).
    pub fn is_same_variable(&self, other: &Expr) -> bool {
        match (&self.kind, &other.kind) {
            (ExprKind::Variable { id: a, .. }, ExprKind::Variable { id: b, .. }) => a == b,
            (ExprKind::This, ExprKind::This) => true,
            (
                ExprKind::Field {
                    instance: ia,
                    field: fa,
                },
                ExprKind::Field {
                    instance: ib,
                    field: fb,
                },
            ) => {
                fa == fb
                    && match (ia, ib) {
                        (None, None) => true,
                        (Some(a), Some(b)) => a.is_same_variable(b),
                        _ => false,
                    }
            }
            _ => false,
        }
    }

    /// Mutable references to every direct child node.
    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        use ExprKind::*;
        let mut out: Vec<&mut Expr> = Vec::new();
        match &mut self.kind {
            Literal(_) | Name(_) | Local(_) | This | Base | TypeRef(_) | Namespace(_) | Constant(_)
            | Variable { .. } | NewTypeParameter { .. } | InitializerTarget | PreparedLoad | DefaultValue
            | TypeOf(_) | SizeOf(_) | Default(_) | TypeToken(_) | SizeOfType(_) => {}
            Unary { operand, .. }
            | IncDec { operand, .. }
            | Cast { operand, .. }
            | Indirection(operand)
            | AddressOf { operand, .. }
            | PredefinedUnary { operand, .. }
            | Convert { operand, .. }
            | Deref(operand)
            | AddressOfVariable(operand)
            | RefArgument(operand)
            | Is { operand, .. }
            | As { operand, .. }
            | TypeTest { operand, .. }
            | TypeAs { operand } => out.push(operand),
            StackAlloc { count, .. } | StackAllocation { count, .. } => out.push(count),
            Checked { inner, .. } => out.push(inner),
            MemberAccess { target, .. } => out.push(target),
            SideEffectConstant { side_effect, .. } => out.push(side_effect),
            Binary { left, right, .. }
            | PredefinedBinary { left, right, .. }
            | Logical { left, right, .. }
            | UserLogical { left, right, .. }
            | PointerDiff { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            PointerOffset { pointer, offset, .. } => {
                out.push(pointer);
                out.push(offset);
            }
            Assign { target, source }
            | CompoundAssign { target, source, .. }
            | Assignment { target, source, .. } => {
                out.push(target);
                out.push(source);
            }
            EventAssignment { event, handler, .. } => {
                out.push(event);
                out.push(handler);
            }
            Invocation { callee, args } => {
                out.push(callee);
                out.extend(args.iter_mut().map(|a| &mut a.expr));
            }
            New { args, initializer, .. } => {
                out.extend(args.iter_mut().map(|a| &mut a.expr));
                if let Some(elements) = initializer {
                    init_children(elements, &mut out);
                }
            }
            ArrayCreation { sizes, initializer, .. } => {
                out.extend(sizes.iter_mut());
                if let Some(items) = initializer {
                    array_init_children(items, &mut out);
                }
            }
            ArrayInitializer(items) => array_init_children(items, &mut out),
            ElementAccess { target, indices } => {
                out.push(target);
                out.extend(indices.iter_mut());
            }
            Conditional {
                condition,
                when_true,
                when_false,
            } => {
                out.push(condition);
                out.push(when_true);
                out.push(when_false);
            }
            Field { instance, .. } | Property { instance, .. } | Event { instance, .. } | MethodGroup { instance, .. } => {
                if let Some(instance) = instance {
                    out.push(instance);
                }
            }
            Call { instance, args, .. } => {
                if let Some(instance) = instance {
                    out.push(instance);
                }
                out.extend(args.iter_mut());
            }
            OperatorCall { args, .. } | NewObject { args, .. } | NewValueType { args, .. } => out.extend(args.iter_mut()),
            ObjectInitializer { creation, steps } => {
                out.push(creation);
                out.extend(steps.iter_mut());
            }
            StringConcat { parts, .. } => out.extend(parts.iter_mut()),
            ArrayAccess { array, indices } => {
                out.push(array);
                out.extend(indices.iter_mut());
            }
            IndexerAccess { instance, args, .. } => {
                out.push(instance);
                out.extend(args.iter_mut());
            }
            ArrayNew { sizes, elements, .. } => {
                out.extend(sizes.iter_mut());
                if let Some(elements) = elements {
                    out.extend(elements.iter_mut());
                }
            }
        }
        out
    }
}

fn init_children<'e>(elements: &'e mut [InitElement], out: &mut Vec<&'e mut Expr>) {
    for element in elements {
        match element {
            InitElement::Member {
                value: InitValue::Expr(e),
                ..
            } => out.push(e),
            InitElement::Member {
                value: InitValue::Nested(nested),
                ..
            } => init_children(nested, out),
            InitElement::Item { args, .. } => out.extend(args.iter_mut()),
        }
    }
}

fn array_init_children<'e>(items: &'e mut [ArrayInit], out: &mut Vec<&'e mut Expr>) {
    for item in items {
        match item {
            ArrayInit::Value(e) => out.push(e),
            ArrayInit::List(nested, _) => array_init_children(nested, out),
        }
    }
}

// ==========================================================================
// Resolution
// ==========================================================================

impl Expr {
    /// Resolve the node. Already resolved nodes are returned unchanged.
    ///
    /// The result may denote a value, a variable, a property or indexer, a
    /// method group, a type or a namespace; use [`Expr::resolve_value`]
    /// where only values are legal.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve(self, rc: &mut ResolveContext<'_>) -> Result<Expr> {
        if self.is_resolved() {
            return Ok(self);
        }
        let span = self.span;
        match self.kind {
            ExprKind::Literal(value) => Ok(literal::resolve_literal(value, span)),
            ExprKind::Name(name) => name::resolve_name(&name, span, rc),
            ExprKind::Local(id) => name::resolve_local(id, span, true, rc),
            ExprKind::This => name::resolve_this(span, rc),
            ExprKind::Base => name::resolve_base(span, rc),
            ExprKind::TypeRef(ty) => Ok(Expr::resolved(ExprKind::TypeRef(ty), ty, ExprClass::Type, span)),
            ExprKind::Namespace(ns) => Ok(Expr::resolved(
                ExprKind::Namespace(ns),
                DataType::VOID,
                ExprClass::Namespace,
                span,
            )),
            ExprKind::Unary { op, operand } => unary::resolve_unary(op, *operand, span, rc),
            ExprKind::Binary { op, left, right } => binary::resolve_binary(op, *left, *right, span, rc),
            ExprKind::IncDec { mode, operand } => incdec::resolve_inc_dec(mode, *operand, span, rc),
            ExprKind::Assign { target, source } => assign::resolve_assign(*target, *source, span, rc),
            ExprKind::CompoundAssign { op, target, source } => {
                assign::resolve_compound_assign(op, *target, *source, span, rc)
            }
            ExprKind::Cast { target, operand } => cast::resolve_cast(target, *operand, span, rc),
            ExprKind::MemberAccess { target, name } => member::resolve_member_access(*target, &name, span, rc),
            ExprKind::Invocation { callee, args } => invocation::resolve_invocation(*callee, args, span, rc),
            ExprKind::New { ty, args, initializer } => new::resolve_new(ty, args, initializer, span, rc),
            ExprKind::ArrayCreation {
                element,
                rank,
                sizes,
                initializer,
            } => array::resolve_array_creation(element, rank, sizes, initializer, span, rc),
            ExprKind::ArrayInitializer(_) => Err(CompilationError::ArrayInitializerContext { span }),
            ExprKind::ElementAccess { target, indices } => access::resolve_element_access(*target, indices, span, rc),
            ExprKind::Conditional {
                condition,
                when_true,
                when_false,
            } => conditional::resolve_conditional(*condition, *when_true, *when_false, span, rc),
            ExprKind::AddressOf { operand, in_fixed } => pointer::resolve_address_of(*operand, in_fixed, span, rc),
            ExprKind::Indirection(operand) => pointer::resolve_indirection(*operand, span, rc),
            ExprKind::Checked { checked, inner } => {
                rc.with_flags(ResolveFlags::CHECKED, checked, |rc| inner.resolve(rc))
            }
            ExprKind::Is { operand, ty } => type_query::resolve_is(*operand, ty, span, rc),
            ExprKind::As { operand, ty } => type_query::resolve_as(*operand, ty, span, rc),
            ExprKind::TypeOf(ty) => type_query::resolve_typeof(ty, span, rc),
            ExprKind::SizeOf(ty) => type_query::resolve_sizeof(ty, span, rc),
            ExprKind::Default(ty) => type_query::resolve_default(ty, span, rc),
            ExprKind::StackAlloc { element, count } => pointer::resolve_stack_alloc(element, *count, span, rc),
            kind => Err(CompilationError::internal(format!(
                "node {} is resolved but carries no class",
                kind_name(&kind)
            ))),
        }
    }

    /// Resolve to something that has a value: a value, variable, property
    /// or indexer with a getter.
    pub fn resolve_value(self, rc: &mut ResolveContext<'_>) -> Result<Expr> {
        let expr = self.resolve(rc)?;
        expr.into_value(rc)
    }

    /// Check that an already resolved node can be read.
    pub(crate) fn into_value(self, rc: &mut ResolveContext<'_>) -> Result<Expr> {
        match self.class {
            ExprClass::Value | ExprClass::Variable => Ok(self),
            ExprClass::PropertyAccess | ExprClass::IndexerAccess => {
                let has_getter = match &self.kind {
                    ExprKind::Property { getter, .. } | ExprKind::IndexerAccess { getter, .. } => getter.is_some(),
                    _ => false,
                };
                if has_getter {
                    Ok(self)
                } else {
                    Err(CompilationError::NoGetter {
                        member: self.describe(rc),
                        span: self.span,
                    })
                }
            }
            ExprClass::EventAccess => Err(CompilationError::EventMisuse {
                event: self.describe(rc),
                span: self.span,
            }),
            found => Err(CompilationError::ClassMisuse {
                name: self.describe(rc),
                found,
                expected: "variable",
                span: self.span,
            }),
        }
    }

    /// Resolve an assignment or `ref`/`out` target. `write_only` targets
    /// (plain `=`, `out`) need not be definitely assigned first.
    pub fn resolve_target(self, rc: &mut ResolveContext<'_>, write_only: bool) -> Result<Expr> {
        if self.is_resolved() {
            return Ok(self);
        }
        let span = self.span;
        match self.kind {
            ExprKind::Local(id) => name::resolve_local(id, span, !write_only, rc),
            ExprKind::Name(name) if rc.locals.lookup(&name).is_some() => {
                let id = rc.locals.lookup(&name).ok_or_else(|| CompilationError::internal("local vanished"))?;
                name::resolve_local(id, span, !write_only, rc)
            }
            kind => Expr::new(kind, span).resolve(rc),
        }
    }

    /// Resolve a test expression: a `bool` value, through an implicit or
    /// `operator true` conversion.
    pub fn resolve_condition(self, rc: &mut ResolveContext<'_>) -> Result<Expr> {
        conditional::resolve_test(self, rc)
    }

    /// Resolve the initializer of a variable or field of type `target`.
    ///
    /// Bare array initializers are legal here and nowhere else.
    pub fn resolve_initializer(self, target: DataType, rc: &mut ResolveContext<'_>) -> Result<Expr> {
        let span = self.span;
        let expr = match self.kind {
            ExprKind::ArrayInitializer(items) if target.is_array() => {
                let element = target.element_type().ok_or_else(|| CompilationError::internal("array without element type"))?;
                array::resolve_array_creation(Some(element), target.array_rank, Vec::new(), Some(items), span, rc)?
            }
            kind => Expr::new(kind, span).resolve_value(rc)?,
        };
        implicit_conversion(expr, target, rc)
    }

    /// Text naming the node in diagnostics.
    pub(crate) fn describe(&self, rc: &ResolveContext<'_>) -> String {
        match &self.kind {
            ExprKind::Name(n) | ExprKind::Namespace(n) => n.clone(),
            ExprKind::MethodGroup { name, .. } | ExprKind::Property { name, .. } | ExprKind::Event { name, .. } => {
                name.clone()
            }
            ExprKind::IndexerAccess { .. } => "this[]".to_string(),
            ExprKind::Local(id) | ExprKind::Variable { id, .. } => {
                rc.locals.get(*id).map(|l| l.name.clone()).unwrap_or_default()
            }
            ExprKind::Field { field, .. } => rc.types.field(*field).map(|f| f.name.clone()).unwrap_or_default(),
            ExprKind::TypeRef(ty) => rc.types.type_name(*ty),
            _ => self.ty.map(|t| rc.types.type_name(t)).unwrap_or_default(),
        }
    }
}

fn kind_name(kind: &ExprKind) -> &'static str {
    match kind {
        ExprKind::Constant(_) => "constant",
        ExprKind::Call { .. } | ExprKind::OperatorCall { .. } => "call",
        ExprKind::Assignment { .. } => "assignment",
        ExprKind::TypeTest { .. } | ExprKind::TypeAs { .. } => "type test",
        _ => "expression",
    }
}

// ==========================================================================
// Emission
// ==========================================================================

impl Expr {
    /// Emit code leaving the node's value on the stack.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn emit(&self, ec: &mut EmitContext<'_>) -> Result<()> {
        use ExprKind::*;
        if !self.is_resolved() {
            return Err(CompilationError::internal(format!(
                "unresolved {} reached emission",
                kind_name(&self.kind)
            )));
        }
        if !self.span.is_synthetic() {
            ec.sink.set_line(self.span.line);
        }
        match &self.kind {
            Constant(c) => {
                ec.sink.emit_constant(&c.value);
                Ok(())
            }
            SideEffectConstant { constant, side_effect } => {
                side_effect.emit_statement(ec)?;
                ec.sink.emit_constant(&constant.value);
                Ok(())
            }
            Variable { .. } | This | Base | Field { .. } | Property { .. } | ArrayAccess { .. } | IndexerAccess { .. }
            | Deref(_) | InitializerTarget => lvalue::emit_load(self, ec),
            PreparedLoad => lvalue::emit_prepared_load(self, ec),
            Call { .. } | OperatorCall { .. } => invocation::emit_call(self, ec),
            NewObject { .. } | NewValueType { .. } | NewTypeParameter { .. } | ObjectInitializer { .. } => {
                new::emit_new(self, ec, true)
            }
            PredefinedUnary { .. } => unary::emit_unary(self, ec),
            PredefinedBinary { .. } | Logical { .. } | UserLogical { .. } => binary::emit_binary(self, ec),
            StringConcat { .. } => concat::emit_concat(self, ec),
            PointerOffset { .. } | PointerDiff { .. } | AddressOfVariable(_) | StackAllocation { .. } => {
                pointer::emit_pointer(self, ec)
            }
            RefArgument(inner) => lvalue::emit_address(inner, ec),
            Convert { .. } => cast::emit_convert(self, ec),
            Assignment { .. } | EventAssignment { .. } => assign::emit_assignment(self, ec, true),
            Conditional { .. } => conditional::emit_conditional(self, ec),
            ArrayNew { .. } => array::emit_array_new(self, ec),
            DefaultValue => literal::emit_default(self.data_type(), ec),
            TypeTest { .. } | TypeAs { .. } | TypeToken(_) | SizeOfType(_) => type_query::emit_type_query(self, ec),
            kind => Err(CompilationError::internal(format!(
                "{} has no value to emit",
                kind_name(kind)
            ))),
        }
    }

    /// Emit the node for its side effects only.
    pub fn emit_statement(&self, ec: &mut EmitContext<'_>) -> Result<()> {
        use ExprKind::*;
        match &self.kind {
            Assignment { .. } | EventAssignment { .. } => assign::emit_assignment(self, ec, false),
            ObjectInitializer { .. } => new::emit_new(self, ec, false),
            SideEffectConstant { side_effect, .. } => side_effect.emit_statement(ec),
            Constant(_) | Variable { .. } | This | Base | InitializerTarget => Ok(()),
            _ => {
                self.emit(ec)?;
                if self.data_type() != DataType::VOID {
                    ec.sink.emit(OpCode::Pop);
                }
                Ok(())
            }
        }
    }

    /// Emit a jump to `label` taken when the `bool` value equals `on_true`.
    ///
    /// Short-circuit operators evaluate exactly as in value form.
    pub fn emit_branch(&self, ec: &mut EmitContext<'_>, on_true: bool, label: Label) -> Result<()> {
        match &self.kind {
            ExprKind::Constant(c) => {
                if c.value.as_bool() == Some(on_true) {
                    ec.sink.emit_branch(OpCode::Br, label);
                }
                Ok(())
            }
            ExprKind::PredefinedUnary {
                op: UnaryOp::LogicalNot,
                operand,
                ..
            } => operand.emit_branch(ec, !on_true, label),
            ExprKind::PredefinedBinary { .. } | ExprKind::Logical { .. } => {
                binary::emit_binary_branch(self, ec, on_true, label)
            }
            ExprKind::TypeTest { .. } => type_query::emit_type_test_branch(self, ec, on_true, label),
            _ => {
                self.emit(ec)?;
                let op = if on_true { OpCode::BrTrue } else { OpCode::BrFalse };
                ec.sink.emit_branch(op, label);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for expression tests.

    use sable_core::{DataType, Diagnostics, Span};
    use sable_registry::TypeRegistry;

    use super::Expr;
    use crate::bytecode::{BytecodeChunk, ConstantPool};
    use crate::context::ResolveContext;
    use crate::emit::{BytecodeEmitter, EmitContext};
    use crate::locals::LocalTable;
    use crate::options::CompilerOptions;
    use crate::overload::BestMatchResolver;

    pub fn span() -> Span {
        Span::new(1, 1, 1)
    }

    /// Resolve `expr` against `reg` with the given locals and options.
    pub fn resolve_with(
        reg: &TypeRegistry,
        locals: &mut LocalTable,
        options: CompilerOptions,
        enclosing: Option<sable_core::TypeHash>,
        expr: Expr,
    ) -> (Result<Expr, sable_core::CompilationError>, Diagnostics) {
        let mut diags = Diagnostics::new();
        let result = {
            let mut rc = ResolveContext::new(reg, &BestMatchResolver, &mut diags, locals, options);
            if let Some(owner) = enclosing {
                rc = rc.with_enclosing_type(owner);
            }
            expr.resolve(&mut rc)
        };
        (result, diags)
    }

    pub fn resolve(reg: &TypeRegistry, locals: &mut LocalTable, expr: Expr) -> Result<Expr, sable_core::CompilationError> {
        resolve_with(reg, locals, CompilerOptions::default(), None, expr).0
    }

    /// Emit a resolved expression as a value and return the chunk.
    pub fn emit_value(reg: &TypeRegistry, locals: &LocalTable, expr: &Expr) -> BytecodeChunk {
        emit_with(reg, locals, expr, true)
    }

    pub fn emit_statement(reg: &TypeRegistry, locals: &LocalTable, expr: &Expr) -> BytecodeChunk {
        emit_with(reg, locals, expr, false)
    }

    fn emit_with(reg: &TypeRegistry, locals: &LocalTable, expr: &Expr, value: bool) -> BytecodeChunk {
        let mut pool = ConstantPool::new();
        let mut sink = BytecodeEmitter::new(&mut pool).with_slot_base(locals.slot_count());
        {
            let mut ec = EmitContext::new(&mut sink, reg);
            if value {
                expr.emit(&mut ec).unwrap();
            } else {
                expr.emit_statement(&mut ec).unwrap();
            }
            ec.end_statement().unwrap();
        }
        sink.finish().unwrap()
    }

    pub fn int_local(locals: &mut LocalTable, name: &str) -> crate::locals::LocalId {
        locals.declare(name, DataType::INT32, true)
    }
}
