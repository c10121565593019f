//! Resolve + emit benchmarks for expression trees.
//!
//! - Deep binary trees over locals and over constants (folding)
//! - String concatenation chains
//! - Compound assignments through array elements
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- "binary"
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sable::Compilation;
use sable::compiler::expr::Expr;
use sable::compiler::operators::BinaryOp;
use sable::core::{DataType, Span};
use sable::registry::TypeRegistry;
use std::hint::black_box;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

const DEPTHS: [usize; 3] = [10, 100, 500];

fn span() -> Span {
    Span::new(1, 1, 1)
}

/// `((x + x) * x + x) ...` with alternating operators, `depth` levels deep.
fn variable_tree(depth: usize) -> Expr {
    let mut expr = Expr::name("x", span());
    for level in 0..depth {
        let op = if level % 2 == 0 { BinaryOp::Addition } else { BinaryOp::Multiply };
        expr = Expr::binary(op, expr, Expr::name("x", span()), span());
    }
    expr
}

/// The same shape over literals; resolution folds it to one constant.
fn constant_tree(depth: usize) -> Expr {
    let mut expr = Expr::int(1, span());
    for level in 0..depth {
        let op = if level % 2 == 0 { BinaryOp::Addition } else { BinaryOp::Subtraction };
        expr = Expr::binary(op, expr, Expr::int(level as i32, span()), span());
    }
    expr
}

/// `s + x + "," + s + x + ...`
fn concat_chain(parts: usize) -> Expr {
    let mut expr = Expr::name("s", span());
    for part in 0..parts {
        let next = match part % 3 {
            0 => Expr::name("x", span()),
            1 => Expr::string(",", span()),
            _ => Expr::name("s", span()),
        };
        expr = Expr::binary(BinaryOp::Addition, expr, next, span());
    }
    expr
}

fn compile(types: &TypeRegistry, expr: Expr) -> usize {
    let mut compilation = Compilation::new(types);
    compilation.declare_local("x", DataType::INT32, true);
    compilation.declare_local("s", DataType::STRING, true);
    compilation.declare_local("xs", DataType::array_of(DataType::INT32, 1), true);
    let chunk = compilation.compile_value(expr).expect("benchmark input compiles");
    end_profiling_frame();
    chunk.len()
}

fn binary_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let types = TypeRegistry::with_builtins();
    let mut group = c.benchmark_group("expr/binary");

    for depth in DEPTHS {
        group.throughput(Throughput::Elements(depth as u64));
        group.bench_with_input(BenchmarkId::new("variables", depth), &depth, |b, &depth| {
            b.iter_batched(
                || variable_tree(depth),
                |expr| black_box(compile(&types, expr)),
                criterion::BatchSize::SmallInput,
            );
        });
        group.bench_with_input(BenchmarkId::new("constants", depth), &depth, |b, &depth| {
            b.iter_batched(
                || constant_tree(depth),
                |expr| black_box(compile(&types, expr)),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn concat_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let types = TypeRegistry::with_builtins();
    let mut group = c.benchmark_group("expr/concat");

    for parts in DEPTHS {
        group.throughput(Throughput::Elements(parts as u64));
        group.bench_with_input(BenchmarkId::from_parameter(parts), &parts, |b, &parts| {
            b.iter_batched(
                || concat_chain(parts),
                |expr| black_box(compile(&types, expr)),
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn compound_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let types = TypeRegistry::with_builtins();
    let mut group = c.benchmark_group("expr/compound");

    group.bench_function("element_add_assign", |b| {
        b.iter_batched(
            || {
                let target = Expr::element_access(Expr::name("xs", span()), vec![Expr::name("x", span())], span());
                Expr::compound_assign(BinaryOp::Addition, target, Expr::int(1, span()), span())
            },
            |expr| black_box(compile(&types, expr)),
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, binary_benchmarks, concat_benchmarks, compound_benchmarks);

criterion_main!(benches);
