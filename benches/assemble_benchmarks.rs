//! Performance benchmarks for the chasm assembler.
//!
//! - Script-based: the sources under `test_scripts/`
//! - Size-based: generated modules with a growing number of methods
//! - Stage-based: parsing alone versus the full pipeline

use bumpalo::Bump;
use chasm::{Parser, assemble};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::fmt::Write;
use std::hint::black_box;

/// Build a module with `methods` methods, each with a loop, a try block and constants.
fn generate_source(methods: usize) -> String {
    let mut source = String::new();
    for i in 0..methods {
        writeln!(
            source,
            "method m{i}<i64, *node>i64 {{
    $limstack = 8;
    $limlocal = 2;
    psh_q {big};
    stl 0;
@top:
    ldl 0;
    jmp_eqz done;
    try {{
        ldl 0;
        psh_b 1;
        sub_q;
        stl 0;
        call m{next};
    }} except Overflow {{
        pop;
        psh_f {half}.5;
        cst_fq;
        stl 1;
    }}
    jmp top;
@done:
    ldl 1;
    ret;
}}",
            big = 1_000_000_000_000i64 + (i as i64 % 16),
            next = (i + 1) % methods,
            half = i % 8,
        )
        .expect("writing to a String cannot fail");
        writeln!(source, "object o{i} {{ i32, *o{i}, **f64 }}").expect("writing to a String cannot fail");
    }
    source
}

fn script_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble/scripts");

    let scripts = [
        ("hello", include_str!("../test_scripts/hello.csm")),
        ("loop", include_str!("../test_scripts/loop.csm")),
        ("exceptions", include_str!("../test_scripts/exceptions.csm")),
        ("constants", include_str!("../test_scripts/constants.csm")),
        ("objects", include_str!("../test_scripts/objects.csm")),
    ];

    for (name, source) in scripts {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| black_box(assemble(black_box(source)).unwrap().len()));
        });
    }

    group.finish();
}

fn size_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble/methods");

    for methods in [1, 10, 100, 1000] {
        let source = generate_source(methods);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(methods), &source, |b, source| {
            b.iter(|| black_box(assemble(black_box(source)).unwrap().len()));
        });
    }

    group.finish();
}

fn stage_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble/stages");
    let source = generate_source(200);
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("parse", |b| {
        b.iter(|| {
            let arena = Bump::new();
            let module = Parser::parse(black_box(&source), &arena).unwrap();
            black_box(module.items().len())
        });
    });

    group.bench_function("parse_and_compile", |b| {
        b.iter(|| {
            let arena = Bump::new();
            let module = chasm::compile(black_box(&source), &arena).unwrap();
            black_box(module.methods.len())
        });
    });

    group.bench_function("full_pipeline", |b| {
        b.iter(|| black_box(assemble(black_box(&source)).unwrap().len()));
    });

    group.finish();
}

criterion_group!(benches, script_benchmarks, size_benchmarks, stage_benchmarks);
criterion_main!(benches);
