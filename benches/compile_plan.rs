//! Benchmark: compile a format description with nested classes and every repetition kind, then
//! run the reference parser over a generated document (speculative `*`/`+` loops, counted
//! repetitions and split lines) and over a document with a long speculative tail.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use instaparse::{compile, DocumentParser};

const FORMAT: &str = r#"
<head>
delimiter ","
<objects>
Point
x:int y:int
Segment
name:string
count:int
points:Point:count!
Tag
label:string
weight:float
<body>
segments:Segment:+!

tags:Tag:*
"#;

fn document(segments: usize, points: usize, tags: usize) -> String {
    let mut out = String::new();
    for s in 0..segments {
        if s > 0 {
            out.push('\n');
        }
        out.push_str(&format!("seg{}\n{}\n", s, points));
        for p in 0..points {
            if p > 0 {
                out.push('\n');
            }
            out.push_str(&format!("{},{}\n", p, p * 2));
        }
    }
    out.push('\n');
    for t in 0..tags {
        out.push_str(&format!("tag{}\n{}.5\n", t, t));
    }
    out
}

fn bench_compile_plan(c: &mut Criterion) {
    c.bench_function("compile_format", |b| {
        b.iter(|| compile(black_box(FORMAT)).expect("compile"))
    });

    let plan = compile(FORMAT).expect("compile");
    let parser = DocumentParser::new(&plan);

    let small = document(10, 10, 10);
    c.bench_function("parse_document_small", |b| {
        b.iter(|| parser.parse_str(black_box(&small)).expect("parse"))
    });

    let large = document(200, 50, 500);
    c.bench_function("parse_document_large", |b| {
        b.iter(|| parser.parse_str(black_box(&large)).expect("parse"))
    });
}

criterion_group!(benches, bench_compile_plan);
criterion_main!(benches);
