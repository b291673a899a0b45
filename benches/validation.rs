//! Benchmarks for schema decoding and document validation.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use validatelet::automaton::NameSignature;
use validatelet::{validate_str, DatatypeRegistry, EncodedSchema, Schema, SchemaWriter, TextSensitivity};

const XSD: &str = "http://www.w3.org/2001/XMLSchema-datatypes";

/// `element doc { element item { attribute id { xsd:int }, text }* }`
fn item_list() -> EncodedSchema {
    let mut w = SchemaWriter::new(0);
    w.name("", "doc", 1).name("", "item", 2).name("", "id", 3);

    let start = w.state(false, true, TextSensitivity::WhitespaceOnly);
    let content = w.state(true, true, TextSensitivity::WhitespaceOnly);
    let item = w.state(false, false, TextSensitivity::WhitespaceOnly);
    let id = w.state(false, true, TextSensitivity::Sensitive);
    let eps = w.state(true, true, TextSensitivity::Ignorable);
    let null = w.state(false, true, TextSensitivity::Ignorable);
    let int = w.datatype(XSD, "int", &[]);

    w.element(start, NameSignature::exact(1), content, eps);
    w.element(content, NameSignature::exact(2), item, content);
    w.attribute(item, NameSignature::exact(3), false, id, eps);
    w.data(id, int, null, eps);

    w.finish().expect("benchmark schema")
}

fn document(items: usize) -> String {
    let mut doc = String::from("<doc>\n");
    for i in 0..items {
        doc.push_str(&format!("  <item id=\"{i}\">entry number {i}</item>\n"));
    }
    doc.push_str("</doc>\n");
    doc
}

fn bench_decode(c: &mut Criterion) {
    let encoded = item_list();
    let registry = DatatypeRegistry::with_xsd();

    c.bench_function("decode/item_list", |b| {
        b.iter(|| Schema::new(black_box(&encoded), &registry).expect("decodes"))
    });
}

fn bench_validate(c: &mut Criterion) {
    let schema = Schema::new(&item_list(), &DatatypeRegistry::with_xsd()).expect("decodes");
    let mut group = c.benchmark_group("validate");

    for items in [10, 100, 1_000] {
        let doc = document(items);
        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::new("items", items), &doc, |b, doc| {
            b.iter(|| validate_str(&schema, black_box(doc)).expect("valid"))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_validate);
criterion_main!(benches);
