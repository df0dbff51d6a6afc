#![allow(clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use jpw_core::{Filter, JsonPath, query};
use serde_json::{Value, json};

const STORE_JSON: &str = include_str!("../data/store.json");

/// The store document with its book list repeated `copies` times
fn large_store(copies: usize) -> Value {
    let mut store: Value = serde_json::from_str(STORE_JSON).unwrap();
    let books = store["store"]["book"].as_array().cloned().unwrap_or_default();
    let repeated: Vec<Value> = books.iter().cycle().take(books.len() * copies).cloned().collect();
    store["store"]["book"] = Value::Array(repeated);
    store
}

/// Objects nested `depth` levels under `a`, each with a `value`
fn deep_document(depth: usize) -> Value {
    (0..depth).fold(json!({"value": depth}), |inner, level| {
        json!({"a": inner, "value": level})
    })
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    let queries = [
        ("property", "$.store.book"),
        ("slice", "$.store.book[0:20:3]"),
        ("filter", "$.store.book[?(@.price < 10 && @.category == 'fiction')]"),
        (
            "methods",
            "$.store.book[?(@.author.toLower().startsWith('h') || @.title.contains('Sword', true))]",
        ),
        ("nested_groups", "$.store.book[?(((@.price > 1) && (@.price < 30)) || !@.isbn)]"),
    ];

    for (name, query_str) in queries {
        group.bench_with_input(BenchmarkId::new("path", name), &query_str, |b, q| {
            b.iter(|| JsonPath::parse(black_box(*q)))
        });
    }

    group.finish();
}

fn bench_basic_elements(c: &mut Criterion) {
    let json: Value = serde_json::from_str(STORE_JSON).unwrap();

    let mut group = c.benchmark_group("basic_elements");

    let queries = [
        ("root", "$"),
        ("property", "$.store"),
        ("nested", "$.store.book"),
        ("index", "$.store.book[0]"),
        ("negative_index", "$.store.book[-1]"),
        ("wildcard", "$.store.book[*]"),
        ("length", "$.store.book.length"),
    ];

    for (name, query_str) in queries {
        group.bench_with_input(BenchmarkId::new("store", name), &query_str, |b, q| {
            b.iter(|| query(black_box(*q), black_box(&json)))
        });
    }

    group.finish();
}

fn bench_filters(c: &mut Criterion) {
    let json: Value = serde_json::from_str(STORE_JSON).unwrap();

    let mut group = c.benchmark_group("filters");

    let queries = [
        ("existence", "$.store.book[?(@.isbn)]"),
        ("comparison", "$.store.book[?(@.price < 10)]"),
        (
            "logical",
            "$.store.book[?(@.price < 10 && @.category == 'fiction')]",
        ),
        ("method", "$.store.book[?(@.title.contains('the', true))]"),
        ("regex", "$.store.book[?(@.author.matches('J.*'))]"),
    ];

    for (name, query_str) in queries {
        group.bench_with_input(BenchmarkId::new("store", name), &query_str, |b, q| {
            b.iter(|| query(black_box(*q), black_box(&json)))
        });
    }

    group.finish();
}

fn bench_by_json_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_size");

    let path = JsonPath::parse("$..book[?(@.price >= 8.99)].title").unwrap();

    for copies in [1, 100, 10_000] {
        let json = large_store(copies);
        group.throughput(Throughput::Elements((copies * 4) as u64));
        group.bench_with_input(BenchmarkId::new("books", copies * 4), &json, |b, json| {
            b.iter(|| path.query(black_box(json)))
        });
    }

    group.finish();
}

fn bench_descendant_chains(c: &mut Criterion) {
    let json = deep_document(64);

    let mut group = c.benchmark_group("descendant_chains");

    let queries = [
        ("single", "$..value"),
        ("double", "$..a..value"),
        ("triple", "$..a..a..value"),
    ];

    for (name, query_str) in queries {
        group.bench_with_input(BenchmarkId::new("deep", name), &query_str, |b, q| {
            b.iter(|| query(black_box(*q), black_box(&json)))
        });
    }

    group.finish();
}

fn bench_parsed_vs_unparsed(c: &mut Criterion) {
    let json: Value = serde_json::from_str(STORE_JSON).unwrap();

    let mut group = c.benchmark_group("parsed_vs_unparsed");

    // Includes parse time
    group.bench_function("query/filter", |b| {
        b.iter(|| query(black_box("$.store.book[?(@.price < 10)]"), black_box(&json)))
    });

    // Parsed once, results borrow from the document
    let parsed = JsonPath::parse("$.store.book[?(@.price < 10)]").unwrap();
    group.bench_function("parsed/filter", |b| {
        b.iter(|| parsed.query(black_box(&json)))
    });

    // A standalone filter applied to each book
    let filter = Filter::parse("@.price < 10").unwrap();
    let books = json["store"]["book"].as_array().cloned().unwrap_or_default();
    group.bench_function("filter/matches", |b| {
        b.iter(|| books.iter().filter(|book| filter.matches(black_box(book))).count())
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_basic_elements,
    bench_filters,
    bench_by_json_size,
    bench_descendant_chains,
    bench_parsed_vs_unparsed,
);
criterion_main!(benches);
