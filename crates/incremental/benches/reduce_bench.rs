//! Benchmarks for reflux-incremental.
//!
//! Compares deriving a new window from a change event with re-running the
//! query over the whole document set.

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use reflux_core::{ChangeEvent, Document};
use reflux_incremental::{calculate_new_results, ResultWindow};
use reflux_query::{
    DefaultQueryFunctions, HookRegistry, Query, QueryParams, QueryParamsResolver, QueryShape, Selector, SortField,
};

fn make_doc(i: usize) -> Rc<Document> {
    Rc::new(
        Document::new(format!("doc-{:06}", i))
            .field("score", (i * 7 % 1000) as i64)
            .field("active", i % 3 != 0),
    )
}

fn params(limit: Option<usize>) -> Rc<QueryParams> {
    let mut shape = QueryShape::new()
        .selector(Selector::eq("active", true))
        .sort_by(SortField::desc("score"));
    if let Some(limit) = limit {
        shape = shape.limit(limit);
    }
    let resolver = QueryParamsResolver::new("id", Rc::new(HookRegistry::new()));
    resolver.resolve(&Query::new(shape).unwrap(), &DefaultQueryFunctions)
}

fn full_query(params: &QueryParams, docs: &[Rc<Document>]) -> ResultWindow {
    let mut matching: Vec<Rc<Document>> = docs.iter().filter(|d| params.matches(d)).cloned().collect();
    matching.sort_by(|a, b| params.compare(a, b));
    matching.truncate(params.limit.unwrap_or(usize::MAX));
    ResultWindow::from_sorted(matching)
}

fn bench_single_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_insert");

    for size in [100, 1000, 10000] {
        let docs: Vec<Rc<Document>> = (0..size).map(make_doc).collect();
        let params = params(Some(20));
        let window = full_query(&params, &docs);
        let event = ChangeEvent::insert(1, Rc::new(Document::new("new").field("score", 995i64).field("active", true)));

        group.bench_with_input(BenchmarkId::new("event_reduce", size), &window, |b, window| {
            b.iter(|| calculate_new_results(black_box(&params), black_box(std::slice::from_ref(&event)), window))
        });

        let mut with_new = docs.clone();
        with_new.extend(event.document().cloned());
        group.bench_with_input(BenchmarkId::new("full_query", size), &with_new, |b, docs| {
            b.iter(|| full_query(black_box(&params), black_box(docs)))
        });
    }

    group.finish();
}

fn bench_update_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_batch");
    let docs: Vec<Rc<Document>> = (0..1000).map(make_doc).collect();
    let params = params(None);
    let window = full_query(&params, &docs);

    for batch in [1, 10, 100] {
        let events: Vec<ChangeEvent> = docs
            .iter()
            .take(batch)
            .enumerate()
            .map(|(i, prev)| {
                let next = Rc::new(prev.next_revision().field("score", (i * 13 % 1000) as i64));
                ChangeEvent::update(i as u64 + 1, prev.clone(), next)
            })
            .collect();

        group.bench_with_input(BenchmarkId::new("event_reduce", batch), &events, |b, events| {
            b.iter(|| calculate_new_results(black_box(&params), black_box(events), &window))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_single_insert, bench_update_batch);
criterion_main!(benches);
