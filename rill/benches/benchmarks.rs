// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use rill::prelude::*;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

fn bench_map_filter_chain(c: &mut Criterion) {
    c.bench_function("map_filter_chain_10k", |b| {
        b.iter(|| {
            let sum = Arc::new(AtomicI64::new(0));
            let sink = sum.clone();
            Observable::range(0, 10_000)
                .filter(|v| v % 3 != 0)
                .map(|v| v * 2)
                .subscribe(move |v| {
                    sink.fetch_add(v, Ordering::Relaxed);
                });
            black_box(sum.load(Ordering::Relaxed))
        });
    });
}

fn bench_flat_map_fan_out(c: &mut Criterion) {
    c.bench_function("flat_map_fan_out_100x100", |b| {
        b.iter(|| {
            let count = Arc::new(AtomicI64::new(0));
            let sink = count.clone();
            Observable::range(0, 100)
                .flat_map(|v| Observable::range(v, 100))
                .subscribe(move |_| {
                    sink.fetch_add(1, Ordering::Relaxed);
                });
            black_box(count.load(Ordering::Relaxed))
        });
    });
}

fn bench_publish_fan_out(c: &mut Criterion) {
    c.bench_function("publish_two_subscribers_10k", |b| {
        b.iter(|| {
            let connectable = Observable::range(0, 10_000).publish();
            let total = Arc::new(AtomicI64::new(0));
            for _ in 0..2 {
                let sink = total.clone();
                connectable.observable().subscribe(move |v| {
                    sink.fetch_add(v, Ordering::Relaxed);
                });
            }
            connectable.connect();
            black_box(total.load(Ordering::Relaxed))
        });
    });
}

criterion_group!(
    benches,
    bench_map_filter_chain,
    bench_flat_map_fan_out,
    bench_publish_fan_out
);
criterion_main!(benches);
