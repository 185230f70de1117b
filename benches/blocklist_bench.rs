//! Benchmarks for blocklist name matching.
//!
//! Measures how quickly we can check if a name is blocked.

use criterion::{BenchmarkId, Criterion, Throughput, black_box};

use dnsguard::filter::Blocklist;

fn build_blocklist() -> Blocklist {
    let mut text = String::from("# generated\n");
    for i in 0..1000 {
        text.push_str(&format!("ads{i}.tracker.net\n"));
    }
    text.push_str("doubleclick.com\n");
    Blocklist::parse(&text)
}

fn bench_is_blocked(c: &mut Criterion) {
    let blocklist = build_blocklist();

    let mut group = c.benchmark_group("blocklist");

    // Benchmark exact match (blocked name)
    group.throughput(Throughput::Elements(1));
    group.bench_function(BenchmarkId::new("is_blocked", "exact_match"), |b| {
        b.iter(|| blocklist.is_blocked(black_box("doubleclick.com")))
    });

    // Benchmark subdomain match (fragment found inside the name)
    group.bench_function(BenchmarkId::new("is_blocked", "subdomain_match"), |b| {
        b.iter(|| blocklist.is_blocked(black_box("ads.tracking.doubleclick.com")))
    });

    // Benchmark miss (not blocked, scans every fragment)
    group.bench_function(BenchmarkId::new("is_blocked", "miss"), |b| {
        b.iter(|| blocklist.is_blocked(black_box("www.google.com")))
    });

    // Benchmark deep subdomain miss
    group.bench_function(BenchmarkId::new("is_blocked", "deep_miss"), |b| {
        b.iter(|| blocklist.is_blocked(black_box("a.b.c.d.e.f.example.org")))
    });

    group.finish();
}

fn main() {
    let mut criterion = Criterion::default().configure_from_args();
    bench_is_blocked(&mut criterion);
    criterion.final_summary();
}
