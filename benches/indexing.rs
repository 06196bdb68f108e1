use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use linescope::diagnostics::Diagnostics;
use linescope::index::IndexBuilder;
use linescope::scan::{CancelFlags, LineScanner, ScanOptions, TextDecoder};
use linescope::search::{FilterEngine, FilterRule, SearchEngine, SearchRequest};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

const BLOCK_SIZE: usize = 1_000_000;

fn create_log_file(size_kb: usize, pattern_frequency: usize) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let target_size = size_kb * 1024;
    let mut current_size = 0;
    let mut line_num = 0;

    let log_levels = ["DEBUG", "INFO", "WARN", "ERROR"];
    let services = ["auth", "database", "cache", "payment"];

    while current_size < target_size {
        let log_line = if line_num % pattern_frequency == 0 {
            format!(
                "[2024-09-02T10:{}:{:02}] ERROR {}: Request {} failed with timeout user_{}\n",
                (line_num / 3600) % 24,
                (line_num / 60) % 60,
                services[line_num % services.len()],
                line_num,
                line_num % 1000
            )
        } else {
            format!(
                "[2024-09-02T10:{}:{:02}] {} {}: Request {} ok user_{}\n",
                (line_num / 3600) % 24,
                (line_num / 60) % 60,
                log_levels[line_num % log_levels.len()],
                services[line_num % services.len()],
                line_num,
                line_num % 1000
            )
        };
        temp_file.write_all(log_line.as_bytes()).unwrap();
        current_size += log_line.len();
        line_num += 1;
    }

    temp_file.flush().unwrap();
    temp_file
}

fn size_label(size_kb: usize) -> String {
    if size_kb < 1024 {
        format!("{}KB", size_kb)
    } else {
        format!("{}MB", size_kb / 1024)
    }
}

fn bench_full_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_index");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    let flags = CancelFlags::new();
    let diagnostics = Diagnostics::default();

    for &size_kb in &[500, 5000, 20000] {
        let temp_file = create_log_file(size_kb, 100);
        group.bench_function(BenchmarkId::new("index", size_label(size_kb)), |b| {
            b.iter(|| {
                let mut scanner = LineScanner::open(
                    temp_file.path(),
                    ScanOptions::new(BLOCK_SIZE),
                    &flags,
                    &diagnostics,
                )
                .unwrap();
                let mut builder = IndexBuilder::new(1000);
                let mut lines = 0usize;
                builder.run(&mut scanner, &mut |batch| lines += batch.records.len());
                black_box(lines)
            });
        });
    }

    group.finish();
}

fn bench_search_and_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_filter");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    let flags = CancelFlags::new();
    let diagnostics = Diagnostics::default();
    let size_kb = 5000;
    let temp_file = create_log_file(size_kb, 100);
    let file_size = std::fs::metadata(temp_file.path()).unwrap().len();
    let decoder = TextDecoder::default();

    for (name, request) in [
        ("literal", SearchRequest::literal("timeout")),
        ("literal_ignore_case", SearchRequest::literal_ignore_case("TIMEOUT")),
        ("regex", SearchRequest::regex(r"user_\d{3}\b")),
    ] {
        group.bench_function(BenchmarkId::new(name, size_label(size_kb)), |b| {
            let mut rng = ChaCha8Rng::seed_from_u64(42); // Fixed seed for reproducibility
            b.iter(|| {
                // Random start offset; the scanner treats it as a line start
                let start = rng.gen_range(0..file_size / 2);
                let options = ScanOptions::new(BLOCK_SIZE)
                    .starting_at(start)
                    .decode_with(decoder);
                let mut scanner =
                    LineScanner::open(temp_file.path(), options, &flags, &diagnostics).unwrap();
                let engine = SearchEngine::new(request.compile().unwrap(), 1000, 500);
                let mut hits = 0usize;
                engine.run(&mut scanner, &mut |batch| hits += batch.results.len());
                black_box(hits)
            });
        });
    }

    let rules = [
        FilterRule::new(SearchRequest::literal("ERROR"), true),
        FilterRule::new(SearchRequest::regex(r"payment|auth"), true),
    ];
    group.bench_function(BenchmarkId::new("filter_two_rules", size_label(size_kb)), |b| {
        b.iter(|| {
            let options = ScanOptions::new(BLOCK_SIZE).decode_with(decoder);
            let mut scanner =
                LineScanner::open(temp_file.path(), options, &flags, &diagnostics).unwrap();
            let mut engine = FilterEngine::from_rules(&rules, 1000).unwrap();
            engine.run(&mut scanner, &mut |_| {});
            black_box(engine.filtered_lines())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_full_index, bench_search_and_filter);
criterion_main!(benches);
