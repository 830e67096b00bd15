use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kuba_logstats::block::{BlockBuilder, BlockResult};
use kuba_logstats::config::StatsConfig;
use kuba_logstats::stats::{parse_stats_func, ParallelStats};

fn create_block(rows: usize, seed: u64) -> BlockResult {
    let mut builder = BlockBuilder::new();
    for i in 0..rows as u64 {
        let n = (i + seed).wrapping_mul(2_654_435_761) % 100_000;
        let bytes = n.to_string();
        let duration = format!("{}", n as f64 / 8.0);
        let level = ["info", "warn", "error"][(n % 3) as usize];
        let msg = format!("request {} served", n);
        builder.push_row(
            Some(1_700_000_000_000_000_000 + (i as i64) * 1_000_000),
            &[
                ("bytes", bytes.as_str()),
                ("duration", duration.as_str()),
                ("level", level),
                ("msg", msg.as_str()),
            ],
        );
    }
    builder.build().unwrap()
}

fn bench_update_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats_min");

    for size in [256, 4096].iter() {
        let block = create_block(*size, 7);
        group.throughput(Throughput::Elements(*size as u64));

        for expr in ["min(bytes)", "min(duration)", "min(level)", "min(*)"] {
            let func = parse_stats_func(expr).unwrap();

            group.bench_with_input(
                BenchmarkId::new(format!("{}/all_rows", expr), size),
                size,
                |b, _| {
                    b.iter(|| {
                        let (mut p, _) = func.new_processor();
                        p.update_for_all_rows(black_box(&block));
                        black_box(p.finalize())
                    });
                },
            );

            group.bench_with_input(
                BenchmarkId::new(format!("{}/each_row", expr), size),
                size,
                |b, _| {
                    b.iter(|| {
                        let (mut p, _) = func.new_processor();
                        for row in 0..block.row_count() {
                            p.update_for_row(black_box(&block), row);
                        }
                        black_box(p.finalize())
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats_parallel");
    let blocks: Vec<BlockResult> = (0..512).map(|i| create_block(256, i)).collect();
    let func = parse_stats_func("min(*)").unwrap();

    for workers in [1, 2, 4, 8].iter() {
        let engine = ParallelStats::new(StatsConfig {
            num_workers: *workers,
            shard_size: 32,
            parallel_threshold: 0,
        })
        .unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(workers), workers, |b, _| {
            b.iter(|| black_box(engine.compute(func.as_ref(), &blocks)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_update_paths, bench_parallel);
criterion_main!(benches);
