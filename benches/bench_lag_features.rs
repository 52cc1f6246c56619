use criterion::{
    black_box, criterion_group, criterion_main, AxisScale, BenchmarkId, Criterion,
    PlotConfiguration,
};

use junction_forecast::flow_analyzer::resolve_lags;

mod common;

/// Benchmarks lag resolution for a known and an unknown junction as the
/// history grows (one week, one month, one quarter of hourly readings).
fn bench_resolve_lags(c: &mut Criterion) {
    let history_hours = [24 * 7, 24 * 30, 24 * 90];

    let mut group = c.benchmark_group("Lag_Feature_Benchmarks");
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Linear));

    for &hours in history_hours.iter() {
        let dataset = common::generate_dataset(4, hours);

        group.bench_with_input(BenchmarkId::new("known_junction", hours), &hours, |b, &_hours| {
            b.iter(|| black_box(resolve_lags(black_box(&dataset), black_box(2))));
        });

        // falls back to the global mean, which scans every junction
        group.bench_with_input(BenchmarkId::new("unknown_junction", hours), &hours, |b, &_hours| {
            b.iter(|| black_box(resolve_lags(black_box(&dataset), black_box(9))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_resolve_lags);
criterion_main!(benches);
