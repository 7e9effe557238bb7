use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use model_skill::comparison::{compare, CompareOptions, SkillOptions};
use model_skill::metrics::Metric;
use model_skill::models::{ItemInfo, TimeSeriesTable};

// Hourly series; the model starts a day later and is sampled every other hour
fn create_tables(hours: usize) -> (TimeSeriesTable, TimeSeriesTable) {
    let start = NaiveDate::from_ymd_opt(2017, 10, 26)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let obs_time = (0..hours)
        .map(|h| start + chrono::Duration::hours(h as i64))
        .collect();
    let obs_values = (0..hours).map(|h| 1.0 + (h as f64 * 0.1).sin()).collect();
    let obs =
        TimeSeriesTable::from_series(obs_time, ItemInfo::new("Hm0").with_unit("m"), obs_values)
            .unwrap();

    let model_hours: Vec<usize> = (24..hours + 24).step_by(2).collect();
    let model_time = model_hours
        .iter()
        .map(|&h| start + chrono::Duration::hours(h as i64))
        .collect();
    let model_values = model_hours
        .iter()
        .map(|&h| 1.1 + (h as f64 * 0.1).sin())
        .collect();
    let model = TimeSeriesTable::from_series(
        model_time,
        ItemInfo::new("Hm0").with_unit("m"),
        model_values,
    )
    .unwrap();

    (obs, model)
}

fn benchmark_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare");

    for hours in [1_000, 10_000, 100_000].iter() {
        let (obs, model) = create_tables(*hours);
        group.bench_with_input(BenchmarkId::new("align", hours), hours, |b, _| {
            b.iter(|| {
                compare(
                    black_box(obs.clone()),
                    black_box(model.clone()),
                    &CompareOptions::new(),
                )
                .unwrap()
            })
        });
    }

    group.finish();
}

fn benchmark_skill(c: &mut Criterion) {
    let (obs, model) = create_tables(100_000);
    let comparer = compare(obs, model, &CompareOptions::new()).unwrap();

    let mut group = c.benchmark_group("skill");
    group.bench_function("default_metrics", |b| {
        b.iter(|| comparer.skill(black_box(&SkillOptions::new())).unwrap())
    });
    group.bench_function("all_metrics", |b| {
        let options = SkillOptions::new().with_metrics(Metric::ALL.to_vec());
        b.iter(|| comparer.skill(black_box(&options)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, benchmark_compare, benchmark_skill);
criterion_main!(benches);
