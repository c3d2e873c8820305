use chrono::{Duration, NaiveDate, NaiveDateTime};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qclcd_weather::{
    align, combine, combine_summary, stack, Frequency, ObservationRow, ObservationTable,
    SummaryField,
};

const STATIONS: [&str; 5] = ["14757", "04789", "94789", "54787", "14734"];

/// A month of half-hourly reports for five stations, every seventh reading missing.
fn month_of_reports() -> ObservationTable {
    let start = NaiveDate::from_ymd_opt(2013, 3, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut table = ObservationTable::new(vec!["DryBulbFarenheit".into(), "RelativeHumidity".into()]);
    for (s, station) in STATIONS.iter().enumerate() {
        for step in 0..(31 * 48) {
            let n = step + s;
            table.push(ObservationRow {
                station: station.to_string(),
                timestamp: start + Duration::minutes(30 * step as i64 + s as i64),
                values: vec![(n % 7 != 0).then_some(n as f64 % 60.0), Some(50.0)],
            });
        }
    }
    table
}

fn bench_stacking(c: &mut Criterion) {
    let table = month_of_reports();
    let timestamps: Vec<NaiveDateTime> = table.for_station("14757").map(|r| r.timestamp).collect();
    let summaries = [SummaryField::mean_of("DryBulbFarenheit")];

    c.bench_function("align", |b| {
        b.iter(|| align(black_box(&timestamps), black_box(&timestamps)))
    });
    c.bench_function("stack", |b| b.iter(|| stack(black_box(&table))));

    let stacked = stack(&table);
    c.bench_function("combine", |b| {
        b.iter(|| combine(black_box(&stacked), &STATIONS, vec![]))
    });
    c.bench_function("combine_summary", |b| {
        b.iter(|| combine_summary(black_box(&table), &STATIONS, &summaries, Frequency::Hourly, false))
    });
}

criterion_group!(benches, bench_stacking);
criterion_main!(benches);
