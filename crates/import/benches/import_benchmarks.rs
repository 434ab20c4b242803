use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pricesync_catalog::{CatalogEntry, RawPriceRow};
use pricesync_core::{CatalogId, Currency, Money};
use pricesync_import::{build_index, import_batch, ImportPolicy};
use pricesync_matching::Matcher;

const AUTHORS: [&str; 6] = [
    "Leo Tolstoy",
    "Fyodor Dostoevsky",
    "Mikhail Bulgakov",
    "Anton Chekhov",
    "Ivan Turgenev",
    "Nikolai Gogol",
];

const WORDS: [&str; 12] = [
    "war", "peace", "crime", "punishment", "master", "garden", "fathers", "sons", "souls", "night",
    "river", "winter",
];

/// Synthetic catalog: every fourth entry has an ISBN, titles are three-word
/// combinations so the token index has realistic fan-out.
fn synthetic_catalog(size: usize) -> Vec<CatalogEntry> {
    let rub = Currency::parse("RUB").unwrap();
    (0..size)
        .map(|i| {
            let title = format!(
                "{} {} {} {}",
                WORDS[i % WORDS.len()],
                WORDS[(i / WORDS.len()) % WORDS.len()],
                WORDS[(i / 7) % WORDS.len()],
                i
            );
            let entry = CatalogEntry::new(
                CatalogId::new(i as u64 + 1),
                title,
                Money::new(300.0 + (i % 500) as f64, rub.clone()),
            )
            .with_author(AUTHORS[i % AUTHORS.len()]);
            if i % 4 == 0 {
                entry.with_isbn(format!("978{:010}", i))
            } else {
                entry
            }
        })
        .collect()
}

fn synthetic_rows(catalog_size: usize, rows: usize) -> Vec<RawPriceRow> {
    (0..rows)
        .map(|n| {
            let i = (n * 7919) % catalog_size;
            let mut row = RawPriceRow::new(n + 1);
            row.price = Some(format!("{}", 310 + (n % 480)));
            if i % 4 == 0 {
                row.isbn = Some(format!("978-{:010}", i));
            } else {
                row.title = Some(format!(
                    "{} {} {}",
                    WORDS[i % WORDS.len()],
                    WORDS[(i / WORDS.len()) % WORDS.len()],
                    i
                ));
                row.author = Some(AUTHORS[i % AUTHORS.len()].to_string());
            }
            row
        })
        .collect()
}

fn bench_build_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_index");

    for size in [1_000usize, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("entries", size), size, |b, &size| {
            let entries = synthetic_catalog(size);
            b.iter(|| build_index(black_box(entries.clone())).unwrap());
        });
    }

    group.finish();
}

fn bench_match_item(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_item");
    let index = build_index(synthetic_catalog(10_000)).unwrap();
    let matcher = Matcher::default();
    let rub = Currency::parse("RUB").unwrap();

    let by_isbn = synthetic_rows(10_000, 1)[0].to_item(&rub).unwrap();
    let by_tokens = RawPriceRow {
        title: Some("master garden souls".into()),
        author: Some("Mikhail Bulgakov".into()),
        price: Some("500".into()),
        ..RawPriceRow::new(1)
    }
    .to_item(&rub)
    .unwrap();

    group.bench_function("isbn_hit", |b| {
        b.iter(|| matcher.match_item(&index, black_box(&by_isbn)));
    });
    group.bench_function("token_scoring", |b| {
        b.iter(|| matcher.match_item(&index, black_box(&by_tokens)));
    });

    group.finish();
}

fn bench_import_batch(c: &mut Criterion) {
    pricesync_observability::init_with_default_filter("error");
    let mut group = c.benchmark_group("import_batch");
    group.sample_size(20);

    let entries = synthetic_catalog(10_000);
    let rows = synthetic_rows(10_000, 5_000);
    group.throughput(Throughput::Elements(rows.len() as u64));

    for workers in [1usize, 4].iter() {
        let policy = ImportPolicy::default()
            .with_workers(*workers)
            .with_update_existing_prices(false);
        group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, _| {
            let index = build_index(entries.clone()).unwrap();
            b.iter(|| import_batch(black_box(rows.clone()), &index, &policy).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_index, bench_match_item, bench_import_batch);
criterion_main!(benches);
