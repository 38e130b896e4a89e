use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rowsql::sql::lexer::Lexer;
use rowsql::sql::parser::parse_sql;
use rowsql::Engine;

const QUERY: &str = "SELECT id, name, age * 2 AS doubled FROM users \
                     WHERE active = true AND (age >= 18 OR name = 'root') \
                     ORDER BY age, id DESC LIMIT 10";

fn populated_engine(rows: usize) -> Engine {
    let mut engine = Engine::new();
    engine
        .execute("CREATE TABLE users (id INTEGER NOT NULL, name TEXT, age INTEGER, active BOOLEAN)")
        .unwrap();
    for i in 0..rows {
        engine
            .execute(&format!(
                "INSERT INTO users VALUES ({}, 'user_{}', {}, {})",
                i,
                i,
                i % 90,
                i % 3 != 0
            ))
            .unwrap();
    }
    engine
}

fn bench_tokenize(c: &mut Criterion) {
    c.bench_function("tokenize_select", |b| {
        b.iter(|| black_box(Lexer::new(black_box(QUERY)).tokenize().unwrap()));
    });
}

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse_select", |b| {
        b.iter(|| black_box(parse_sql(black_box(QUERY)).unwrap()));
    });
}

fn bench_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_inserts");

    for size in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(populated_engine(size)));
        });
    }
    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("sql_select_filter_sort");

    for size in [100, 1000, 10000].iter() {
        let mut engine = populated_engine(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(engine.execute(QUERY).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tokenize, bench_parse, bench_inserts, bench_select);
criterion_main!(benches);
