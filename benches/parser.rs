use criterion::{criterion_group, criterion_main, Criterion};
use crust::{ParseError, Program};

pub fn parse_benchmark(c: &mut Criterion) {
    c.bench_function("parse", |b| {
        b.iter(|| -> Result<(), ParseError> {
            Program::from_file("resources/countdown.crust")?;

            Ok(())
        })
    });
}

pub fn parse_large_benchmark(c: &mut Criterion) {
    let source = "spush hello spush world sadd put putln ipush 3 ipush 4 iadd jumpl 10 1\n".repeat(2048);
    c.bench_function("parse large", |b| {
        b.iter(|| -> Result<(), ParseError> {
            source.parse::<Program>()?;

            Ok(())
        })
    });
}

criterion_group!(parser, parse_benchmark, parse_large_benchmark);
criterion_main!(parser);
