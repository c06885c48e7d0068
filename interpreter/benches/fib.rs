use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};
use lpp::{parse, Environment, Interpreter};

fn benchmark(c: &mut Criterion) {
    let src = include_str!("../data/fib.lpp");
    let program = parse(src).unwrap();
    let sink: Rc<RefCell<dyn io::Write>> = Rc::new(RefCell::new(io::sink()));

    c.bench_function("fib 20", |b| {
        b.iter(|| {
            let mut interpreter = Interpreter::new(sink.clone());
            interpreter.evaluate(&program, Environment::root())
        })
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
