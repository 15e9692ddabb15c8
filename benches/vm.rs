use criterion::{criterion_group, criterion_main, Criterion};
use crust::{Program, Vm, VmConfig, VmError};

pub fn single_instruction_with_param_benchmark(c: &mut Criterion) {
    let program = Program::parse("ipush 64").unwrap();
    let mut vm = Vm::new(&program, VmConfig::suppressed());
    c.bench_function("single instruction with param", |b| {
        b.iter(|| -> Result<(), VmError> {
            vm.run()?;
            vm.reset();

            Ok(())
        })
    });
}

pub fn reset_vm_benchmark(c: &mut Criterion) {
    let program = Program::from_file("resources/hello_world.crust").unwrap();
    let mut vm = Vm::new(&program, VmConfig::suppressed());
    c.bench_function("reset vm", |b| {
        b.iter(|| -> Result<(), VmError> {
            vm.reset();

            Ok(())
        })
    });
}

pub fn hello_world_benchmark(c: &mut Criterion) {
    let program = Program::from_file("resources/hello_world.crust").unwrap();
    let mut vm = Vm::new(&program, VmConfig::suppressed());
    c.bench_function("hello world", |b| {
        b.iter(|| -> Result<(), VmError> {
            vm.run()?;
            vm.reset();

            Ok(())
        })
    });
}

pub fn count_benchmark(c: &mut Criterion) {
    let program = Program::from_file("resources/count.crust").unwrap();
    let mut vm = Vm::new(&program, VmConfig::suppressed());
    c.bench_function("count", |b| {
        b.iter(|| -> Result<(), VmError> {
            vm.run()?;
            vm.reset();

            Ok(())
        })
    });
}

pub fn count_to_output_benchmark(c: &mut Criterion) {
    let program = Program::from_file("resources/count.crust").unwrap();
    let mut vm = Vm::with_output(&program, VmConfig::default(), std::io::sink());
    c.bench_function("count to sink", |b| {
        b.iter(|| -> Result<(), VmError> {
            vm.run()?;
            vm.reset();

            Ok(())
        })
    });
}

pub fn countdown_benchmark(c: &mut Criterion) {
    let program = Program::from_file("resources/countdown.crust").unwrap();
    let mut vm = Vm::new(&program, VmConfig::suppressed());
    c.bench_function("countdown", |b| {
        b.iter(|| -> Result<(), VmError> {
            vm.run()?;
            vm.reset();

            Ok(())
        })
    });
}

criterion_group!(
    vm,
    count_benchmark,
    count_to_output_benchmark,
    countdown_benchmark,
    hello_world_benchmark,
    reset_vm_benchmark,
    single_instruction_with_param_benchmark
);
criterion_main!(vm);
