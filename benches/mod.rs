use criterion::{criterion_group, criterion_main};

mod cli;

criterion_group!(
    benches,
    cli::bench_dispatch,
    cli::bench_par_get,
    cli::bench_osci_sample
);
criterion_main!(benches);
