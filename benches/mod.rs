use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    config::bench_validate,
    config::bench_load_network_config,
    subscriptions::bench_replay,
    subscriptions::bench_add_remove
);
criterion_main!(benches);
