//! Match simulation throughput
//!
//! ```bash
//! cargo bench --bench simulation_bench
//! ```

use std::path::PathBuf;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hexbrawl::{load_rules, load_team, simulate, simulate_many};

fn data(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data").join(relative)
}

fn bench_simulation(c: &mut Criterion) {
    let rules = load_rules(&data("rules/default.toml")).unwrap();
    let team_a = load_team(&data("teams/vanguard.json")).unwrap();
    let team_b = load_team(&data("teams/arcanists.json")).unwrap();

    c.bench_function("simulate_6v6", |b| {
        b.iter(|| simulate(black_box(&rules), &team_a, &team_b, black_box(42)).unwrap())
    });

    let seeds: Vec<u64> = (0..64).collect();
    c.bench_function("simulate_many_64_seeds", |b| {
        b.iter(|| simulate_many(&rules, &team_a, &team_b, black_box(&seeds)).unwrap())
    });
}

criterion_group!(benches, bench_simulation);
criterion_main!(benches);
