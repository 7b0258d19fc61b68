//! Performance benchmarks for queue sweeps and room operations

use anteroom::config::MatchmakerConfig;
use anteroom::types::{Player, QueueLabel};
use anteroom::Matchmaker;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

type BenchMatchmaker = Matchmaker<Player, QueueLabel>;

fn create_bench_system(shuffle: bool) -> BenchMatchmaker {
    let config = MatchmakerConfig::immediate()
        .with_shuffle(shuffle)
        .with_wait_times(Duration::ZERO, Duration::from_secs(30));
    Matchmaker::new(config).unwrap()
}

fn fill_queue(matchmaker: &BenchMatchmaker, participants: usize, keys: usize) {
    for i in 0..participants {
        let key = format!("mode_{}", i % keys);
        matchmaker
            .join_queue(Player::new(format!("player_{}", i)), QueueLabel::new(key, 4))
            .unwrap();
    }
}

fn bench_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("sweep");

    for participants in [100usize, 1_000, 10_000] {
        for shuffle in [false, true] {
            let id = format!("{}_{}", participants, if shuffle { "shuffled" } else { "ordered" });
            group.bench_function(BenchmarkId::from_parameter(id), |b| {
                b.iter_batched(
                    || {
                        let matchmaker = create_bench_system(shuffle);
                        fill_queue(&matchmaker, participants, 8);
                        matchmaker
                    },
                    |matchmaker| black_box(matchmaker.run_sweep().unwrap()),
                    criterion::BatchSize::LargeInput,
                )
            });
        }
    }

    group.finish();
}

fn bench_idle_sweep(c: &mut Criterion) {
    // Entries still settling are skipped without matching
    let config = MatchmakerConfig::default().with_shuffle(false);
    let matchmaker: BenchMatchmaker = Matchmaker::new(config).unwrap();
    fill_queue(&matchmaker, 1_000, 8);

    c.bench_function("idle_sweep_1000_settling", |b| {
        b.iter(|| black_box(matchmaker.run_sweep().unwrap()))
    });
}

fn bench_single_queue_request(c: &mut Criterion) {
    let matchmaker = create_bench_system(false);
    let mut i = 0u64;

    c.bench_function("single_queue_request", |b| {
        b.iter(|| {
            i += 1;
            let id = format!("bench_player_{}", i);
            matchmaker
                .join_queue(Player::new(id.clone()), QueueLabel::new("duo", 2))
                .unwrap();
            black_box(matchmaker.leave_queue(&id))
        })
    });
}

fn bench_room_lifecycle(c: &mut Criterion) {
    let matchmaker = create_bench_system(false);

    c.bench_function("room_create_join_start", |b| {
        b.iter(|| {
            let code = matchmaker
                .create_room(Player::new("host"), Some(QueueLabel::new("duo", 2)))
                .unwrap();
            matchmaker.join_room(Player::new("guest"), &code).unwrap();
            black_box(matchmaker.start_room("host", &code, false).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_sweep,
    bench_idle_sweep,
    bench_single_queue_request,
    bench_room_lifecycle
);
criterion_main!(benches);
