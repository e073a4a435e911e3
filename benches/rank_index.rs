use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nebula_economy::rank::{RankIndex, RankIndexEntry};
use nebula_economy::PlayerId;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

fn player(i: u64) -> PlayerId {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&i.to_le_bytes());
    PlayerId::new(bytes)
}

fn entry(i: u64, score: u64) -> RankIndexEntry {
    RankIndexEntry {
        player_id: player(i),
        best_score: score,
        improved_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
            + Duration::seconds(i as i64),
        display_name: format!("player-{i}"),
        level: 1,
        character_used: "basic_cosmic".into(),
    }
}

fn setup_index(size: u64) -> RankIndex {
    let mut rng = StdRng::seed_from_u64(7);
    let mut index = RankIndex::new();
    for i in 0..size {
        index.offer(entry(i, rng.gen_range(0..1_000_000)));
    }
    index
}

fn rank_index(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_index");
    for size in [1_000u64, 10_000, 100_000] {
        let base = setup_index(size);
        let target = player(size / 2);

        group.bench_function(BenchmarkId::new("rank_of", size), |b| {
            b.iter(|| black_box(base.rank_of(&target)))
        });

        group.bench_function(BenchmarkId::new("count_greater", size), |b| {
            b.iter(|| black_box(base.count_greater(500_000)))
        });

        group.bench_function(BenchmarkId::new("top_100", size), |b| {
            b.iter(|| black_box(base.top(100)))
        });

        group.bench_function(BenchmarkId::new("improve_score", size), |b| {
            let mut index = base.clone();
            let mut score = 1_000_000;
            b.iter(|| {
                score += 1;
                black_box(index.offer(entry(size / 2, score)))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, rank_index);
criterion_main!(benches);
