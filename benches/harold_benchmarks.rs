//! # Harold Performance Benchmarks
//!
//! Benchmarks for the pieces of Harold that run on every tick or every
//! session. None of them should ever be noticeable next to a 25 second song,
//! but a Raspberry Pi scanning a large NFS home directory can surprise you.
//!
//! ## Benchmark Categories
//!
//! - **Session**: Fade ramp generation and quiet hours evaluation
//! - **Song Selection**: Directory scans of various sizes, fallback picks
//! - **Player Protocol**: Command rendering and escaping
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench song_selection
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use harold::identity::Identity;
use harold::player::PlayerCommand;
use harold::quiet_hours;
use harold::session::fade_ramp;
use harold::song_selector::{HomeDirSelector, SongSelector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper creating a home root where `bench` owns `count` songs.
fn create_song_directory(count: usize) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let dir = temp_dir.path().join("bench").join("harold");
    std::fs::create_dir_all(&dir).expect("Failed to create song directory");

    for i in 0..count {
        // Mix in non-song files the scan has to skip.
        let name = if i % 10 == 0 {
            format!("cover{i:04}.jpg")
        } else {
            format!("song{i:04}.mp3")
        };
        std::fs::write(dir.join(name), b"").expect("Failed to create song file");
    }
    temp_dir
}

fn benchmark_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");

    group.bench_function("fade_ramp_full", |b| {
        b.iter(|| fade_ramp(black_box(100), black_box(60)))
    });

    group.bench_function("quiet_hours_week", |b| {
        b.iter(|| {
            (0..7u32)
                .flat_map(|day| (0..24u32).map(move |hour| (day, hour)))
                .filter(|&(day, hour)| quiet_hours::is_quiet_hours(black_box(day), black_box(hour)))
                .count()
        })
    });

    group.finish();
}

fn benchmark_song_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("song_selection");

    for size in [10, 100, 1000].iter() {
        let home = create_song_directory(*size);
        let mut selector = HomeDirSelector::new(Vec::new(), Box::new(StdRng::seed_from_u64(1)))
            .with_home_root(Some(home.path().to_path_buf()));
        let identity = Identity::Known("bench".to_string());

        group.bench_with_input(BenchmarkId::new("user_directory", size), &identity, |b, identity| {
            b.iter(|| selector.select(black_box(identity)))
        });
    }

    let empty_home = TempDir::new().expect("Failed to create temp directory");
    let mut selector = HomeDirSelector::new(Vec::new(), Box::new(StdRng::seed_from_u64(1)))
        .with_home_root(Some(empty_home.path().to_path_buf()));
    group.bench_function("anonymous_fallback", |b| {
        b.iter(|| selector.select(black_box(&Identity::Anonymous)))
    });

    group.finish();
}

fn benchmark_player_protocol(c: &mut Criterion) {
    let mut group = c.benchmark_group("player_protocol");

    let plain = PlayerCommand::LoadFile(PathBuf::from("/users/u22/henry/harold/waka.mp3"));
    let quoted = PlayerCommand::LoadFile(PathBuf::from("/music/'Don't' 'Stop' 'Me' 'Now'.mp3"));

    group.bench_function("render_plain", |b| b.iter(|| black_box(&plain).render()));
    group.bench_function("render_escaped", |b| b.iter(|| black_box(&quoted).render()));

    group.finish();
}

// Group all benchmarks
criterion_group!(
    benches,
    benchmark_session,
    benchmark_song_selection,
    benchmark_player_protocol
);

criterion_main!(benches);
