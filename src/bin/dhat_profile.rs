//! DHAT heap profiler for the watermark cache.
//!
//! Run with: cargo run --bin dhat_profile --release --features dhat-heap
//! View results: Open dhat-heap.json in <https://nnethercote.github.io/dh_view/dh_view.html>

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::sync::Arc;

use watermark_cache::{EvictionPolicy, WatermarkConfig, WatermarkCore};

/// Simple XorShift64 RNG for deterministic workloads.
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_f64(&mut self) -> f64 {
        const SCALE: f64 = 1.0 / (u64::MAX as f64);
        (self.next_u64() as f64) * SCALE
    }
}

type Engine = WatermarkCore<u64, u64>;

/// 90% of accesses hit 10% of keys; misses are filled in.
fn hotset_workload(cache: &mut Engine, operations: usize, universe: u64, seed: u64) {
    let mut rng = XorShift64::new(seed);
    let hot_size = (universe as f64 * 0.1) as u64;

    for _ in 0..operations {
        let key = if rng.next_f64() < 0.9 {
            rng.next_u64() % hot_size
        } else {
            hot_size + (rng.next_u64() % (universe - hot_size))
        };

        if cache.get(&key).is_none() {
            cache.insert(key, Arc::new(key));
        }
    }
}

/// Sequential keys wrapping over the universe.
fn scan_workload(cache: &mut Engine, operations: usize, universe: u64) {
    for i in 0..operations {
        let key = (i as u64) % universe;
        if cache.get(&key).is_none() {
            cache.insert(key, Arc::new(key));
        }
    }
}

/// Fresh keys only, so every insert past the high watermark drains.
fn eviction_churn(cache: &mut Engine, operations: usize) {
    for i in 0..operations {
        let key = 1_000_000 + i as u64;
        cache.insert(key, Arc::new(key));
    }
}

fn profile(label: &str, config: WatermarkConfig) {
    println!("=== Profiling {label} ===");
    let operations = 100_000;
    let universe = 16_384;

    let mut cache = match Engine::with_config(config) {
        Ok(cache) => cache,
        Err(err) => {
            eprintln!("  skipped: {err}");
            return;
        },
    };

    for i in 0..config.high_watermark as u64 {
        cache.insert(i, Arc::new(i));
    }

    hotset_workload(&mut cache, operations, universe, 42);
    scan_workload(&mut cache, operations / 2, universe);
    eviction_churn(&mut cache, operations / 4);

    println!("  Final size: {}", cache.len());
}

fn main() {
    let _profiler = dhat::Profiler::new_heap();

    println!("Watermark Cache DHAT Heap Profiling");
    println!("===================================\n");

    profile(
        "LRU fixed capacity",
        WatermarkConfig::fixed_capacity(EvictionPolicy::Lru, 4096),
    );
    profile(
        "LRU 3072/4096",
        WatermarkConfig::new(EvictionPolicy::Lru, 3072, 4096),
    );
    profile(
        "FIFO fixed capacity",
        WatermarkConfig::fixed_capacity(EvictionPolicy::Fifo, 4096),
    );
    profile(
        "FIFO 1024/4096",
        WatermarkConfig::new(EvictionPolicy::Fifo, 1024, 4096),
    );

    println!("\n===================================");
    println!("Profile written to dhat-heap.json");
}
