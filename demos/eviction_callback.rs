use std::sync::Arc;

use parking_lot::Mutex;
use watermark_cache::{CacheBuilder, EvictionPolicy};

fn main() {
    // RUST_LOG=watermark_cache=debug shows each watermark drain.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evicted);

    let cache = CacheBuilder::<u32, String>::new()
        .policy(EvictionPolicy::Fifo)
        .watermarks(2, 4)
        .post_eviction_callback(move |value: &Arc<String>| sink.lock().push(value.to_string()))
        .try_build()
        .unwrap();

    for (i, name) in ["one", "two", "three", "four", "five"].iter().enumerate() {
        cache.insert(i as u32, name.to_string());
    }
    println!("evicted by drain: {:?}", evicted.lock());

    cache.erase(&4);
    println!("after erase: {:?}", evicted.lock());

    cache.clear();
    println!("after clear: {:?}", evicted.lock());
}

// Expected output:
// evicted by drain: ["one", "two", "three"]
// after erase: ["one", "two", "three", "five"]
// after clear: ["one", "two", "three", "five"]
//
// Explanation: watermarks (2, 4). The fifth insert finds four entries and
// drains in FIFO order until one remains. erase() notifies the callback;
// clear() drops the remaining entry silently.
