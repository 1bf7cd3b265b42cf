use watermark_cache::{Cache, EvictionPolicy};

fn main() {
    let cache: Cache<&str, String> = Cache::with_watermarks(EvictionPolicy::Lru, 2, 3).unwrap();

    cache.insert("alpha", "a".to_string());
    cache.insert("beta", "b".to_string());
    cache.insert("gamma", "c".to_string());

    if let Some(value) = cache.get(&"alpha") {
        println!("hit alpha: {}", value.as_str());
    }

    cache.insert("delta", "d".to_string());

    println!("len after drain: {}", cache.len());
    cache.visit(|key, value| {
        println!("  {key} => {value}");
        true
    });
}

// Expected output:
// hit alpha: a
// len after drain: 2
//   alpha => a
//   delta => d
//
// Explanation: watermarks (2, 3). The fourth insert finds the cache at the
// high watermark and evicts from the LRU end until fewer than 2 remain.
// alpha was touched by get(), so beta and gamma go; then delta is added.
