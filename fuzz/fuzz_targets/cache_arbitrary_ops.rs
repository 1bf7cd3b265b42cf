#![no_main]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use watermark_cache::{EvictionPolicy, WatermarkConfig, WatermarkCore};

// Fuzz arbitrary operation sequences on the watermark engine
//
// The first two bytes pick the policy and watermarks; the rest is a stream
// of (op, key) pairs. After every step the index and queue must agree, the
// size must stay within the high watermark, and every entry that left the
// cache other than through clear must have reached the callback.
fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let policy = if data[0] & 1 == 0 {
        EvictionPolicy::Lru
    } else {
        EvictionPolicy::Fifo
    };
    let high = usize::from(data[1] % 32) + 1;
    let low = usize::from(data[0] >> 1) % high + 1;

    let mut core: WatermarkCore<u8, u8> =
        match WatermarkCore::with_config(WatermarkConfig::new(policy, low, high)) {
            Ok(core) => core,
            Err(_) => return,
        };

    let notified = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&notified);
    core.set_post_eviction_callback(move |_: &Arc<u8>| {
        sink.fetch_add(1, Ordering::Relaxed);
    });

    let mut live = 0usize;
    let mut departed = 0usize;

    for pair in data[2..].chunks_exact(2) {
        let key = pair[1] % 64;
        let before = notified.load(Ordering::Relaxed);

        match pair[0] % 6 {
            0 | 1 => {
                if core.insert(key, Arc::new(pair[1])) {
                    live += 1;
                }
                assert_eq!(core.peek(&key).map(|v| **v), Some(pair[1]));
                assert_eq!(core.iter().last().map(|(k, _)| *k), Some(key));
            },
            2 => {
                let touched = core.try_get_value(&key, pair[1] & 0x80 != 0).is_some();
                assert_eq!(touched, core.contains(&key));
            },
            3 => {
                if core.remove(&key).is_some() {
                    assert!(!core.contains(&key));
                }
            },
            4 => {
                let head = core.peek_front().map(|(k, _)| *k);
                assert_eq!(core.pop_front().map(|(k, _)| k), head);
            },
            _ => {
                live -= core.len();
                core.clear();
                assert_eq!(notified.load(Ordering::Relaxed), before);
            },
        }

        departed += notified.load(Ordering::Relaxed) - before;
        assert!(core.len() <= high);
        assert_eq!(core.len() + departed, live);
        assert!(core.check_invariants().is_ok());
    }
});
