#![no_main]

use libfuzzer_sys::fuzz_target;
use watermark_cache::ds::IntrusiveList;

// Fuzz arbitrary operation sequences on the eviction queue list
//
// Tests random sequences of push_back, pop_front, pop_back, move_to_back,
// remove, guarded appends and clear, checking length and order bookkeeping.
fuzz_target!(|data: &[u8]| {
    let mut list: IntrusiveList<u32> = IntrusiveList::new();
    let mut all_ids = Vec::new();

    for pair in data.chunks_exact(2) {
        let op = pair[0] % 8;
        let value = u32::from(pair[1]);

        match op {
            0 => {
                let id = list.push_back(value);
                all_ids.push(id);
                assert_eq!(list.back(), Some(&value));
                assert_eq!(list.back_id(), Some(id));
            },
            1 => {
                let old_len = list.len();
                match list.pop_front() {
                    Some(_) => assert_eq!(list.len(), old_len - 1),
                    None => assert!(list.is_empty()),
                }
            },
            2 => {
                let old_len = list.len();
                match list.pop_back() {
                    Some(_) => assert_eq!(list.len(), old_len - 1),
                    None => assert!(list.is_empty()),
                }
            },
            3 => {
                if !all_ids.is_empty() {
                    let id = all_ids[value as usize % all_ids.len()];
                    if list.move_to_back(id) {
                        assert_eq!(list.back_id(), Some(id));
                    } else {
                        assert!(!list.contains(id));
                    }
                }
            },
            4 => {
                if !all_ids.is_empty() {
                    let id = all_ids[value as usize % all_ids.len()];
                    let was_present = list.contains(id);
                    assert_eq!(list.remove(id).is_some(), was_present);
                    assert!(!list.contains(id));
                }
            },
            5 => {
                // Guarded append that is abandoned: list must be unchanged.
                let before: Vec<u32> = list.iter().copied().collect();
                {
                    let mut guard = list.append_guard();
                    for i in 0..=(value % 4) {
                        guard.push_back(i);
                    }
                }
                let after: Vec<u32> = list.iter().copied().collect();
                assert_eq!(before, after);
            },
            6 => {
                // Guarded append that commits.
                let old_len = list.len();
                let mut guard = list.append_guard();
                let id = guard.push_back(value);
                guard.disarm();
                all_ids.push(id);
                assert_eq!(list.len(), old_len + 1);
            },
            _ => {
                list.clear();
                assert!(list.is_empty());
                assert_eq!(list.front_id(), None);
            },
        }

        assert_eq!(list.iter().count(), list.len());
    }
});
