//! Credential store operations from concurrent threads.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use credpal_core::fs::memory::DriverOp;
use credpal_core::{CERTIFICATE_FILE_NAME, KEY_FILE_NAME};

const THREADS: usize = 8;
const ROUNDS: usize = 25;

#[test]
fn test_concurrent_operations_never_interleave_on_the_device() {
    let (store, probe) = common::booted_store();
    store.save(CERTIFICATE_FILE_NAME, b"initial certificate").expect("seed cert");
    store.save(KEY_FILE_NAME, b"initial key").expect("seed key");
    probe.clear_calls();

    let store = Arc::new(store);
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|worker| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let slot = if worker % 2 == 0 {
                    CERTIFICATE_FILE_NAME
                } else {
                    KEY_FILE_NAME
                };
                for round in 0..ROUNDS {
                    if round % 3 == 0 {
                        let data = vec![u8::try_from(worker).expect("small"); 64 + round];
                        store.save(slot, &data).expect("save");
                    } else {
                        let buffer = store.read(slot).expect("read");
                        store.release(buffer).expect("release");
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker");
    }

    // Every open..close run on the device belongs to exactly one thread.
    let calls = probe.file_calls();
    assert!(!calls.is_empty());
    let mut owner = None;
    for call in &calls {
        match call.op {
            DriverOp::Open(_) => {
                assert!(owner.is_none(), "open while another file is open: {call:?}");
                owner = Some(call.thread);
            }
            DriverOp::Close => {
                assert_eq!(owner.take(), Some(call.thread), "close from a foreign thread");
            }
            _ => assert_eq!(owner, Some(call.thread), "interleaved call: {call:?}"),
        }
    }
    assert!(owner.is_none());
    assert_eq!(probe.open_files(), 0);
    assert_eq!(store.heap().outstanding(), 0);
}

#[test]
fn test_saved_content_is_never_torn() {
    let (store, _probe) = common::booted_store();
    store.save(KEY_FILE_NAME, &[0u8; 128]).expect("seed");
    let store = Arc::new(store);

    let writers: Vec<_> = (1..=4u8)
        .map(|fill| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    store.save(KEY_FILE_NAME, &[fill; 128]).expect("save");
                }
            })
        })
        .collect();

    for _ in 0..100 {
        let buffer = store.read(KEY_FILE_NAME).expect("read");
        let first = buffer[0];
        assert!(buffer.iter().all(|&byte| byte == first), "torn read");
        store.release(buffer).expect("release");
    }
    for writer in writers {
        writer.join().expect("writer");
    }
}
