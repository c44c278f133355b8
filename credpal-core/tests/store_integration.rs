//! Save, read and release against the in-memory volume.

mod common;

use credpal_core::fs::memory::{DriverOp, FaultPlan};
use credpal_core::fs::{FatCode, OpenMode};
use credpal_core::{ErrorKind, StoreError, CERTIFICATE_FILE_NAME, KEY_FILE_NAME};
use test_case::test_case;

#[test]
fn test_round_trip_across_lengths() {
    let (store, probe) = common::booted_store();
    for len in [0, 1, 3, 4, 5, 255, 256, 1024, 4096] {
        let data = common::payload(len);
        store.save(KEY_FILE_NAME, &data).expect("save");
        let buffer = store.read(KEY_FILE_NAME).expect("read");
        assert_eq!(buffer.len(), len);
        assert_eq!(buffer.as_slice(), data.as_slice());
        store.release(buffer).expect("release");
    }
    assert_eq!(store.heap().outstanding(), 0);
    assert_eq!(probe.open_files(), 0);
}

#[test_case("seedfile.dat" ; "unrelated name")]
#[test_case("" ; "empty name")]
#[test_case("FreeRTOS_P11_" ; "shared stem only")]
#[test_case("../FreeRTOS_P11_Key.dat" ; "path traversal")]
#[test_case("freertos_p11_key.dat" ; "different case")]
fn test_disallowed_names_do_no_io(name: &str) {
    let (store, probe) = common::booted_store();
    probe.clear_calls();

    let err = store.save(name, b"data").expect_err("save rejected");
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    let err = store.read(name).expect_err("read rejected");
    assert_eq!(
        err,
        StoreError::PolicyViolation {
            name: name.to_string()
        }
    );

    assert!(probe.calls().is_empty());
    assert!(probe.file_names().is_empty());
}

#[test]
fn test_never_saved_slot_is_open_failure() {
    let (store, probe) = common::booted_store();
    let err = store.read(CERTIFICATE_FILE_NAME).expect_err("missing");
    assert_eq!(
        err,
        StoreError::OpenFailure {
            file: CERTIFICATE_FILE_NAME
        }
    );
    assert!(err.is_io());
    assert_eq!(store.heap().outstanding(), 0);
    assert_eq!(probe.open_files(), 0);
}

#[test]
fn test_short_write_is_reported_and_file_closed() {
    let (store, probe) = common::booted_store();
    probe.set_faults(FaultPlan {
        short_write_at: Some(2),
        ..FaultPlan::default()
    });
    let err = store.save(KEY_FILE_NAME, b"abcdef").expect_err("short write");
    assert_eq!(
        err,
        StoreError::ShortWrite {
            file: KEY_FILE_NAME,
            written: 2,
            requested: 6
        }
    );
    assert_eq!(probe.open_files(), 0);

    let ops: Vec<DriverOp> = probe.file_calls().into_iter().map(|call| call.op).collect();
    assert_eq!(
        ops,
        [
            DriverOp::Open(OpenMode::CreateAlways),
            DriverOp::Write,
            DriverOp::Close
        ]
    );
}

#[test]
fn test_zero_byte_read_of_nonempty_file_fails() {
    let (store, probe) = common::booted_store();
    store.save(CERTIFICATE_FILE_NAME, b"cert").expect("save");
    probe.set_faults(FaultPlan {
        empty_read: true,
        ..FaultPlan::default()
    });
    let err = store.read(CERTIFICATE_FILE_NAME).expect_err("empty read");
    assert_eq!(
        err,
        StoreError::ShortRead {
            file: CERTIFICATE_FILE_NAME,
            read: 0,
            expected: 4
        }
    );
    assert_eq!(store.heap().outstanding(), 0);
    assert_eq!(probe.open_files(), 0);
}

#[test]
fn test_open_failure_on_save() {
    let (store, probe) = common::booted_store();
    probe.set_faults(FaultPlan {
        open: Some(FatCode::Denied),
        ..FaultPlan::default()
    });
    let err = store.save(KEY_FILE_NAME, b"key").expect_err("denied");
    assert_eq!(err, StoreError::OpenFailure { file: KEY_FILE_NAME });
    assert_eq!(probe.open_files(), 0);
}

#[test]
fn test_slots_are_independent() {
    let (store, probe) = common::booted_store();
    store.save(CERTIFICATE_FILE_NAME, b"certificate").expect("save cert");
    store.save(KEY_FILE_NAME, b"key").expect("save key");
    assert_eq!(probe.file(CERTIFICATE_FILE_NAME), Some(b"certificate".to_vec()));
    assert_eq!(probe.file(KEY_FILE_NAME), Some(b"key".to_vec()));
    assert_eq!(probe.file_names().len(), 2);
}

#[test]
fn test_buffers_count_against_heap_until_released() {
    let (store, _probe) = common::booted_store();
    store.save(KEY_FILE_NAME, &common::payload(100)).expect("save");
    let first = store.read(KEY_FILE_NAME).expect("read");
    let second = store.read(KEY_FILE_NAME).expect("read");
    assert_eq!(store.heap().outstanding(), 200);
    store.release(first).expect("release");
    assert_eq!(store.heap().outstanding(), 100);
    store.release(second).expect("release");
    assert_eq!(store.heap().outstanding(), 0);
}

#[test]
fn test_prefixed_name_replaces_the_canonical_slot() {
    let (store, probe) = common::booted_store();
    store.save(KEY_FILE_NAME, b"primary").expect("save");
    store.save("FreeRTOS_P11_Key.dat.bak", b"backup").expect("save prefixed");

    assert_eq!(probe.file(KEY_FILE_NAME), Some(b"backup".to_vec()));
    assert_eq!(probe.file_names(), [KEY_FILE_NAME]);
    let buffer = store.read("FreeRTOS_P11_Key.dat.bak").expect("read prefixed");
    assert_eq!(buffer.as_slice(), b"backup");
}
