//! Fuzz target for record decoding.
//!
//! Arbitrary bytes from the store must decode to a record or fail with a
//! marshal error. Never a panic.

#![no_main]

use kv_mirror::store::{JsonMarshaler, Marshaler, MsgPackMarshaler};
use kv_mirror::StoreError;
use libfuzzer_sys::fuzz_target;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Record {
    id: u64,
    uuid: String,
    tags: Vec<String>,
    score: Option<f64>,
}

fuzz_target!(|data: &[u8]| {
    for result in [
        MsgPackMarshaler.unmarshal::<Record>(data),
        JsonMarshaler.unmarshal::<Record>(data),
    ] {
        match result {
            Ok(_) => {}
            Err(StoreError::Marshal { operation, .. }) => assert_eq!(operation, "decode"),
            Err(other) => panic!("unexpected error kind: {:?}", other),
        }
    }

    // Whatever decodes must encode again.
    if let Ok(record) = MsgPackMarshaler.unmarshal::<Record>(data) {
        let bytes = MsgPackMarshaler.marshal(&record).expect("re-encode");
        let _ = MsgPackMarshaler.unmarshal::<Record>(&bytes);
    }
});
