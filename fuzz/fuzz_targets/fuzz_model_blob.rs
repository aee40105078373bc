//! Fuzz target: `DenseModel::from_bytes` + `invoke`
//!
//! Arbitrary bytes are parsed as a model blob.  Whatever the parser
//! accepts must run on a zero input without panicking or indexing out of
//! bounds.
//!
//! cargo fuzz run fuzz_model_blob

#![no_main]

use clinipower::inference::InferenceEngine;
use clinipower::inference::dense::DenseModel;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(mut model) = DenseModel::from_bytes(data) else {
        return;
    };
    let schema = model.schema();
    if schema.input_len > 4096 || schema.output_len > 4096 {
        return;
    }
    let input = vec![0i8; schema.input_len];
    let mut output = vec![0i8; schema.output_len];
    assert!(model.invoke(&input, &mut output).is_ok());
});
