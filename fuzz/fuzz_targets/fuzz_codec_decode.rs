// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for store file decoding.
// Run with: cargo +nightly fuzz run fuzz_codec_decode
//
// A damaged store file must decode to an error, never a panic, and anything
// that does decode must encode again.

#![no_main]

use libfuzzer_sys::fuzz_target;
use litestore::{CborCodec, Codec, JsonCodec};

fuzz_target!(|data: &[u8]| {
    let codecs: [&dyn Codec; 2] = [&JsonCodec, &CborCodec];
    for codec in codecs {
        if let Ok(contents) = codec.decode(data) {
            // CBOR may carry NaN, which JSON refuses; re-encode with the
            // codec that produced it.
            let bytes = codec.encode(&contents).expect("decoded contents must re-encode");
            let again = codec.decode(&bytes).expect("re-encoded contents must decode");
            assert_eq!(again.len(), contents.len());
        }
    }
});
