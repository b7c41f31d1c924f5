// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use libfuzzer_sys::fuzz_target;
use trvoyage::conflicts::detect_conflicts;
use trvoyage::dependencies::infer_dependencies;
use trvoyage::mapper::decode_document;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(doc) = decode_document(text) {
        let linked = infer_dependencies(&doc.activities);
        assert_eq!(linked.len(), doc.activities.len());
        let _ = detect_conflicts(&linked);
    }
});
