// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use libfuzzer_sys::fuzz_target;
use trvoyage::mapper::derive_tags;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let (name, level2) = text.split_once('|').map_or((text.as_ref(), None), |(n, l)| (n, Some(l)));
    let tags = derive_tags(name, level2, &[]);
    if let Some(voyage) = tags.voyage_id {
        assert!(voyage.starts_with('V'));
    }
    if let Some(unit) = tags.tr_unit_id {
        assert!(unit.starts_with("TR-"));
    }
});
