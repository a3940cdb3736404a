#![no_main]

use libfuzzer_sys::fuzz_target;
use limare_stream::AttributeTable;

const MAX_INPUT_SIZE_BYTES: usize = 1024 * 1024; // 1 MiB

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_INPUT_SIZE_BYTES {
        return;
    }

    let Ok(Some(table)) = AttributeTable::parse(data) else {
        return;
    };

    assert_eq!(table.entries.len(), table.count as usize);
    for entry in &table.entries {
        let _ = (entry.name, entry.data.byte_size(), entry.initializer.is_some());
    }
    let _ = table.debug_summary();
});
