#![no_main]

use libfuzzer_sys::fuzz_target;
use limare_stream::UniformTable;

/// Max fuzz input size; matches the default link-time cap on metadata streams.
const MAX_INPUT_SIZE_BYTES: usize = 1024 * 1024; // 1 MiB

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_INPUT_SIZE_BYTES {
        return;
    }

    // All errors are acceptable; panics and unbounded allocations are not.
    let Ok(Some(table)) = UniformTable::parse(data) else {
        return;
    };

    assert_eq!(table.entries.len(), table.count as usize);
    for entry in &table.entries {
        let _ = (entry.name.len(), entry.data.byte_size());
        if let Some(init) = &entry.initializer {
            assert!(init.data.len() <= data.len());
        }
    }
    let _ = table.debug_summary();
});
