#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use limare_link::{link_vertex, LinkLimits, LinkOptions, ShaderBinary};

#[derive(Debug, Arbitrary)]
struct Input {
    code: Vec<u8>,
    uniform_stream: Vec<u8>,
    attribute_stream: Vec<u8>,
    patch_attributes: bool,
    patch_varyings: bool,
}

fuzz_target!(|input: Input| {
    let binary = ShaderBinary {
        code: input.code,
        uniform_stream: input.uniform_stream,
        attribute_stream: input.attribute_stream,
        varying_stream: Vec::new(),
    };
    let options = LinkOptions {
        patch_attributes: input.patch_attributes,
        patch_varyings: input.patch_varyings,
    };

    let Ok(stage) = link_vertex(&binary, &LinkLimits::default(), &options) else {
        return;
    };

    // Patching never changes the code length.
    assert_eq!(stage.code.len_bytes(), binary.code.len());
    assert!(stage.patch_report.instructions <= binary.code.len() / 16);
});
