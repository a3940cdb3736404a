#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
#[cfg(not(target_arch = "wasm32"))]
use limare_stream::test_utils::{
    build_attribute_stream, build_uniform_stream, f32_bytes, float_attribute, float_uniform,
    AttributeDesc, UniformDesc,
};
#[cfg(not(target_arch = "wasm32"))]
use limare_stream::{AttributeTable, UniformTable};

#[cfg(not(target_arch = "wasm32"))]
fn uniform_stream(count: usize) -> Vec<u8> {
    let names: Vec<String> = (0..count).map(|i| format!("uniform_{i}")).collect();
    let init = f32_bytes(&[1.0, 2.0, 3.0, 4.0]);
    let descs: Vec<UniformDesc<'_>> = names
        .iter()
        .enumerate()
        .map(|(i, name)| UniformDesc {
            name,
            data: float_uniform(4, (i * 16) as u16),
            initializer: (i % 2 == 0).then_some((4, init.as_slice())),
        })
        .collect();
    build_uniform_stream((count * 16) as u32, &descs)
}

#[cfg(not(target_arch = "wasm32"))]
fn attribute_stream(count: usize) -> Vec<u8> {
    let names: Vec<String> = (0..count).map(|i| format!("in_attr_{i}")).collect();
    let descs: Vec<AttributeDesc<'_>> = names
        .iter()
        .enumerate()
        .map(|(i, name)| AttributeDesc {
            name,
            data: float_attribute(4, i as u16),
            initializer: None,
        })
        .collect();
    build_attribute_stream(&descs)
}

#[cfg(not(target_arch = "wasm32"))]
fn bench_table_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("limare_stream_parse");

    for count in [2usize, 16, 128] {
        let uniforms = uniform_stream(count);
        group.bench_with_input(
            BenchmarkId::new("uniforms", count),
            &uniforms,
            |b, bytes| {
                b.iter(|| {
                    let table = UniformTable::parse(black_box(bytes)).unwrap();
                    black_box(table.map(|t| t.entries.len()));
                })
            },
        );

        let attributes = attribute_stream(count);
        group.bench_with_input(
            BenchmarkId::new("attributes", count),
            &attributes,
            |b, bytes| {
                b.iter(|| {
                    let table = AttributeTable::parse(black_box(bytes)).unwrap();
                    black_box(table.map(|t| t.entries.len()));
                })
            },
        );
    }

    group.finish();
}

#[cfg(not(target_arch = "wasm32"))]
criterion_group!(benches, bench_table_parse);
#[cfg(not(target_arch = "wasm32"))]
criterion_main!(benches);
