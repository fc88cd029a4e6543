// In benches/pipeline_bench.rs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use molvis_core::config::HideMode;
use molvis_core::frame::{ATOMS, BONDS};
use molvis_core::modifier::{
    DataSourceModifier, ExpressionSelectionModifier, HideSelectionModifier, SourceType,
};
use molvis_core::{Block, Frame, ModifierPipeline};

const ELEMENTS: [&str; 5] = ["C", "H", "O", "N", "S"];

/// A random chain molecule: atoms scattered in a 40 Å cube, each bonded to the next.
fn random_frame(atoms: usize, seed: u64) -> Frame {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut coords = || (0..atoms).map(|_| rng.random_range(-20.0f32..20.0)).collect::<Vec<_>>();
    let (x, y, z) = (coords(), coords(), coords());
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
    let elements: Vec<&str> = (0..atoms)
        .map(|_| ELEMENTS[rng.random_range(0..ELEMENTS.len())])
        .collect();

    let mut block = Block::new();
    block.set_f32("x", x).unwrap();
    block.set_f32("y", y).unwrap();
    block.set_f32("z", z).unwrap();
    block.set_strings("element", elements).unwrap();

    let bonds_len = atoms.saturating_sub(1) as u32;
    let mut bonds = Block::new();
    bonds.set_u32("i", (0..bonds_len).collect()).unwrap();
    bonds.set_u32("j", (1..=bonds_len).collect()).unwrap();

    let mut frame = Frame::new();
    frame.insert_block(ATOMS, block);
    frame.insert_block(BONDS, bonds);
    frame
}

fn pipeline_for(frame: Frame, mode: HideMode) -> ModifierPipeline {
    let mut pipeline = ModifierPipeline::default();
    pipeline.add_modifier(Box::new(DataSourceModifier::new(frame, SourceType::Frame)));
    pipeline.add_modifier(Box::new(ExpressionSelectionModifier::new(
        "element == 'H' or (x > 0 and not z < -5)",
    )));
    pipeline.add_modifier(Box::new(HideSelectionModifier::new().with_mode(mode)));
    pipeline
}

fn bench_pipeline_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("Pipeline apply (select + hide)");
    for atoms in [1_000usize, 10_000, 100_000] {
        group.throughput(Throughput::Elements(atoms as u64));
        for mode in [HideMode::Remove, HideMode::Mask] {
            let pipeline = pipeline_for(random_frame(atoms, 42), mode);
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", mode), atoms),
                &pipeline,
                |b, pipeline| b.iter(|| black_box(pipeline.apply())),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_pipeline_apply);
criterion_main!(benches);
