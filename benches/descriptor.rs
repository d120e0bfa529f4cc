use std::hint::black_box;

use cbir::descriptor::{Descriptor, ShapeDescriptor, TextureDescriptor};
use cbir::search::rank;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use image::{GrayImage, Luma};
use rand::prelude::*;

fn shape_image() -> GrayImage {
    GrayImage::from_fn(256, 256, |x, y| {
        let (dx, dy) = (x as i64 - 128, y as i64 - 128);
        if dx * dx + 4 * dy * dy <= 90 * 90 { Luma([255]) } else { Luma([0]) }
    })
}

fn texture_image() -> GrayImage {
    let mut rng = rand::rng();
    GrayImage::from_fn(256, 256, |x, y| Luma([((x + 2 * y) % 16 * 12) as u8 ^ rng.random::<u8>() >> 4]))
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("特征提取");
    group.sample_size(20);

    let shape = ShapeDescriptor::new(512);
    let img = shape_image();
    group.bench_function("shape_256", |b| b.iter(|| shape.extract(black_box(&img))));

    let texture = TextureDescriptor::new(256);
    let img = texture_image();
    group.bench_function("texture_256", |b| b.iter(|| texture.extract(black_box(&img))));

    group.finish();
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("排序");
    let mut rng = rand::rng();
    let descriptor = TextureDescriptor::new(64);
    let dim = descriptor.dim();

    let ids = (0..10000).map(|i| format!("{i}.jpg")).collect::<Vec<_>>();
    let vectors = (0..ids.len())
        .map(|_| (0..dim).map(|_| rng.random::<f32>()).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let query = vectors[0].clone();

    group.throughput(Throughput::Elements(ids.len() as u64));
    group.bench_function("texture_10000", |b| {
        b.iter(|| {
            let candidates = ids.iter().zip(&vectors).map(|(id, v)| (id.as_str(), v.as_slice()));
            rank(&descriptor, "0.jpg", black_box(&query), candidates, 6)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_extract, bench_rank);
criterion_main!(benches);
