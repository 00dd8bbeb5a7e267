extern crate criterion;
extern crate tiff_baseline as tiff;

use std::io::Cursor;

use criterion::{black_box, Criterion, Throughput};
use tiff::encoder::{Compression, EncodeParams, TiffEncoder};
use tiff::image::MemoryImage;

fn encode(image: &MemoryImage, params: &EncodeParams) -> usize {
    let mut cursor = Cursor::new(Vec::new());
    let mut encoder = TiffEncoder::new(&mut cursor).unwrap();
    encoder.write_image(black_box(image), params).unwrap();
    drop(encoder);
    cursor.into_inner().len()
}

fn main() {
    let mut c = Criterion::default().configure_from_args();
    let mut group = c.benchmark_group("tiff-encode");

    let samples: Vec<u8> = (0..512 * 512).map(|i| (i % 251) as u8).collect();
    let image = MemoryImage::gray8(512, 512, samples).unwrap();
    group.throughput(Throughput::Bytes(512 * 512));

    group.bench_function("gray8-uncompressed", |b| {
        let params = EncodeParams::default();
        b.iter(|| encode(&image, &params))
    });

    group.bench_function("gray8-packbits", |b| {
        let params = EncodeParams {
            compression: Compression::PackBits,
            ..EncodeParams::default()
        };
        b.iter(|| encode(&image, &params))
    });

    group.bench_function("gray8-deflate", |b| {
        let params = EncodeParams {
            compression: Compression::Deflate,
            ..EncodeParams::default()
        };
        b.iter(|| encode(&image, &params))
    });

    group.finish();
}
