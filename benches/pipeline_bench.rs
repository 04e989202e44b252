use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pixelot::{Analyzer, PixelBuffer};

fn noisy(width: u32, height: u32) -> PixelBuffer {
    let mut state = 0x5eed_u64;
    PixelBuffer::from_fn(width, height, |x, y| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let grain = (state >> 59) as u32;
        let r = (x * 255 / width + grain) as u8;
        let g = (y * 255 / height + grain) as u8;
        [r, g, r / 2 + g / 2, 255]
    })
    .expect("valid dimensions")
}

fn bench_pipeline(c: &mut Criterion) {
    let analyzer = Analyzer::new();
    let image = noisy(512, 512);

    c.bench_function("analyze_512x512", |b| b.iter(|| analyzer.analyze(black_box(&image))));

    let small = noisy(64, 64);
    c.bench_function("analyze_64x64", |b| b.iter(|| analyzer.analyze(black_box(&small))));
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
