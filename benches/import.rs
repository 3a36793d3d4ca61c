// benches/import.rs
use backup_envelope::{export_envelope, BackupConfig, ImportVerifier, KeyMaterial};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::io::{self, Cursor};

fn bench_import(c: &mut Criterion) {
    let mut group = c.benchmark_group("import_two_pass");
    let keys = KeyMaterial::from_bytes([0x11; 32], &[0x22; 32]).unwrap();
    let config = BackupConfig::default();

    for &size in &[1024usize, 64 * 1024, 1024 * 1024, 10 * 1024 * 1024] {
        let record: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        let mut envelope = Vec::new();
        export_envelope(std::iter::once(record), &mut envelope, &keys, &config).unwrap();
        let factory = || Ok::<_, io::Error>(Cursor::new(envelope.as_slice()));

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("size", size), &size, |b, _| {
            b.iter(|| {
                let mut sink: Vec<Vec<u8>> = Vec::new();
                ImportVerifier::new(&factory, &mut sink, &keys, &config)
                    .run()
                    .unwrap();
                black_box(sink)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_import);
criterion_main!(benches);
