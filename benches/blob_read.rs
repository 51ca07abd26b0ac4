//! Identifier and blob read benchmarks using criterion.
//!
//! Run with: cargo bench --bench blob_read

use bytes::Bytes;
use chunkcas::schema::wire::WireMessage;
use chunkcas::{
    CasBlob, ContentId, ContentStore, FileInfo, FilePayload, FileType, InMemoryStore,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use tokio::runtime::Runtime;

const CHUNK: usize = 64 * 1024;

fn bench_identify(c: &mut Criterion) {
    let mut group = c.benchmark_group("identify");
    let refs: Vec<ContentId> = (0u8..16)
        .map(|i| ContentId::compute(&[], &[i]))
        .collect();

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let data = vec![0xa5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("no_refs", size), &data, |b, data| {
            b.iter(|| ContentId::compute(&[], black_box(data)))
        });
        group.bench_with_input(BenchmarkId::new("16_refs", size), &data, |b, data| {
            b.iter(|| ContentId::compute(black_box(&refs), black_box(data)))
        });
    }

    group.finish();
}

/// A plain blob split into `chunks` chunks of [`CHUNK`] bytes
fn chunked_blob(rt: &Runtime, chunks: usize) -> CasBlob {
    rt.block_on(async {
        let store: Arc<dyn ContentStore> = Arc::new(InMemoryStore::new());
        let mut ids = Vec::with_capacity(chunks);
        for i in 0..chunks {
            let data = Bytes::from(vec![i as u8; CHUNK]);
            ids.push(store.put(vec![], data).await.unwrap());
        }
        let info = FileInfo {
            kind: FileType::PlainFile,
            size: (chunks * CHUNK) as u64,
            payload: Some(FilePayload::FixedChunkSize(CHUNK as u64)),
            ..Default::default()
        };
        let outer = store
            .put(ids, Bytes::from(info.encode_to_vec()))
            .await
            .unwrap();
        CasBlob::parse(outer, store).await.unwrap()
    })
}

fn bench_chunked_read(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let blob = chunked_blob(&rt, 32);
    let mut group = c.benchmark_group("chunked_read");

    // Inside one chunk, across a boundary, and the whole blob.
    let half = CHUNK as u64 / 2;
    let cases = [
        ("one_chunk", 16..half),
        ("boundary", half..CHUNK as u64 + half),
        ("whole", 0..blob.size()),
    ];

    for (name, range) in cases {
        group.throughput(Throughput::Bytes(range.end - range.start));
        group.bench_function(name, |b| {
            b.iter(|| rt.block_on(blob.read(black_box(range.clone()))).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_identify, bench_chunked_read);
criterion_main!(benches);
