use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mersforge::squarer::{CpuSquarer, Squarer};
use mersforge::store::ProofStore;
use mersforge::{mersenne, proof, words};
use rug::Integer;

/// Populate a snapshot set with a real PRP residue sequence.
fn populate(store: &ProofStore) {
    let e = store.exponent();
    let mut squarer = CpuSquarer::prp(e);
    squarer.write_words(&[3]);
    for k in 1..=e {
        squarer.advance();
        if store.schedule().is_checkpoint(k) {
            let residue = words::from_device(&squarer.read_words(), e);
            store.save(k, &residue).unwrap();
        }
    }
}

fn bench_compute_proof(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let store = ProofStore::new(dir.path(), 9941, 4).unwrap();
    populate(&store);

    c.bench_function("compute_proof(M9941, power=4)", |b| {
        b.iter(|| proof::compute_proof(black_box(&store)).unwrap());
    });
}

fn bench_mersenne_powmod(c: &mut Criterion) {
    let base = mersenne::modulus(9941) - 12345u32;

    c.bench_function("powmod(M9941, 64-bit exp)", |b| {
        b.iter(|| mersenne::powmod(black_box(&base), black_box(0x9E3779B97F4A7C15), 9941));
    });
}

fn bench_reduce(c: &mut Criterion) {
    let m = mersenne::modulus(86243);
    let x = Integer::from(&m - 99u32) * Integer::from(&m - 3u32);

    c.bench_function("reduce(product mod M86243)", |b| {
        b.iter(|| mersenne::reduce(black_box(x.clone()), 86243));
    });
}

criterion_group!(
    benches,
    bench_compute_proof,
    bench_mersenne_powmod,
    bench_reduce
);
criterion_main!(benches);
