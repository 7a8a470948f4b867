use criterion::{black_box, criterion_group, criterion_main, Criterion};

use carriageway::dson::{DsonObject, DsonValue};

fn sample_container() -> DsonObject {
    DsonObject::container(
        7,
        vec![
            DsonObject::new(1, DsonValue::U32(100)),
            DsonObject::new(2, DsonValue::I64(1000)),
            DsonObject::new(3, DsonValue::F64(100.1)),
            DsonObject::new(4, DsonValue::Str("100.1".to_string())),
            DsonObject::new(5, DsonValue::VecI32((0..64).collect())),
        ],
    )
}

fn bench_encode(c: &mut Criterion) {
    let object = sample_container();
    c.bench_function("dson_encode", |b| {
        b.iter(|| black_box(object.encode()));
    });
}

fn bench_decode(c: &mut Criterion) {
    let bytes = sample_container().encode();
    c.bench_function("dson_decode", |b| {
        b.iter(|| black_box(DsonObject::decode(&bytes).unwrap()));
    });
}

criterion_group!(dson_benches, bench_encode, bench_decode);
criterion_main!(dson_benches);
