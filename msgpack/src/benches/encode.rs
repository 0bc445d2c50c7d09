use commonware_msgpack::{primitives::*, Writer};
use criterion::{criterion_group, BatchSize, Criterion, Throughput};
use std::hint::black_box;

fn bench_encode(c: &mut Criterion) {
    for count in [10, 1_000] {
        let value = super::records_value(count, 0);
        let len = value.encoded_len();
        let mut group = c.benchmark_group(module_path!());
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_function(format!("value/records={count}"), |b| {
            b.iter(|| black_box(value.encode()));
        });
        group.bench_function(format!("writer/records={count}"), |b| {
            b.iter_batched(
                || Writer::new(Vec::with_capacity(len)),
                |mut writer| {
                    writer.write_value(&value).unwrap();
                    writer.into_inner().unwrap()
                },
                BatchSize::SmallInput,
            );
        });
        group.finish();
    }

    c.bench_function(&format!("{}/ints", module_path!()), |b| {
        let mut buf = Vec::with_capacity(9 * 1024);
        b.iter(|| {
            buf.clear();
            for i in -512i64..512 {
                put_int(&mut buf, black_box(i * 1_000_003));
            }
        });
    });
}

criterion_group!(benches, bench_encode);
