//! 동기화 버퍼 벤치마크
//!
//! append/consume 처리량과 DropOldest 오버플로우 비용을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use conveyor_log_stream::{OverflowPolicy, SyncBuffer};

/// 일반적인 CloudWatch 로그 한 줄
const LOG_LINE: &[u8] = b"2024-01-15T12:00:00.123Z INFO request completed path=/api/v1/users status=200 duration_ms=12\n";

fn bench_append_consume(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_buffer_append_consume");

    for batch in [1usize, 100, 1000] {
        group.throughput(Throughput::Bytes((LOG_LINE.len() * batch) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &batch, |b, &batch| {
            let buffer = SyncBuffer::new(8 * 1024 * 1024, OverflowPolicy::Backpressure);
            let mut dst = vec![0u8; 4096];
            b.iter(|| {
                for _ in 0..batch {
                    buffer.append(black_box(LOG_LINE));
                }
                while buffer.consume(&mut dst) > 0 {}
            });
        });
    }

    group.finish();
}

fn bench_drop_oldest_overflow(c: &mut Criterion) {
    let mut group = c.benchmark_group("sync_buffer_drop_oldest");
    group.throughput(Throughput::Bytes(LOG_LINE.len() as u64));

    group.bench_function("append_when_full", |b| {
        let buffer = SyncBuffer::new(64 * 1024, OverflowPolicy::DropOldest);
        while !buffer.is_full() {
            buffer.append(LOG_LINE);
        }
        b.iter(|| buffer.append(black_box(LOG_LINE)));
    });

    group.finish();
}

criterion_group!(benches, bench_append_consume, bench_drop_oldest_overflow);
criterion_main!(benches);
