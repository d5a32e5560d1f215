#![no_main]

use arbitrary::Arbitrary;
use conveyor_log_stream::{OverflowPolicy, SyncBuffer};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Append(Vec<u8>),
    Consume(u16),
}

#[derive(Debug, Arbitrary)]
struct Input {
    drop_oldest: bool,
    capacity: u16,
    ops: Vec<Op>,
}

// 어떤 append/consume 순서에서도 바이트 수 불변식과 순서가 유지되어야 함
fuzz_target!(|input: Input| {
    let capacity = usize::from(input.capacity).max(1);
    let policy = if input.drop_oldest {
        OverflowPolicy::DropOldest
    } else {
        OverflowPolicy::Backpressure
    };
    let buffer = SyncBuffer::new(capacity, policy);
    let mut model: Vec<u8> = Vec::new();

    for op in input.ops {
        match op {
            Op::Append(bytes) => {
                let dropped = buffer.append(&bytes);
                model.extend_from_slice(&bytes);
                model.drain(..dropped);
            }
            Op::Consume(len) => {
                let mut dst = vec![0u8; usize::from(len)];
                let n = buffer.consume(&mut dst);
                assert_eq!(&dst[..n], &model[..n]);
                model.drain(..n);
            }
        }
        assert_eq!(buffer.len(), model.len());
        assert_eq!(
            buffer.total_appended() - buffer.total_consumed() - buffer.dropped_bytes(),
            buffer.len() as u64
        );
        if policy == OverflowPolicy::DropOldest {
            assert!(buffer.len() <= capacity);
        }
    }
});
