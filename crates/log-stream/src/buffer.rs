//! 동기화 바이트 버퍼 -- 폴러(생산자)와 리더(소비자)가 공유하는 유일한 가변 상태
//!
//! [`SyncBuffer`]는 하나의 뮤텍스로 보호되는 `BytesMut`에 대한 복제 가능한 핸들입니다.
//! append와 consume은 상호 배제되며 바이트 순서는 절대 바뀌지 않습니다.
//!
//! # 오버플로우 정책
//! - [`OverflowPolicy::Backpressure`]: 버퍼는 아무것도 버리지 않습니다.
//!   용량 초과 여부는 [`SyncBuffer::is_full`]로 폴러가 확인하고 조회를 미룹니다.
//! - [`OverflowPolicy::DropOldest`]: 최신 `capacity` 바이트만 유지하고
//!   앞쪽 바이트를 버립니다.
//!
//! # 불변식
//! `total_appended - total_consumed - dropped_bytes == len`

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

use bytes::{Buf, BytesMut};

use crate::config::OverflowPolicy;

/// 뮤텍스 안쪽 상태
#[derive(Debug, Default)]
struct BufferState {
    /// 아직 읽히지 않은 바이트
    data: BytesMut,
    /// 지금까지 추가된 바이트 수
    total_appended: u64,
    /// 지금까지 소비된 바이트 수
    total_consumed: u64,
    /// 오버플로우로 버려진 바이트 수
    dropped: u64,
    /// 더 이상 append가 없음을 표시
    closed: bool,
    /// 빈 버퍼에서 대기 중인 비동기 소비자
    waker: Option<Waker>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<BufferState>,
    capacity: usize,
    policy: OverflowPolicy,
}

/// 생산자/소비자 간 공유 바이트 버퍼
#[derive(Debug, Clone)]
pub struct SyncBuffer {
    shared: Arc<Shared>,
}

impl SyncBuffer {
    /// 새 버퍼를 생성합니다.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BufferState {
                    data: BytesMut::with_capacity(capacity.min(64 * 1024)),
                    ..BufferState::default()
                }),
                capacity,
                policy,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        // 상태 갱신 중에는 panic 지점이 없으므로 poison 이후에도 일관성이 유지됩니다.
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// 바이트를 꼬리에 추가합니다. 실패하지 않습니다.
    ///
    /// `DropOldest` 정책에서 용량을 넘으면 앞쪽 바이트를 버리고,
    /// 버린 바이트 수를 반환합니다. 그 외에는 항상 0입니다.
    pub fn append(&self, bytes: &[u8]) -> usize {
        if bytes.is_empty() {
            return 0;
        }

        let mut state = self.lock();
        state.total_appended += bytes.len() as u64;

        let dropped = match self.shared.policy {
            OverflowPolicy::Backpressure => {
                state.data.extend_from_slice(bytes);
                0
            }
            OverflowPolicy::DropOldest => {
                let capacity = self.shared.capacity;
                if bytes.len() >= capacity {
                    let dropped = state.data.len() + (bytes.len() - capacity);
                    state.data.clear();
                    state.data.extend_from_slice(&bytes[bytes.len() - capacity..]);
                    dropped
                } else {
                    let overflow = (state.data.len() + bytes.len()).saturating_sub(capacity);
                    state.data.advance(overflow);
                    state.data.extend_from_slice(bytes);
                    overflow
                }
            }
        };
        state.dropped += dropped as u64;

        let waker = state.waker.take();
        let total_dropped = state.dropped;
        drop(state);

        if let Some(waker) = waker {
            waker.wake();
        }
        if dropped > 0 {
            tracing::warn!(
                dropped,
                total_dropped,
                capacity = self.shared.capacity,
                "buffer full, dropped oldest bytes"
            );
        }
        dropped
    }

    /// 머리에서 최대 `dst.len()` 바이트를 꺼내 복사하고, 복사한 바이트 수를 반환합니다.
    ///
    /// 버퍼가 비어 있으면 0을 반환합니다.
    pub fn consume(&self, dst: &mut [u8]) -> usize {
        let mut state = self.lock();
        Self::consume_locked(&mut state, dst)
    }

    fn consume_locked(state: &mut BufferState, dst: &mut [u8]) -> usize {
        let n = dst.len().min(state.data.len());
        if n > 0 {
            dst[..n].copy_from_slice(&state.data[..n]);
            state.data.advance(n);
            state.total_consumed += n as u64;
        }
        n
    }

    /// 비동기 소비: 데이터가 있으면 꺼내고, 비어 있으면 waker를 등록합니다.
    ///
    /// 닫힌 버퍼를 모두 비웠으면 `Ready(0)`을 반환합니다.
    pub fn poll_consume(&self, cx: &mut Context<'_>, dst: &mut [u8]) -> Poll<usize> {
        let mut state = self.lock();
        if !state.data.is_empty() || dst.is_empty() {
            return Poll::Ready(Self::consume_locked(&mut state, dst));
        }
        if state.closed {
            return Poll::Ready(0);
        }
        match &state.waker {
            Some(existing) if existing.will_wake(cx.waker()) => {}
            _ => state.waker = Some(cx.waker().clone()),
        }
        Poll::Pending
    }

    /// 더 이상 append가 없음을 표시하고 대기 중인 소비자를 깨웁니다.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        let waker = state.waker.take();
        drop(state);
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// 닫혔는지 확인합니다.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// 현재 읽히지 않은 바이트 수
    pub fn len(&self) -> usize {
        self.lock().data.len()
    }

    /// 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.lock().data.is_empty()
    }

    /// 용량 이상으로 차 있는지 확인합니다.
    pub fn is_full(&self) -> bool {
        self.len() >= self.shared.capacity
    }

    /// 최대 용량 (바이트)
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// 오버플로우 정책
    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.shared.policy
    }

    /// 지금까지 추가된 바이트 수
    pub fn total_appended(&self) -> u64 {
        self.lock().total_appended
    }

    /// 지금까지 소비된 바이트 수
    pub fn total_consumed(&self) -> u64 {
        self.lock().total_consumed
    }

    /// 오버플로우로 버려진 바이트 수
    pub fn dropped_bytes(&self) -> u64 {
        self.lock().dropped
    }

    /// 버퍼 사용률 (Backpressure 정책에서는 1.0을 넘을 수 있음)
    pub fn utilization(&self) -> f64 {
        if self.shared.capacity == 0 {
            return 0.0;
        }
        f64::from(u32::try_from(self.len()).unwrap_or(u32::MAX))
            / f64::from(u32::try_from(self.shared.capacity).unwrap_or(u32::MAX))
    }
}
