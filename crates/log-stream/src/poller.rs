//! 폴러 -- 고정 간격으로 원격 로그를 조회하여 커서와 버퍼를 갱신합니다.
//!
//! 한 폴러는 단일 태스크에서 조회를 순차적으로 실행합니다.
//! 매 틱마다 최대 한 번 조회하고(재시도 제외), 응답의 메시지를 수신 순서대로
//! [`SyncBuffer`]에 추가합니다.
//!
//! # 실패 처리
//! 조회 실패는 `retry_max_attempts`번까지 선형 백오프(`base * attempt`)로 재시도합니다.
//! 재시도를 모두 소진하면 폴러는 멈추고 [`PollerState::Failed`]를 게시합니다.
//! `retry_max_attempts = 0`이면 첫 실패에서 멈춥니다.
//! 재시도로 회복되지 않는 에러(예: 스트림 없음)는 백오프 없이 즉시 멈춥니다.
//!
//! # 취소
//! 모든 대기 지점(틱, 조회, 백오프)은 [`CancellationToken`]과 경합하므로
//! 진행 중인 조회도 즉시 해제됩니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use conveyor_core::metrics::{
    LABEL_RESULT, LOG_STREAM_BACKPRESSURE_SKIPS_TOTAL, LOG_STREAM_BUFFER_BYTES,
    LOG_STREAM_BYTES_APPENDED_TOTAL, LOG_STREAM_BYTES_DROPPED_TOTAL,
    LOG_STREAM_EMPTY_POLLS_TOTAL, LOG_STREAM_EVENTS_TOTAL, LOG_STREAM_POLLERS_ACTIVE,
    LOG_STREAM_POLLS_TOTAL, LOG_STREAM_QUERY_DURATION_SECONDS, LOG_STREAM_QUERY_ERRORS_TOTAL,
    LOG_STREAM_QUERY_RETRIES_TOTAL,
};
use conveyor_core::types::StreamIdentity;

use crate::buffer::SyncBuffer;
use crate::config::{OverflowPolicy, ReaderConfig};
use crate::cursor::Cursor;
use crate::error::LogStreamError;
use crate::source::{LogPage, LogSource};

/// 폴러 실행 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum PollerState {
    /// 실행 중
    Running,
    /// 취소되어 정상 종료됨
    Stopped,
    /// 조회 실패로 멈춤
    Failed(String),
}

impl PollerState {
    /// 상태명을 반환합니다.
    pub fn name(&self) -> &str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Failed(_) => "failed",
        }
    }

    /// 더 이상 바이트가 추가되지 않는 상태인지 확인합니다.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// 폴러 태스크 종료 사유
#[derive(Debug)]
pub enum PollerExit {
    /// 취소 토큰으로 종료
    Cancelled,
    /// 재시도를 소진한 조회 에러로 종료
    Failed(LogStreamError),
}

/// 한 틱의 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// 이벤트를 버퍼에 추가함
    Appended {
        /// 추가한 이벤트 수
        events: usize,
        /// 추가한 바이트 수
        bytes: usize,
    },
    /// 새 이벤트 없음 (정상 상태)
    CaughtUp,
    /// 버퍼가 가득 차서 조회를 미룸
    Throttled,
}

/// 폴러 카운터 (폴러와 리더가 공유)
#[derive(Debug, Default)]
pub struct PollerStats {
    queries: AtomicU64,
    query_errors: AtomicU64,
    retries: AtomicU64,
    empty_polls: AtomicU64,
    events: AtomicU64,
    bytes_appended: AtomicU64,
    bytes_dropped: AtomicU64,
    backpressure_skips: AtomicU64,
}

impl PollerStats {
    /// 현재 카운터 값을 복사합니다.
    pub fn snapshot(&self) -> PollerStatsSnapshot {
        PollerStatsSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            query_errors: self.query_errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            bytes_appended: self.bytes_appended.load(Ordering::Relaxed),
            bytes_dropped: self.bytes_dropped.load(Ordering::Relaxed),
            backpressure_skips: self.backpressure_skips.load(Ordering::Relaxed),
        }
    }
}

/// 폴러 카운터 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollerStatsSnapshot {
    /// 조회 시도 수 (재시도 포함)
    pub queries: u64,
    /// 실패한 조회 수
    pub query_errors: u64,
    /// 재시도 수
    pub retries: u64,
    /// 새 이벤트 없이 끝난 조회 수
    pub empty_polls: u64,
    /// 수신한 이벤트 수
    pub events: u64,
    /// 버퍼에 추가한 바이트 수
    pub bytes_appended: u64,
    /// 오버플로우로 버려진 바이트 수
    pub bytes_dropped: u64,
    /// 버퍼 포화로 건너뛴 틱 수
    pub backpressure_skips: u64,
}

/// 원격 로그 폴러
pub struct Poller<S: LogSource> {
    source: Arc<S>,
    cursor: Cursor,
    buffer: SyncBuffer,
    config: ReaderConfig,
    stats: Arc<PollerStats>,
    state_tx: watch::Sender<PollerState>,
    cancel: CancellationToken,
}

impl<S: LogSource> Poller<S> {
    /// 새 폴러를 생성합니다. 커서는 토큰 없이 시작합니다.
    ///
    /// # Errors
    ///
    /// 설정이 범위를 벗어나면 `LogStreamError::Config`를 반환합니다.
    pub fn new(
        source: Arc<S>,
        identity: StreamIdentity,
        buffer: SyncBuffer,
        config: ReaderConfig,
        cancel: CancellationToken,
    ) -> Result<Self, LogStreamError> {
        config.validate()?;
        let (state_tx, _) = watch::channel(PollerState::Running);
        Ok(Self {
            source,
            cursor: Cursor::new(identity),
            buffer,
            config,
            stats: Arc::new(PollerStats::default()),
            state_tx,
            cancel,
        })
    }

    /// 상태 변경을 구독합니다.
    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.state_tx.subscribe()
    }

    /// 공유 카운터를 반환합니다.
    pub fn stats(&self) -> Arc<PollerStats> {
        Arc::clone(&self.stats)
    }

    /// 현재 커서
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// 취소되거나 조회가 최종 실패할 때까지 폴링합니다.
    ///
    /// 첫 조회는 시작 후 한 간격이 지나서 실행됩니다. 처리가 밀린 틱은
    /// 몰아서 실행하지 않고 뒤로 미룹니다.
    pub async fn run(mut self) -> PollerExit {
        let period = self.config.poll_interval();
        let mut throttle = time::interval_at(Instant::now() + period, period);
        throttle.set_missed_tick_behavior(MissedTickBehavior::Delay);

        gauge!(LOG_STREAM_POLLERS_ACTIVE).increment(1.0);
        info!(
            stream = %self.cursor.identity(),
            interval_ms = self.config.poll_interval_ms,
            "log stream poller started"
        );

        let exit = loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break PollerExit::Cancelled,
                _ = throttle.tick() => {}
            }

            match self.poll_once().await {
                Ok(outcome) => trace!(?outcome, "poll tick complete"),
                Err(LogStreamError::Cancelled) => break PollerExit::Cancelled,
                Err(e) => break PollerExit::Failed(e),
            }
        };

        self.finish(&exit);
        gauge!(LOG_STREAM_POLLERS_ACTIVE).decrement(1.0);
        exit
    }

    /// 한 틱을 처리합니다: 백프레셔 확인, 조회(재시도 포함), 커서 갱신, 버퍼 추가.
    pub async fn poll_once(&mut self) -> Result<PollOutcome, LogStreamError> {
        if self.config.overflow_policy == OverflowPolicy::Backpressure && self.buffer.is_full() {
            self.stats
                .backpressure_skips
                .fetch_add(1, Ordering::Relaxed);
            counter!(LOG_STREAM_BACKPRESSURE_SKIPS_TOTAL).increment(1);
            debug!(
                buffered = self.buffer.len(),
                capacity = self.buffer.capacity(),
                "buffer full, deferring query"
            );
            return Ok(PollOutcome::Throttled);
        }

        let LogPage { events, next_token } = self.fetch_with_retry().await?;

        if self.cursor.advance(next_token) {
            trace!(token = ?self.cursor.token(), "cursor advanced");
        }

        if events.is_empty() {
            self.stats.empty_polls.fetch_add(1, Ordering::Relaxed);
            counter!(LOG_STREAM_EMPTY_POLLS_TOTAL).increment(1);
            debug!("no new log events");
            return Ok(PollOutcome::CaughtUp);
        }

        let mut bytes = 0usize;
        let mut dropped = 0usize;
        for event in &events {
            dropped += self.buffer.append(event.message.as_bytes());
            bytes += event.message.len();
        }

        self.stats
            .events
            .fetch_add(events.len() as u64, Ordering::Relaxed);
        self.stats
            .bytes_appended
            .fetch_add(bytes as u64, Ordering::Relaxed);
        counter!(LOG_STREAM_EVENTS_TOTAL).increment(events.len() as u64);
        counter!(LOG_STREAM_BYTES_APPENDED_TOTAL).increment(bytes as u64);
        if dropped > 0 {
            self.stats
                .bytes_dropped
                .fetch_add(dropped as u64, Ordering::Relaxed);
            counter!(LOG_STREAM_BYTES_DROPPED_TOTAL).increment(dropped as u64);
        }
        gauge!(LOG_STREAM_BUFFER_BYTES).set(self.buffer.len() as f64);

        debug!(events = events.len(), bytes, "appended log events");
        Ok(PollOutcome::Appended {
            events: events.len(),
            bytes,
        })
    }

    async fn fetch_with_retry(&self) -> Result<LogPage, LogStreamError> {
        let identity = self.cursor.identity();
        let timeout = self.config.query_timeout();
        let mut last_error = None;

        for attempt in 0..=self.config.retry_max_attempts {
            if attempt > 0 {
                let backoff = self.config.retry_backoff_base() * attempt;
                self.stats.retries.fetch_add(1, Ordering::Relaxed);
                counter!(LOG_STREAM_QUERY_RETRIES_TOTAL).increment(1);
                warn!(
                    stream = %identity,
                    attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    "retrying log query"
                );
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => return Err(LogStreamError::Cancelled),
                    () = time::sleep(backoff) => {}
                }
            }

            self.stats.queries.fetch_add(1, Ordering::Relaxed);
            let started = Instant::now();
            let result = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Err(LogStreamError::Cancelled),
                result = time::timeout(timeout, self.source.fetch(identity, self.cursor.token())) => result,
            };
            histogram!(LOG_STREAM_QUERY_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

            let err = match result {
                Ok(Ok(page)) => {
                    counter!(LOG_STREAM_POLLS_TOTAL, LABEL_RESULT => "success").increment(1);
                    return Ok(page);
                }
                Ok(Err(e)) => {
                    counter!(LOG_STREAM_POLLS_TOTAL, LABEL_RESULT => "failure").increment(1);
                    e
                }
                Err(_elapsed) => {
                    counter!(LOG_STREAM_POLLS_TOTAL, LABEL_RESULT => "timeout").increment(1);
                    LogStreamError::Timeout {
                        stream: identity.to_string(),
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    }
                }
            };

            self.stats.query_errors.fetch_add(1, Ordering::Relaxed);
            counter!(LOG_STREAM_QUERY_ERRORS_TOTAL).increment(1);
            if !err.is_transient() {
                error!(stream = %identity, attempt, error = %err, "log query failed permanently");
                return Err(err);
            }
            warn!(stream = %identity, attempt, error = %err, "log query failed");
            last_error = Some(err);
        }

        Err(last_error.unwrap_or_else(|| LogStreamError::Query {
            stream: identity.to_string(),
            reason: "unknown error".to_owned(),
        }))
    }

    /// 종료 상태를 게시하고 버퍼를 닫습니다.
    ///
    /// 상태를 먼저 게시해야 버퍼가 닫힌 것을 본 소비자가 종료 사유를 읽을 수 있습니다.
    fn finish(&self, exit: &PollerExit) {
        let state = match exit {
            PollerExit::Cancelled => {
                info!(stream = %self.cursor.identity(), "log stream poller stopped");
                PollerState::Stopped
            }
            PollerExit::Failed(e) => {
                error!(
                    stream = %self.cursor.identity(),
                    error = %e,
                    "log stream poller halted after query failure"
                );
                PollerState::Failed(e.to_string())
            }
        };
        self.state_tx.send_replace(state);
        self.buffer.close();
    }
}
