//! 리더 -- 소비자에게 버퍼를 스트림 읽기 인터페이스로 노출합니다.
//!
//! [`LogStreamReader`]는 생성 즉시 백그라운드 폴러를 시작하고,
//! 소비자는 [`LogStreamReader::read`](논블로킹) 또는 [`AsyncRead`]로 바이트를 꺼냅니다.
//!
//! # 읽기 결과
//! - 버퍼에 데이터가 있으면 항상 먼저 반환합니다 ([`ReadStatus::Data`]).
//! - 버퍼가 비고 폴러가 실행 중이면 [`ReadStatus::Pending`]: 스트림은 아직 살아 있습니다.
//! - 버퍼가 비고 폴러가 종료(shutdown)되었으면 [`ReadStatus::Closed`].
//! - 버퍼가 비고 폴러가 실패했으면 [`ErrorMode`]에 따라 에러 또는 영구 `Pending`.
//!
//! # 사용 예시
//! ```ignore
//! let reader = LogStreamReaderBuilder::new(Arc::new(source))
//!     .stream("my-group", "my-stream")
//!     .config(ReaderConfig::default())
//!     .build()?;
//!
//! let mut buf = [0u8; 4096];
//! match reader.read(&mut buf)? {
//!     ReadStatus::Data(n) => handle(&buf[..n]),
//!     ReadStatus::Pending => { /* 다음에 다시 시도 */ }
//!     ReadStatus::Closed => return Ok(()),
//! }
//! ```

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use conveyor_core::types::{HealthStatus, StreamIdentity};

use crate::buffer::SyncBuffer;
use crate::config::{ErrorMode, ReaderConfig};
use crate::error::LogStreamError;
use crate::poller::{Poller, PollerExit, PollerState, PollerStats, PollerStatsSnapshot};
use crate::source::LogSource;

/// 버퍼 사용률이 이 값을 넘으면 Degraded로 보고합니다.
const DEGRADED_UTILIZATION: f64 = 0.9;

/// 한 번의 읽기 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// `n`바이트를 복사함
    Data(usize),
    /// 지금은 읽을 데이터가 없음. 스트림 종료가 아닙니다.
    Pending,
    /// 폴러가 종료되었고 버퍼도 비었음
    Closed,
}

impl ReadStatus {
    /// 복사한 바이트 수 (`Data`가 아니면 0)
    pub fn bytes(&self) -> usize {
        match self {
            Self::Data(n) => *n,
            Self::Pending | Self::Closed => 0,
        }
    }

    /// 나중에 다시 시도해야 하는지 확인합니다.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// 스트림이 끝났는지 확인합니다.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// 원격 로그 스트림 리더
///
/// 드롭하면 폴러를 취소합니다. 폴러 종료를 기다리려면 [`shutdown`](Self::shutdown)을 사용하세요.
pub struct LogStreamReader {
    identity: StreamIdentity,
    buffer: SyncBuffer,
    stats: Arc<PollerStats>,
    state_rx: watch::Receiver<PollerState>,
    error_mode: ErrorMode,
    cancel: CancellationToken,
    task: Option<JoinHandle<PollerExit>>,
    reader_id: Uuid,
    /// Stall 모드에서 실패 후 `poll_read`가 취소를 기다리는 future
    stall_wait: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
}

impl LogStreamReader {
    /// 버퍼에서 최대 `dst.len()`바이트를 꺼냅니다. 절대 블로킹하지 않습니다.
    ///
    /// # Errors
    ///
    /// `ErrorMode::Surface`에서 폴러가 실패했고 버퍼가 비었으면
    /// `LogStreamError::PollerFailed`를 반환합니다.
    pub fn read(&self, dst: &mut [u8]) -> Result<ReadStatus, LogStreamError> {
        // 폴러는 마지막 append 이후에 종료 상태를 게시하므로,
        // 상태를 먼저 읽으면 종료 상태에서 남은 바이트를 놓치지 않습니다.
        let state = self.state_rx.borrow().clone();

        let n = self.buffer.consume(dst);
        if n > 0 || (dst.is_empty() && !self.buffer.is_empty()) {
            return Ok(ReadStatus::Data(n));
        }

        match state {
            PollerState::Running => Ok(ReadStatus::Pending),
            PollerState::Stopped => Ok(ReadStatus::Closed),
            PollerState::Failed(reason) => match self.error_mode {
                ErrorMode::Surface => Err(LogStreamError::PollerFailed { reason }),
                ErrorMode::Stall if self.cancel.is_cancelled() => Ok(ReadStatus::Closed),
                ErrorMode::Stall => Ok(ReadStatus::Pending),
            },
        }
    }

    /// 폴러를 취소하고 종료를 기다립니다.
    ///
    /// 취소 후에도 버퍼에 남은 바이트는 계속 읽을 수 있습니다.
    ///
    /// # Errors
    ///
    /// 이미 shutdown했으면 `NotRunning`, 태스크가 panic했으면 `Task`를 반환합니다.
    pub async fn shutdown(&mut self) -> Result<PollerExit, LogStreamError> {
        let task = self.task.take().ok_or(LogStreamError::NotRunning)?;
        self.cancel.cancel();

        let exit = task
            .await
            .map_err(|e| LogStreamError::Task(e.to_string()))?;

        info!(
            stream = %self.identity,
            reader_id = %self.reader_id,
            buffered = self.buffer.len(),
            "log stream reader shut down"
        );
        Ok(exit)
    }

    /// 폴러 취소 토큰 (시그널 핸들러 등에서 사용)
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 읽는 스트림
    pub fn identity(&self) -> &StreamIdentity {
        &self.identity
    }

    /// 리더 인스턴스 ID (로그 span에 기록됨)
    pub fn reader_id(&self) -> Uuid {
        self.reader_id
    }

    /// 현재 폴러 상태
    pub fn state(&self) -> PollerState {
        self.state_rx.borrow().clone()
    }

    /// 폴러가 실패했으면 마지막 에러 메시지
    pub fn last_error(&self) -> Option<String> {
        match &*self.state_rx.borrow() {
            PollerState::Failed(reason) => Some(reason.clone()),
            PollerState::Running | PollerState::Stopped => None,
        }
    }

    /// 폴러 카운터 스냅샷
    pub fn stats(&self) -> PollerStatsSnapshot {
        self.stats.snapshot()
    }

    /// 아직 읽지 않은 바이트 수
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// 폴러 상태와 버퍼 사용률로 건강 상태를 판단합니다.
    pub fn health(&self) -> HealthStatus {
        match self.state() {
            PollerState::Failed(reason) => {
                HealthStatus::Unhealthy(format!("poller failed: {reason}"))
            }
            PollerState::Stopped => HealthStatus::Unhealthy("poller stopped".to_owned()),
            PollerState::Running => {
                let utilization = self.buffer.utilization();
                if utilization > DEGRADED_UTILIZATION {
                    HealthStatus::Degraded(format!(
                        "buffer {:.0}% full",
                        utilization * 100.0
                    ))
                } else {
                    HealthStatus::Healthy
                }
            }
        }
    }
}

impl AsyncRead for LogStreamReader {
    /// 버퍼가 비고 폴러가 실행 중이면 waker를 등록하고 `Pending`을 반환합니다.
    ///
    /// 닫힌 버퍼를 모두 비우면 EOF(`Ok` + 0바이트)입니다. 단, 폴러가 실패했으면
    /// `Surface`에서는 `io::Error`, `Stall`에서는 취소 토큰이 취소될 때까지 `Pending`입니다.
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        let n = match this.buffer.poll_consume(cx, buf.initialize_unfilled()) {
            Poll::Ready(n) => n,
            Poll::Pending => return Poll::Pending,
        };
        if n > 0 {
            buf.advance(n);
            return Poll::Ready(Ok(()));
        }

        // 버퍼가 닫힘: 종료 상태는 close 이전에 게시됨
        let failure = match &*this.state_rx.borrow() {
            PollerState::Failed(reason) => Some(reason.clone()),
            PollerState::Running | PollerState::Stopped => None,
        };
        match (failure, this.error_mode) {
            (None, _) => Poll::Ready(Ok(())),
            (Some(reason), ErrorMode::Surface) => Poll::Ready(Err(io::Error::other(
                LogStreamError::PollerFailed { reason },
            ))),
            (Some(_), ErrorMode::Stall) => this.poll_stalled(cx),
        }
    }
}

impl LogStreamReader {
    /// 실패를 숨기는 동안에도 shutdown 신호로는 깨어나야 합니다. 취소되면 EOF.
    fn poll_stalled(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let cancel = &self.cancel;
        let wait = self
            .stall_wait
            .get_or_insert_with(|| Box::pin(cancel.clone().cancelled_owned()));
        wait.as_mut().poll(cx).map(Ok)
    }
}

impl Drop for LogStreamReader {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for LogStreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStreamReader")
            .field("identity", &self.identity)
            .field("reader_id", &self.reader_id)
            .field("state", &self.state().name())
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

/// 리더 빌더
///
/// ```ignore
/// let reader = LogStreamReaderBuilder::new(source)
///     .stream("grp", "strm")
///     .config(config)
///     .build()?;
/// ```
pub struct LogStreamReaderBuilder<S: LogSource> {
    source: Arc<S>,
    identity: Option<StreamIdentity>,
    config: ReaderConfig,
}

impl<S: LogSource> LogStreamReaderBuilder<S> {
    /// 로그 소스로 빌더를 생성합니다.
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            identity: None,
            config: ReaderConfig::default(),
        }
    }

    /// 읽을 로그 그룹과 스트림을 지정합니다.
    pub fn stream(mut self, group: impl Into<String>, stream: impl Into<String>) -> Self {
        self.identity = Some(StreamIdentity::new(group, stream));
        self
    }

    /// 스트림 식별자를 지정합니다.
    pub fn identity(mut self, identity: StreamIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// 리더 설정을 지정합니다.
    pub fn config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// 리더를 생성하고 폴러를 즉시 시작합니다.
    ///
    /// # Errors
    ///
    /// 스트림 미지정, 잘못된 설정, tokio 런타임 밖에서 호출한 경우 에러를 반환합니다.
    pub fn build(self) -> Result<LogStreamReader, LogStreamError> {
        let identity = self.identity.ok_or_else(|| LogStreamError::Config {
            field: "stream".to_owned(),
            reason: "log group and stream are required".to_owned(),
        })?;
        identity.validate()?;
        self.config.validate()?;

        let handle = Handle::try_current().map_err(|e| LogStreamError::Runtime(e.to_string()))?;

        let buffer = SyncBuffer::new(self.config.max_buffered_bytes, self.config.overflow_policy);
        let cancel = CancellationToken::new();
        let error_mode = self.config.error_mode;
        let poller = Poller::new(
            self.source,
            identity.clone(),
            buffer.clone(),
            self.config,
            cancel.clone(),
        )?;
        let state_rx = poller.subscribe();
        let stats = poller.stats();

        let reader_id = Uuid::new_v4();
        let span = info_span!(
            "log_stream_poller",
            group = identity.group(),
            stream = identity.stream(),
            reader_id = %reader_id
        );
        let task = handle.spawn(poller.run().instrument(span));

        info!(
            stream = %identity,
            reader_id = %reader_id,
            error_mode = ?error_mode,
            "log stream reader started"
        );

        Ok(LogStreamReader {
            identity,
            buffer,
            stats,
            state_rx,
            error_mode,
            cancel,
            task: Some(task),
            reader_id,
            stall_wait: None,
        })
    }
}
