//! 통합 테스트 -- 폴러부터 리더까지의 전체 흐름 검증

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use tokio::io::AsyncReadExt;
use tokio::time;

use conveyor_core::config::LogStreamConfig;
use conveyor_core::error::ConveyorError;
use conveyor_core::types::StreamIdentity;
use conveyor_log_stream::{
    ErrorMode, LogPage, LogSource, LogStreamError, LogStreamReaderBuilder, OverflowPolicy,
    PollerExit, ReadStatus, ReaderConfig, ReaderConfigBuilder, SyncBuffer,
};

/// 스크립트대로 응답하는 로그 소스
#[derive(Default)]
struct ScriptedSource {
    pages: Mutex<VecDeque<Result<LogPage, String>>>,
    tokens: Mutex<Vec<Option<String>>>,
}

impl ScriptedSource {
    fn page(self, messages: &[&str], token: Option<&str>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .push_back(Ok(LogPage::from_messages(messages.iter().copied(), token)));
        self
    }

    fn failure(self, reason: &str) -> Self {
        self.pages.lock().unwrap().push_back(Err(reason.to_owned()));
        self
    }

    fn tokens(&self) -> Vec<Option<String>> {
        self.tokens.lock().unwrap().clone()
    }
}

impl LogSource for ScriptedSource {
    async fn fetch(
        &self,
        identity: &StreamIdentity,
        token: Option<&str>,
    ) -> Result<LogPage, LogStreamError> {
        self.tokens.lock().unwrap().push(token.map(str::to_owned));
        let next = self.pages.lock().unwrap().pop_front();
        match next {
            Some(Ok(page)) => Ok(page),
            Some(Err(reason)) => Err(LogStreamError::Query {
                stream: identity.to_string(),
                reason,
            }),
            None => Ok(LogPage::default()),
        }
    }
}

fn fast_config() -> ReaderConfig {
    ReaderConfigBuilder::new()
        .poll_interval(Duration::from_millis(50))
        .retry(0, Duration::from_millis(10))
        .build()
        .expect("valid config")
}

/// 첫 조회 ["a","b"]+T1, 빈 조회, ["c"] 순서의 기본 시나리오
#[tokio::test(start_paused = true)]
async fn test_stream_scenario_with_empty_poll() {
    let source = Arc::new(
        ScriptedSource::default()
            .page(&["a", "b"], Some("T1"))
            .page(&[], None)
            .page(&["c"], None),
    );
    let reader = LogStreamReaderBuilder::new(Arc::clone(&source))
        .stream("grp", "strm")
        .config(fast_config())
        .build()
        .unwrap();

    let mut dst = [0u8; 10];

    time::sleep(Duration::from_millis(75)).await;
    assert_eq!(reader.read(&mut dst).unwrap(), ReadStatus::Data(2));
    assert_eq!(&dst[..2], b"ab");

    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(reader.read(&mut dst).unwrap(), ReadStatus::Pending);

    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(reader.read(&mut dst).unwrap(), ReadStatus::Data(1));
    assert_eq!(&dst[..1], b"c");

    let tokens = source.tokens();
    assert_eq!(tokens[0], None);
    assert_eq!(tokens[1].as_deref(), Some("T1"));
    assert_eq!(tokens[2].as_deref(), Some("T1"));
}

/// core 설정에서 만든 리더가 같은 흐름으로 동작하는지 확인
#[tokio::test(start_paused = true)]
async fn test_reader_from_core_config() {
    let core = LogStreamConfig {
        poll_interval_ms: 50,
        on_error: "stall".to_owned(),
        retry_max_attempts: 0,
        ..LogStreamConfig::default()
    };
    let config = ReaderConfig::from_core(&core).unwrap();
    assert_eq!(config.error_mode, ErrorMode::Stall);

    let source = Arc::new(ScriptedSource::default().failure("ThrottlingException"));
    let reader = LogStreamReaderBuilder::new(source)
        .identity(StreamIdentity::new("grp", "strm"))
        .config(config)
        .build()
        .unwrap();

    time::sleep(Duration::from_millis(200)).await;
    let mut dst = [0u8; 4];
    // 실패는 읽기 경로에 드러나지 않음
    assert_eq!(reader.read(&mut dst).unwrap(), ReadStatus::Pending);
    assert!(reader.last_error().unwrap().contains("ThrottlingException"));
}

/// AsyncRead로 읽으면 종료 후 EOF까지 전체 바이트가 순서대로 나옴
#[tokio::test(start_paused = true)]
async fn test_async_read_collects_all_pages() {
    let source = Arc::new(
        ScriptedSource::default()
            .page(&["line-1\n", "line-2\n"], Some("T1"))
            .page(&["line-3\n"], Some("T2"))
            .page(&[], None)
            .page(&["line-4\n"], Some("T3")),
    );
    let mut reader = LogStreamReaderBuilder::new(Arc::clone(&source))
        .stream("grp", "strm")
        .config(fast_config())
        .build()
        .unwrap();

    let mut first = [0u8; 7];
    reader.read_exact(&mut first).await.unwrap();
    assert_eq!(&first, b"line-1\n");

    time::sleep(Duration::from_millis(250)).await;
    let exit = reader.shutdown().await.unwrap();
    assert!(matches!(exit, PollerExit::Cancelled));

    let mut rest = String::new();
    reader.read_to_string(&mut rest).await.unwrap();
    assert_eq!(rest, "line-2\nline-3\nline-4\n");
    assert_eq!(source.tokens()[3].as_deref(), Some("T2"));
    assert_eq!(reader.stats().events, 4);
}

/// 리더 에러가 상위 에러 타입으로 변환되는지 확인
#[tokio::test(start_paused = true)]
async fn test_failure_converts_to_conveyor_error() {
    let source = Arc::new(ScriptedSource::default().failure("ResourceNotFoundException"));
    let reader = LogStreamReaderBuilder::new(source)
        .stream("grp", "missing")
        .config(fast_config())
        .build()
        .unwrap();

    time::sleep(Duration::from_millis(100)).await;
    let mut dst = [0u8; 4];
    let err = reader.read(&mut dst).unwrap_err();
    let top: ConveyorError = err.into();
    assert!(top.to_string().contains("ResourceNotFoundException"));
}

proptest! {
    /// 배치 크기와 읽기 크기에 관계없이 소비 결과는 추가한 바이트의 연결과 같음
    #[test]
    fn buffer_preserves_order(
        batches in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..32),
        read_sizes in prop::collection::vec(1usize..48, 1..16),
    ) {
        let buffer = SyncBuffer::new(1 << 20, OverflowPolicy::Backpressure);
        let expected: Vec<u8> = batches.iter().flatten().copied().collect();
        for batch in &batches {
            buffer.append(batch);
        }

        let mut out = Vec::new();
        let mut sizes = read_sizes.iter().cycle();
        loop {
            let mut dst = vec![0u8; *sizes.next().unwrap()];
            let n = buffer.consume(&mut dst);
            if n == 0 {
                break;
            }
            out.extend_from_slice(&dst[..n]);
        }

        prop_assert_eq!(out, expected);
        prop_assert!(buffer.is_empty());
    }

    /// DropOldest는 항상 최신 바이트만 남김
    #[test]
    fn drop_oldest_keeps_newest_suffix(
        batches in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..512), 1..16),
    ) {
        let capacity = 1024;
        let buffer = SyncBuffer::new(capacity, OverflowPolicy::DropOldest);
        let all: Vec<u8> = batches.iter().flatten().copied().collect();
        for batch in &batches {
            buffer.append(batch);
        }

        let kept = all.len().min(capacity);
        let mut dst = vec![0u8; capacity];
        let n = buffer.consume(&mut dst);
        prop_assert_eq!(n, kept);
        prop_assert_eq!(&dst[..n], &all[all.len() - kept..]);
        prop_assert_eq!(buffer.dropped_bytes(), (all.len() - kept) as u64);
    }
}
