//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `conveyor_`
//! - 컴포넌트명: `log_stream_`
//! - 접미어: `_total` (counter), `_seconds` (histogram), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(conveyor_core::metrics::LOG_STREAM_POLLS_TOTAL).increment(1);
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure, timeout)
pub const LABEL_RESULT: &str = "result";

// ─── Log Stream 메트릭 ──────────────────────────────────────────────

/// Log Stream: 실행된 원격 조회 수 (counter, label: result)
pub const LOG_STREAM_POLLS_TOTAL: &str = "conveyor_log_stream_polls_total";

/// Log Stream: 새 이벤트 없이 끝난 조회 수 (counter)
pub const LOG_STREAM_EMPTY_POLLS_TOTAL: &str = "conveyor_log_stream_empty_polls_total";

/// Log Stream: 수신한 로그 이벤트 수 (counter)
pub const LOG_STREAM_EVENTS_TOTAL: &str = "conveyor_log_stream_events_total";

/// Log Stream: 버퍼에 추가된 바이트 수 (counter)
pub const LOG_STREAM_BYTES_APPENDED_TOTAL: &str = "conveyor_log_stream_bytes_appended_total";

/// Log Stream: 조회 실패 수 (counter)
pub const LOG_STREAM_QUERY_ERRORS_TOTAL: &str = "conveyor_log_stream_query_errors_total";

/// Log Stream: 조회 재시도 수 (counter)
pub const LOG_STREAM_QUERY_RETRIES_TOTAL: &str = "conveyor_log_stream_query_retries_total";

/// Log Stream: 버퍼 포화로 건너뛴 조회 수 (counter)
pub const LOG_STREAM_BACKPRESSURE_SKIPS_TOTAL: &str =
    "conveyor_log_stream_backpressure_skips_total";

/// Log Stream: 오버플로우로 버려진 바이트 수 (counter)
pub const LOG_STREAM_BYTES_DROPPED_TOTAL: &str = "conveyor_log_stream_bytes_dropped_total";

/// Log Stream: 현재 버퍼에 남은 바이트 수 (gauge)
pub const LOG_STREAM_BUFFER_BYTES: &str = "conveyor_log_stream_buffer_bytes";

/// Log Stream: 원격 조회 지연 시간 (histogram, 초)
pub const LOG_STREAM_QUERY_DURATION_SECONDS: &str = "conveyor_log_stream_query_duration_seconds";

/// Log Stream: 실행 중인 폴러 수 (gauge)
pub const LOG_STREAM_POLLERS_ACTIVE: &str = "conveyor_log_stream_pollers_active";

/// 모든 메트릭 설명을 등록합니다.
///
/// recorder 설치 직후 한 번 호출합니다. recorder가 없어도 안전합니다.
pub fn describe_all() {
    describe_counter!(
        LOG_STREAM_POLLS_TOTAL,
        "Total number of remote log queries issued"
    );
    describe_counter!(
        LOG_STREAM_EMPTY_POLLS_TOTAL,
        "Total number of queries that returned no new events"
    );
    describe_counter!(
        LOG_STREAM_EVENTS_TOTAL,
        "Total number of log events received from the remote store"
    );
    describe_counter!(
        LOG_STREAM_BYTES_APPENDED_TOTAL,
        "Total bytes appended to reader buffers"
    );
    describe_counter!(
        LOG_STREAM_QUERY_ERRORS_TOTAL,
        "Total number of failed remote log queries"
    );
    describe_counter!(
        LOG_STREAM_QUERY_RETRIES_TOTAL,
        "Total number of remote log query retries"
    );
    describe_counter!(
        LOG_STREAM_BACKPRESSURE_SKIPS_TOTAL,
        "Total number of poll ticks skipped because the buffer was full"
    );
    describe_counter!(
        LOG_STREAM_BYTES_DROPPED_TOTAL,
        "Total bytes discarded by the drop_oldest overflow policy"
    );
    describe_gauge!(
        LOG_STREAM_BUFFER_BYTES,
        "Unread bytes currently held in reader buffers"
    );
    describe_histogram!(
        LOG_STREAM_QUERY_DURATION_SECONDS,
        "Remote log query latency in seconds"
    );
    describe_gauge!(
        LOG_STREAM_POLLERS_ACTIVE,
        "Number of log stream pollers currently running"
    );
}
