//! 로그 스트림 리더 설정
//!
//! [`ReaderConfig`]는 core의 [`LogStreamConfig`](conveyor_core::config::LogStreamConfig)를
//! 타입이 있는 형태로 변환한 리더 전용 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use conveyor_core::config::ConveyorConfig;
//! use conveyor_log_stream::config::ReaderConfig;
//!
//! let core_config = ConveyorConfig::default();
//! let config = ReaderConfig::from_core(&core_config.log_stream)?;
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::LogStreamError;

/// 버퍼가 가득 찼을 때의 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// 버퍼가 비워질 때까지 다음 조회를 미룸 (기본값, 손실 없음)
    ///
    /// 커서가 전진하지 않으므로 데이터는 원격 저장소에 남아 있습니다.
    /// 버퍼는 최대 한 페이지만큼 용량을 넘을 수 있습니다.
    #[default]
    Backpressure,
    /// 가장 오래된 바이트를 버리고 최신 `capacity` 바이트만 유지
    DropOldest,
}

impl std::str::FromStr for OverflowPolicy {
    type Err = LogStreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backpressure" => Ok(Self::Backpressure),
            "drop_oldest" => Ok(Self::DropOldest),
            other => Err(LogStreamError::Config {
                field: "overflow_policy".to_owned(),
                reason: format!("unknown policy '{other}', expected backpressure or drop_oldest"),
            }),
        }
    }
}

/// 폴러가 실패로 멈췄을 때 리더가 소비자에게 보여주는 동작
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// 버퍼를 모두 비운 뒤 read가 에러를 반환 (기본값)
    #[default]
    Surface,
    /// 에러 없이 "데이터 없음"을 계속 반환 (이전 호환 동작)
    Stall,
}

impl std::str::FromStr for ErrorMode {
    type Err = LogStreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "surface" => Ok(Self::Surface),
            "stall" => Ok(Self::Stall),
            other => Err(LogStreamError::Config {
                field: "on_error".to_owned(),
                reason: format!("unknown mode '{other}', expected surface or stall"),
            }),
        }
    }
}

/// 로그 스트림 리더 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// 원격 조회 최소 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 단일 조회 타임아웃 (초)
    pub query_timeout_secs: u64,
    /// 버퍼 최대 용량 (바이트)
    pub max_buffered_bytes: usize,
    /// 버퍼 오버플로우 정책
    pub overflow_policy: OverflowPolicy,
    /// 폴러 실패 시 리더 동작
    pub error_mode: ErrorMode,
    /// 조회 실패 시 재시도 횟수 (0이면 재시도 없이 중단)
    pub retry_max_attempts: u32,
    /// 재시도 백오프 기준값 (밀리초)
    pub retry_backoff_base_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            query_timeout_secs: 30,
            max_buffered_bytes: 8 * 1024 * 1024,
            overflow_policy: OverflowPolicy::Backpressure,
            error_mode: ErrorMode::Surface,
            retry_max_attempts: 3,
            retry_backoff_base_ms: 500,
        }
    }
}

impl ReaderConfig {
    /// core의 `LogStreamConfig`에서 리더 설정을 생성합니다.
    ///
    /// 문자열 열거값(overflow_policy, on_error)을 파싱하고 범위를 검증합니다.
    pub fn from_core(
        core: &conveyor_core::config::LogStreamConfig,
    ) -> Result<Self, LogStreamError> {
        let config = Self {
            poll_interval_ms: core.poll_interval_ms,
            query_timeout_secs: core.query_timeout_secs,
            max_buffered_bytes: core.max_buffered_bytes,
            overflow_policy: core.overflow_policy.parse()?,
            error_mode: core.on_error.parse()?,
            retry_max_attempts: core.retry_max_attempts,
            retry_backoff_base_ms: core.retry_backoff_base_ms,
        };
        config.validate()?;
        Ok(config)
    }

    /// 기존 동작을 그대로 재현하는 설정을 반환합니다.
    ///
    /// 첫 실패에서 폴링을 멈추고, 소비자에게는 에러 없이 "데이터 없음"만 보입니다.
    /// 버퍼 용량 제한은 유지됩니다.
    pub fn legacy() -> Self {
        Self {
            error_mode: ErrorMode::Stall,
            retry_max_attempts: 0,
            ..Self::default()
        }
    }

    /// 폴링 간격
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// 조회 타임아웃
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    /// 재시도 백오프 기준값
    pub fn retry_backoff_base(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_base_ms)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogStreamError> {
        const MAX_POLL_INTERVAL_MS: u64 = 3_600_000; // 1 hour
        const MAX_QUERY_TIMEOUT_SECS: u64 = 600;
        const MIN_BUFFERED_BYTES: usize = 1024;
        const MAX_BUFFERED_BYTES: usize = 1024 * 1024 * 1024; // 1GB
        const MAX_RETRY_ATTEMPTS: u32 = 100;
        const MAX_BACKOFF_BASE_MS: u64 = 60_000;

        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(LogStreamError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: format!("must be 1-{}", MAX_POLL_INTERVAL_MS),
            });
        }

        if self.query_timeout_secs == 0 || self.query_timeout_secs > MAX_QUERY_TIMEOUT_SECS {
            return Err(LogStreamError::Config {
                field: "query_timeout_secs".to_owned(),
                reason: format!("must be 1-{}", MAX_QUERY_TIMEOUT_SECS),
            });
        }

        if self.max_buffered_bytes < MIN_BUFFERED_BYTES
            || self.max_buffered_bytes > MAX_BUFFERED_BYTES
        {
            return Err(LogStreamError::Config {
                field: "max_buffered_bytes".to_owned(),
                reason: format!("must be {}-{}", MIN_BUFFERED_BYTES, MAX_BUFFERED_BYTES),
            });
        }

        if self.retry_max_attempts > MAX_RETRY_ATTEMPTS {
            return Err(LogStreamError::Config {
                field: "retry_max_attempts".to_owned(),
                reason: format!("must be at most {}", MAX_RETRY_ATTEMPTS),
            });
        }

        if self.retry_backoff_base_ms > MAX_BACKOFF_BASE_MS {
            return Err(LogStreamError::Config {
                field: "retry_backoff_base_ms".to_owned(),
                reason: format!("must be at most {}", MAX_BACKOFF_BASE_MS),
            });
        }

        Ok(())
    }
}

/// 리더 설정 빌더
#[derive(Default)]
pub struct ReaderConfigBuilder {
    config: ReaderConfig,
}

impl ReaderConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 폴링 간격을 설정합니다.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// 조회 타임아웃(초)을 설정합니다.
    pub fn query_timeout_secs(mut self, secs: u64) -> Self {
        self.config.query_timeout_secs = secs;
        self
    }

    /// 버퍼 최대 용량을 설정합니다.
    pub fn max_buffered_bytes(mut self, bytes: usize) -> Self {
        self.config.max_buffered_bytes = bytes;
        self
    }

    /// 오버플로우 정책을 설정합니다.
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    /// 폴러 실패 시 리더 동작을 설정합니다.
    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.config.error_mode = mode;
        self
    }

    /// 재시도 횟수와 백오프 기준값을 설정합니다.
    pub fn retry(mut self, max_attempts: u32, backoff_base: Duration) -> Self {
        self.config.retry_max_attempts = max_attempts;
        self.config.retry_backoff_base_ms =
            u64::try_from(backoff_base.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// 설정을 검증하고 `ReaderConfig`를 생성합니다.
    pub fn build(self) -> Result<ReaderConfig, LogStreamError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        ReaderConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_parses_enums() {
        let core = conveyor_core::config::LogStreamConfig {
            poll_interval_ms: 250,
            overflow_policy: "drop_oldest".to_owned(),
            on_error: "stall".to_owned(),
            ..Default::default()
        };
        let config = ReaderConfig::from_core(&core).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.overflow_policy, OverflowPolicy::DropOldest);
        assert_eq!(config.error_mode, ErrorMode::Stall);
    }

    #[test]
    fn from_core_rejects_unknown_policy() {
        let core = conveyor_core::config::LogStreamConfig {
            overflow_policy: "drop_newest".to_owned(),
            ..Default::default()
        };
        let err = ReaderConfig::from_core(&core).unwrap_err();
        assert!(err.to_string().contains("overflow_policy"));
    }

    #[test]
    fn legacy_halts_and_stalls() {
        let config = ReaderConfig::legacy();
        assert_eq!(config.retry_max_attempts, 0);
        assert_eq!(config.error_mode, ErrorMode::Stall);
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let config = ReaderConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_tiny_buffer() {
        let config = ReaderConfig {
            max_buffered_bytes: 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = ReaderConfigBuilder::new()
            .poll_interval(Duration::from_millis(100))
            .max_buffered_bytes(4096)
            .overflow_policy(OverflowPolicy::DropOldest)
            .retry(5, Duration::from_millis(20))
            .build()
            .unwrap();
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.max_buffered_bytes, 4096);
        assert_eq!(config.retry_max_attempts, 5);
        assert_eq!(config.retry_backoff_base(), Duration::from_millis(20));
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = ReaderConfigBuilder::new().query_timeout_secs(0).build();
        assert!(result.is_err());
    }

    #[test]
    fn policy_defaults() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::Backpressure);
        assert_eq!(ErrorMode::default(), ErrorMode::Surface);
    }
}
