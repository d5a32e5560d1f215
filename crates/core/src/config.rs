//! 설정 관리 — conveyor.toml 파싱 및 런타임 설정
//!
//! [`ConveyorConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`CONVEYOR_LOG_STREAM_POLL_INTERVAL_MS=500` 형식)
//! 3. 설정 파일 (`conveyor.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), conveyor_core::error::ConveyorError> {
//! use conveyor_core::config::ConveyorConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ConveyorConfig::load("conveyor.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ConveyorConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ConveyorError};

/// Conveyor 통합 설정
///
/// `conveyor.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConveyorConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 스트림 리더 설정
    #[serde(default)]
    pub log_stream: LogStreamConfig,
}

impl ConveyorConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConveyorError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConveyorError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConveyorError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ConveyorError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ConveyorError> {
        toml::from_str(toml_str).map_err(|e| {
            ConveyorError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `CONVEYOR_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "CONVEYOR_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CONVEYOR_GENERAL_LOG_FORMAT");

        // Log Stream
        let ls = &mut self.log_stream;
        override_u64(
            &mut ls.poll_interval_ms,
            "CONVEYOR_LOG_STREAM_POLL_INTERVAL_MS",
        );
        override_u64(
            &mut ls.query_timeout_secs,
            "CONVEYOR_LOG_STREAM_QUERY_TIMEOUT_SECS",
        );
        override_usize(
            &mut ls.max_buffered_bytes,
            "CONVEYOR_LOG_STREAM_MAX_BUFFERED_BYTES",
        );
        override_string(
            &mut ls.overflow_policy,
            "CONVEYOR_LOG_STREAM_OVERFLOW_POLICY",
        );
        override_string(&mut ls.on_error, "CONVEYOR_LOG_STREAM_ON_ERROR");
        override_u32(
            &mut ls.retry_max_attempts,
            "CONVEYOR_LOG_STREAM_RETRY_MAX_ATTEMPTS",
        );
        override_u64(
            &mut ls.retry_backoff_base_ms,
            "CONVEYOR_LOG_STREAM_RETRY_BACKOFF_BASE_MS",
        );
        override_bool(
            &mut ls.start_from_head,
            "CONVEYOR_LOG_STREAM_START_FROM_HEAD",
        );
        override_opt_string(&mut ls.region, "CONVEYOR_LOG_STREAM_REGION");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 숫자 범위 검증은 log-stream 크레이트의 `ReaderConfig::validate()`가 담당하고,
    /// 여기서는 문자열 열거값만 확인합니다.
    pub fn validate(&self) -> Result<(), ConveyorError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        let valid_policies = ["backpressure", "drop_oldest"];
        if !valid_policies.contains(&self.log_stream.overflow_policy.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_stream.overflow_policy".to_owned(),
                reason: format!("must be one of: {}", valid_policies.join(", ")),
            }
            .into());
        }

        let valid_modes = ["surface", "stall"];
        if !valid_modes.contains(&self.log_stream.on_error.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "log_stream.on_error".to_owned(),
                reason: format!("must be one of: {}", valid_modes.join(", ")),
            }
            .into());
        }

        if self.log_stream.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "log_stream.poll_interval_ms".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 로그 스트림 리더 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogStreamConfig {
    /// 원격 조회 최소 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 단일 조회 타임아웃 (초)
    pub query_timeout_secs: u64,
    /// 버퍼에 쌓아둘 최대 바이트 수
    pub max_buffered_bytes: usize,
    /// 버퍼가 가득 찼을 때의 정책 (backpressure, drop_oldest)
    pub overflow_policy: String,
    /// 조회 실패로 폴러가 멈췄을 때 리더의 동작 (surface, stall)
    pub on_error: String,
    /// 조회 실패 시 재시도 횟수 (0이면 첫 실패에서 중단)
    pub retry_max_attempts: u32,
    /// 재시도 백오프 기준값 (밀리초, 시도 횟수에 비례해 증가)
    pub retry_backoff_base_ms: u64,
    /// 커서가 없을 때 스트림 처음부터 읽을지 여부
    pub start_from_head: bool,
    /// AWS 리전 (없으면 기본 provider chain 사용)
    pub region: Option<String>,
}

impl Default for LogStreamConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            query_timeout_secs: 30,
            max_buffered_bytes: 8 * 1024 * 1024, // 8MB
            overflow_policy: "backpressure".to_owned(),
            on_error: "surface".to_owned(),
            retry_max_attempts: 3,
            retry_backoff_base_ms: 500,
            start_from_head: false,
            region: None,
        }
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_opt_string(target: &mut Option<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = if val.trim().is_empty() {
            None
        } else {
            Some(val)
        };
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
