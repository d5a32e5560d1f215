//! 도메인 타입 — 로그 스트림 식별자, 로그 이벤트, 헬스 상태

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// CloudWatch Logs가 허용하는 그룹/스트림 이름의 최대 길이 (바이트)
pub const MAX_STREAM_NAME_LEN: usize = 512;

/// 원격 로그 저장소의 스트림 식별자 (로그 그룹 + 로그 스트림)
///
/// 리더 생성 시 한 번 정해지며 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamIdentity {
    group: String,
    stream: String,
}

impl StreamIdentity {
    /// 새 스트림 식별자를 생성합니다.
    pub fn new(group: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            stream: stream.into(),
        }
    }

    /// 로그 그룹 이름
    pub fn group(&self) -> &str {
        &self.group
    }

    /// 로그 스트림 이름
    pub fn stream(&self) -> &str {
        &self.stream
    }

    /// 그룹/스트림 이름이 비어 있거나 너무 길면 에러를 반환합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("group", &self.group), ("stream", &self.stream)] {
            if value.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "must not be empty".to_owned(),
                });
            }
            if value.len() > MAX_STREAM_NAME_LEN {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: format!("must be at most {MAX_STREAM_NAME_LEN} bytes"),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for StreamIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.stream)
    }
}

/// 원격 저장소가 반환한 단일 로그 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// 원시 메시지 텍스트 (구분자 없이 그대로 버퍼에 추가됨)
    pub message: String,
    /// 이벤트 타임스탬프 (epoch 밀리초, 저장소가 제공한 경우)
    pub timestamp_ms: Option<i64>,
}

impl LogEvent {
    /// 타임스탬프 없는 이벤트를 생성합니다.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp_ms: None,
        }
    }

    /// 타임스탬프를 설정합니다.
    pub fn with_timestamp(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }
}

/// 컴포넌트 헬스 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작은 하지만 주의가 필요함
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_identity_display() {
        let id = StreamIdentity::new("builds", "abc123");
        assert_eq!(id.to_string(), "builds/abc123");
        assert_eq!(id.group(), "builds");
        assert_eq!(id.stream(), "abc123");
    }

    #[test]
    fn stream_identity_rejects_empty_names() {
        assert!(StreamIdentity::new("", "strm").validate().is_err());
        assert!(StreamIdentity::new("grp", "").validate().is_err());
        assert!(StreamIdentity::new("grp", "strm").validate().is_ok());
    }

    #[test]
    fn stream_identity_rejects_long_names() {
        let long = "x".repeat(MAX_STREAM_NAME_LEN + 1);
        let err = StreamIdentity::new(long, "strm").validate().unwrap_err();
        assert!(err.to_string().contains("group"));
    }

    #[test]
    fn log_event_with_timestamp() {
        let event = LogEvent::new("hello").with_timestamp(1_700_000_000_000);
        assert_eq!(event.message, "hello");
        assert_eq!(event.timestamp_ms, Some(1_700_000_000_000));
    }

    #[test]
    fn health_status_predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Degraded("slow".to_owned()).is_healthy());
        assert!(HealthStatus::Unhealthy("stopped".to_owned()).is_unhealthy());
        assert_eq!(
            HealthStatus::Degraded("buffer 95%".to_owned()).to_string(),
            "degraded: buffer 95%"
        );
    }
}
