//! 로그 스트림 에러 타입
//!
//! [`LogStreamError`]는 커서 조회, 폴링, 리더 생명주기에서 발생하는 에러를 표현합니다.
//! `From<LogStreamError> for ConveyorError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use conveyor_core::error::{ConfigError, ConveyorError, PipelineError};

/// 로그 스트림 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogStreamError {
    /// 원격 로그 조회 실패
    #[error("query error: {stream}: {reason}")]
    Query {
        /// 조회 대상 (group/stream)
        stream: String,
        /// 실패 사유
        reason: String,
    },

    /// 원격 로그 조회 타임아웃
    #[error("query timed out after {timeout_ms}ms: {stream}")]
    Timeout {
        /// 조회 대상 (group/stream)
        stream: String,
        /// 적용된 타임아웃 (밀리초)
        timeout_ms: u64,
    },

    /// 로그 그룹 또는 스트림이 존재하지 않음 (재시도하지 않음)
    #[error("log stream not found: {stream}")]
    StreamNotFound {
        /// 조회 대상 (group/stream)
        stream: String,
    },

    /// 재시도를 모두 소진하여 폴러가 멈춤
    #[error("poller stopped after failure: {reason}")]
    PollerFailed {
        /// 마지막 조회 실패 사유
        reason: String,
    },

    /// 폴러가 취소됨
    #[error("poller cancelled")]
    Cancelled,

    /// 폴러 태스크가 이미 회수됨
    #[error("poller is not running")]
    NotRunning,

    /// 폴러 태스크 join 실패 (panic 등)
    #[error("poller task error: {0}")]
    Task(String),

    /// tokio 런타임 밖에서 리더를 생성함
    #[error("no tokio runtime available: {0}")]
    Runtime(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl LogStreamError {
    /// 재시도로 회복될 수 있는 조회 에러인지 확인합니다.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Query { .. } | Self::Timeout { .. })
    }
}

impl From<ConfigError> for LogStreamError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidValue { field, reason } => Self::Config { field, reason },
            other => Self::Config {
                field: "config".to_owned(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<LogStreamError> for ConveyorError {
    fn from(err: LogStreamError) -> Self {
        match err {
            LogStreamError::Config { field, reason } => {
                ConveyorError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogStreamError::NotRunning => ConveyorError::Pipeline(PipelineError::NotRunning),
            LogStreamError::Runtime(reason) => {
                ConveyorError::Pipeline(PipelineError::InitFailed(reason))
            }
            other => ConveyorError::Pipeline(PipelineError::Stopped(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_error_display() {
        let err = LogStreamError::Query {
            stream: "builds/abc".to_owned(),
            reason: "ThrottlingException".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("builds/abc"));
        assert!(msg.contains("ThrottlingException"));
    }

    #[test]
    fn timeout_display() {
        let err = LogStreamError::Timeout {
            stream: "g/s".to_owned(),
            timeout_ms: 30_000,
        };
        assert!(err.to_string().contains("30000ms"));
    }

    #[test]
    fn transient_classification() {
        assert!(
            LogStreamError::Timeout {
                stream: "g/s".to_owned(),
                timeout_ms: 1
            }
            .is_transient()
        );
        assert!(!LogStreamError::Cancelled.is_transient());
        assert!(
            !LogStreamError::StreamNotFound {
                stream: "g/s".to_owned()
            }
            .is_transient()
        );
        assert!(
            !LogStreamError::PollerFailed {
                reason: "x".to_owned()
            }
            .is_transient()
        );
    }

    #[test]
    fn config_error_maps_field() {
        let err: LogStreamError = ConfigError::InvalidValue {
            field: "group".to_owned(),
            reason: "must not be empty".to_owned(),
        }
        .into();
        assert!(matches!(err, LogStreamError::Config { ref field, .. } if field == "group"));
    }

    #[test]
    fn converts_to_conveyor_error() {
        let err: ConveyorError = LogStreamError::NotRunning.into();
        assert!(matches!(
            err,
            ConveyorError::Pipeline(PipelineError::NotRunning)
        ));

        let err: ConveyorError = LogStreamError::PollerFailed {
            reason: "access denied".to_owned(),
        }
        .into();
        assert!(matches!(err, ConveyorError::Pipeline(PipelineError::Stopped(_))));
    }

    #[test]
    fn every_pipeline_error_is_reachable() {
        let sources = [
            LogStreamError::NotRunning,
            LogStreamError::Runtime("no reactor".to_owned()),
            LogStreamError::StreamNotFound {
                stream: "g/s".to_owned(),
            },
        ];
        let mut seen = [false; 3];
        for source in sources {
            let ConveyorError::Pipeline(pipeline) = ConveyorError::from(source) else {
                panic!("expected a pipeline error");
            };
            let slot = match pipeline {
                PipelineError::NotRunning => 0,
                PipelineError::InitFailed(_) => 1,
                PipelineError::Stopped(_) => 2,
            };
            seen[slot] = true;
        }
        assert_eq!(seen, [true; 3]);
    }
}
