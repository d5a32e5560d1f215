//! AWS CloudWatch Logs 기반 로그 소스
//!
//! `GetLogEvents` API로 한 페이지씩 조회합니다. 인증은 AWS 기본
//! credential provider chain(환경변수, 프로파일, 인스턴스 역할 등)에 맡깁니다.

use aws_sdk_cloudwatchlogs::Client;
use aws_sdk_cloudwatchlogs::error::DisplayErrorContext;
use tracing::debug;

use conveyor_core::types::{LogEvent, StreamIdentity};

use super::{LogPage, LogSource};
use crate::error::LogStreamError;

/// CloudWatch Logs 클라이언트
///
/// 내부 `Client`는 복제 비용이 작고 여러 태스크에서 공유할 수 있습니다.
#[derive(Debug, Clone)]
pub struct CloudWatchLogSource {
    client: Client,
    start_from_head: bool,
}

impl CloudWatchLogSource {
    /// 이미 구성된 SDK 클라이언트로 생성합니다.
    pub fn new(client: Client, start_from_head: bool) -> Self {
        Self {
            client,
            start_from_head,
        }
    }

    /// AWS 기본 설정을 로드하여 생성합니다.
    ///
    /// `region`이 `None`이면 환경/프로파일의 리전을 사용합니다.
    pub async fn from_env(region: Option<String>, start_from_head: bool) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), start_from_head)
    }

    /// 커서가 없을 때 스트림 처음부터 읽는지 여부
    pub fn start_from_head(&self) -> bool {
        self.start_from_head
    }
}

impl LogSource for CloudWatchLogSource {
    async fn fetch(
        &self,
        identity: &StreamIdentity,
        token: Option<&str>,
    ) -> Result<LogPage, LogStreamError> {
        let output = self
            .client
            .get_log_events()
            .log_group_name(identity.group())
            .log_stream_name(identity.stream())
            .set_next_token(token.map(str::to_owned))
            .start_from_head(self.start_from_head)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception());
                if missing {
                    LogStreamError::StreamNotFound {
                        stream: identity.to_string(),
                    }
                } else {
                    LogStreamError::Query {
                        stream: identity.to_string(),
                        reason: DisplayErrorContext(&e).to_string(),
                    }
                }
            })?;

        // 메시지가 없는 이벤트는 버퍼에 보탤 내용이 없으므로 건너뜁니다.
        let events: Vec<LogEvent> = output
            .events()
            .iter()
            .filter_map(|event| {
                event.message().map(|message| LogEvent {
                    message: message.to_owned(),
                    timestamp_ms: event.timestamp(),
                })
            })
            .collect();

        debug!(
            stream = %identity,
            events = events.len(),
            "fetched cloudwatch log page"
        );

        Ok(LogPage {
            events,
            next_token: output.next_forward_token().map(str::to_owned),
        })
    }
}
