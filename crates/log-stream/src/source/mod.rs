//! 원격 로그 조회 추상화
//!
//! [`LogSource`] trait은 원격 로그 저장소의 페이지 조회 API를 추상화합니다.
//! 운영 코드는 [`CloudWatchLogSource`]를, 테스트는 `MockLogSource`를 사용합니다.
//!
//! ```text
//! Poller --fetch(identity, token)--> LogSource
//!                                      |     |
//!                               CloudWatch  Mock
//! ```

#[cfg(feature = "cloudwatch")]
pub mod cloudwatch;

#[cfg(feature = "cloudwatch")]
pub use cloudwatch::CloudWatchLogSource;

use std::future::Future;

use conveyor_core::types::{LogEvent, StreamIdentity};

use crate::error::LogStreamError;

/// 한 번의 조회 결과
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogPage {
    /// 저장소가 제공한 순서 그대로의 이벤트
    pub events: Vec<LogEvent>,
    /// 다음 조회를 이어갈 토큰. `None`은 "새 위치 없음"이지 "처음부터"가 아닙니다.
    pub next_token: Option<String>,
}

impl LogPage {
    /// 이벤트와 다음 토큰으로 페이지를 생성합니다.
    pub fn new(events: Vec<LogEvent>, next_token: Option<String>) -> Self {
        Self { events, next_token }
    }

    /// 메시지 문자열만으로 페이지를 생성합니다.
    pub fn from_messages<I, M>(messages: I, next_token: Option<&str>) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<String>,
    {
        Self {
            events: messages.into_iter().map(LogEvent::new).collect(),
            next_token: next_token.map(str::to_owned),
        }
    }

    /// 이벤트가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// 원격 로그 저장소 조회 trait
///
/// 구현체는 여러 태스크에서 공유될 수 있도록 `Send + Sync + 'static`이어야 합니다.
/// 한 폴러는 조회를 절대 동시에 실행하지 않습니다.
///
/// # Errors
///
/// 전송/서비스 실패는 `LogStreamError::Query`로 반환합니다.
/// 폴러가 재시도 정책에 따라 처리합니다.
pub trait LogSource: Send + Sync + 'static {
    /// `token` 위치부터 한 페이지를 조회합니다. `token`이 `None`이면 첫 조회입니다.
    fn fetch(
        &self,
        identity: &StreamIdentity,
        token: Option<&str>,
    ) -> impl Future<Output = Result<LogPage, LogStreamError>> + Send;
}

/// 테스트용 Mock 로그 소스
///
/// 미리 정한 응답을 순서대로 반환하고, 각 조회에 전달된 토큰을 기록합니다.
/// 스크립트가 끝나면 빈 페이지(토큰 없음)를 반환합니다.
#[cfg(test)]
#[derive(Default)]
pub struct MockLogSource {
    script: std::sync::Mutex<std::collections::VecDeque<MockStep>>,
    calls: std::sync::Mutex<Vec<Option<String>>>,
}

/// Mock 조회 한 번의 동작
#[cfg(test)]
#[derive(Debug)]
pub enum MockStep {
    /// 페이지 반환
    Page(LogPage),
    /// 조회 실패
    Fail(String),
    /// 스트림 없음
    Missing,
    /// 응답하지 않음 (취소 테스트용)
    Hang,
}

#[cfg(test)]
impl MockLogSource {
    /// 빈 스크립트로 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 페이지 응답을 추가합니다.
    pub fn with_page(self, messages: &[&str], next_token: Option<&str>) -> Self {
        self.push(MockStep::Page(LogPage::from_messages(
            messages.iter().copied(),
            next_token,
        )));
        self
    }

    /// 실패 응답을 추가합니다.
    pub fn with_failure(self, reason: &str) -> Self {
        self.push(MockStep::Fail(reason.to_owned()));
        self
    }

    /// 스트림 없음 응답을 추가합니다.
    pub fn with_missing_stream(self) -> Self {
        self.push(MockStep::Missing);
        self
    }

    /// 응답하지 않는 조회를 추가합니다.
    pub fn with_hang(self) -> Self {
        self.push(MockStep::Hang);
        self
    }

    fn push(&self, step: MockStep) {
        self.script
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(step);
    }

    /// 지금까지 조회에 전달된 토큰 목록
    pub fn calls(&self) -> Vec<Option<String>> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// 지금까지의 조회 횟수
    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[cfg(test)]
impl LogSource for MockLogSource {
    async fn fetch(
        &self,
        identity: &StreamIdentity,
        token: Option<&str>,
    ) -> Result<LogPage, LogStreamError> {
        let step = {
            self.calls
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(token.map(str::to_owned));
            self.script
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop_front()
        };

        match step {
            Some(MockStep::Page(page)) => Ok(page),
            Some(MockStep::Fail(reason)) => Err(LogStreamError::Query {
                stream: identity.to_string(),
                reason,
            }),
            Some(MockStep::Missing) => Err(LogStreamError::StreamNotFound {
                stream: identity.to_string(),
            }),
            Some(MockStep::Hang) => std::future::pending().await,
            None => Ok(LogPage::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_script_in_order_then_empty() {
        let source = MockLogSource::new()
            .with_page(&["a", "b"], Some("T1"))
            .with_failure("boom");
        let id = StreamIdentity::new("grp", "strm");

        let page = source.fetch(&id, None).await.unwrap();
        assert_eq!(page.events.len(), 2);
        assert_eq!(page.next_token.as_deref(), Some("T1"));

        let err = source.fetch(&id, Some("T1")).await.unwrap_err();
        assert!(err.to_string().contains("boom"));

        let page = source.fetch(&id, Some("T1")).await.unwrap();
        assert!(page.is_empty());
        assert!(page.next_token.is_none());

        assert_eq!(
            source.calls(),
            vec![None, Some("T1".to_owned()), Some("T1".to_owned())]
        );
    }

    #[test]
    fn page_from_messages() {
        let page = LogPage::from_messages(["x", "y"], None);
        assert_eq!(page.events[0].message, "x");
        assert_eq!(page.events[1].message, "y");
        assert!(page.next_token.is_none());
    }
}
