//! 페이지네이션 커서 -- 원격 저장소에서의 읽기 위치

use conveyor_core::types::StreamIdentity;

/// 스트림 식별자와 불투명한 페이지네이션 토큰
///
/// 토큰은 한 번 설정되면 새 토큰으로만 교체됩니다. 응답에 토큰이 없으면
/// 기존 토큰을 유지하여 빈 조회가 페이지네이션을 처음으로 되돌리지 않게 합니다.
#[derive(Debug, Clone)]
pub struct Cursor {
    identity: StreamIdentity,
    token: Option<String>,
}

impl Cursor {
    /// 토큰 없이 스트림 처음 조회용 커서를 생성합니다.
    pub fn new(identity: StreamIdentity) -> Self {
        Self {
            identity,
            token: None,
        }
    }

    /// 조회 대상 스트림
    pub fn identity(&self) -> &StreamIdentity {
        &self.identity
    }

    /// 다음 조회에 사용할 토큰
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// 조회 응답의 다음 토큰을 반영합니다.
    ///
    /// `next`가 `None`이면 아무것도 바꾸지 않습니다. 토큰이 실제로 바뀌었으면 `true`.
    pub fn advance(&mut self, next: Option<String>) -> bool {
        match next {
            Some(token) if self.token.as_deref() != Some(token.as_str()) => {
                self.token = Some(token);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor() -> Cursor {
        Cursor::new(StreamIdentity::new("grp", "strm"))
    }

    #[test]
    fn starts_without_token() {
        let c = cursor();
        assert!(c.token().is_none());
        assert_eq!(c.identity().to_string(), "grp/strm");
    }

    #[test]
    fn advance_replaces_token() {
        let mut c = cursor();
        assert!(c.advance(Some("T1".to_owned())));
        assert_eq!(c.token(), Some("T1"));
        assert!(c.advance(Some("T2".to_owned())));
        assert_eq!(c.token(), Some("T2"));
    }

    #[test]
    fn missing_token_keeps_previous() {
        let mut c = cursor();
        c.advance(Some("T1".to_owned()));
        assert!(!c.advance(None));
        assert_eq!(c.token(), Some("T1"));
    }

    #[test]
    fn same_token_reports_unchanged() {
        let mut c = cursor();
        c.advance(Some("T1".to_owned()));
        assert!(!c.advance(Some("T1".to_owned())));
        assert_eq!(c.token(), Some("T1"));
    }

    #[test]
    fn missing_token_before_first_page_stays_empty() {
        let mut c = cursor();
        assert!(!c.advance(None));
        assert!(c.token().is_none());
    }
}
