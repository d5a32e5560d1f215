#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`cursor`]: 스트림 식별자 + 페이지네이션 토큰
//! - [`buffer`]: 폴러와 리더가 공유하는 동기화 바이트 버퍼
//! - [`source`]: 원격 로그 조회 trait 및 CloudWatch Logs 구현
//! - [`poller`]: 고정 간격 조회, 재시도, 취소
//! - [`reader`]: 소비자용 스트림 읽기 인터페이스 (논블로킹 read + `AsyncRead`)
//! - [`config`]: 리더 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! interval tick -> Poller --fetch(cursor)--> LogSource
//!                    |
//!                 append (순서 유지)
//!                    v
//!               SyncBuffer --consume--> LogStreamReader --> consumer
//! ```

pub mod buffer;
pub mod config;
pub mod cursor;
pub mod error;
pub mod poller;
pub mod reader;
pub mod source;

// --- 주요 타입 re-export ---

// 리더
pub use reader::{LogStreamReader, LogStreamReaderBuilder, ReadStatus};

// 폴러
pub use poller::{PollOutcome, Poller, PollerExit, PollerState, PollerStatsSnapshot};

// 설정
pub use config::{ErrorMode, OverflowPolicy, ReaderConfig, ReaderConfigBuilder};

// 에러
pub use error::LogStreamError;

// 구성 요소
pub use buffer::SyncBuffer;
pub use cursor::Cursor;
pub use source::{LogPage, LogSource};

#[cfg(feature = "cloudwatch")]
pub use source::CloudWatchLogSource;
