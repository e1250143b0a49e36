//! 플러그인 코드 격리 실행
//!
//! 플러그인 메서드의 `Err`와 패닉을 같은 `Error`로 받아 호출자가
//! 플러그인 단위로 처리할 수 있게 합니다.

use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use weave_foundation::{Error, Result};

/// 패닉 페이로드에서 메시지 추출
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// 플러그인 future 실행 (패닉 → `Error::Internal`)
pub(crate) async fn isolate<T, F>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Error::Internal(format!(
            "plugin panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolate_passes_through() {
        let value = tokio_test::block_on(isolate(async { Ok::<_, Error>(3) }));
        assert_eq!(value.unwrap(), 3);

        let err = tokio_test::block_on(isolate(async { Err::<(), _>(Error::Cancelled) }));
        assert!(matches!(err, Err(Error::Cancelled)));
    }

    #[test]
    fn test_panic_message_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic");
    }

    #[tokio::test]
    async fn test_isolate_catches_panic() {
        let err = isolate(async {
            if true {
                panic!("kaboom");
            }
            Ok::<(), Error>(())
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("kaboom"));
    }
}
