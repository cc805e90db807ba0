// Standard library imports
use std::{future::Future, time::Duration};

// Third party imports
use tracing::warn;

// Internal imports
use evmsecure_common::{SecurityError, SecurityResult};

/// Chạy future với timeout, hết hạn thì trả về `SecurityError::Timeout`
pub async fn with_timeout<T, F>(operation: &str, after: Duration, future: F) -> SecurityResult<T>
where
    F: Future<Output = SecurityResult<T>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            let after_ms = after.as_millis() as u64;
            warn!(operation, after_ms, "Hết thời gian chờ");
            Err(SecurityError::Timeout {
                operation: operation.to_string(),
                after_ms,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_in_time() {
        let value = with_timeout("fast", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_timeout_error() {
        let result: SecurityResult<()> = with_timeout("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert_eq!(
            result.unwrap_err(),
            SecurityError::Timeout {
                operation: "slow".to_string(),
                after_ms: 10
            }
        );
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: SecurityResult<()> = with_timeout("failing", Duration::from_secs(1), async {
            Err(SecurityError::Network("boom".to_string()))
        })
        .await;
        assert_eq!(result.unwrap_err(), SecurityError::Network("boom".to_string()));
    }
}
