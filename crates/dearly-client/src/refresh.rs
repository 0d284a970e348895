use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::api::ApiClient;
use crate::error::ClientError;
use dearly_types::api::NotificationsResponse;

/// Bounded exponential backoff for re-reading data that the server may not
/// show yet right after a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub initial_delay: Duration,
    pub factor: u32,
    pub max_attempts: u32,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            factor: 2,
            max_attempts: 4,
        }
    }
}

impl RefreshPolicy {
    /// Delay before each attempt: 500ms, 1s, 2s, 4s with the defaults.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts).map(move |attempt| self.initial_delay * self.factor.pow(attempt))
    }

    /// Wait, fetch, and stop at the first result `is_consistent` accepts.
    /// The last fetched value is returned when no attempt is consistent.
    pub async fn refresh_until<T, F, Fut, P>(
        &self,
        mut fetch: F,
        is_consistent: P,
    ) -> Result<Option<T>, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
        P: Fn(&T) -> bool,
    {
        let mut last = None;
        for (attempt, delay) in self.delays().enumerate() {
            tokio::time::sleep(delay).await;
            let value = fetch().await?;
            if is_consistent(&value) {
                debug!("Refresh settled after {} attempt(s)", attempt + 1);
                return Ok(Some(value));
            }
            last = Some(value);
        }
        debug!("Refresh gave up after {} attempts", self.max_attempts);
        Ok(last)
    }
}

/// Mark one notification read and re-read the list until the server shows it read.
pub async fn mark_read_and_refresh(
    client: &ApiClient,
    policy: &RefreshPolicy,
    user_id: &str,
    notification_id: &str,
) -> Result<Option<NotificationsResponse>, ClientError> {
    client.mark_notification_read(user_id, notification_id).await?;
    policy
        .refresh_until(
            || client.notifications(user_id),
            |list| {
                list.notifications
                    .iter()
                    .find(|n| n.id == notification_id)
                    .is_none_or(|n| n.read)
            },
        )
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn default_schedule_doubles() {
        let delays: Vec<_> = RefreshPolicy::default().delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_first_consistent_read() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = RefreshPolicy::default()
            .refresh_until(
                || {
                    let counter = counter.clone();
                    async move { Ok::<_, ClientError>(counter.fetch_add(1, Ordering::SeqCst) + 1) }
                },
                |n| *n >= 2,
            )
            .await
            .unwrap();
        assert_eq!(result, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let policy = RefreshPolicy {
            max_attempts: 3,
            ..RefreshPolicy::default()
        };
        let result = policy
            .refresh_until(
                || {
                    let counter = counter.clone();
                    async move { Ok::<_, ClientError>(counter.fetch_add(1, Ordering::SeqCst)) }
                },
                |_| false,
            )
            .await
            .unwrap();
        assert_eq!(result, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_stop_the_refresh() {
        let result = RefreshPolicy::default()
            .refresh_until(
                || async { Err::<u32, _>(ClientError::Gateway("down".into())) },
                |_| true,
            )
            .await;
        assert!(matches!(result, Err(ClientError::Gateway(_))));
    }
}
