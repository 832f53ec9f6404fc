//! In-memory publisher for testing.

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::types::ThreadLink;
use super::{PublishError, Publisher};

/// A post accepted by [`RecordingPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    /// Text that was posted.
    pub text: String,
    /// Link the post replied to.
    pub reply_to: Option<ThreadLink>,
    /// Link issued for the post.
    pub link: ThreadLink,
}

#[derive(Debug, Default)]
struct Recorded {
    posts: Vec<PublishedPost>,
    attempts: usize,
}

/// Publisher that records every post and issues sequential links.
///
/// A failure can be injected at a given attempt index; that attempt and
/// every later one fail with the injected error.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    recorded: Mutex<Recorded>,
    fail_at: Option<(usize, PublishError)>,
}

impl RecordingPublisher {
    /// Create a publisher that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail attempt `index` (zero based) and all after it with `error`.
    pub fn fail_at(mut self, index: usize, error: PublishError) -> Self {
        self.fail_at = Some((index, error));
        self
    }

    /// Accepted posts, in order.
    pub fn posts(&self) -> Vec<PublishedPost> {
        self.recorded.lock().posts.clone()
    }

    /// Number of publish calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.recorded.lock().attempts
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(
        &self,
        text: &str,
        reply_to: Option<&ThreadLink>,
    ) -> Result<ThreadLink, PublishError> {
        let mut recorded = self.recorded.lock();
        let attempt = recorded.attempts;
        recorded.attempts += 1;

        if let Some((index, error)) = &self.fail_at {
            if attempt >= *index {
                return Err(error.clone());
            }
        }

        let link = ThreadLink::new(format!("0x{:040x}", attempt + 1));
        recorded.posts.push(PublishedPost {
            text: text.to_string(),
            reply_to: reply_to.cloned(),
            link: link.clone(),
        });

        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_links_are_unique_and_sequential() {
        let publisher = RecordingPublisher::new();
        let a = publisher.publish("one", None).await.unwrap();
        let b = publisher.publish("two", Some(&a)).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(publisher.posts()[1].reply_to, Some(a));
        assert_eq!(publisher.attempts(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure_sticks() {
        let publisher = RecordingPublisher::new().fail_at(1, PublishError::Auth("bad signer".into()));

        assert!(publisher.publish("one", None).await.is_ok());
        assert!(publisher.publish("two", None).await.is_err());
        assert!(publisher.publish("three", None).await.is_err());
        assert_eq!(publisher.posts().len(), 1);
        assert_eq!(publisher.attempts(), 3);
    }
}
