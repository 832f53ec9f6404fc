//! Publishing backends and the thread publisher.
//!
//! A [`Publisher`] posts one piece of text, optionally as a reply. The
//! [`ThreadPublisher`] turns a list of segments into a reply chain by folding
//! over them and threading each returned [`ThreadLink`] into the next call.

pub mod memory;
pub mod neynar;

use async_trait::async_trait;

use crate::types::{Segment, ThreadLink};

/// Classified publishing failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// Credentials were rejected.
    #[error("Publisher rejected credentials: {0}")]
    Auth(String),
    /// The service throttled the request.
    #[error("Publisher rate limited: {0}")]
    RateLimited(String),
    /// Anything else, including transport failures.
    #[error("Publish failed: {0}")]
    Unknown(String),
}

/// Trait for publishing backends.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish `text`, as a reply to `reply_to` when given.
    async fn publish(
        &self,
        text: &str,
        reply_to: Option<&ThreadLink>,
    ) -> Result<ThreadLink, PublishError>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for std::sync::Arc<P> {
    async fn publish(
        &self,
        text: &str,
        reply_to: Option<&ThreadLink>,
    ) -> Result<ThreadLink, PublishError> {
        (**self).publish(text, reply_to).await
    }
}

/// Progress of one thread publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadState {
    /// Root segment not yet submitted.
    RootPending,
    /// Root segment published.
    RootPublished(ThreadLink),
    /// Reply `index` submitted, anchored to `parent`.
    ReplyPending {
        /// Segment index.
        index: usize,
        /// Link the reply anchors to.
        parent: ThreadLink,
    },
    /// Reply `index` published.
    ReplyPublished {
        /// Segment index.
        index: usize,
        /// Link returned for it.
        link: ThreadLink,
    },
    /// Every segment published.
    Done,
}

impl ThreadState {
    /// Link the next segment must reply to.
    fn anchor(&self) -> Option<&ThreadLink> {
        match self {
            Self::RootPublished(link) | Self::ReplyPublished { link, .. } => Some(link),
            _ => None,
        }
    }
}

/// A thread that stopped part way.
///
/// Segments after `stage` were never attempted; the `links` already
/// published stay up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Thread publication failed at segment {stage} after {} published: {source}", .links.len())]
pub struct PartialThread {
    /// Links obtained before the failure, in segment order.
    pub links: Vec<ThreadLink>,
    /// Index of the segment that failed.
    pub stage: usize,
    /// Why it failed.
    pub source: PublishError,
}

/// Publishes segments as a sequential reply chain.
pub struct ThreadPublisher<P: Publisher> {
    publisher: P,
}

impl<P: Publisher> ThreadPublisher<P> {
    /// Create a thread publisher over a backend.
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }

    /// Borrow the backend.
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Publish one standalone post with no reply chain.
    pub async fn publish_announcement(&self, text: &str) -> Result<ThreadLink, PublishError> {
        let link = self.publisher.publish(text, None).await?;
        tracing::info!(link = %link, "Announcement published");
        Ok(link)
    }

    /// Publish `segments` as a thread.
    ///
    /// Segment `i + 1` is submitted only after segment `i` returned its link.
    /// The first failure ends the thread.
    pub async fn publish_thread(&self, segments: &[Segment]) -> Result<Vec<ThreadLink>, PartialThread> {
        let mut links = Vec::with_capacity(segments.len());
        let mut state = ThreadState::RootPending;

        for (index, segment) in segments.iter().enumerate() {
            let reply_to = state.anchor().cloned();
            if let Some(parent) = &reply_to {
                state = ThreadState::ReplyPending { index, parent: parent.clone() };
            }
            tracing::debug!(stage = index, state = ?state, bytes = segment.len(), "Publishing segment");

            let link = match self.publisher.publish(segment.as_str(), reply_to.as_ref()).await {
                Ok(link) => link,
                Err(source) => {
                    tracing::warn!(
                        stage = index,
                        published = links.len(),
                        error = %source,
                        "Thread publication stopped"
                    );
                    return Err(PartialThread { links, stage: index, source });
                }
            };

            state = if index == 0 {
                ThreadState::RootPublished(link.clone())
            } else {
                ThreadState::ReplyPublished { index, link: link.clone() }
            };
            links.push(link);
        }

        state = ThreadState::Done;
        tracing::info!(segments = links.len(), state = ?state, "Thread published");

        Ok(links)
    }
}

pub use memory::{PublishedPost, RecordingPublisher};
pub use neynar::{NeynarConfig, NeynarPublisher};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::format;
    use crate::types::IdentityChange;

    fn segments(n: usize) -> Vec<Segment> {
        (0..n).map(|i| Segment::new(format!("segment {}\n", i))).collect()
    }

    #[tokio::test]
    async fn test_root_has_no_anchor_and_replies_chain() {
        let thread = ThreadPublisher::new(RecordingPublisher::new());
        let links = thread.publish_thread(&segments(3)).await.unwrap();

        let posts = thread.publisher().posts();
        assert_eq!(links.len(), 3);
        assert_eq!(posts[0].reply_to, None);
        assert_eq!(posts[1].reply_to.as_ref(), Some(&links[0]));
        assert_eq!(posts[2].reply_to.as_ref(), Some(&links[1]));
    }

    #[tokio::test]
    async fn test_failure_stops_the_chain() {
        for fail_at in 0..4 {
            let thread = ThreadPublisher::new(
                RecordingPublisher::new().fail_at(fail_at, PublishError::RateLimited("slow down".into())),
            );

            let err = thread.publish_thread(&segments(4)).await.unwrap_err();
            assert_eq!(err.stage, fail_at);
            assert_eq!(err.links.len(), fail_at);
            assert_eq!(err.source, PublishError::RateLimited("slow down".into()));
            // attempted calls: the successes plus the failing one
            assert_eq!(thread.publisher().attempts(), fail_at + 1);
        }
    }

    #[tokio::test]
    async fn test_thirty_changes_thread_replies_to_root() {
        let changes: Vec<_> = (0..30)
            .map(|i| IdentityChange::new(format!("member{:02}", i), format!("member{:02}.eth", i)))
            .collect();
        let segs = format(&changes).unwrap();
        assert!(segs.len() >= 2);

        let thread = ThreadPublisher::new(RecordingPublisher::new());
        let links = thread.publish_thread(&segs).await.unwrap();

        let posts = thread.publisher().posts();
        assert_eq!(posts.len(), segs.len());
        assert_eq!(posts[1].reply_to.as_ref(), Some(&links[0]));
        assert_eq!(posts[1].text, segs[1].as_str());
    }

    #[tokio::test]
    async fn test_empty_thread_publishes_nothing() {
        let thread = ThreadPublisher::new(RecordingPublisher::new());
        assert!(thread.publish_thread(&[]).await.unwrap().is_empty());
        assert_eq!(thread.publisher().attempts(), 0);
    }

    #[tokio::test]
    async fn test_announcement_is_standalone() {
        let thread = ThreadPublisher::new(RecordingPublisher::new());
        let link = thread.publish_announcement("gm").await.unwrap();

        let posts = thread.publisher().posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].link, link);
        assert_eq!(posts[0].reply_to, None);
    }
}
