//! Session Management
//!
//! A session is one geolocation attempt on one image. It owns the turn
//! history and every crop derived during the attempt, and is dropped when
//! the loop ends.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::message::Conversation;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Why the model was judged finished
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// `[STOP]` in the text
    StopSignal,
    /// "final answer" together with "coordinates"
    FinalAnswer,
    /// "impossible" together with "stock photo"
    Impossible,
}

impl TerminationReason {
    /// Completion banner shown to the operator
    pub fn banner(self) -> &'static str {
        match self {
            TerminationReason::StopSignal => "[Process Completed - Stop Signal Received]",
            TerminationReason::FinalAnswer => "[Process Completed - Final Answer Found]",
            TerminationReason::Impossible => "[Process Completed - Unable to Geolocate]",
        }
    }
}

/// Position in the turn state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    AwaitingModel,
    ProcessingParts,
    ToolDispatch,
    Continuing,
    Terminated,
}

/// How a session ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The model signalled completion
    Terminated(TerminationReason),
    /// Turn budget ran out without a signal; not a failure
    BudgetExhausted,
    /// Provider or upload failure ended the loop
    Aborted(String),
}

impl SessionOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, SessionOutcome::Aborted(_))
    }
}

/// What happens to derived crops once a session ends
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Leave crops on disk (the server keeps serving them)
    #[default]
    Keep,
    /// Delete every crop this session produced
    DeleteOnSessionEnd,
}

impl std::str::FromStr for RetentionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(RetentionPolicy::Keep),
            "session" | "delete" | "delete_on_session_end" => {
                Ok(RetentionPolicy::DeleteOnSessionEnd)
            }
            other => Err(format!("unknown retention policy '{}'", other)),
        }
    }
}

/// A single geolocation attempt
#[derive(Clone, Debug, Serialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Image being geolocated
    pub image_path: PathBuf,

    /// Turn history sent to the model
    pub conversation: Conversation,

    /// Completed model turns
    pub turn: usize,

    pub state: SessionState,

    /// Crops written during this session, in creation order
    pub derived_images: Vec<PathBuf>,

    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            id: SessionId::new(),
            image_path: image_path.into(),
            conversation: Conversation::new(),
            turn: 0,
            state: SessionState::AwaitingModel,
            derived_images: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    pub fn transition(&mut self, next: SessionState) {
        tracing::trace!(session_id = %self.id, from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    pub fn record_derived(&mut self, path: PathBuf) {
        if !self.derived_images.contains(&path) {
            self.derived_images.push(path);
        }
    }

    /// Apply `policy` to the crops this session produced.
    ///
    /// Returns how many files were removed. Missing files are ignored.
    pub async fn release(&mut self, policy: RetentionPolicy) -> usize {
        if policy == RetentionPolicy::Keep {
            return 0;
        }

        let mut removed = 0;
        for path in self.derived_images.drain(..) {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), "failed to remove crop: {}", e);
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new("static/target.jpg");
        assert_eq!(session.state, SessionState::AwaitingModel);
        assert_eq!(session.turn, 0);
        assert!(session.conversation.is_empty());
    }

    #[test]
    fn test_derived_images_deduplicated() {
        let mut session = Session::new("a.jpg");
        session.record_derived(PathBuf::from("a_crop_0_0.jpg"));
        session.record_derived(PathBuf::from("a_crop_0_0.jpg"));
        assert_eq!(session.derived_images.len(), 1);
    }

    #[tokio::test]
    async fn test_release_deletes_crops() {
        let dir = tempfile::tempdir().unwrap();
        let crop = dir.path().join("a_crop_1_2.png");
        std::fs::write(&crop, b"png").unwrap();

        let mut session = Session::new(dir.path().join("a.png"));
        session.record_derived(crop.clone());
        session.record_derived(dir.path().join("gone.png"));

        assert_eq!(session.release(RetentionPolicy::DeleteOnSessionEnd).await, 1);
        assert!(!crop.exists());
    }

    #[tokio::test]
    async fn test_keep_leaves_crops() {
        let dir = tempfile::tempdir().unwrap();
        let crop = dir.path().join("a_crop_1_2.png");
        std::fs::write(&crop, b"png").unwrap();

        let mut session = Session::new(dir.path().join("a.png"));
        session.record_derived(crop.clone());

        assert_eq!(session.release(RetentionPolicy::Keep).await, 0);
        assert!(crop.exists());
    }

    #[test]
    fn test_banners() {
        assert_eq!(
            TerminationReason::StopSignal.banner(),
            "[Process Completed - Stop Signal Received]"
        );
    }
}
