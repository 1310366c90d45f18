use serde::{Deserialize, Serialize};

/// Lifecycle status of a job record.
///
/// The happy path is linear:
///
/// ```text
/// Queued → Resolving Channel → Channel Resolved → Fetching Videos
///        → Videos Fetched → Enhancing Titles → Titles Enhanced
///        → Sending Email → Completed
/// ```
///
/// Any non-terminal status may move to `Failed` (business failure) or
/// `Error` (transient/infrastructure failure). Re-applying the current
/// status is always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "Queued")]
    Queued,
    #[serde(rename = "Resolving Channel")]
    ResolvingChannel,
    #[serde(rename = "Channel Resolved")]
    ChannelResolved,
    #[serde(rename = "Fetching Videos")]
    FetchingVideos,
    #[serde(rename = "Videos Fetched")]
    VideosFetched,
    #[serde(rename = "Enhancing Titles")]
    EnhancingTitles,
    #[serde(rename = "Titles Enhanced")]
    TitlesEnhanced,
    #[serde(rename = "Sending Email")]
    SendingEmail,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Failed")]
    Failed,
    #[serde(rename = "Error")]
    Error,
}

impl JobStatus {
    pub const ALL: [JobStatus; 11] = [
        JobStatus::Queued,
        JobStatus::ResolvingChannel,
        JobStatus::ChannelResolved,
        JobStatus::FetchingVideos,
        JobStatus::VideosFetched,
        JobStatus::EnhancingTitles,
        JobStatus::TitlesEnhanced,
        JobStatus::SendingEmail,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Error,
    ];

    /// Stored label.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "Queued",
            JobStatus::ResolvingChannel => "Resolving Channel",
            JobStatus::ChannelResolved => "Channel Resolved",
            JobStatus::FetchingVideos => "Fetching Videos",
            JobStatus::VideosFetched => "Videos Fetched",
            JobStatus::EnhancingTitles => "Enhancing Titles",
            JobStatus::TitlesEnhanced => "Titles Enhanced",
            JobStatus::SendingEmail => "Sending Email",
            JobStatus::Completed => "Completed",
            JobStatus::Failed => "Failed",
            JobStatus::Error => "Error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Error
        )
    }

    /// Next status on the happy path, `None` for terminal statuses.
    pub fn next(&self) -> Option<JobStatus> {
        match self {
            JobStatus::Queued => Some(JobStatus::ResolvingChannel),
            JobStatus::ResolvingChannel => Some(JobStatus::ChannelResolved),
            JobStatus::ChannelResolved => Some(JobStatus::FetchingVideos),
            JobStatus::FetchingVideos => Some(JobStatus::VideosFetched),
            JobStatus::VideosFetched => Some(JobStatus::EnhancingTitles),
            JobStatus::EnhancingTitles => Some(JobStatus::TitlesEnhanced),
            JobStatus::TitlesEnhanced => Some(JobStatus::SendingEmail),
            JobStatus::SendingEmail => Some(JobStatus::Completed),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Error => None,
        }
    }

    pub fn can_transition_to(&self, to: JobStatus) -> bool {
        if *self == to {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        matches!(to, JobStatus::Failed | JobStatus::Error) || self.next() == Some(to)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Invalid job status: {}", s))
    }
}
