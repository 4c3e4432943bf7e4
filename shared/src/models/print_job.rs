//! Print Job Model

use serde::{Deserialize, Serialize};

/// What a job prints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Test,
    StationOrder,
    FullOrder,
}

/// Delivery state, PENDING → SENT | FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Sent,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One attempt to deliver one rendered ticket to one printer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: String,
    pub printer_id: String,
    pub branch_id: String,
    pub order_id: Option<String>,
    pub job_type: JobType,
    /// 1-based copy number within the dispatch
    pub copy_index: u32,
    /// Base64 of the rendered ESC/POS byte stream
    pub content: String,
    pub status: JobStatus,
    pub error: Option<String>,
    pub attempts: u32,
    pub created_at: i64,
    pub sent_at: Option<i64>,
    pub finished_at: Option<i64>,
    /// Job whose content this one replays
    #[serde(default)]
    pub reprint_of: Option<String>,
}

/// Job counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJobStats {
    pub total: usize,
    pub pending: usize,
    pub sent: usize,
    pub failed: usize,
}
