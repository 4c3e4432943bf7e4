//! redb-based print job store
//!
//! Every delivery attempt is kept as an audit trail; there is no delete path.

use redb::{Database, ReadableDatabase, ReadableTable, Table, TableDefinition};
use shared::error::{AppError, ErrorCode};
use shared::models::{JobStatus, PrintJob, PrintJobStats};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Print jobs table: key = job_id, value = JSON
const PRINT_JOBS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("print_jobs");

/// Index: (order_id, job_id) -> ()
const PRINT_JOBS_BY_ORDER_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("print_jobs_by_order");

/// Index: (printer_id, job_id) -> ()
const PRINT_JOBS_BY_PRINTER_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("print_jobs_by_printer");

/// Index: (created_at, copy_index, job_id) -> ()
const PRINT_JOBS_BY_TIME_TABLE: TableDefinition<(i64, u32, &str), ()> =
    TableDefinition::new("print_jobs_by_time");

/// Job count per status, kept in step with every transition
const PRINT_JOB_COUNTS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("print_job_counts");

fn status_key(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Sent => "sent",
        JobStatus::Failed => "failed",
    }
}

fn adjust_count(
    counts: &mut Table<'_, &'static str, u64>,
    status: JobStatus,
    increment: bool,
) -> PrintStorageResult<()> {
    let key = status_key(status);
    let current = counts.get(key)?.map(|v| v.value()).unwrap_or(0);
    let next = if increment {
        current + 1
    } else {
        current.saturating_sub(1)
    };
    counts.insert(key, next)?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum PrintStorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Print job not found: {0}")]
    JobNotFound(String),

    #[error("Print job {id} already exists")]
    JobExists { id: String },

    #[error("Print job {id} is already {status:?}")]
    AlreadyFinished { id: String, status: JobStatus },
}

pub type PrintStorageResult<T> = Result<T, PrintStorageError>;

impl From<PrintStorageError> for AppError {
    fn from(err: PrintStorageError) -> Self {
        match err {
            PrintStorageError::JobNotFound(id) => {
                AppError::with_message(ErrorCode::PrintJobNotFound, format!("Print job not found: {}", id))
                    .with_detail("job_id", id)
            }
            other => AppError::database(other.to_string()),
        }
    }
}

/// Print job storage
#[derive(Clone)]
pub struct PrintJobStore {
    db: Arc<Database>,
}

impl PrintJobStore {
    /// Open or create database
    pub fn open(path: impl AsRef<Path>) -> PrintStorageResult<Self> {
        Self::init(Database::create(path)?)
    }

    /// Open in-memory database
    pub fn open_in_memory() -> PrintStorageResult<Self> {
        Self::init(Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?)
    }

    fn init(db: Database) -> PrintStorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PRINT_JOBS_TABLE)?;
            let _ = write_txn.open_table(PRINT_JOBS_BY_ORDER_TABLE)?;
            let _ = write_txn.open_table(PRINT_JOBS_BY_PRINTER_TABLE)?;
            let _ = write_txn.open_table(PRINT_JOBS_BY_TIME_TABLE)?;
            let _ = write_txn.open_table(PRINT_JOB_COUNTS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Persist a new PENDING job
    pub fn create_pending(&self, job: &PrintJob) -> PrintStorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PRINT_JOBS_TABLE)?;
            if table.get(job.id.as_str())?.is_some() {
                return Err(PrintStorageError::JobExists { id: job.id.clone() });
            }
            let value = serde_json::to_vec(job)?;
            table.insert(job.id.as_str(), value.as_slice())?;

            if let Some(order_id) = &job.order_id {
                let mut idx_table = write_txn.open_table(PRINT_JOBS_BY_ORDER_TABLE)?;
                idx_table.insert((order_id.as_str(), job.id.as_str()), ())?;
            }

            let mut idx_table = write_txn.open_table(PRINT_JOBS_BY_PRINTER_TABLE)?;
            idx_table.insert((job.printer_id.as_str(), job.id.as_str()), ())?;

            let mut time_table = write_txn.open_table(PRINT_JOBS_BY_TIME_TABLE)?;
            time_table.insert((job.created_at, job.copy_index, job.id.as_str()), ())?;

            let mut counts = write_txn.open_table(PRINT_JOB_COUNTS_TABLE)?;
            adjust_count(&mut counts, job.status, true)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// PENDING → SENT
    pub fn mark_sent(&self, id: &str, at: i64) -> PrintStorageResult<PrintJob> {
        self.finish(id, |job| {
            job.status = JobStatus::Sent;
            job.sent_at = Some(at);
            job.finished_at = Some(at);
            job.error = None;
        })
    }

    /// PENDING → FAILED
    pub fn mark_failed(&self, id: &str, error: &str, at: i64) -> PrintStorageResult<PrintJob> {
        self.finish(id, |job| {
            job.status = JobStatus::Failed;
            job.error = Some(error.to_string());
            job.finished_at = Some(at);
        })
    }

    /// Apply a terminal transition; terminal jobs never change again
    fn finish(&self, id: &str, apply: impl FnOnce(&mut PrintJob)) -> PrintStorageResult<PrintJob> {
        let write_txn = self.db.begin_write()?;
        let job = {
            let mut table = write_txn.open_table(PRINT_JOBS_TABLE)?;

            // Read first
            let bytes = {
                let value = table
                    .get(id)?
                    .ok_or_else(|| PrintStorageError::JobNotFound(id.to_string()))?;
                value.value().to_vec()
            };

            let mut job: PrintJob = serde_json::from_slice(&bytes)?;
            if job.status.is_terminal() {
                return Err(PrintStorageError::AlreadyFinished {
                    id: id.to_string(),
                    status: job.status,
                });
            }

            let previous = job.status;
            apply(&mut job);
            job.attempts = 1;

            let new_value = serde_json::to_vec(&job)?;
            table.insert(id, new_value.as_slice())?;

            let mut counts = write_txn.open_table(PRINT_JOB_COUNTS_TABLE)?;
            adjust_count(&mut counts, previous, false)?;
            adjust_count(&mut counts, job.status, true)?;
            job
        };
        write_txn.commit()?;
        Ok(job)
    }

    /// Get a job by ID
    pub fn get_job(&self, id: &str) -> PrintStorageResult<Option<PrintJob>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRINT_JOBS_TABLE)?;

        match table.get(id)? {
            Some(guard) => {
                let job: PrintJob = serde_json::from_slice(guard.value())?;
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    /// Jobs for an order, oldest first
    pub fn jobs_for_order(&self, order_id: &str) -> PrintStorageResult<Vec<PrintJob>> {
        self.indexed(PRINT_JOBS_BY_ORDER_TABLE, order_id)
    }

    /// Jobs for a printer, oldest first
    pub fn jobs_for_printer(&self, printer_id: &str) -> PrintStorageResult<Vec<PrintJob>> {
        self.indexed(PRINT_JOBS_BY_PRINTER_TABLE, printer_id)
    }

    fn indexed(
        &self,
        index: TableDefinition<'static, (&'static str, &'static str), ()>,
        key: &str,
    ) -> PrintStorageResult<Vec<PrintJob>> {
        let read_txn = self.db.begin_read()?;
        let idx_table = read_txn.open_table(index)?;
        let data_table = read_txn.open_table(PRINT_JOBS_TABLE)?;

        let mut jobs = Vec::new();
        let range_start: (&str, &str) = (key, "");
        let range_end: (&str, &str) = (key, "\u{ffff}");

        for result in idx_table.range(range_start..=range_end)? {
            let (entry, _) = result?;
            let (_, job_id) = entry.value();
            if let Some(guard) = data_table.get(job_id)? {
                let job: PrintJob = serde_json::from_slice(guard.value())?;
                jobs.push(job);
            }
        }

        jobs.sort_by_key(|j| (j.created_at, j.copy_index));
        Ok(jobs)
    }

    /// All jobs, newest first (paginated)
    pub fn list_jobs(&self, offset: usize, limit: usize) -> PrintStorageResult<Vec<PrintJob>> {
        let read_txn = self.db.begin_read()?;
        let time_table = read_txn.open_table(PRINT_JOBS_BY_TIME_TABLE)?;
        let data_table = read_txn.open_table(PRINT_JOBS_TABLE)?;

        let mut jobs = Vec::with_capacity(limit);
        for result in time_table.iter()?.rev().skip(offset).take(limit) {
            let (entry, _) = result?;
            let (_, _, job_id) = entry.value();
            if let Some(guard) = data_table.get(job_id)? {
                jobs.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(jobs)
    }

    /// Job counts by status
    pub fn stats(&self) -> PrintStorageResult<PrintJobStats> {
        let read_txn = self.db.begin_read()?;
        let counts = read_txn.open_table(PRINT_JOB_COUNTS_TABLE)?;
        let count = |status: JobStatus| -> PrintStorageResult<usize> {
            Ok(counts
                .get(status_key(status))?
                .map(|v| v.value() as usize)
                .unwrap_or(0))
        };

        let pending = count(JobStatus::Pending)?;
        let sent = count(JobStatus::Sent)?;
        let failed = count(JobStatus::Failed)?;
        Ok(PrintJobStats {
            total: pending + sent + failed,
            pending,
            sent,
            failed,
        })
    }
}
