//! Anticipated build status for dashboards.
//!
//! Fetches recent history from a [`StatusSource`], classifies it with
//! [`compute_trend`], and turns "no usable history" into a user-facing error.

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;
use crate::models::{BuildResult, BuildStatus};
use crate::repo::BuildRepo;
use crate::trend::compute_trend;

/// Shown to consumers when no classification can be made. Existing dashboards match on it.
pub const NO_FINISHED_BUILDS_MESSAGE: &str =
    "No successful or failed builds found. The system might be having trouble catching up with the rate of commits.";

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("{}", NO_FINISHED_BUILDS_MESSAGE)]
    NoFinishedBuilds,

    /// Fetching history failed; the source's error is passed through as-is
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

/// Success payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublicStatus {
    #[serde(rename = "AnticipatedBuildStatus")]
    pub anticipated_build_status: BuildResult,
}

/// Supplies build history, newest build first
pub trait StatusSource {
    fn build_statuses(&self) -> anyhow::Result<Vec<BuildStatus>>;
}

/// Reads the most recent `depth` builds from the ledger database
pub struct DbStatusSource<'a> {
    conn: &'a Connection,
    depth: usize,
}

impl<'a> DbStatusSource<'a> {
    pub fn new(conn: &'a Connection, depth: usize) -> Self {
        Self { conn, depth }
    }
}

impl StatusSource for DbStatusSource<'_> {
    fn build_statuses(&self) -> anyhow::Result<Vec<BuildStatus>> {
        BuildRepo::list_recent(self.conn, self.depth)
    }
}

/// Compute the anticipated status of the current build
pub fn get_public_build_status<S: StatusSource + ?Sized>(source: &S) -> Result<PublicStatus, StatusError> {
    let statuses = source.build_statuses()?;
    log::info!("Classifying {} recent builds", statuses.len());

    translate_trend(compute_trend(&statuses))
}

/// Map a classification to the caller-facing result
pub fn translate_trend(trend: BuildResult) -> Result<PublicStatus, StatusError> {
    if trend == BuildResult::New {
        return Err(StatusError::NoFinishedBuilds);
    }

    Ok(PublicStatus {
        anticipated_build_status: trend,
    })
}
