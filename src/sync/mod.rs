//! One reconciliation pass from the directory into the identity backend.
//!
//! The pass is strictly phased: bind, resolve every group, snapshot the
//! backend, plan, apply. Any failure before apply aborts the run with
//! nothing written; failures during apply are collected per record.

pub mod identity;
pub mod reconcile;
pub mod resolve;

use tracing::info;

use crate::config::SyncConfig;
use crate::context::ServiceContext;
use crate::error::SyncError;
use reconcile::{ApplyReport, BackendSnapshot, SyncAction};
use resolve::{Resolution, SearchMemberResolver};

/// What a pass decided and, unless it was a dry run, what it applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Resolved directory state.
    pub resolution: Resolution,
    /// Planned backend writes.
    pub actions: Vec<SyncAction>,
    /// Apply results; `None` for dry runs.
    pub report: Option<ApplyReport>,
}

/// Runs one pass using the ports in `ctx`.
///
/// With `dry_run` the plan is computed (including the backend snapshot)
/// but no write is issued.
///
/// # Errors
///
/// Returns a [`SyncError`] for any setup-phase failure: bind, directory
/// searches, DN parsing, or the backend snapshot.
pub fn run(
    ctx: &ServiceContext,
    config: &SyncConfig,
    dry_run: bool,
) -> Result<SyncOutcome, SyncError> {
    let directory = &config.directory;
    ctx.directory
        .bind(&directory.bind_user, &directory.bind_password)?;

    let members = SearchMemberResolver::new(
        ctx.directory.as_ref(),
        &directory.base_dn,
        directory.member_strategy,
    );
    let resolution = resolve::resolve(
        ctx.directory.as_ref(),
        directory,
        &config.dest_realm,
        &members,
    )?;
    info!(
        groups = resolution.groups.len(),
        users = resolution.membership.len(),
        "Resolved directory membership"
    );

    let snapshot = BackendSnapshot::fetch(
        ctx.backend.as_ref(),
        &config.dest_realm,
        &config.realm_type,
    )?;
    let actions = reconcile::plan_sync(&resolution, &snapshot);

    if dry_run {
        return Ok(SyncOutcome {
            resolution,
            actions,
            report: None,
        });
    }

    let report = reconcile::execute_sync(ctx.backend.as_ref(), &actions);
    info!(
        applied = report.applied,
        failed = report.failures.len(),
        "Sync pass finished"
    );
    Ok(SyncOutcome {
        resolution,
        actions,
        report: Some(report),
    })
}
