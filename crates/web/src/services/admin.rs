//! Admin table controller.
//!
//! The user snapshot is fetched once per page view; filtering happens
//! client-side over that snapshot. Bulk actions dispatch one independent
//! backend call per selected row and report every row's outcome
//! individually; a failure never rolls back earlier rows.

use chrono::{DateTime, Utc};
use tracing::instrument;

use carebot_core::{EffectiveRole, UserIdx};

use crate::backend::{BackendClient, RowOutcome, UserRecord};
use crate::error::AppError;

/// One derived row of the admin grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRow {
    pub idx: UserIdx,
    pub user_id: String,
    pub user_name: String,
    pub employee_no: String,
    pub email: String,
    pub role: EffectiveRole,
    pub approved: bool,
    pub suspended: bool,
    pub days_since_registration: i64,
    pub days_since_suspension: Option<i64>,
}

impl AdminRow {
    /// Derive the display row from a snapshot record.
    #[must_use]
    pub fn derive(record: &UserRecord, now: DateTime<Utc>) -> Self {
        Self {
            idx: record.idx,
            user_id: record.user_id.clone(),
            user_name: record.user_name.clone(),
            employee_no: record.employee_no.clone(),
            email: record.email.clone(),
            role: EffectiveRole::from_flags(record.developer, record.admin),
            approved: record.approved,
            suspended: record.is_suspended(),
            days_since_registration: (now - record.registered_at).num_days(),
            days_since_suspension: record.suspended_at.map(|at| (now - at).num_days()),
        }
    }

    /// Whether this row belongs to an admin account.
    ///
    /// Admin rows are never modified by bulk actions.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, EffectiveRole::Admin)
    }
}

/// Snapshot filters, applied client-side.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UserFilter {
    /// Every row.
    #[default]
    All,
    /// Rows awaiting signup approval.
    PendingApproval,
    /// Suspended rows.
    Suspended,
    /// Developer accounts.
    Developer,
    /// A single row by exact login identifier.
    ByUserId(String),
}

impl UserFilter {
    /// Whether `row` passes this filter.
    #[must_use]
    pub fn matches(&self, row: &AdminRow) -> bool {
        match self {
            Self::All => true,
            Self::PendingApproval => !row.approved,
            Self::Suspended => row.suspended,
            Self::Developer => matches!(row.role, EffectiveRole::Developer),
            Self::ByUserId(user_id) => row.user_id == *user_id,
        }
    }

    /// Apply the filter to a snapshot.
    #[must_use]
    pub fn apply<'a>(&self, rows: &'a [AdminRow]) -> Vec<&'a AdminRow> {
        rows.iter().filter(|row| self.matches(row)).collect()
    }
}

/// Bulk actions available on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Approve,
    RevokeApproval,
    Suspend,
    Unsuspend,
    HardDelete,
    ResetPassword,
}

impl std::str::FromStr for AdminAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Self::Approve),
            "revoke_approval" => Ok(Self::RevokeApproval),
            "suspend" => Ok(Self::Suspend),
            "unsuspend" => Ok(Self::Unsuspend),
            "hard_delete" => Ok(Self::HardDelete),
            "reset_password" => Ok(Self::ResetPassword),
            _ => Err(format!("invalid admin action: {s}")),
        }
    }
}

/// Outcome of one row's action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The state change was applied.
    Done,
    /// The row was already in the target state.
    NoWork,
    /// Guarded or refused: the action is not allowed for this row.
    OverWork,
    /// The backend call for this row failed.
    Failed(String),
}

impl From<RowOutcome> for ActionOutcome {
    fn from(outcome: RowOutcome) -> Self {
        match outcome {
            RowOutcome::Done => Self::Done,
            RowOutcome::NoWork => Self::NoWork,
            RowOutcome::OverWork => Self::OverWork,
        }
    }
}

impl std::fmt::Display for ActionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::NoWork => write!(f, "no change"),
            Self::OverWork => write!(f, "not allowed"),
            Self::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}

/// One row's report in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowReport {
    pub idx: UserIdx,
    pub user_id: String,
    pub outcome: ActionOutcome,
}

/// Per-row outcomes of a bulk action.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub rows: Vec<RowReport>,
}

impl BatchReport {
    /// Count of rows whose state actually changed.
    #[must_use]
    pub fn done_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.outcome == ActionOutcome::Done)
            .count()
    }

    /// Whether nothing was selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Admin grid controller.
pub struct AdminTable<'a> {
    backend: &'a BackendClient,
    allow_hard_delete: bool,
}

impl<'a> AdminTable<'a> {
    #[must_use]
    pub const fn new(backend: &'a BackendClient, allow_hard_delete: bool) -> Self {
        Self {
            backend,
            allow_hard_delete,
        }
    }

    /// Whether the hard-delete control should be offered at all.
    #[must_use]
    pub const fn hard_delete_enabled(&self) -> bool {
        self.allow_hard_delete
    }

    /// Fetch the snapshot and derive display rows.
    ///
    /// # Errors
    ///
    /// Returns a backend error; a snapshot row missing an expected column
    /// fails the whole fetch.
    #[instrument(skip(self))]
    pub async fn snapshot(&self) -> Result<Vec<AdminRow>, AppError> {
        let records = self.backend.list_users().await?;
        let now = Utc::now();
        Ok(records.iter().map(|r| AdminRow::derive(r, now)).collect())
    }

    /// Apply `action` to every selected row, one backend call per row.
    ///
    /// An empty selection yields an empty report (the page shows a notice).
    /// Guarded rows (admin accounts; unsuspended rows for hard delete) are
    /// reported as [`ActionOutcome::OverWork`] without a backend call.
    ///
    /// # Errors
    ///
    /// - [`AppError::PermissionDenied`] for a hard delete while the config
    ///   switch is off
    /// - [`AppError::Validation`] for a password reset without exactly one
    ///   selected row or without a new password
    ///
    /// Per-row backend failures are reported in the batch, never returned.
    #[instrument(skip(self, rows, new_password), fields(?action, selected = selection.len()))]
    pub async fn apply(
        &self,
        action: AdminAction,
        selection: &[UserIdx],
        rows: &[AdminRow],
        new_password: Option<&str>,
    ) -> Result<BatchReport, AppError> {
        if selection.is_empty() {
            return Ok(BatchReport::default());
        }

        if action == AdminAction::HardDelete && !self.allow_hard_delete {
            return Err(AppError::PermissionDenied);
        }

        if action == AdminAction::ResetPassword {
            if selection.len() != 1 {
                return Err(AppError::Validation(
                    "password reset applies to exactly one row".to_owned(),
                ));
            }
            if new_password.is_none_or(str::is_empty) {
                return Err(AppError::Validation("a new password is required".to_owned()));
            }
        }

        let mut report = BatchReport::default();
        for &idx in selection {
            let Some(row) = rows.iter().find(|r| r.idx == idx) else {
                report.rows.push(RowReport {
                    idx,
                    user_id: String::new(),
                    outcome: ActionOutcome::Failed("row not in snapshot".to_owned()),
                });
                continue;
            };

            let outcome = match Self::guard(action, row) {
                Some(guarded) => guarded,
                None => self.dispatch(action, idx, new_password).await,
            };

            report.rows.push(RowReport {
                idx,
                user_id: row.user_id.clone(),
                outcome,
            });
        }

        Ok(report)
    }

    /// Local guards evaluated before any backend call.
    fn guard(action: AdminAction, row: &AdminRow) -> Option<ActionOutcome> {
        if row.is_admin() {
            return Some(ActionOutcome::OverWork);
        }
        // hard delete only applies to rows that are already suspended
        if action == AdminAction::HardDelete && !row.suspended {
            return Some(ActionOutcome::OverWork);
        }
        None
    }

    async fn dispatch(
        &self,
        action: AdminAction,
        idx: UserIdx,
        new_password: Option<&str>,
    ) -> ActionOutcome {
        let result = match action {
            AdminAction::Approve => self.backend.set_approval(idx, true).await,
            AdminAction::RevokeApproval => self.backend.set_approval(idx, false).await,
            AdminAction::Suspend => self.backend.set_suspension(idx, true).await,
            AdminAction::Unsuspend => self.backend.set_suspension(idx, false).await,
            AdminAction::HardDelete => self.backend.delete_user(idx).await,
            AdminAction::ResetPassword => {
                self.backend
                    .reset_password(idx, new_password.unwrap_or_default())
                    .await
            }
        };

        match result {
            Ok(outcome) => outcome.into(),
            Err(e) => {
                tracing::error!(error = %e, idx = %idx, "Row action failed");
                ActionOutcome::Failed("backend call failed".to_owned())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::config::BackendConfig;

    fn record(idx: i32) -> UserRecord {
        UserRecord {
            idx: UserIdx::new(idx),
            user_id: format!("user{idx:02}"),
            user_name: format!("User {idx}"),
            employee_no: format!("E10{idx:02}"),
            email: format!("user{idx}@example.com"),
            developer: false,
            admin: false,
            approved: true,
            registered_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            suspended_at: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 11, 12, 0, 0).unwrap()
    }

    fn test_backend() -> BackendClient {
        let config = BackendConfig {
            auth_url: url::Url::parse("http://127.0.0.1:1").unwrap(),
            chat_url: url::Url::parse("http://127.0.0.1:1").unwrap(),
            api_version: "v0".to_owned(),
        };
        BackendClient::new(&config).unwrap()
    }

    #[test]
    fn test_derive_elapsed_days() {
        let row = AdminRow::derive(&record(1), now());
        assert_eq!(row.days_since_registration, 10);
        assert_eq!(row.days_since_suspension, None);
        assert!(!row.suspended);
    }

    #[test]
    fn test_derive_suspension() {
        let mut rec = record(2);
        rec.suspended_at = Some(Utc.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap());
        let row = AdminRow::derive(&rec, now());
        assert!(row.suspended);
        assert_eq!(row.days_since_suspension, Some(2));
    }

    #[test]
    fn test_derive_role_label() {
        let mut rec = record(3);
        rec.developer = true;
        rec.admin = true;
        let row = AdminRow::derive(&rec, now());
        assert_eq!(row.role, EffectiveRole::Admin);
        assert!(row.is_admin());
    }

    #[test]
    fn test_filters() {
        let mut pending = record(1);
        pending.approved = false;
        let mut suspended = record(2);
        suspended.suspended_at = Some(now());
        let mut dev = record(3);
        dev.developer = true;
        let plain = record(4);

        let rows: Vec<AdminRow> = [pending, suspended, dev, plain]
            .iter()
            .map(|r| AdminRow::derive(r, now()))
            .collect();

        assert_eq!(UserFilter::All.apply(&rows).len(), 4);
        assert_eq!(UserFilter::PendingApproval.apply(&rows).len(), 1);
        assert_eq!(UserFilter::Suspended.apply(&rows).len(), 1);
        assert_eq!(UserFilter::Developer.apply(&rows).len(), 1);

        let by_id = UserFilter::ByUserId("user04".to_owned()).apply(&rows);
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id.first().unwrap().user_id, "user04");

        assert!(UserFilter::ByUserId("user0".to_owned()).apply(&rows).is_empty());
    }

    #[tokio::test]
    async fn test_empty_selection_is_a_no_op() {
        let backend = test_backend();
        let table = AdminTable::new(&backend, true);
        let rows: Vec<AdminRow> = vec![AdminRow::derive(&record(1), now())];

        let report = table
            .apply(AdminAction::Suspend, &[], &rows, None)
            .await
            .unwrap();
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_hard_delete_gated_by_config() {
        let backend = test_backend();
        let table = AdminTable::new(&backend, false);
        let rows: Vec<AdminRow> = vec![AdminRow::derive(&record(1), now())];

        let err = table
            .apply(AdminAction::HardDelete, &[UserIdx::new(1)], &rows, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_admin_rows_are_guarded() {
        let backend = test_backend();
        let table = AdminTable::new(&backend, true);

        let mut rec = record(1);
        rec.admin = true;
        let rows = vec![AdminRow::derive(&rec, now())];

        // guarded locally, so no backend call happens despite the dead address
        let report = table
            .apply(AdminAction::Suspend, &[UserIdx::new(1)], &rows, None)
            .await
            .unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(
            report.rows.first().unwrap().outcome,
            ActionOutcome::OverWork
        );
        assert_eq!(report.done_count(), 0);
    }

    #[tokio::test]
    async fn test_hard_delete_requires_suspended_row() {
        let backend = test_backend();
        let table = AdminTable::new(&backend, true);
        let rows = vec![AdminRow::derive(&record(1), now())];

        let report = table
            .apply(AdminAction::HardDelete, &[UserIdx::new(1)], &rows, None)
            .await
            .unwrap();
        assert_eq!(
            report.rows.first().unwrap().outcome,
            ActionOutcome::OverWork
        );
    }

    #[tokio::test]
    async fn test_reset_password_requires_single_row() {
        let backend = test_backend();
        let table = AdminTable::new(&backend, true);
        let rows: Vec<AdminRow> = (1..=2).map(|i| AdminRow::derive(&record(i), now())).collect();

        let err = table
            .apply(
                AdminAction::ResetPassword,
                &[UserIdx::new(1), UserIdx::new(2)],
                &rows,
                Some("replacement-pass-1"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = table
            .apply(AdminAction::ResetPassword, &[UserIdx::new(1)], &rows, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_action_from_str() {
        assert_eq!(
            "hard_delete".parse::<AdminAction>().unwrap(),
            AdminAction::HardDelete
        );
        assert!("drop_table".parse::<AdminAction>().is_err());
    }
}
