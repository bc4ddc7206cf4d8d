//! Declarative configuration for the admin user grid.
//!
//! The template iterates this config to render the header, the filter bar,
//! and the bulk-action buttons, so the grid layout lives in one place.

/// A column in the grid.
#[derive(Debug, Clone)]
pub struct TableColumn {
    /// Row field key, matching the template's row accessors.
    pub key: &'static str,
    /// Header label.
    pub label: &'static str,
}

impl TableColumn {
    #[must_use]
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

/// One option in the filter bar.
#[derive(Debug, Clone)]
pub struct FilterOption {
    /// Query-string value.
    pub value: &'static str,
    /// Display label.
    pub label: &'static str,
}

impl FilterOption {
    #[must_use]
    pub const fn new(value: &'static str, label: &'static str) -> Self {
        Self { value, label }
    }
}

/// A bulk-action button under the grid.
#[derive(Debug, Clone)]
pub struct BulkActionButton {
    /// Action name posted to the action endpoint.
    pub action: &'static str,
    /// Button label.
    pub label: &'static str,
    /// Whether the browser asks for confirmation first.
    pub confirm: bool,
}

impl BulkActionButton {
    #[must_use]
    pub const fn new(action: &'static str, label: &'static str) -> Self {
        Self {
            action,
            label,
            confirm: false,
        }
    }

    #[must_use]
    pub const fn with_confirm(mut self) -> Self {
        self.confirm = true;
        self
    }
}

/// Complete grid configuration.
#[derive(Debug, Clone)]
pub struct UserTableConfig {
    pub columns: Vec<TableColumn>,
    pub filters: Vec<FilterOption>,
    pub bulk_actions: Vec<BulkActionButton>,
}

/// The user grid, as rendered on the admin page.
///
/// The hard-delete button only exists while the config switch allows it;
/// it is not merely disabled.
#[must_use]
pub fn users_table_config(allow_hard_delete: bool) -> UserTableConfig {
    let columns = vec![
        TableColumn::new("user_id", "User ID"),
        TableColumn::new("user_name", "Name"),
        TableColumn::new("employee_no", "Employee #"),
        TableColumn::new("email", "Email"),
        TableColumn::new("role", "Role"),
        TableColumn::new("approved", "Approved"),
        TableColumn::new("suspended", "Suspended"),
        TableColumn::new("days_since_registration", "Days registered"),
        TableColumn::new("days_since_suspension", "Days suspended"),
    ];

    let filters = vec![
        FilterOption::new("all", "All"),
        FilterOption::new("pending", "Pending approval"),
        FilterOption::new("suspended", "Suspended"),
        FilterOption::new("developer", "Developers"),
    ];

    let mut bulk_actions = vec![
        BulkActionButton::new("approve", "Approve"),
        BulkActionButton::new("revoke_approval", "Revoke approval"),
        BulkActionButton::new("suspend", "Suspend").with_confirm(),
        BulkActionButton::new("unsuspend", "Unsuspend"),
        BulkActionButton::new("reset_password", "Reset password").with_confirm(),
    ];
    if allow_hard_delete {
        bulk_actions.push(BulkActionButton::new("hard_delete", "Delete permanently").with_confirm());
    }

    UserTableConfig {
        columns,
        filters,
        bulk_actions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_delete_button_is_hidden_when_disallowed() {
        let config = users_table_config(false);
        assert!(!config.bulk_actions.iter().any(|a| a.action == "hard_delete"));

        let config = users_table_config(true);
        let delete = config
            .bulk_actions
            .iter()
            .find(|a| a.action == "hard_delete");
        assert!(delete.is_some_and(|a| a.confirm));
    }

    #[test]
    fn test_grid_has_expected_columns() {
        let config = users_table_config(true);
        let keys: Vec<&str> = config.columns.iter().map(|c| c.key).collect();
        assert!(keys.contains(&"role"));
        assert!(keys.contains(&"days_since_registration"));
    }
}
