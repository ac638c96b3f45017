//! # Permissions
//!
//! Role-based access rules. Handlers ask `role.can(permission)` and never
//! compare roles directly.
//!
//! ```text
//! ┌──────────────────────────┬───────┬─────────┬──────────┐
//! │ Permission               │ Admin │ Manager │ Retailer │
//! ├──────────────────────────┼───────┼─────────┼──────────┤
//! │ ViewProducts             │   ✓   │    ✓    │    ✓     │
//! │ ManageProducts           │   ✓   │    ✓    │          │
//! │ RecordSales              │   ✓   │    ✓    │    ✓     │
//! │ RecordSalesForOthers     │   ✓   │    ✓    │          │
//! │ ViewAllSales             │   ✓   │    ✓    │          │
//! │ ViewReports              │   ✓   │    ✓    │          │
//! │ ManageUsers              │   ✓   │         │          │
//! └──────────────────────────┴───────┴─────────┴──────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Role;

/// An action guarded by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewProducts,
    /// Create, update, delete and adjust stock of products.
    ManageProducts,
    RecordSales,
    /// Credit a sale to a retailer other than the caller.
    RecordSalesForOthers,
    /// See sales of every retailer, not only one's own.
    ViewAllSales,
    ViewReports,
    /// User CRUD and the user accounts report.
    ManageUsers,
}

impl Permission {
    pub const ALL: [Permission; 7] = [
        Permission::ViewProducts,
        Permission::ManageProducts,
        Permission::RecordSales,
        Permission::RecordSalesForOthers,
        Permission::ViewAllSales,
        Permission::ViewReports,
        Permission::ManageUsers,
    ];
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::ViewProducts => "view_products",
            Permission::ManageProducts => "manage_products",
            Permission::RecordSales => "record_sales",
            Permission::RecordSalesForOthers => "record_sales_for_others",
            Permission::ViewAllSales => "view_all_sales",
            Permission::ViewReports => "view_reports",
            Permission::ManageUsers => "manage_users",
        };
        f.write_str(name)
    }
}

impl Role {
    /// Whether this role is granted `permission`.
    pub const fn can(&self, permission: Permission) -> bool {
        match self {
            Role::Admin => true,
            Role::Manager => !matches!(permission, Permission::ManageUsers),
            Role::Retailer => matches!(
                permission,
                Permission::ViewProducts | Permission::RecordSales
            ),
        }
    }

    /// Every permission this role holds.
    pub fn permissions(&self) -> Vec<Permission> {
        Permission::ALL
            .into_iter()
            .filter(|p| self.can(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_has_everything() {
        assert_eq!(Role::Admin.permissions().len(), Permission::ALL.len());
    }

    #[test]
    fn test_manager_cannot_manage_users() {
        assert!(Role::Manager.can(Permission::ManageProducts));
        assert!(Role::Manager.can(Permission::ViewReports));
        assert!(Role::Manager.can(Permission::RecordSalesForOthers));
        assert!(!Role::Manager.can(Permission::ManageUsers));
    }

    #[test]
    fn test_retailer_is_limited_to_pos() {
        assert_eq!(
            Role::Retailer.permissions(),
            vec![Permission::ViewProducts, Permission::RecordSales]
        );
        assert!(!Role::Retailer.can(Permission::ViewAllSales));
        assert!(!Role::Retailer.can(Permission::ManageUsers));
    }
}
