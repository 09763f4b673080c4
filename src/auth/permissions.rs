use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Create or alter admin and sub-admin accounts.
    ManageStaff,
    /// Create or alter trainer and student accounts.
    ManageUsers,
    ManageDomains,
    /// Act on any course regardless of its trainer.
    ManageAllCourses,
    AuthorCourses,
    ManageClasses,
    ManageEnrollments,
    ReviewSubmissions,
    ViewAnalytics,
    TakeCourses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    SubAdmin,
    Trainer,
    Student,
}

impl UserRole {
    pub fn has_permission(&self, permission: Permission) -> bool {
        use Permission::*;

        match self {
            Self::Admin => !matches!(permission, TakeCourses),
            Self::SubAdmin => !matches!(permission, TakeCourses | ManageStaff),
            Self::Trainer => matches!(
                permission,
                AuthorCourses | ManageClasses | ManageEnrollments | ReviewSubmissions
            ),
            Self::Student => matches!(permission, TakeCourses),
        }
    }

    /// Admin and sub-admin accounts can only be touched by holders of
    /// [`Permission::ManageStaff`].
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Admin | Self::SubAdmin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::SubAdmin => "sub_admin",
            Self::Trainer => "trainer",
            Self::Student => "student",
        }
    }

    /// Accepts both the stored form (`sub_admin`) and the upper-case form
    /// (`SUB_ADMIN`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "admin" => Some(Self::Admin),
            "sub_admin" | "subadmin" => Some(Self::SubAdmin),
            "trainer" => Some(Self::Trainer),
            "student" => Some(Self::Student),
            _ => None,
        }
    }
}

impl From<&str> for UserRole {
    fn from(value: &str) -> Self {
        Self::parse(value).unwrap_or(Self::Student)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
