use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    AccessCatalog,
    EditCatalog,
    ManageUsers,
}

impl Permission {
    pub fn as_int(self) -> i32 {
        match self {
            Permission::AccessCatalog => 1,
            Permission::EditCatalog => 2,
            Permission::ManageUsers => 3,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            1 => Some(Permission::AccessCatalog),
            2 => Some(Permission::EditCatalog),
            3 => Some(Permission::ManageUsers),
            _ => None,
        }
    }
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::AccessCatalog,
    Permission::EditCatalog,
    Permission::ManageUsers,
];
const EDITOR_PERMISSIONS: &[Permission] = &[Permission::AccessCatalog, Permission::EditCatalog];
const REGULAR_PERMISSIONS: &[Permission] = &[Permission::AccessCatalog];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Editor,
    Regular,
}

impl UserRole {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Admin => ADMIN_PERMISSIONS,
            UserRole::Editor => EDITOR_PERMISSIONS,
            UserRole::Regular => REGULAR_PERMISSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Editor => "Editor",
            UserRole::Regular => "Regular",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "editor" => Some(UserRole::Editor),
            "regular" => Some(UserRole::Regular),
            _ => None,
        }
    }
}

/// Union of the permissions granted by `roles`, without duplicates.
pub fn permissions_of(roles: &[UserRole]) -> Vec<Permission> {
    let mut permissions: Vec<Permission> = Vec::new();
    for permission in roles.iter().flat_map(|role| role.permissions()) {
        if !permissions.contains(permission) {
            permissions.push(*permission);
        }
    }
    permissions.sort_by_key(|p| p.as_int());
    permissions
}
