//! Book permissions granted through named groups.

use agora_common::{AppError, AppResult, IdGenerator};
use agora_db::{
    entities::{permission_group, user, user_group},
    repositories::{PermissionGroupRepository, UserRepository},
};
use sea_orm::Set;
use serde::Serialize;

const DENIED: &str = "You do not have permission to perform this action.";

/// A single book permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    View,
    Create,
    Edit,
    Delete,
}

impl Permission {
    /// Codename as stored on groups.
    #[must_use]
    pub const fn codename(self) -> &'static str {
        match self {
            Self::View => "can_view",
            Self::Create => "can_create",
            Self::Edit => "can_edit",
            Self::Delete => "can_delete",
        }
    }
}

/// The permissions a user holds across all their groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PermissionSet {
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl PermissionSet {
    pub const ALL: Self = Self {
        can_view: true,
        can_create: true,
        can_edit: true,
        can_delete: true,
    };

    #[must_use]
    pub const fn allows(self, permission: Permission) -> bool {
        match permission {
            Permission::View => self.can_view,
            Permission::Create => self.can_create,
            Permission::Edit => self.can_edit,
            Permission::Delete => self.can_delete,
        }
    }

    #[must_use]
    pub const fn with_group(self, group: &permission_group::Model) -> Self {
        Self {
            can_view: self.can_view || group.can_view,
            can_create: self.can_create || group.can_create,
            can_edit: self.can_edit || group.can_edit,
            can_delete: self.can_delete || group.can_delete,
        }
    }
}

/// Groups created at startup when seeding is enabled.
pub const DEFAULT_GROUPS: &[(&str, PermissionSet)] = &[
    (
        "Viewers",
        PermissionSet {
            can_view: true,
            can_create: false,
            can_edit: false,
            can_delete: false,
        },
    ),
    (
        "Editors",
        PermissionSet {
            can_view: true,
            can_create: true,
            can_edit: true,
            can_delete: false,
        },
    ),
    ("Admins", PermissionSet::ALL),
];

/// Permission service for business logic.
#[derive(Clone)]
pub struct PermissionService {
    group_repo: PermissionGroupRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

impl PermissionService {
    /// Create a new permission service.
    #[must_use]
    pub const fn new(group_repo: PermissionGroupRepository, user_repo: UserRepository) -> Self {
        Self {
            group_repo,
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Everything `user` may do. Staff hold every permission.
    pub async fn effective(&self, user: &user::Model) -> AppResult<PermissionSet> {
        if user.is_staff {
            return Ok(PermissionSet::ALL);
        }

        Ok(self
            .group_repo
            .find_by_user(&user.id)
            .await?
            .iter()
            .fold(PermissionSet::default(), PermissionSet::with_group))
    }

    /// Check that a caller holds `permission`.
    ///
    /// Anonymous callers get `Unauthorized`, authenticated ones without the
    /// permission get `Forbidden`.
    pub async fn require<'a>(
        &self,
        caller: Option<&'a user::Model>,
        permission: Permission,
    ) -> AppResult<&'a user::Model> {
        let user = caller.ok_or(AppError::Unauthorized)?;

        if self.effective(user).await?.allows(permission) {
            Ok(user)
        } else {
            tracing::debug!(
                user_id = %user.id,
                permission = permission.codename(),
                "Permission denied"
            );
            Err(AppError::Forbidden(DENIED.to_string()))
        }
    }

    fn require_staff(actor: &user::Model) -> AppResult<()> {
        if actor.is_staff {
            Ok(())
        } else {
            Err(AppError::Forbidden(DENIED.to_string()))
        }
    }

    /// All groups. Staff only.
    pub async fn groups(&self, actor: &user::Model) -> AppResult<Vec<permission_group::Model>> {
        Self::require_staff(actor)?;
        self.group_repo.find_all().await
    }

    async fn group_by_name(&self, name: &str) -> AppResult<permission_group::Model> {
        self.group_repo
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group {name}")))
    }

    /// Put a user in a group. Staff only. Adding an existing member is a no-op.
    pub async fn add_member(
        &self,
        actor: &user::Model,
        group_name: &str,
        user_id: &str,
    ) -> AppResult<()> {
        Self::require_staff(actor)?;
        let group = self.group_by_name(group_name).await?;
        self.user_repo.get_by_id(user_id).await?;

        if self.group_repo.is_member(user_id, &group.id).await? {
            return Ok(());
        }

        self.group_repo
            .add_member(user_group::ActiveModel {
                id: Set(self.id_gen.generate()),
                user_id: Set(user_id.to_string()),
                group_id: Set(group.id.clone()),
                created_at: Set(chrono::Utc::now().into()),
            })
            .await?;

        tracing::info!(user_id = %user_id, group = %group.name, "User added to group");
        Ok(())
    }

    /// Take a user out of a group. Staff only.
    pub async fn remove_member(
        &self,
        actor: &user::Model,
        group_name: &str,
        user_id: &str,
    ) -> AppResult<()> {
        Self::require_staff(actor)?;
        let group = self.group_by_name(group_name).await?;

        if !self.group_repo.remove_member(user_id, &group.id).await? {
            return Err(AppError::NotFound(format!(
                "User {user_id} is not in group {group_name}"
            )));
        }
        Ok(())
    }

    /// Create the default groups that do not exist yet. Returns how many were created.
    pub async fn seed_default_groups(&self) -> AppResult<usize> {
        let mut created = 0;

        for (name, perms) in DEFAULT_GROUPS {
            if self.group_repo.find_by_name(name).await?.is_some() {
                continue;
            }

            self.group_repo
                .create(permission_group::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    name: Set((*name).to_string()),
                    can_view: Set(perms.can_view),
                    can_create: Set(perms.can_create),
                    can_edit: Set(perms.can_edit),
                    can_delete: Set(perms.can_delete),
                })
                .await?;
            created += 1;
        }

        Ok(created)
    }
}
