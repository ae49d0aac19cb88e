//! Permission group repository.

use std::sync::Arc;

use crate::entities::{PermissionGroup, UserGroup, permission_group, user_group};
use agora_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, RelationTrait, JoinType,
};

/// Permission group repository for database operations.
#[derive(Clone)]
pub struct PermissionGroupRepository {
    db: Arc<DatabaseConnection>,
}

impl PermissionGroupRepository {
    /// Create a new permission group repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a group by name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<permission_group::Model>> {
        PermissionGroup::find()
            .filter(permission_group::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All groups, by name.
    pub async fn find_all(&self) -> AppResult<Vec<permission_group::Model>> {
        PermissionGroup::find()
            .order_by_asc(permission_group::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a group.
    pub async fn create(
        &self,
        model: permission_group::ActiveModel,
    ) -> AppResult<permission_group::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Groups a user belongs to.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Vec<permission_group::Model>> {
        PermissionGroup::find()
            .join(JoinType::InnerJoin, permission_group::Relation::Members.def())
            .filter(user_group::Column::UserId.eq(user_id))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether a user belongs to a group.
    pub async fn is_member(&self, user_id: &str, group_id: &str) -> AppResult<bool> {
        let membership = UserGroup::find()
            .filter(user_group::Column::UserId.eq(user_id))
            .filter(user_group::Column::GroupId.eq(group_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(membership.is_some())
    }

    /// Add a membership row.
    pub async fn add_member(&self, model: user_group::ActiveModel) -> AppResult<()> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Remove a user from a group. Returns whether a row was removed.
    pub async fn remove_member(&self, user_id: &str, group_id: &str) -> AppResult<bool> {
        let result = UserGroup::delete_many()
            .filter(user_group::Column::UserId.eq(user_id))
            .filter(user_group::Column::GroupId.eq(group_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_group(name: &str, can_delete: bool) -> permission_group::Model {
        permission_group::Model {
            id: format!("g_{name}"),
            name: name.to_string(),
            can_view: true,
            can_create: true,
            can_edit: true,
            can_delete,
        }
    }

    #[tokio::test]
    async fn test_find_by_user() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_group("Editors", false)]])
                .into_connection(),
        );

        let repo = PermissionGroupRepository::new(db);
        let groups = repo.find_by_user("user1").await.unwrap();

        assert_eq!(groups.len(), 1);
        assert!(!groups[0].can_delete);
    }

    #[tokio::test]
    async fn test_is_member_false() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user_group::Model>::new()])
                .into_connection(),
        );

        let repo = PermissionGroupRepository::new(db);
        assert!(!repo.is_member("user1", "g1").await.unwrap());
    }
}
