// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::services::identity_provider::{IdentityError, IdentityProvider};
use crate::infrastructure::database::entities::api_key;
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// 基于 `api_keys` 表的身份提供者
#[derive(Clone)]
pub struct DatabaseIdentityProvider {
    db: Arc<DatabaseConnection>,
}

impl DatabaseIdentityProvider {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IdentityProvider for DatabaseIdentityProvider {
    async fn resolve(&self, credential: &str) -> Result<Uuid, IdentityError> {
        let key = api_key::Entity::find()
            .filter(api_key::Column::Key.eq(credential))
            .one(self.db.as_ref())
            .await
            .map_err(|e| IdentityError::Backend(e.to_string()))?;

        match key {
            Some(key) if key.revoked_at.is_none() => Ok(key.owner_id),
            Some(key) => {
                warn!("Rejected revoked API key {}", key.id);
                Err(IdentityError::InvalidCredentials)
            }
            None => Err(IdentityError::InvalidCredentials),
        }
    }
}
