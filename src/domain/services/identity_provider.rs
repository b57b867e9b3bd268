// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// 身份识别错误
#[derive(Error, Debug)]
pub enum IdentityError {
    /// 凭证缺失、未知或已吊销
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// 身份存储不可用
    #[error("Identity backend error: {0}")]
    Backend(String),
}

/// 身份提供者
///
/// 服务只消费身份：把请求携带的凭证解析为所有者ID，
/// 不负责签发或管理凭证。
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<Uuid, IdentityError>;
}
