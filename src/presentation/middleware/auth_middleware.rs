// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::services::identity_provider::{IdentityError, IdentityProvider};
use crate::presentation::extractors::owner_id::OwnerId;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// 认证状态
#[derive(Clone)]
pub struct AuthState {
    /// 凭证解析器
    pub identity: Arc<dyn IdentityProvider>,
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": "Unauthorized" })),
    )
        .into_response()
}

/// 从 `Authorization: Bearer <key>` 中取出凭证
fn bearer_token(req: &Request) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// 认证中间件
///
/// 验证请求中的API密钥，并把解析出的所有者写入请求扩展。
///
/// # 返回值
///
/// * 凭证缺失或无效时返回 401
/// * 身份存储不可用时返回 500
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Response {
    debug!("AuthMiddleware processing path: {}", req.uri().path());

    let Some(token) = bearer_token(&req) else {
        return unauthorized();
    };

    match state.identity.resolve(&token).await {
        Ok(owner_id) => {
            req.extensions_mut().insert(OwnerId(owner_id));
            next.run(req).await
        }
        Err(IdentityError::InvalidCredentials) => {
            warn!("Rejected request with unknown API key");
            unauthorized()
        }
        Err(IdentityError::Backend(e)) => {
            error!("Identity backend error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}
