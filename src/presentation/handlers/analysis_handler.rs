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

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    application::{
        dto::{
            analysis_response::{
                AnalysisHistoryDto, AnalysisResultDto, AnalysisStatusDto, AnalysisSummaryDto,
                AnalyzeResponseDto, PaginationDto, ProgressEventDto,
            },
            analyze_request::AnalyzeRequestDto,
            history_query::{EventsQueryDto, HistoryQueryDto},
        },
        use_cases::analysis_use_case::{AnalysisError, AnalysisUseCase},
    },
    domain::repositories::analysis_repository::AnalysisRepository,
    presentation::{errors::AppError, extractors::owner_id::OwnerId},
    queue::job_queue::JobQueue,
};

/// 路径中的分析ID；无法解析时按不存在处理
fn parse_analysis_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::from(AnalysisError::NotFound))
}

/// 提交分析请求
pub async fn analyze<R, Q>(
    Extension(use_case): Extension<Arc<AnalysisUseCase<R, Q>>>,
    OwnerId(owner_id): OwnerId,
    payload: Result<Json<AnalyzeRequestDto>, JsonRejection>,
) -> Result<impl IntoResponse, AppError>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    let Json(payload) = payload.map_err(|e| AppError::invalid_body(e.body_text()))?;
    let record = use_case.submit(owner_id, payload).await?;
    Ok(Json(AnalyzeResponseDto::queued(record.id)))
}

/// 查询分析状态
pub async fn get_status<R, Q>(
    Extension(use_case): Extension<Arc<AnalysisUseCase<R, Q>>>,
    OwnerId(owner_id): OwnerId,
    Path(analysis_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    let analysis_id = parse_analysis_id(&analysis_id)?;
    let record = use_case.get_status(analysis_id, owner_id).await?;
    Ok(Json(json!({
        "success": true,
        "analysis": AnalysisStatusDto::from(&record),
    })))
}

/// 获取已完成分析的完整结果
pub async fn get_result<R, Q>(
    Extension(use_case): Extension<Arc<AnalysisUseCase<R, Q>>>,
    OwnerId(owner_id): OwnerId,
    Path(analysis_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    let analysis_id = parse_analysis_id(&analysis_id)?;
    let record = use_case.get_result(analysis_id, owner_id).await?;
    Ok(Json(json!({
        "success": true,
        "analysis": AnalysisResultDto::from(record),
    })))
}

/// 分页列出当前用户的分析历史
pub async fn list_history<R, Q>(
    Extension(use_case): Extension<Arc<AnalysisUseCase<R, Q>>>,
    OwnerId(owner_id): OwnerId,
    query: Result<Query<HistoryQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, AppError>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    let Query(query) = query.map_err(|e| AppError::invalid_body(e.body_text()))?;
    let (page, limit) = query.normalized();
    let (order_by, direction) = query.ordering();
    let (records, total) = use_case
        .list_history(owner_id, page, limit, order_by, direction)
        .await?;

    let history = AnalysisHistoryDto {
        analyses: records.into_iter().map(AnalysisSummaryDto::from).collect(),
        pagination: PaginationDto::new(page, limit, total),
    };
    Ok(Json(json!({
        "success": true,
        "analyses": history.analyses,
        "pagination": history.pagination,
    })))
}

/// 删除分析记录
pub async fn delete_analysis<R, Q>(
    Extension(use_case): Extension<Arc<AnalysisUseCase<R, Q>>>,
    OwnerId(owner_id): OwnerId,
    Path(analysis_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    let analysis_id = parse_analysis_id(&analysis_id)?;
    if !use_case.delete(analysis_id, owner_id).await? {
        return Err(AnalysisError::NotFound.into());
    }
    Ok(Json(json!({
        "success": true,
        "message": "Analysis deleted successfully",
    })))
}

/// 回放进度事件
pub async fn list_events<R, Q>(
    Extension(use_case): Extension<Arc<AnalysisUseCase<R, Q>>>,
    OwnerId(owner_id): OwnerId,
    Path(analysis_id): Path<String>,
    query: Result<Query<EventsQueryDto>, QueryRejection>,
) -> Result<impl IntoResponse, AppError>
where
    R: AnalysisRepository + 'static,
    Q: JobQueue + 'static,
{
    let analysis_id = parse_analysis_id(&analysis_id)?;
    let Query(query) = query.map_err(|e| AppError::invalid_body(e.body_text()))?;
    let events = use_case
        .list_events(analysis_id, owner_id, query.after)
        .await?;
    let events: Vec<ProgressEventDto> = events.into_iter().map(ProgressEventDto::from).collect();
    Ok(Json(json!({ "success": true, "events": events })))
}
