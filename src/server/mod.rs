use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::updater::progress::{SharedProgress, UpdateProgress};
use crate::updater::{FirmwareUpdater, UpdateConfig};

#[derive(Clone)]
struct AppState {
    updater: Arc<FirmwareUpdater>,
    progress: SharedProgress,
    cancel: CancellationToken,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub url: String,
    pub md5: String,
}

/// 启动 HTTP 服务, 通过接口触发更新并暴露进度查询
pub async fn run(listen: &str, config: UpdateConfig) -> anyhow::Result<()> {
    let state = AppState {
        updater: Arc::new(FirmwareUpdater::new(config)),
        progress: SharedProgress::new(),
        cancel: CancellationToken::new(),
    };

    let app = Router::new()
        .route("/api/update", post(start_update))
        .route("/api/update/progress", get(get_progress))
        .layer(CorsLayer::permissive())
        .with_state(state);

    info!("🚀 固件更新服务已启动: {}", listen);
    let listener = tokio::net::TcpListener::bind(listen).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn start_update(
    State(state): State<AppState>,
    Json(req): Json<UpdateRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    if url::Url::parse(&req.url).is_err() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "无效的固件下载链接" })),
        );
    }

    // 更新流程作为后台任务执行, 请求方通过进度接口跟踪结果
    let updater = Arc::clone(&state.updater);
    let progress = state.progress.clone();
    let cancel = state.cancel.child_token();
    tokio::spawn(async move {
        if let Err(e) = updater.run(&req.url, &req.md5, progress, cancel).await {
            error!("固件更新任务失败: {}", e);
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(json!({ "success": true, "message": "更新任务已启动" })),
    )
}

async fn get_progress(State(state): State<AppState>) -> Json<UpdateProgress> {
    Json(state.progress.snapshot().await)
}
