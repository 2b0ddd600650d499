use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::progress::{SharedProgress, UpdateStatus};
use super::systemd::{UnitManager, UnitState};

/// 状态轮询的最终结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// 更新服务执行完毕并正常退出
    Success,
    /// 更新服务进入 failed 状态
    Failure,
    /// 查询失败, 更新的真实结果未知
    Aborted,
    /// 被调用方主动取消
    Cancelled,
}

/// 更新完成观察者
///
/// 在后台任务里按固定间隔查询更新服务的生命周期状态,
/// 直到得出终态或被取消; 句柄交还给调用方管理
pub struct CompletionWatcher {
    unit_manager: Arc<dyn UnitManager>,
    interval: Duration,
}

impl CompletionWatcher {
    pub fn new(unit_manager: Arc<dyn UnitManager>, interval: Duration) -> Self {
        Self {
            unit_manager,
            interval,
        }
    }

    pub fn spawn(
        self,
        unit_name: String,
        progress: SharedProgress,
        cancel: CancellationToken,
    ) -> JoinHandle<WatchOutcome> {
        tokio::spawn(async move { self.watch(unit_name, progress, cancel).await })
    }

    async fn watch(
        self,
        unit_name: String,
        progress: SharedProgress,
        cancel: CancellationToken,
    ) -> WatchOutcome {
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("状态轮询已取消: {}", unit_name);
                    return WatchOutcome::Cancelled;
                }
                _ = ticker.tick() => {
                    // 已经发出的查询会执行完, 取消只在下一轮生效
                    let state = match self.unit_manager.query_unit_state(&unit_name).await {
                        Ok(state) => state,
                        Err(e) => {
                            // 查询失败不代表更新失败, 进度保持原状让操作者能区分
                            error!("查询更新服务状态失败: {}, unit: {}", e, unit_name);
                            return WatchOutcome::Aborted;
                        }
                    };

                    match state {
                        UnitState::Inactive => {
                            progress.set_status(UpdateStatus::Completed).await;
                            info!("✅ 固件更新完成: {}", unit_name);
                            return WatchOutcome::Success;
                        }
                        UnitState::Failed => {
                            progress
                                .record_activation_error(format!("更新服务 {} 执行失败", unit_name))
                                .await;
                            progress.set_status(UpdateStatus::Completed).await;
                            warn!("❌ 更新服务执行失败: {}", unit_name);
                            return WatchOutcome::Failure;
                        }
                        // active / activating / unknown 都说明还没结束, 继续轮询
                        _ => {}
                    }
                }
            }
        }
    }
}
