use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub mod download;
pub mod error;
pub mod extract;
pub mod progress;
pub mod systemd;
pub mod verify;
pub mod watcher;

use download::ArchiveDownloader;
use error::UpdateError;
use extract::ArchiveInstaller;
use progress::{SharedProgress, UpdateStatus};
use systemd::{SystemdManager, UnitManager};
use verify::Md5Verifier;
use watcher::{CompletionWatcher, WatchOutcome};

/// 更新流程的配置, 路径和单元名都由外部传入
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// 固件包的落盘路径
    pub archive_path: PathBuf,
    /// 固件解压安装目录
    pub install_dir: PathBuf,
    /// 负责应用更新的服务单元
    pub unit_name: String,
    /// 提交启动请求后的静置时间, 避开服务管理器自身的状态切换
    pub settle_delay: Duration,
    /// 状态轮询间隔
    pub poll_interval: Duration,
    /// 是否显示下载进度条
    pub show_progress: bool,
}

/// 固件更新编排器
///
/// 下载 -> 校验 -> 解压 -> 激活依次执行, 每一步把进展写进共享进度报告;
/// 激活成功后启动后台观察者并把任务句柄交还调用方
pub struct FirmwareUpdater {
    downloader: ArchiveDownloader,
    verifier: Md5Verifier,
    installer: ArchiveInstaller,
    unit_manager: Arc<dyn UnitManager>,
    config: UpdateConfig,
}

impl FirmwareUpdater {
    pub fn new(config: UpdateConfig) -> Self {
        Self::with_unit_manager(config, Arc::new(SystemdManager))
    }

    /// 注入自定义的服务管理器实现
    pub fn with_unit_manager(config: UpdateConfig, unit_manager: Arc<dyn UnitManager>) -> Self {
        Self {
            downloader: ArchiveDownloader::new(config.show_progress),
            verifier: Md5Verifier,
            installer: ArchiveInstaller,
            unit_manager,
            config,
        }
    }

    /// 执行一次完整的固件更新
    ///
    /// 失败的步骤会记入进度报告对应的错误字段并终止流程,
    /// 错误同时返回给关心结果的调用方; 各步骤都不自动重试,
    /// 也不回滚前面步骤留下的文件
    pub async fn run(
        &self,
        url: &str,
        expected_md5: &str,
        progress: SharedProgress,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<WatchOutcome>, UpdateError> {
        let attempt_id = uuid::Uuid::new_v4();
        info!("开始固件更新任务: {}, url: {}", attempt_id, url);
        progress.begin().await;

        // 下载固件包
        if let Err(e) = self
            .downloader
            .fetch(url, &self.config.archive_path, progress.clone())
            .await
        {
            error!("下载固件包失败: {}, url: {}", e, url);
            return Err(e);
        }

        // 校验完整性, 不匹配就不再往下走
        progress.set_status(UpdateStatus::Verifying).await;
        if let Err(e) = self
            .verifier
            .verify(&self.config.archive_path, expected_md5)
            .await
        {
            error!("固件包校验失败: {}", e);
            progress.record_checksum_error(e.to_string()).await;
            progress.set_status(UpdateStatus::Completed).await;
            return Err(e);
        }

        // 解压到安装目录
        progress.set_status(UpdateStatus::Extracting).await;
        if let Err(e) = self
            .installer
            .extract(&self.config.archive_path, &self.config.install_dir)
            .await
        {
            error!("解压固件包失败: {}", e);
            progress.record_extract_error(e.to_string()).await;
            progress.set_status(UpdateStatus::Completed).await;
            return Err(e);
        }

        // 请求服务管理器启动更新服务
        progress.set_status(UpdateStatus::Activating).await;
        if let Err(e) = self.unit_manager.start_unit(&self.config.unit_name).await {
            error!("启动更新服务失败: {}", e);
            progress.record_activation_error(e.to_string()).await;
            progress.set_status(UpdateStatus::Completed).await;
            return Err(e);
        }

        // 等服务管理器完成自身的状态切换再开始轮询
        tokio::time::sleep(self.config.settle_delay).await;

        let watcher =
            CompletionWatcher::new(Arc::clone(&self.unit_manager), self.config.poll_interval);
        Ok(watcher.spawn(self.config.unit_name.clone(), progress, cancel))
    }
}
