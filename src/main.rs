use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ota_updater::cli::Cli;
use ota_updater::updater::progress::SharedProgress;
use ota_updater::updater::watcher::WatchOutcome;
use ota_updater::updater::{FirmwareUpdater, UpdateConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Cli::parse();

    let config = UpdateConfig {
        archive_path: args.archive_path.clone(),
        install_dir: args.install_dir.clone(),
        unit_name: args.unit.clone(),
        settle_delay: Duration::from_secs(args.settle_secs),
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        show_progress: !args.quiet,
    };

    #[cfg(feature = "http")]
    if args.serve {
        return ota_updater::server::run(&args.listen, config).await;
    }

    let url = args.url.context("缺少 --url 参数")?;
    let md5 = args.md5.context("缺少 --md5 参数")?;
    url::Url::parse(&url).context("无效的固件下载链接")?;

    let updater = FirmwareUpdater::new(config);
    let progress = SharedProgress::new();
    let cancel = CancellationToken::new();

    // Ctrl-C 时停掉后台轮询
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let watcher = match updater.run(&url, &md5, progress.clone(), cancel).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("固件更新失败: {}", e);
            return Err(e.into());
        }
    };

    info!("更新服务已启动, 等待执行结果...");
    match watcher.await.context("状态轮询任务异常退出")? {
        WatchOutcome::Success => {
            println!("{}", "固件更新完成！".green());
            Ok(())
        }
        WatchOutcome::Failure => {
            println!("{}", "更新服务执行失败".red());
            anyhow::bail!("更新服务执行失败")
        }
        WatchOutcome::Aborted => {
            warn!("状态查询失败, 无法确认更新结果, 请手动检查更新服务状态");
            anyhow::bail!("无法确认更新结果")
        }
        WatchOutcome::Cancelled => {
            println!("{}", "已取消状态轮询".yellow());
            Ok(())
        }
    }
}
