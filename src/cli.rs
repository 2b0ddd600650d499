use clap::Parser;
use std::path::PathBuf;

/// 固件在线更新工具
#[derive(Parser, Debug)]
#[command(name = "otaup")]
#[command(version = "0.1")]
#[command(about = "下载、校验、安装固件包并跟踪更新服务的执行结果", long_about = None)]
pub struct Cli {
    /// 固件包下载链接
    #[arg(long, value_name = "URL")]
    #[arg(value_hint = clap::ValueHint::Url)]
    pub url: Option<String>,

    /// 固件包的期望 MD5 校验和
    #[arg(long, value_name = "MD5")]
    #[arg(help = "32位十六进制, 也接受 md5sum 的完整输出")]
    pub md5: Option<String>,

    /// 固件包落盘路径
    #[arg(long, value_name = "FILE")]
    #[arg(default_value = "/var/sota/update-latest.tar.gz")]
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub archive_path: PathBuf,

    /// 固件安装目录
    #[arg(long, value_name = "DIR")]
    #[arg(default_value = "/var/sota")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub install_dir: PathBuf,

    /// 负责应用更新的服务单元
    #[arg(long, value_name = "UNIT")]
    #[arg(default_value = "offline-update.service")]
    pub unit: String,

    #[arg(long, value_name = "轮询间隔毫秒数", default_value_t = 200)]
    pub poll_interval_ms: u64,
    #[arg(long, value_name = "启动后静置秒数", default_value_t = 1)]
    pub settle_secs: u64,
    #[arg(long, value_name = "是否隐藏进度条", default_value_t = false)]
    pub quiet: bool,

    /// 以 HTTP 服务模式运行, 通过接口触发更新并查询进度
    #[cfg(feature = "http")]
    #[arg(long, default_value_t = false)]
    pub serve: bool,

    /// HTTP 服务监听地址
    #[cfg(feature = "http")]
    #[arg(long, value_name = "ADDR", default_value = "0.0.0.0:8080")]
    pub listen: String,
}
