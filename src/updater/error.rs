use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("网络请求失败: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP 响应异常, 状态码: {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error("文件{phase}失败: {source}")]
    Filesystem {
        phase: FsPhase,
        #[source]
        source: std::io::Error,
    },

    #[error("校验和不匹配, 期望: {expected}, 实际: {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("解压固件包失败: {0}")]
    Extraction(String),

    #[error("启动更新服务失败: {0}")]
    ActivationRequest(String),

    #[error("状态轮询中止: {0}")]
    WatcherAborted(String),
}

impl UpdateError {
    pub fn fs(phase: FsPhase, source: std::io::Error) -> Self {
        UpdateError::Filesystem { phase, source }
    }
}

// 文件操作阶段, 用于区分创建/写入/重命名/读取失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsPhase {
    Create,
    Write,
    Rename,
    Read,
}

impl fmt::Display for FsPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            FsPhase::Create => "创建",
            FsPhase::Write => "写入",
            FsPhase::Rename => "重命名",
            FsPhase::Read => "读取",
        };
        write!(f, "{}", word)
    }
}
