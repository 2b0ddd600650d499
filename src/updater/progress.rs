use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

/// 更新流程所处的阶段, 只会向前推进
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Idle,
    Downloading,
    Verifying,
    Extracting,
    Activating,
    Completed,
}

/// 单次更新的进度报告, 由流水线各步骤写入, 供外部观察者随时读取
#[derive(Debug, Clone, Serialize)]
pub struct UpdateProgress {
    pub percentage: f64,
    pub status: UpdateStatus,
    pub checksum_error: Option<String>,
    pub extract_error: Option<String>,
    pub activation_error: Option<String>,
    pub started_at: Option<String>,
}

impl UpdateProgress {
    fn idle() -> Self {
        Self {
            percentage: 0.0,
            status: UpdateStatus::Idle,
            checksum_error: None,
            extract_error: None,
            activation_error: None,
            started_at: None,
        }
    }
}

/// 进度报告的共享句柄
///
/// 写入方只在单字段赋值期间短暂持锁, 读取方通过 snapshot 拿到克隆,
/// 不会读到撕裂的中间状态, 也不会阻塞写入方
#[derive(Clone)]
pub struct SharedProgress {
    inner: Arc<Mutex<UpdateProgress>>,
}

impl SharedProgress {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(UpdateProgress::idle())),
        }
    }

    // 开始新一轮更新, 重置上一轮的所有字段
    pub async fn begin(&self) {
        let mut guard = self.inner.lock().await;
        *guard = UpdateProgress::idle();
        guard.status = UpdateStatus::Downloading;
        guard.started_at = Some(chrono::Utc::now().to_rfc3339());
    }

    pub async fn set_status(&self, status: UpdateStatus) {
        self.inner.lock().await.status = status;
    }

    pub async fn set_percentage(&self, percentage: f64) {
        self.inner.lock().await.percentage = percentage;
    }

    pub async fn record_checksum_error(&self, message: impl Into<String>) {
        self.inner.lock().await.checksum_error = Some(message.into());
    }

    pub async fn record_extract_error(&self, message: impl Into<String>) {
        self.inner.lock().await.extract_error = Some(message.into());
    }

    pub async fn record_activation_error(&self, message: impl Into<String>) {
        self.inner.lock().await.activation_error = Some(message.into());
    }

    /// 获取当前进度的一致性快照
    pub async fn snapshot(&self) -> UpdateProgress {
        self.inner.lock().await.clone()
    }
}

impl Default for SharedProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// 下载字节计数器, 把写入的字节数换算成共享进度里的百分比
///
/// 单次下载内 transferred 只增不减, 百分比单调不降
pub struct TransferCounter {
    transferred: u64,
    total: u64,
    progress: SharedProgress,
}

impl TransferCounter {
    pub fn new(total: u64, progress: SharedProgress) -> Self {
        Self {
            transferred: 0,
            total,
            progress,
        }
    }

    pub async fn add(&mut self, n: u64) {
        self.transferred += n;
        // 总大小未知时不做除法, 百分比维持 0
        if self.total > 0 {
            let percentage = (self.transferred as f64 / self.total as f64) * 100.0;
            self.progress.set_percentage(percentage).await;
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counter_percentage() {
        let progress = SharedProgress::new();
        let mut counter = TransferCounter::new(200, progress.clone());

        counter.add(50).await;
        assert_eq!(progress.snapshot().await.percentage, 25.0);

        counter.add(50).await;
        assert_eq!(progress.snapshot().await.percentage, 50.0);

        counter.add(100).await;
        assert_eq!(progress.snapshot().await.percentage, 100.0);
        assert_eq!(counter.transferred(), 200);
    }

    #[tokio::test]
    async fn test_counter_monotonic() {
        let progress = SharedProgress::new();
        let mut counter = TransferCounter::new(1000, progress.clone());

        let mut last = 0.0;
        for _ in 0..10 {
            counter.add(37).await;
            let current = progress.snapshot().await.percentage;
            assert!(current >= last, "百分比不应回退: {} -> {}", last, current);
            last = current;
        }
    }

    #[tokio::test]
    async fn test_counter_zero_total() {
        // 总大小为 0 (缺少 Content-Length) 时不能触发除零
        let progress = SharedProgress::new();
        let mut counter = TransferCounter::new(0, progress.clone());

        counter.add(1024).await;
        assert_eq!(progress.snapshot().await.percentage, 0.0);
        assert_eq!(counter.transferred(), 1024);
    }

    #[tokio::test]
    async fn test_begin_resets_previous_attempt() {
        let progress = SharedProgress::new();
        progress.record_checksum_error("校验失败").await;
        progress.set_status(UpdateStatus::Completed).await;

        progress.begin().await;
        let snapshot = progress.snapshot().await;
        assert_eq!(snapshot.status, UpdateStatus::Downloading);
        assert!(snapshot.checksum_error.is_none());
        assert!(snapshot.started_at.is_some());
        assert_eq!(snapshot.percentage, 0.0);
    }

    #[tokio::test]
    async fn test_snapshot_serializes_lowercase_status() {
        let progress = SharedProgress::new();
        progress.set_status(UpdateStatus::Verifying).await;

        let value = serde_json::to_value(progress.snapshot().await).unwrap();
        assert_eq!(value["status"], "verifying");
    }
}
