use std::path::{Path, PathBuf};

use futures::StreamExt;
use indicatif::ProgressBar;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::error::{FsPhase, UpdateError};
use super::progress::{SharedProgress, TransferCounter};

/// 固件包下载器
///
/// 先写入 `目标路径.tmp` 临时文件, 全部写完后原子重命名到最终路径,
/// 外部永远不会在最终路径看到半截文件
pub struct ArchiveDownloader {
    client: reqwest::Client,
    show_progress: bool,
}

impl ArchiveDownloader {
    pub fn new(show_progress: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            show_progress,
        }
    }

    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: SharedProgress,
    ) -> Result<(), UpdateError> {
        let tmp_path = tmp_path_of(dest);
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| UpdateError::fs(FsPhase::Create, e))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::HttpStatus(status));
        }

        // Content-Length 缺失时总大小记为 0, 百分比保持 0 但下载照常进行
        let total_size = response.content_length().unwrap_or(0);
        debug!("固件包大小: {} 字节, url: {}", total_size, url);

        let mut counter = TransferCounter::new(total_size, progress);

        let pb = if self.show_progress && total_size > 0 {
            let pb = ProgressBar::new(total_size);
            pb.set_style(
                indicatif::ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                )
                .unwrap()
                .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            // 流中途断开属于网络错误, 临时文件原样留下便于排查
            let chunk = chunk_result?;
            file.write_all(&chunk)
                .await
                .map_err(|e| UpdateError::fs(FsPhase::Write, e))?;
            counter.add(chunk.len() as u64).await;

            if let Some(pb) = &pb {
                pb.set_position(counter.transferred());
            }
        }

        file.flush()
            .await
            .map_err(|e| UpdateError::fs(FsPhase::Write, e))?;
        drop(file);

        if let Some(pb) = pb {
            pb.finish_with_message("下载完成");
        }

        tokio::fs::rename(&tmp_path, dest)
            .await
            .map_err(|e| UpdateError::fs(FsPhase::Rename, e))?;

        info!("固件包已落盘: {}", dest.display());
        Ok(())
    }
}

// 在目标路径后追加 .tmp 后缀
fn tmp_path_of(dest: &Path) -> PathBuf {
    let mut os = dest.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmp_path_keeps_full_name() {
        let tmp = tmp_path_of(Path::new("/var/sota/update-latest.tar.gz"));
        assert_eq!(
            tmp,
            PathBuf::from("/var/sota/update-latest.tar.gz.tmp")
        );
    }
}
