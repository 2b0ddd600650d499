use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::info;

use super::error::{FsPhase, UpdateError};

/// 固件包安装器, 把 tar.gz 压缩包解压到安装目录
pub struct ArchiveInstaller;

impl ArchiveInstaller {
    /// 解压固件包, 覆盖安装目录里的同名文件
    pub async fn extract(&self, archive_path: &Path, target_dir: &Path) -> Result<(), UpdateError> {
        let archive_path = archive_path.to_path_buf();
        let target_dir = target_dir.to_path_buf();

        // tar 解包是同步 IO, 放到阻塞线程执行
        tokio::task::spawn_blocking(move || {
            let file = std::fs::File::open(&archive_path)
                .map_err(|e| UpdateError::fs(FsPhase::Read, e))?;
            let decoder = GzDecoder::new(file);
            let mut archive = Archive::new(decoder);
            archive.set_overwrite(true);
            archive
                .unpack(&target_dir)
                .map_err(|e| UpdateError::Extraction(e.to_string()))?;

            info!("固件包已解压到: {}", target_dir.display());
            Ok(())
        })
        .await
        .map_err(|e| UpdateError::Extraction(e.to_string()))?
    }
}
