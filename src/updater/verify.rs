use std::path::Path;

use md5::{Digest, Md5};
use tokio::io::AsyncReadExt;
use tracing::debug;

use super::error::{FsPhase, UpdateError};

/// 固件包完整性校验器
pub struct Md5Verifier;

impl Md5Verifier {
    /// 计算文件 MD5 并与期望值比对
    ///
    /// 期望值只取前 32 位十六进制字符, 兼容 md5sum 输出里
    /// 摘要后面跟文件名的格式; 不匹配与读不到文件是两种错误
    pub async fn verify(&self, path: &Path, expected: &str) -> Result<(), UpdateError> {
        let mut file = tokio::fs::File::open(path)
            .await
            .map_err(|e| UpdateError::fs(FsPhase::Read, e))?;

        let mut hasher = Md5::new();
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = file
                .read(&mut buf)
                .await
                .map_err(|e| UpdateError::fs(FsPhase::Read, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        let actual = format!("{:x}", hasher.finalize());

        let expected = expected.trim().to_lowercase();
        let expected = expected.get(..32).unwrap_or(expected.as_str());
        debug!("校验和比对, 期望: {}, 实际: {}", expected, actual);

        if actual != expected {
            return Err(UpdateError::ChecksumMismatch {
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }
}
