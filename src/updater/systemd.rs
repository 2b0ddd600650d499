use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use super::error::UpdateError;

/// 服务单元的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Active,
    Activating,
    Inactive,
    Failed,
    Unknown,
}

impl UnitState {
    pub fn parse(word: &str) -> Self {
        match word {
            "active" => UnitState::Active,
            "activating" => UnitState::Activating,
            "inactive" => UnitState::Inactive,
            "failed" => UnitState::Failed,
            _ => UnitState::Unknown,
        }
    }
}

/// 服务管理器的窄接口: 启动单元 + 查询生命周期状态
///
/// 把对自由文本输出的解析隔离在实现内部, 方便测试时注入模拟实现
#[async_trait]
pub trait UnitManager: Send + Sync {
    async fn start_unit(&self, unit_name: &str) -> Result<(), UpdateError>;
    async fn query_unit_state(&self, unit_name: &str) -> Result<UnitState, UpdateError>;
}

/// 通过 gdbus 调用 systemd 的服务管理器实现
pub struct SystemdManager;

#[async_trait]
impl UnitManager for SystemdManager {
    async fn start_unit(&self, unit_name: &str) -> Result<(), UpdateError> {
        let output = Command::new("gdbus")
            .args([
                "call",
                "--system",
                "--dest",
                "org.freedesktop.systemd1",
                "--object-path",
                "/org/freedesktop/systemd1",
                "--method",
                "org.freedesktop.systemd1.Manager.StartUnit",
                unit_name,
                "fail",
            ])
            .output()
            .await
            .map_err(|e| UpdateError::ActivationRequest(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UpdateError::ActivationRequest(stderr.trim().to_string()));
        }

        debug!("已向 systemd 提交启动请求: {}", unit_name);
        Ok(())
    }

    async fn query_unit_state(&self, unit_name: &str) -> Result<UnitState, UpdateError> {
        let object_path = format!(
            "/org/freedesktop/systemd1/unit/{}",
            escape_unit_name(unit_name)
        );
        let output = Command::new("gdbus")
            .args([
                "introspect",
                "--system",
                "--dest",
                "org.freedesktop.systemd1",
                "--object-path",
                &object_path,
                "--only-properties",
            ])
            .output()
            .await
            .map_err(|e| UpdateError::WatcherAborted(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(UpdateError::WatcherAborted(stderr.trim().to_string()));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        parse_active_state(&text).ok_or_else(|| {
            UpdateError::WatcherAborted(format!("{} 的属性输出里没有 ActiveState", unit_name))
        })
    }
}

/// 从 gdbus 属性输出里提取 ActiveState 字段
pub fn parse_active_state(text: &str) -> Option<UnitState> {
    lazy_static! {
        static ref ACTIVE_STATE_RE: Regex = Regex::new(r"ActiveState = '([a-z]+)'").unwrap();
    }

    ACTIVE_STATE_RE
        .captures(text)
        .map(|caps| UnitState::parse(&caps[1]))
}

/// 把单元名转义成 systemd 的对象路径片段
///
/// 字母和数字原样保留, 其余字节替换为 _xx 十六进制形式
pub fn escape_unit_name(name: &str) -> String {
    name.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' => (b as char).to_string(),
            _ => format!("_{:02x}", b),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_unit_name() {
        assert_eq!(
            escape_unit_name("offline-update.service"),
            "offline_2dupdate_2eservice"
        );
        assert_eq!(escape_unit_name("sshd.service"), "sshd_2eservice");
    }

    #[test]
    fn test_parse_active_state() {
        let output = "\
node /org/freedesktop/systemd1/unit/offline_2dupdate_2eservice {
  interface org.freedesktop.systemd1.Unit {
    properties:
      readonly s LoadState = 'loaded';
      readonly s ActiveState = 'activating';
      readonly s SubState = 'start';
  };
};";
        assert_eq!(parse_active_state(output), Some(UnitState::Activating));
    }

    #[test]
    fn test_parse_active_state_missing_field() {
        assert_eq!(parse_active_state("readonly s LoadState = 'loaded';"), None);
    }

    #[test]
    fn test_unit_state_words() {
        assert_eq!(UnitState::parse("active"), UnitState::Active);
        assert_eq!(UnitState::parse("inactive"), UnitState::Inactive);
        assert_eq!(UnitState::parse("failed"), UnitState::Failed);
        assert_eq!(UnitState::parse("deactivating"), UnitState::Unknown);
    }
}
