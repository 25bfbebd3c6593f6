use crate::core::{BridgeError, Result};
use log::info;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 重复 create 同一个 playerId 时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// 先销毁旧播放器（连同 sink），再注册新播放器
    #[default]
    Replace,
    /// 拒绝并返回 PlayerExists
    Reject,
}

/// 桥接层配置
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// 方法通道名
    pub method_channel: String,
    /// 事件通道前缀，完整名称为 `前缀 + playerId`
    pub event_channel_prefix: String,
    /// 播放期间 position 事件的间隔（毫秒），0 表示关闭
    pub position_update_interval_ms: u64,
    pub duplicate_create: DuplicatePolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            method_channel: "xyz.luan/audioplayers".to_string(),
            event_channel_prefix: "xyz.luan/audioplayers/events/".to_string(),
            position_update_interval_ms: 200,
            duplicate_create: DuplicatePolicy::Replace,
        }
    }
}

impl BridgeConfig {
    /// 指向 JSON 配置文件的环境变量
    pub const ENV_VAR: &'static str = "AUDIOPLAYERS_BRIDGE_CONFIG";

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!("⚙ 已加载配置: {}", path.display());
        Ok(config)
    }

    /// 环境变量指定了配置文件则加载，否则使用默认配置
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(Self::ENV_VAR) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn event_channel_name(&self, player_id: &str) -> String {
        format!("{}{}", self.event_channel_prefix, player_id)
    }

    pub fn position_update_interval(&self) -> Option<Duration> {
        match self.position_update_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.method_channel.is_empty() {
            return Err(BridgeError::ConfigError("method_channel 不能为空".to_string()));
        }
        if self.event_channel_prefix.is_empty() {
            return Err(BridgeError::ConfigError("event_channel_prefix 不能为空".to_string()));
        }
        Ok(())
    }
}
