use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::Result;

/// 投递给监听者的事件（Success / Error / EndOfStream）
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Success(Value),
    Error {
        code: String,
        message: String,
        details: Option<Value>,
    },
    EndOfStream,
}

/// 播放器领域事件，序列化后形如 `{"event": "position", "position": 12.5}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PlayerEvent {
    Position { position: f64 },
    Duration { duration: f64 },
    Prepared { value: bool },
    SeekComplete,
    Completed,
    Log { value: String },
}

impl PlayerEvent {
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Stopped,
    Completed,
}

/// 播放结束后的行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseMode {
    /// 结束后释放资源（回到起点）
    #[default]
    Release,
    /// 循环播放
    Loop,
    /// 结束后停止，保留资源
    Stop,
}

/// 播放器生命周期：Active（已创建）/ Subscribed（已绑定监听者）/ Disposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerLifecycle {
    Active,
    Subscribed,
    Disposed,
}

/// 播放器状态信息（位置由时钟单独提供）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub duration: Option<f64>,  // 总时长（秒），未知时为 None
    pub volume: f64,            // 音量 0.0 - 1.0
    pub balance: f64,           // 声道平衡 -1.0 - 1.0
    pub playback_rate: f64,
    pub release_mode: ReleaseMode,
    pub source: Option<String>,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            duration: None,
            volume: 1.0,
            balance: 0.0,
            playback_rate: 1.0,
            release_mode: ReleaseMode::default(),
            source: None,
        }
    }
}

/// 宿主发来的方法调用（方法名 + 松散类型的参数）
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_position_event_shape() {
        let value = PlayerEvent::Position { position: 12.5 }.to_value().unwrap();
        assert_eq!(value, json!({"event": "position", "position": 12.5}));
    }

    #[test]
    fn test_unit_events_carry_only_tag() {
        assert_eq!(
            PlayerEvent::SeekComplete.to_value().unwrap(),
            json!({"event": "seekComplete"})
        );
        assert_eq!(
            PlayerEvent::Completed.to_value().unwrap(),
            json!({"event": "completed"})
        );
    }

    #[test]
    fn test_release_mode_from_string() {
        let mode: ReleaseMode = serde_json::from_value(json!("loop")).unwrap();
        assert_eq!(mode, ReleaseMode::Loop);
        assert!(serde_json::from_value::<ReleaseMode>(json!("forever")).is_err());
    }
}
