use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("参数无效: {0}")]
    InvalidArgument(String),

    #[error("未实现的方法: {0}")]
    NotImplemented(String),

    #[error("播放器不存在: {0}")]
    UnknownPlayer(String),

    #[error("播放器已存在: {0}")]
    PlayerExists(String),

    #[error("事件通道不存在: {0}")]
    UnknownChannel(String),

    #[error("播放器状态无效: {0}")]
    InvalidState(String),

    /// 没有监听者时发出事件（静默忽略，不会返回给调用方）
    #[error("事件接收端未绑定")]
    SinkUnbound,

    /// 分发目标在排队事件被处理前已销毁（事件被丢弃）
    #[error("分发目标已销毁: sink #{0}")]
    DispatchTargetGone(u64),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl BridgeError {
    /// 返回给插件宿主的稳定错误码
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::InvalidArgument(_) => "InvalidArgument",
            BridgeError::NotImplemented(_) => "NotImplemented",
            BridgeError::UnknownPlayer(_) => "UnknownPlayer",
            BridgeError::PlayerExists(_) => "PlayerExists",
            BridgeError::UnknownChannel(_) => "UnknownChannel",
            BridgeError::InvalidState(_) => "InvalidState",
            BridgeError::SinkUnbound => "SinkUnbound",
            BridgeError::DispatchTargetGone(_) => "DispatchTargetGone",
            BridgeError::ConfigError(_) => "ConfigError",
            BridgeError::IoError(_) => "IoError",
            BridgeError::JsonError(_) => "JsonError",
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(BridgeError::InvalidArgument("x".into()).code(), "InvalidArgument");
        assert_eq!(BridgeError::NotImplemented("foo".into()).code(), "NotImplemented");
        assert_eq!(BridgeError::DispatchTargetGone(3).code(), "DispatchTargetGone");
    }

    #[test]
    fn test_json_error_converts() {
        let err: BridgeError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert_eq!(err.code(), "JsonError");
    }
}
