//! 音频播放器插件桥接层
//!
//! - `sink`：跨线程事件投递。任意线程入队，邮箱所属线程按 FIFO 分发给监听者
//! - `player`：播放器注册表与方法分发器，每个播放器一条事件流

pub mod config;
pub mod core;
pub mod player;
pub mod sink;

pub use crate::config::{BridgeConfig, DuplicatePolicy};
pub use crate::core::{BridgeError, MethodCall, PlayerEvent, Result, SinkEvent};
pub use crate::player::{AudioPlayer, MethodDispatcher, PlayerEmitter};
pub use crate::sink::{EventListener, Mailbox, ThreadSafeEventSink};
