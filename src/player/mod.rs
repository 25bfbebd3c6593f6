// 播放器核心模块

pub mod audio_player;
pub mod ticker;
pub mod registry;
pub mod dispatcher;

pub use audio_player::{AudioPlayer, PlayerEmitter};
pub use ticker::PositionTicker;
pub use registry::PlayerRegistry;
pub use dispatcher::MethodDispatcher;
