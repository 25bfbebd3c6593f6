use crate::core::{
    BridgeError, PlaybackClock, PlaybackState, PlayerEvent, PlayerLifecycle, PlayerStatus,
    ReleaseMode, Result,
};
use crate::player::ticker::PositionTicker;
use crate::sink::ThreadSafeEventSink;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct PlayerShared {
    id: String,
    clock: PlaybackClock,
    status: Mutex<PlayerStatus>,
    /// 当前绑定的 sink（最多一个）
    sink: Mutex<Option<ThreadSafeEventSink>>,
}

/// 事件发射端
///
/// 可以 clone 并交给工作线程（定时器、解码回调等），
/// 所有领域状态变化都经由这里进入 sink。未绑定 sink 时发射静默忽略。
#[derive(Clone)]
pub struct PlayerEmitter {
    shared: Arc<PlayerShared>,
}

impl PlayerEmitter {
    pub fn player_id(&self) -> &str {
        &self.shared.id
    }

    pub fn emit(&self, event: PlayerEvent) {
        match self.try_emit(&event) {
            Ok(()) => {}
            Err(BridgeError::SinkUnbound) => {
                debug!("[{}] 无监听者，忽略事件 {:?}", self.shared.id, event);
            }
            Err(e) => error!("[{}] 事件序列化失败: {}", self.shared.id, e),
        }
    }

    fn try_emit(&self, event: &PlayerEvent) -> Result<()> {
        let value = event.to_value()?;
        let sink = self.shared.sink.lock();
        let sink = sink.as_ref().ok_or(BridgeError::SinkUnbound)?;
        sink.success(value);
        Ok(())
    }

    /// 播放位置变化（秒）
    pub fn report_position(&self, position: f64) {
        self.shared.clock.set_time(position);
        self.emit(PlayerEvent::Position { position });
    }

    pub fn report_duration(&self, duration: f64) {
        self.shared.status.lock().duration = Some(duration);
        self.emit(PlayerEvent::Duration { duration });
    }

    /// 播放完成；返回是否继续播放（循环模式）
    pub fn report_completed(&self) -> bool {
        let looping = {
            let mut status = self.shared.status.lock();
            if status.release_mode == ReleaseMode::Loop {
                self.shared.clock.set_time(0.0);
                true
            } else {
                self.shared.clock.pause();
                self.shared.clock.set_time(0.0);
                status.state = PlaybackState::Completed;
                false
            }
        };
        info!("[{}] 🏁 播放完成{}", self.shared.id, if looping { "，循环播放" } else { "" });
        self.emit(PlayerEvent::Completed);
        looping
    }

    /// 通过事件流上报错误（Error 事件）
    pub fn report_error(&self, code: &str, message: &str) {
        let sink = self.shared.sink.lock();
        match sink.as_ref() {
            Some(sink) => sink.error(code, message, None),
            None => debug!("[{}] 无监听者，忽略错误 {}: {}", self.shared.id, code, message),
        }
    }

    /// 进度线程的一次上报；返回 false 表示播放已结束
    pub(crate) fn tick(&self) -> bool {
        let position = self.shared.clock.now();
        let duration = self.shared.status.lock().duration;
        match duration {
            Some(duration) if position >= duration => {
                self.emit(PlayerEvent::Position { position: duration });
                self.report_completed()
            }
            _ => {
                self.emit(PlayerEvent::Position { position });
                true
            }
        }
    }
}

/// 音频播放器
///
/// 不包含音频引擎，只维护播放状态、时钟和事件流。
/// 由注册表独占持有，销毁时先释放 sink，再停止进度线程。
pub struct AudioPlayer {
    emitter: PlayerEmitter,
    event_channel: String,
    tick_interval: Option<Duration>,
    ticker: Option<PositionTicker>,
    disposed: bool,
}

impl AudioPlayer {
    pub fn new(id: impl Into<String>, event_channel: impl Into<String>, tick_interval: Option<Duration>) -> Self {
        let id = id.into();
        info!("🎵 创建播放器: {}", id);
        Self {
            emitter: PlayerEmitter {
                shared: Arc::new(PlayerShared {
                    id,
                    clock: PlaybackClock::new(),
                    status: Mutex::new(PlayerStatus::default()),
                    sink: Mutex::new(None),
                }),
            },
            event_channel: event_channel.into(),
            tick_interval,
            ticker: None,
            disposed: false,
        }
    }

    pub fn id(&self) -> &str {
        self.emitter.player_id()
    }

    pub fn event_channel(&self) -> &str {
        &self.event_channel
    }

    fn shared(&self) -> &PlayerShared {
        &self.emitter.shared
    }

    pub fn emitter(&self) -> PlayerEmitter {
        self.emitter.clone()
    }

    pub fn lifecycle(&self) -> PlayerLifecycle {
        if self.disposed {
            PlayerLifecycle::Disposed
        } else if self.has_listener() {
            PlayerLifecycle::Subscribed
        } else {
            PlayerLifecycle::Active
        }
    }

    pub fn status(&self) -> PlayerStatus {
        self.shared().status.lock().clone()
    }

    /// 当前播放位置（秒）
    pub fn position(&self) -> f64 {
        self.shared().clock.now()
    }

    pub fn duration(&self) -> Option<f64> {
        self.shared().status.lock().duration
    }

    pub fn has_listener(&self) -> bool {
        self.shared().sink.lock().is_some()
    }

    /// 绑定新的 sink，旧 sink 随之销毁
    pub fn set_event_sink(&mut self, sink: ThreadSafeEventSink) {
        if self.disposed {
            warn!("[{}] 已销毁的播放器不能绑定 sink", self.id());
            return;
        }
        let previous = self.shared().sink.lock().replace(sink);
        if previous.is_some() {
            debug!("[{}] 替换已有 sink", self.id());
        }
    }

    /// 解绑 sink，播放器继续静默运行
    pub fn clear_event_sink(&mut self) {
        if self.shared().sink.lock().take().is_some() {
            debug!("[{}] 🔌 解绑 sink", self.id());
        }
    }

    pub fn emit(&self, event: PlayerEvent) {
        self.emitter.emit(event);
    }

    pub fn on_position_changed(&self, position: f64) {
        self.emitter.report_position(position);
    }

    pub fn set_source_url(&mut self, url: &str, is_local: bool) -> Result<()> {
        if url.is_empty() {
            return Err(BridgeError::InvalidArgument("url 不能为空".to_string()));
        }
        self.stop_ticker();
        {
            let mut status = self.shared().status.lock();
            status.source = Some(url.to_string());
            status.duration = None;
            status.state = PlaybackState::Stopped;
        }
        self.shared().clock.pause();
        self.shared().clock.set_time(0.0);
        info!("[{}] 📁 设置音源: {} (本地: {})", self.id(), url, is_local);
        self.emit(PlayerEvent::Prepared { value: true });
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        {
            let mut status = self.shared().status.lock();
            if status.source.is_none() {
                return Err(BridgeError::InvalidState(format!("{} 尚未设置音源", self.id())));
            }
            status.state = PlaybackState::Playing;
        }
        self.shared().clock.play();
        self.stop_ticker();
        if let Some(interval) = self.tick_interval {
            self.ticker = Some(PositionTicker::start(self.emitter(), interval)?);
        }
        info!("[{}] ▶ 播放", self.id());
        Ok(())
    }

    pub fn pause(&mut self) {
        self.stop_ticker();
        self.shared().clock.pause();
        self.shared().status.lock().state = PlaybackState::Paused;
        info!("[{}] ⏸ 暂停", self.id());
        self.emit(PlayerEvent::Position { position: self.position() });
    }

    pub fn stop(&mut self) {
        self.stop_ticker();
        self.shared().clock.pause();
        self.shared().clock.set_time(0.0);
        self.shared().status.lock().state = PlaybackState::Stopped;
        info!("[{}] ⏹ 停止", self.id());
        self.emit(PlayerEvent::Position { position: 0.0 });
    }

    /// 停止并释放音源
    pub fn release(&mut self) {
        self.stop();
        let mut status = self.shared().status.lock();
        status.source = None;
        status.duration = None;
        status.state = PlaybackState::Idle;
    }

    /// 跳转（秒），超过已知时长时截断到末尾
    pub fn seek(&mut self, position: f64) -> Result<()> {
        if !position.is_finite() || position < 0.0 {
            return Err(BridgeError::InvalidArgument(format!("无效的跳转位置: {}", position)));
        }
        let target = match self.duration() {
            Some(duration) => position.min(duration),
            None => position,
        };
        self.shared().clock.set_time(target);
        info!("[{}] ⏩ 跳转到 {:.3}s", self.id(), target);
        self.emit(PlayerEvent::Position { position: target });
        self.emit(PlayerEvent::SeekComplete);
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f64) -> Result<()> {
        if !volume.is_finite() {
            return Err(BridgeError::InvalidArgument(format!("无效的音量: {}", volume)));
        }
        self.shared().status.lock().volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    pub fn set_balance(&mut self, balance: f64) -> Result<()> {
        if !balance.is_finite() {
            return Err(BridgeError::InvalidArgument(format!("无效的声道平衡: {}", balance)));
        }
        self.shared().status.lock().balance = balance.clamp(-1.0, 1.0);
        Ok(())
    }

    pub fn set_playback_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(BridgeError::InvalidArgument(format!("无效的播放速率: {}", rate)));
        }
        self.shared().clock.set_rate(rate);
        self.shared().status.lock().playback_rate = rate;
        Ok(())
    }

    pub fn set_release_mode(&mut self, mode: ReleaseMode) {
        self.shared().status.lock().release_mode = mode;
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }

    /// 销毁播放器：先释放 sink，再停止进度线程
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.clear_event_sink();
        self.stop_ticker();
        self.shared().clock.pause();
        self.disposed = true;
        info!("[{}] 🗑 播放器已销毁", self.id());
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.dispose();
    }
}
