use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// 播放时钟 - 播放位置的唯一来源（秒）
#[derive(Clone)]
pub struct PlaybackClock {
    inner: Arc<Mutex<ClockInner>>,
}

struct ClockInner {
    base_position: f64,         // 基准位置（秒）
    base_instant: Instant,      // 基准时刻
    playback_rate: f64,         // 播放速率（1.0 = 正常）
    paused: bool,
    paused_at: f64,             // 暂停时的位置
}

impl ClockInner {
    fn now(&self) -> f64 {
        if self.paused {
            self.paused_at
        } else {
            let elapsed = self.base_instant.elapsed().as_secs_f64();
            self.base_position + elapsed * self.playback_rate
        }
    }
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClockInner {
                base_position: 0.0,
                base_instant: Instant::now(),
                playback_rate: 1.0,
                paused: true,
                paused_at: 0.0,
            })),
        }
    }

    /// 获取当前播放位置（秒）
    pub fn now(&self) -> f64 {
        self.inner.lock().now()
    }

    /// 设置播放位置
    pub fn set_time(&self, position: f64) {
        let mut inner = self.inner.lock();
        inner.base_position = position;
        inner.base_instant = Instant::now();
        inner.paused_at = position;
    }

    /// 开始播放
    pub fn play(&self) {
        let mut inner = self.inner.lock();
        if inner.paused {
            inner.base_position = inner.paused_at;
            inner.base_instant = Instant::now();
            inner.paused = false;
        }
    }

    /// 暂停播放
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        if !inner.paused {
            inner.paused_at = inner.now();
            inner.paused = true;
        }
    }

    /// 设置播放速率
    pub fn set_rate(&self, rate: f64) {
        let mut inner = self.inner.lock();
        if !inner.paused {
            let current = inner.now();
            inner.base_position = current;
            inner.base_instant = Instant::now();
        }
        inner.playback_rate = rate;
    }

}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}
