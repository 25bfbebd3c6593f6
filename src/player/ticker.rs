use crate::core::Result;
use crate::player::audio_player::PlayerEmitter;
use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use log::{debug, info, warn};
use std::process;
use std::thread::{self, JoinHandle};
use std::time::Duration;

fn log_ctx() -> String {
    format!("[pid:{} tid:{:?}]", process::id(), thread::current().id())
}

/// 进度线程命令
enum TickerCommand {
    Stop,
}

/// 进度上报线程
/// - 播放期间每个 interval 从时钟读取位置并通过 sink 发出 position 事件
/// - 到达已知时长时上报播放完成；非循环模式下线程随即退出
pub struct PositionTicker {
    thread_handle: Option<JoinHandle<()>>,
    command_tx: Sender<TickerCommand>,
}

impl PositionTicker {
    pub fn start(emitter: PlayerEmitter, interval: Duration) -> Result<Self> {
        let (command_tx, command_rx) = unbounded::<TickerCommand>();
        let name = format!("position-ticker-{}", emitter.player_id());

        let thread_handle = thread::Builder::new().name(name).spawn(move || {
            info!("{} ⏱ 进度线程启动: {} (每 {:?})", log_ctx(), emitter.player_id(), interval);
            let mut ticks: u64 = 0;

            loop {
                match command_rx.recv_timeout(interval) {
                    Ok(TickerCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    Err(RecvTimeoutError::Timeout) => {
                        ticks += 1;
                        if !emitter.tick() {
                            debug!("{} 🏁 播放完成，进度线程结束", log_ctx());
                            break;
                        }
                    }
                }
            }

            info!("{} 🛑 进度线程退出: {}（共上报 {} 次）", log_ctx(), emitter.player_id(), ticks);
        })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            command_tx,
        })
    }

    /// 线程是否仍在运行
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// 停止线程并等待退出
    pub fn stop(&mut self) {
        let _ = self.command_tx.send(TickerCommand::Stop);
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                warn!("{} ⚠ 进度线程异常退出", log_ctx());
            }
        }
    }
}

impl Drop for PositionTicker {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            self.stop();
        }
    }
}
