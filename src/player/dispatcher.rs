use crate::config::{BridgeConfig, DuplicatePolicy};
use crate::core::{BridgeError, MethodCall, PlayerEvent, ReleaseMode, Result};
use crate::player::audio_player::AudioPlayer;
use crate::player::registry::PlayerRegistry;
use crate::sink::{EventListener, Mailbox, ThreadSafeEventSink};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerArgs {
    player_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceArgs {
    player_id: String,
    url: String,
    #[serde(default)]
    is_local: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeekArgs {
    player_id: String,
    position: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumeArgs {
    player_id: String,
    volume: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceArgs {
    player_id: String,
    balance: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RateArgs {
    player_id: String,
    playback_rate: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseModeArgs {
    player_id: String,
    release_mode: ReleaseMode,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogArgs {
    player_id: String,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorArgs {
    player_id: String,
    code: String,
    message: String,
}

fn parse_args<T: DeserializeOwned>(method: &str, args: &Value) -> Result<T> {
    T::deserialize(args).map_err(|e| BridgeError::InvalidArgument(format!("{}: {}", method, e)))
}

/// 方法分发器
///
/// 插件挂载时创建，持有播放器注册表和所属线程的邮箱；
/// 按方法名把宿主的调用路由到对应播放器，并管理每个播放器的事件通道订阅。
/// 所有调用都必须由宿主串行化后在邮箱所属线程上进入。
pub struct MethodDispatcher {
    config: BridgeConfig,
    mailbox: Mailbox,
    registry: PlayerRegistry,
    /// 事件通道名 -> playerId
    channels: HashMap<String, String>,
}

impl MethodDispatcher {
    pub fn new(config: BridgeConfig, mailbox: Mailbox) -> Self {
        info!("🔌 插件挂载: {}", config.method_channel);
        Self {
            config,
            mailbox,
            registry: PlayerRegistry::new(),
            channels: HashMap::new(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    /// 处理一次方法调用；错误同步返回给调用方
    pub fn handle_method_call(&mut self, call: &MethodCall) -> Result<Value> {
        debug!("📨 方法调用: {} {}", call.method, call.arguments);
        let result = self.route(&call.method, &call.arguments);
        if let Err(e) = &result {
            warn!("❌ 方法 {} 失败 [{}]: {}", call.method, e.code(), e);
        }
        result
    }

    fn route(&mut self, method: &str, args: &Value) -> Result<Value> {
        match method {
            "create" => self.create(args),
            "dispose" => {
                let player_id = match args {
                    Value::String(id) => id.clone(),
                    _ => parse_args::<PlayerArgs>(method, args)?.player_id,
                };
                self.dispose_player(&player_id).map(|_| Value::Null)
            }
            "setSourceUrl" => {
                let args: SourceArgs = parse_args(method, args)?;
                self.registry
                    .require_mut(&args.player_id)?
                    .set_source_url(&args.url, args.is_local)
                    .map(|_| Value::Null)
            }
            "resume" => {
                let args: PlayerArgs = parse_args(method, args)?;
                self.registry.require_mut(&args.player_id)?.resume().map(|_| Value::Null)
            }
            "pause" => {
                let args: PlayerArgs = parse_args(method, args)?;
                self.registry.require_mut(&args.player_id)?.pause();
                Ok(Value::Null)
            }
            "stop" => {
                let args: PlayerArgs = parse_args(method, args)?;
                self.registry.require_mut(&args.player_id)?.stop();
                Ok(Value::Null)
            }
            "release" => {
                let args: PlayerArgs = parse_args(method, args)?;
                self.registry.require_mut(&args.player_id)?.release();
                Ok(Value::Null)
            }
            "seek" => {
                let args: SeekArgs = parse_args(method, args)?;
                self.registry
                    .require_mut(&args.player_id)?
                    .seek(args.position)
                    .map(|_| Value::Null)
            }
            "setVolume" => {
                let args: VolumeArgs = parse_args(method, args)?;
                self.registry
                    .require_mut(&args.player_id)?
                    .set_volume(args.volume)
                    .map(|_| Value::Null)
            }
            "setBalance" => {
                let args: BalanceArgs = parse_args(method, args)?;
                self.registry
                    .require_mut(&args.player_id)?
                    .set_balance(args.balance)
                    .map(|_| Value::Null)
            }
            "setPlaybackRate" => {
                let args: RateArgs = parse_args(method, args)?;
                self.registry
                    .require_mut(&args.player_id)?
                    .set_playback_rate(args.playback_rate)
                    .map(|_| Value::Null)
            }
            "setReleaseMode" => {
                let args: ReleaseModeArgs = parse_args(method, args)?;
                self.registry
                    .require_mut(&args.player_id)?
                    .set_release_mode(args.release_mode);
                Ok(Value::Null)
            }
            "getCurrentPosition" => {
                let args: PlayerArgs = parse_args(method, args)?;
                let position = self.registry.require_mut(&args.player_id)?.position();
                Ok(json!(position))
            }
            "getDuration" => {
                let args: PlayerArgs = parse_args(method, args)?;
                let duration = self.registry.require_mut(&args.player_id)?.duration();
                Ok(json!(duration))
            }
            "emitLog" => {
                let args: LogArgs = parse_args(method, args)?;
                self.registry
                    .require_mut(&args.player_id)?
                    .emit(PlayerEvent::Log { value: args.message });
                Ok(Value::Null)
            }
            "emitError" => {
                let args: ErrorArgs = parse_args(method, args)?;
                self.registry
                    .require_mut(&args.player_id)?
                    .emitter()
                    .report_error(&args.code, &args.message);
                Ok(Value::Null)
            }
            _ => Err(BridgeError::NotImplemented(method.to_string())),
        }
    }

    fn create(&mut self, args: &Value) -> Result<Value> {
        let player_id = match args {
            Value::String(id) if !id.is_empty() => id.clone(),
            other => {
                return Err(BridgeError::InvalidArgument(format!(
                    "create 需要非空字符串 playerId，收到: {}",
                    other
                )))
            }
        };

        if self.registry.contains(&player_id) {
            match self.config.duplicate_create {
                DuplicatePolicy::Reject => return Err(BridgeError::PlayerExists(player_id)),
                DuplicatePolicy::Replace => {
                    warn!("⚠ 播放器 {} 已存在，销毁后重新创建", player_id);
                    self.dispose_player(&player_id)?;
                }
            }
        }

        let channel = self.config.event_channel_name(&player_id);
        let player = AudioPlayer::new(
            player_id.clone(),
            channel.clone(),
            self.config.position_update_interval(),
        );
        self.channels.insert(channel, player_id);
        self.registry.insert(player);
        Ok(Value::Null)
    }

    fn dispose_player(&mut self, player_id: &str) -> Result<()> {
        let mut player = self
            .registry
            .remove(player_id)
            .ok_or_else(|| BridgeError::UnknownPlayer(player_id.to_string()))?;
        self.channels.remove(player.event_channel());
        player.dispose();
        Ok(())
    }

    /// 事件通道订阅：为播放器绑定新的 sink（替换已有 sink）
    pub fn listen(&mut self, channel: &str, listener: Box<dyn EventListener>) -> Result<()> {
        let player_id = self
            .channels
            .get(channel)
            .ok_or_else(|| BridgeError::UnknownChannel(channel.to_string()))?;
        let player = self.registry.require_mut(player_id)?;
        let sink = ThreadSafeEventSink::new(&self.mailbox, listener);
        info!("👂 {} 开始监听 (sink #{})", channel, sink.id());
        player.set_event_sink(sink);
        Ok(())
    }

    /// 取消订阅：解绑并释放 sink，已排队的事件丢弃
    pub fn cancel(&mut self, channel: &str) -> Result<()> {
        let player_id = self
            .channels
            .get(channel)
            .ok_or_else(|| BridgeError::UnknownChannel(channel.to_string()))?;
        self.registry.require_mut(player_id)?.clear_event_sink();
        info!("🙉 {} 取消监听", channel);
        Ok(())
    }

    /// 插件卸载：销毁全部播放器
    pub fn detach(&mut self) {
        self.channels.clear();
        self.registry.clear();
    }
}

impl Drop for MethodDispatcher {
    fn drop(&mut self) {
        if !self.registry.is_empty() {
            info!("🔌 插件卸载");
            self.detach();
        }
    }
}
