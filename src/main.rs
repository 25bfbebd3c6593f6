use anyhow::Result;
use audioplayers_bridge::{BridgeConfig, Mailbox, MethodCall, MethodDispatcher, SinkEvent};
use log::{info, warn};
use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

const PLAYER_ID: &str = "demo-player";

fn main() -> Result<()> {
    // 初始化日志
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("🎧 audioplayers 桥接层演示启动");

    let config = BridgeConfig::from_env()?;

    // 当前线程即宿主的消息线程，邮箱在这里创建
    let mailbox = Mailbox::new();
    let mut dispatcher = MethodDispatcher::new(config, mailbox.clone());

    let call = |dispatcher: &mut MethodDispatcher, method: &str, args: Value| {
        dispatcher.handle_method_call(&MethodCall::new(method, args))
    };

    call(&mut dispatcher, "create", json!(PLAYER_ID))?;

    let completed = Rc::new(Cell::new(false));
    let done = completed.clone();
    let channel = dispatcher.config().event_channel_name(PLAYER_ID);
    dispatcher.listen(
        &channel,
        Box::new(move |event: SinkEvent| {
            match &event {
                SinkEvent::Success(value) => {
                    info!("📡 事件: {}", value);
                    if value["event"] == "completed" {
                        done.set(true);
                    }
                }
                SinkEvent::Error { code, message, .. } => warn!("📡 错误事件 {}: {}", code, message),
                SinkEvent::EndOfStream => info!("📡 事件流结束"),
            }
        }),
    )?;

    call(
        &mut dispatcher,
        "setSourceUrl",
        json!({"playerId": PLAYER_ID, "url": "https://example.com/demo.mp3"}),
    )?;

    // 模拟解码线程上报时长
    let emitter = dispatcher
        .registry()
        .get(PLAYER_ID)
        .map(|player| player.emitter())
        .ok_or_else(|| anyhow::anyhow!("播放器 {} 不存在", PLAYER_ID))?;
    if thread::spawn(move || emitter.report_duration(1.5)).join().is_err() {
        warn!("⚠ 模拟解码线程异常退出");
    }

    call(&mut dispatcher, "resume", json!({"playerId": PLAYER_ID}))?;

    // 宿主消息循环
    let deadline = Instant::now() + Duration::from_secs(5);
    while !completed.get() && Instant::now() < deadline {
        mailbox.pump_timeout(Duration::from_millis(50));
    }

    if let Err(e) = call(&mut dispatcher, "unknown_method", json!({})) {
        info!("未知方法返回错误码: {}", e.code());
    }

    call(&mut dispatcher, "dispose", json!(PLAYER_ID))?;
    mailbox.pump();
    dispatcher.detach();

    info!("👋 演示结束");
    Ok(())
}
