use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::process;
use std::rc::Rc;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use crate::core::{BridgeError, Result};
use crate::sink::event_sink::SinkShared;
use crate::sink::listener::EventListener;

fn log_ctx() -> String {
    format!("[pid:{} tid:{:?}]", process::id(), thread::current().id())
}

pub(crate) type SinkId = u64;

/// 宿主唤醒回调：有新消息时调用，用来提醒宿主的原生消息循环尽快调用 `pump()`
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// 邮箱消息
pub(crate) enum MailMessage {
    /// 对应 sink 有新事件入队
    Wake(SinkId),
    /// 对应 sink 已销毁，释放监听者
    Detach(SinkId),
}

impl MailMessage {
    fn sink_id(&self) -> SinkId {
        match self {
            MailMessage::Wake(id) | MailMessage::Detach(id) => *id,
        }
    }
}

/// 邮箱投递端（可跨线程 clone）
#[derive(Clone)]
pub(crate) struct MailboxPoster {
    tx: Sender<MailMessage>,
    waker: Option<Waker>,
}

impl MailboxPoster {
    pub(crate) fn post(&self, message: MailMessage) -> Result<()> {
        let id = message.sink_id();
        self.tx
            .send(message)
            .map_err(|_| BridgeError::DispatchTargetGone(id))?;
        if let Some(waker) = &self.waker {
            waker();
        }
        Ok(())
    }
}

/// 分发目标：sink 的队列 + 绑定的监听者（只在所属线程上访问）
struct DispatchTarget {
    shared: Arc<SinkShared>,
    listener: Box<dyn EventListener>,
}

struct MailboxInner {
    owner: ThreadId,
    poster: MailboxPoster,
    rx: Receiver<MailMessage>,
    targets: RefCell<HashMap<SinkId, DispatchTarget>>,
    next_id: Cell<SinkId>,
}

/// 线程亲和邮箱
///
/// 创建邮箱的线程即为“所属线程”。`Mailbox` 基于 `Rc`，既不是 `Send` 也不是 `Sync`，
/// 因此监听者的绑定和回调在编译期就被限制在所属线程上。
/// 其他线程只能通过 sink 投递唤醒消息；宿主在自己的消息循环里调用 `pump()` 完成分发。
#[derive(Clone)]
pub struct Mailbox {
    inner: Rc<MailboxInner>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// 带唤醒回调的邮箱（用于接入宿主原生消息循环）
    pub fn with_waker<F>(waker: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(Some(Arc::new(waker)))
    }

    fn build(waker: Option<Waker>) -> Self {
        let (tx, rx) = unbounded();
        info!("{} 📬 创建事件邮箱", log_ctx());
        Self {
            inner: Rc::new(MailboxInner {
                owner: thread::current().id(),
                poster: MailboxPoster { tx, waker },
                rx,
                targets: RefCell::new(HashMap::new()),
                next_id: Cell::new(1),
            }),
        }
    }

    /// 所属线程
    pub fn owner(&self) -> ThreadId {
        self.inner.owner
    }

    /// 当前仍绑定监听者的 sink 数量
    pub fn live_sinks(&self) -> usize {
        self.inner
            .targets
            .borrow()
            .values()
            .filter(|target| !target.shared.is_closed())
            .count()
    }

    /// 尚未处理的邮箱消息数
    pub fn pending(&self) -> usize {
        self.inner.rx.len()
    }

    pub(crate) fn register(
        &self,
        shared: Arc<SinkShared>,
        listener: Box<dyn EventListener>,
    ) -> (SinkId, MailboxPoster) {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .targets
            .borrow_mut()
            .insert(id, DispatchTarget { shared, listener });
        debug!("{} 🔗 绑定 sink #{}", log_ctx(), id);
        (id, self.inner.poster.clone())
    }

    /// 处理调用时已在邮箱中的全部消息，返回投递给监听者的事件数
    ///
    /// 监听者回调期间新投递的消息留给下一次 `pump()`。
    pub fn pump(&self) -> usize {
        let budget = self.inner.rx.len();
        let mut delivered = 0;
        for _ in 0..budget {
            match self.inner.rx.try_recv() {
                Ok(message) => delivered += self.handle(message),
                Err(_) => break,
            }
        }
        delivered
    }

    /// 最多阻塞 `timeout` 等待第一条消息，随后处理所有已到达的消息
    pub fn pump_timeout(&self, timeout: Duration) -> usize {
        match self.inner.rx.recv_timeout(timeout) {
            Ok(message) => self.handle(message) + self.pump(),
            Err(_) => 0,
        }
    }

    fn handle(&self, message: MailMessage) -> usize {
        match message {
            MailMessage::Wake(id) => self.dispatch(id),
            MailMessage::Detach(id) => {
                if self.inner.targets.borrow_mut().remove(&id).is_some() {
                    debug!("{} 🔌 释放 sink #{} 的监听者", log_ctx(), id);
                }
                0
            }
        }
    }

    fn dispatch(&self, id: SinkId) -> usize {
        // 回调期间不持有 targets 的借用，监听者可以重入（再次入队、绑定新 sink）
        let target = self.inner.targets.borrow_mut().remove(&id);
        let Some(mut target) = target else {
            debug!("{} 🗑 {}，丢弃唤醒", log_ctx(), BridgeError::DispatchTargetGone(id));
            return 0;
        };

        // 已取出的批次整体投递，sink 在投递期间被销毁只影响之后的事件
        let mut delivered = 0;
        if let Some(batch) = target.shared.take_batch() {
            for event in batch {
                target.listener.deliver(event);
                delivered += 1;
            }
        }

        if target.shared.is_closed() {
            debug!("{} 🔌 sink #{} 已关闭，释放监听者", log_ctx(), id);
        } else {
            self.inner.targets.borrow_mut().insert(id, target);
        }
        delivered
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MailboxInner {
    fn drop(&mut self) {
        let remaining = self.targets.get_mut().len();
        if remaining > 0 {
            warn!("{} ⚠ 邮箱销毁时仍有 {} 个监听者，后续事件将被丢弃", log_ctx(), remaining);
        }
    }
}
