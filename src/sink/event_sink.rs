use log::debug;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::core::SinkEvent;
use crate::sink::listener::EventListener;
use crate::sink::mailbox::{MailMessage, Mailbox, MailboxPoster, SinkId};

struct SinkState {
    queue: VecDeque<SinkEvent>,
    closed: bool,
}

/// sink 与邮箱共享的事件队列
pub(crate) struct SinkShared {
    state: Mutex<SinkState>,
}

impl SinkShared {
    fn new() -> Self {
        Self {
            state: Mutex::new(SinkState {
                queue: VecDeque::new(),
                closed: false,
            }),
        }
    }

    /// 取出当前全部排队事件；已关闭时返回 None
    pub(crate) fn take_batch(&self) -> Option<VecDeque<SinkEvent>> {
        let mut state = self.state.lock();
        if state.closed {
            None
        } else {
            Some(std::mem::take(&mut state.queue))
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// 关闭并清空队列，返回丢弃的事件数
    fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;
        let dropped = state.queue.len();
        state.queue.clear();
        dropped
    }
}

/// 线程安全的事件 sink
///
/// 任意线程都可以调用 `success` / `error` / `end_of_stream`：事件在短临界区内入队，
/// 随后向邮箱投递一次唤醒。监听者只会在邮箱所属线程的 `pump()` 中按入队顺序被调用。
///
/// 销毁时清空队列并通知邮箱释放监听者，尚未分发的事件全部丢弃。
pub struct ThreadSafeEventSink {
    id: SinkId,
    shared: Arc<SinkShared>,
    poster: MailboxPoster,
}

impl ThreadSafeEventSink {
    /// 在邮箱所属线程上绑定监听者
    pub fn new(mailbox: &Mailbox, listener: Box<dyn EventListener>) -> Self {
        let shared = Arc::new(SinkShared::new());
        let (id, poster) = mailbox.register(shared.clone(), listener);
        Self { id, shared, poster }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn success(&self, value: Value) {
        self.post(SinkEvent::Success(value));
    }

    pub fn error(&self, code: impl Into<String>, message: impl Into<String>, details: Option<Value>) {
        self.post(SinkEvent::Error {
            code: code.into(),
            message: message.into(),
            details,
        });
    }

    /// 结束标记；之后的调用仍然会被接受并投递（邮箱已销毁时除外）
    pub fn end_of_stream(&self) {
        self.post(SinkEvent::EndOfStream);
    }

    /// 入队并唤醒所属线程
    pub fn post(&self, event: SinkEvent) {
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return;
            }
            state.queue.push_back(event);
        }
        if let Err(e) = self.poster.post(MailMessage::Wake(self.id)) {
            let dropped = self.shared.close();
            debug!("{}，关闭 sink 并丢弃 {} 个事件", e, dropped);
        }
    }

    /// 尚未分发的事件数
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }
}

impl Drop for ThreadSafeEventSink {
    fn drop(&mut self) {
        let dropped = self.shared.close();
        if dropped > 0 {
            debug!("sink #{} 销毁，丢弃 {} 个未分发事件", self.id, dropped);
        }
        let _ = self.poster.post(MailMessage::Detach(self.id));
    }
}

impl std::fmt::Debug for ThreadSafeEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadSafeEventSink")
            .field("id", &self.id)
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn recording_sink(mailbox: &Mailbox) -> (ThreadSafeEventSink, Rc<RefCell<Vec<SinkEvent>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let sink = ThreadSafeEventSink::new(
            mailbox,
            Box::new(move |event: SinkEvent| log.borrow_mut().push(event)),
        );
        (sink, seen)
    }

    #[test]
    fn test_fifo_across_call_forms() {
        let mailbox = Mailbox::new();
        let (sink, seen) = recording_sink(&mailbox);

        sink.success(json!({"n": 1}));
        sink.error("E", "bad", Some(json!({"why": "x"})));
        sink.success(json!({"n": 2}));
        sink.end_of_stream();

        // 入队后、pump 之前不会有任何回调
        assert!(seen.borrow().is_empty());
        assert_eq!(mailbox.pump(), 4);

        assert_eq!(
            *seen.borrow(),
            vec![
                SinkEvent::Success(json!({"n": 1})),
                SinkEvent::Error {
                    code: "E".into(),
                    message: "bad".into(),
                    details: Some(json!({"why": "x"})),
                },
                SinkEvent::Success(json!({"n": 2})),
                SinkEvent::EndOfStream,
            ]
        );
    }

    #[test]
    fn test_calls_after_end_of_stream_are_accepted() {
        let mailbox = Mailbox::new();
        let (sink, seen) = recording_sink(&mailbox);

        sink.end_of_stream();
        sink.success(json!("late"));
        mailbox.pump();

        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_multi_thread_enqueue_order_equals_delivery_order() {
        let mailbox = Mailbox::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let sink = Arc::new(ThreadSafeEventSink::new(
            &mailbox,
            Box::new(move |event: SinkEvent| log.borrow_mut().push(event)),
        ));

        // 记录与入队在同一把锁内完成，记录顺序即入队顺序
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();
        for t in 0..4 {
            let sink = sink.clone();
            let order = order.clone();
            handles.push(thread::spawn(move || {
                for i in 0..200 {
                    let value = json!({"thread": t, "i": i});
                    let mut order = order.lock();
                    order.push(value.clone());
                    sink.success(value);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.borrow().len() < 800 && Instant::now() < deadline {
            mailbox.pump_timeout(Duration::from_millis(10));
        }

        let delivered: Vec<Value> = seen
            .borrow()
            .iter()
            .map(|event| match event {
                SinkEvent::Success(value) => value.clone(),
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(delivered, *order.lock());
    }

    #[test]
    fn test_drop_before_drain_delivers_nothing() {
        let mailbox = Mailbox::new();
        let (sink, seen) = recording_sink(&mailbox);

        for i in 0..10 {
            sink.success(json!(i));
        }
        assert_eq!(sink.pending(), 10);
        drop(sink);

        assert_eq!(mailbox.pump(), 0);
        assert!(seen.borrow().is_empty());
        assert_eq!(mailbox.live_sinks(), 0);
    }

    #[test]
    fn test_drain_before_drop_delivers_everything() {
        let mailbox = Mailbox::new();
        let (sink, seen) = recording_sink(&mailbox);

        for i in 0..10 {
            sink.success(json!(i));
        }
        mailbox.pump();
        drop(sink);
        mailbox.pump();

        assert_eq!(seen.borrow().len(), 10);
    }

    #[test]
    fn test_events_discarded_after_mailbox_teardown() {
        let mailbox = Mailbox::new();
        let (sink, _seen) = recording_sink(&mailbox);
        drop(mailbox);

        for i in 0..1000 {
            sink.success(json!(i));
        }
        sink.end_of_stream();
        assert_eq!(sink.pending(), 0);
        assert!(sink.shared.is_closed());
    }

    #[test]
    fn test_drop_during_delivery_keeps_taken_batch_whole() {
        let mailbox = Mailbox::new();
        let (go_tx, go_rx) = crossbeam_channel::bounded::<()>(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        let sink = ThreadSafeEventSink::new(
            &mailbox,
            Box::new(move |event: SinkEvent| {
                if log.borrow().is_empty() {
                    // 第一次回调时让另一个线程销毁 sink，并等待其完成
                    go_tx.send(()).unwrap();
                    done_rx.recv().unwrap();
                }
                log.borrow_mut().push(event);
            }),
        );
        for i in 0..5 {
            sink.success(json!(i));
        }

        let handle = thread::spawn(move || {
            go_rx.recv().unwrap();
            drop(sink);
            done_tx.send(()).unwrap();
        });

        assert_eq!(mailbox.pump(), 5);
        handle.join().unwrap();
        assert_eq!(seen.borrow().len(), 5);

        mailbox.pump();
        assert_eq!(mailbox.live_sinks(), 0);
    }

    #[test]
    fn test_listener_may_enqueue_reentrantly() {
        let mailbox = Mailbox::new();
        let slot: Rc<RefCell<Option<Arc<ThreadSafeEventSink>>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let slot_in = slot.clone();
        let log = seen.clone();
        let sink = Arc::new(ThreadSafeEventSink::new(
            &mailbox,
            Box::new(move |event: SinkEvent| {
                if event == SinkEvent::Success(json!("ping")) {
                    if let Some(sink) = slot_in.borrow().as_ref() {
                        sink.success(json!("pong"));
                    }
                }
                log.borrow_mut().push(event);
            }),
        ));
        *slot.borrow_mut() = Some(sink.clone());

        sink.success(json!("ping"));
        assert_eq!(mailbox.pump(), 1);
        assert_eq!(mailbox.pump(), 1);
        assert_eq!(
            *seen.borrow(),
            vec![SinkEvent::Success(json!("ping")), SinkEvent::Success(json!("pong"))]
        );
        slot.borrow_mut().take();
    }

    #[test]
    fn test_sinks_do_not_block_each_other() {
        let mailbox = Mailbox::new();
        let (first, _) = recording_sink(&mailbox);
        let (second, _) = recording_sink(&mailbox);
        let first = Arc::new(first);
        let second = Arc::new(second);

        // 持有第一个 sink 的队列锁时，另一个线程仍能向第二个 sink 入队
        let guard = first.shared.state.lock();
        let other = second.clone();
        let handle = thread::spawn(move || {
            other.success(json!("free"));
        });
        handle.join().unwrap();
        drop(guard);

        assert_eq!(second.pending(), 1);
        assert_eq!(first.pending(), 0);
    }
}
