// 跨线程事件投递：任意线程入队，所属线程分发

pub mod event_sink;
pub mod listener;
pub mod mailbox;

pub use event_sink::ThreadSafeEventSink;
pub use listener::EventListener;
pub use mailbox::{Mailbox, Waker};
