use serde_json::Value;

use crate::core::SinkEvent;

/// 下游监听者（宿主框架的事件回调）
///
/// 实现不要求线程安全：邮箱保证所有回调只在所属线程上执行，
/// 且同一监听者不会被并发调用。
pub trait EventListener {
    fn success(&mut self, value: Value);

    fn error(&mut self, code: String, message: String, details: Option<Value>);

    fn end_of_stream(&mut self);

    /// 按事件类型转发到对应回调
    fn deliver(&mut self, event: SinkEvent) {
        match event {
            SinkEvent::Success(value) => self.success(value),
            SinkEvent::Error {
                code,
                message,
                details,
            } => self.error(code, message, details),
            SinkEvent::EndOfStream => self.end_of_stream(),
        }
    }
}

impl<F> EventListener for F
where
    F: FnMut(SinkEvent),
{
    fn success(&mut self, value: Value) {
        self(SinkEvent::Success(value))
    }

    fn error(&mut self, code: String, message: String, details: Option<Value>) {
        self(SinkEvent::Error {
            code,
            message,
            details,
        })
    }

    fn end_of_stream(&mut self) {
        self(SinkEvent::EndOfStream)
    }
}
