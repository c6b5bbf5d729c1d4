use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Ready on the next tick, see [yield_now]
pub struct YieldNow(bool);

/// Suspends the current task until the next tick
pub fn yield_now() -> YieldNow {
    YieldNow(false)
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if std::mem::replace(&mut self.0, true) {
            Poll::Ready(())
        } else {
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
