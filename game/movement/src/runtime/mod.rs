mod cancel;
mod futures;
mod runtime;

pub use self::cancel::CancellationToken;
pub use self::futures::{yield_now, YieldNow};
pub use runtime::{Runtime, Task, TaskHandle, TaskRef};
