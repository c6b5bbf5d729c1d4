mod broadcaster;
mod message;
mod transport;

pub use broadcaster::PathBroadcaster;
pub use message::{PathUpdate, WireError};
pub use transport::{ObserverSet, PathTransport, TransportError};
