pub mod connection;
pub mod queue;
pub mod transport;

pub use connection::{
    CommandEvent, Connection, ConnectionConfig, DEFAULT_MAX_FAILURES, DispatchPhase, EventSender,
};
pub use queue::{CommandQueue, Enqueued, PendingCommand};
pub use transport::{Endpoint, TcpTransport, Transport, encode_frame};
