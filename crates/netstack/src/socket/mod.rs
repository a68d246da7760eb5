pub mod bindings;
pub mod tcp;

pub use self::bindings::SocketAddr;
pub use self::tcp::{ClientEvent, ClientState, TcpClient};
