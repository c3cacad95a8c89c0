pub mod transport;

pub use transport::{HttpTransport, HttpTransportConfig, HttpTransportError};
