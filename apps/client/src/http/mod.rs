pub mod client;
pub mod transport;

pub use client::AuthenticatedClient;
pub use transport::{
    Method, OutboundRequest, ReqwestTransport, Transport, TransportError, TransportResponse,
};
