//! RPC client transporting procedure calls over a TCP stream using the
//! binary wire codec, plus the bounded `LimitStream` and `hexdump` debug
//! helper that support it.

pub mod async_client;
pub mod client;
mod framing;
pub mod error;
pub mod hexdump;
pub mod limit_stream;

pub use async_client::AsyncClient;
pub use client::Client;
pub use error::RpcError;
pub use hexdump::hex_dump;
pub use limit_stream::LimitStream;
