use wiretree_binary::WireError;
use wiretree_core::FormatError;

/// Errors the RPC client can surface, grounded on cxxtools `RemoteException`,
/// `IOTimeout`, `IOError`, and the `std::logic_error`s thrown by the async
/// path when it's misused without a selector or with a call already running.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("{message}")]
    Remote { code: i32, message: String },

    #[error("reading result failed")]
    ReadingResultFailed,

    #[error("io timeout")]
    IoTimeout,

    #[error("{0}")]
    Logic(String),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("{0}")]
    Format(FormatError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RpcError {
    /// `true` for failures that warrant the one-reconnect-then-retry dance;
    /// a server-level `RemoteException` is not a transport failure and must
    /// never trigger a reconnect.
    pub(crate) fn is_transport_failure(&self) -> bool {
        !matches!(self, RpcError::Remote { .. })
    }
}
