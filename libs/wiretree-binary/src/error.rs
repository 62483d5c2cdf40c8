use wiretree_core::TreeError;

/// Failure kinds surfaced by the binary parser, formatter and scanner.
///
/// Mirrors the cxxtools bin scanner/parser failure signals: an unknown
/// leading type code, a truncated payload, an invalid BCD nibble.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("unexpected type code 0x{0:02x}")]
    UnexpectedTypeCode(u8),

    #[error("unexpected end of stream")]
    UnexpectedEnd,

    #[error("invalid bcd nibble 0x{0:x}")]
    InvalidBcdNibble(u8),

    #[error("invalid floating point sentinel byte 0x{0:02x}")]
    InvalidFloatSentinel(u8),

    #[error("malformed utf-8 in binary stream")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("value conversion failed: {0}")]
    Conversion(String),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Format(#[from] wiretree_core::FormatError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Maps a short read against an in-memory buffer (used while the RPC
    /// client is still accumulating a reply) to a request for more bytes.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, WireError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof)
    }

    /// `true` when the underlying I/O failed because a socket read/write
    /// timeout set by the caller (e.g. `TcpStream::set_read_timeout`) elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            WireError::Io(e) if e.kind() == std::io::ErrorKind::WouldBlock
                || e.kind() == std::io::ErrorKind::TimedOut
        )
    }
}
