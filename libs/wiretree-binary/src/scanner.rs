//! RPC reply scanner: the framing layer above a bare value, grounded on
//! cxxtools `bin::Scanner` (`state_0`/`state_value`/`state_errorcode`/
//! `state_errormessage`/`state_end`). Reads a leader byte (`\x41` success,
//! `\x42` error), then either a parsed value or a 4-byte error code plus a
//! NUL-terminated message, and always a trailing `\xff`.

use crate::error::WireError;
use crate::parser::BinaryParser;
use crate::wire;
use std::io::Read;
use wiretree_core::Composer;

/// What a reply frame turned out to contain. The error code/message is
/// handed back as data rather than bundled into `WireError`, since
/// "the server raised an application error" isn't a wire-framing failure —
/// the RPC client maps it onto its own `RemoteException`-equivalent.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    Success,
    Error { code: i32, message: String },
}

pub struct Scanner {
    parser: BinaryParser,
}

impl Default for Scanner {
    fn default() -> Self {
        Scanner::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Scanner { parser: BinaryParser::new() }
    }

    /// Reads one full reply frame from `input`, filling `composer` on
    /// success. `composer` is left untouched on an error reply.
    pub fn read_reply<R: Read>(
        &self,
        input: &mut R,
        composer: &mut dyn Composer,
    ) -> Result<ReplyOutcome, WireError> {
        match wire::read_u8(input)? {
            wire::RPC_REPLY_OK => {
                self.parser.parse_root(input, composer)?;
                wire::expect_terminator(input)?;
                tracing::debug!("reply finished");
                Ok(ReplyOutcome::Success)
            }
            wire::RPC_REPLY_ERROR => {
                let mut code_bytes = [0u8; 4];
                input.read_exact(&mut code_bytes)?;
                let code = i32::from_be_bytes(code_bytes);
                let message = wire::read_cstring(input)?;
                wire::expect_terminator(input)?;
                tracing::debug!(code, message = %message, "reply finished with error");
                Ok(ReplyOutcome::Error { code, message })
            }
            other => Err(WireError::UnexpectedTypeCode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use wiretree_core::Node;

    #[test]
    fn success_reply_parses_value() {
        let mut bytes = vec![wire::RPC_REPLY_OK, wire::PLAIN_INT8, 0x05, wire::TERMINATOR];
        let mut cursor = Cursor::new(std::mem::take(&mut bytes));
        let mut node = Node::void();
        let outcome = Scanner::new().read_reply(&mut cursor, &mut node).unwrap();
        assert_eq!(outcome, ReplyOutcome::Success);
        assert_eq!(node.as_i64().unwrap(), 5);
    }

    #[test]
    fn error_reply_carries_code_and_message() {
        let mut bytes = vec![wire::RPC_REPLY_ERROR];
        bytes.extend_from_slice(&42i32.to_be_bytes());
        bytes.extend_from_slice(b"Boom\0");
        bytes.push(wire::TERMINATOR);

        let mut cursor = Cursor::new(bytes);
        let mut node = Node::void();
        let outcome = Scanner::new().read_reply(&mut cursor, &mut node).unwrap();
        assert_eq!(outcome, ReplyOutcome::Error { code: 42, message: "Boom".to_string() });
    }
}
