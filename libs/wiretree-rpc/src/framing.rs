use wiretree_binary::{BinaryFormatter, wire};
use wiretree_core::Decomposer;

use crate::error::RpcError;

/// Builds `\xc0 name \0 args... \xff` (no domain) or
/// `\xc3 domain \0 name \0 args... \xff`, each argument plain-coded. Shared
/// by the sync and async clients (spec §4.1 RPC framing layer).
pub(crate) fn prepare_request(
    domain: &Option<String>,
    method: &str,
    args: &[&dyn Decomposer],
) -> Result<Vec<u8>, RpcError> {
    let mut buf = Vec::new();
    match domain {
        None => buf.push(wire::RPC_REQUEST_NO_DOMAIN),
        Some(domain) => {
            buf.push(wire::RPC_REQUEST_DOMAIN);
            buf.extend_from_slice(domain.as_bytes());
            buf.push(wire::NAME_TERMINATOR);
        }
    }
    buf.extend_from_slice(method.as_bytes());
    buf.push(wire::NAME_TERMINATOR);

    let mut formatter = BinaryFormatter::new(buf);
    for arg in args {
        arg.decompose("", &mut formatter).map_err(RpcError::Format)?;
    }
    let mut buf = formatter.into_inner();
    buf.push(wire::TERMINATOR);
    Ok(buf)
}
