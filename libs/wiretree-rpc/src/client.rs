use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use wiretree_binary::{ReplyOutcome, Scanner};
use wiretree_core::{Composer, Decomposer};

use crate::error::RpcError;
use crate::framing::prepare_request;

/// Synchronous RPC client over a TCP socket, grounded on cxxtools
/// `bin::RpcClientImpl::call` (the `src/bin/` copy, which carries the
/// domain-scoped framing and `wait`/`IOTimeout` — see DESIGN.md). The socket
/// is kept open between calls; a write or read failure on a reused
/// connection gets one reconnect-and-retry before surfacing to the caller.
pub struct Client {
    addr: String,
    port: u16,
    domain: Option<String>,
    stream: Option<TcpStream>,
    scanner: Scanner,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    connect_timeout_set: bool,
}

impl Client {
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Client {
            addr: addr.into(),
            port,
            domain: None,
            stream: None,
            scanner: Scanner::new(),
            timeout: None,
            connect_timeout: None,
            connect_timeout_set: false,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Sets the per-call read/write timeout. Mirrors cxxtools `timeout(Timespan)`:
    /// unless `connectTimeout` was set explicitly, it tracks this value too.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
        if !self.connect_timeout_set {
            self.connect_timeout = timeout;
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn set_connect_timeout(&mut self, timeout: Option<Duration>) {
        self.connect_timeout = timeout;
        self.connect_timeout_set = true;
    }

    pub fn connect(&mut self) -> Result<(), RpcError> {
        let addr = (self.addr.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| RpcError::Logic(format!("no address found for {}:{}", self.addr, self.port)))?;

        let stream = match self.connect_timeout {
            Some(t) => TcpStream::connect_timeout(&addr, t).map_err(map_io_timeout)?,
            None => TcpStream::connect(addr)?,
        };
        self.stream = Some(stream);
        Ok(())
    }

    /// Closes the socket and drops any partially-read reply state. Safe to
    /// call at any point; the caller must not race this against another
    /// thread driving the same client (spec §5 leaves that synchronization
    /// to the caller).
    pub fn cancel(&mut self) {
        self.stream = None;
    }

    /// Sync `Client` has no selector to wait on, so any call to `wait` is a
    /// logic error, mirroring cxxtools `RpcClientImpl::wait` when
    /// `_socket.selector() == 0`.
    pub fn wait(&self, _msecs: Duration) -> Result<(), RpcError> {
        Err(RpcError::Logic("cannot run async rpc request without a selector".to_string()))
    }

    /// Serializes the request, sends it, and blocks until a full reply frame
    /// arrives. `activeProcedure`-equivalent state is implicit in the
    /// call stack: there is no `Client` field tracking it, since a sync call
    /// cannot be interleaved with another on the same client.
    pub fn call(
        &mut self,
        method: &str,
        args: &[&dyn Decomposer],
        result: &mut dyn Composer,
    ) -> Result<(), RpcError> {
        let was_connected = self.is_connected();
        if !was_connected {
            self.connect()?;
        }

        match self.send_and_receive(method, args, result) {
            Ok(outcome) => Self::finish(outcome),
            Err(e) if was_connected && e.is_transport_failure() => {
                tracing::debug!(error = %e, "write failed, connection is not active any more");
                self.cancel();
                self.connect()?;
                match self.send_and_receive(method, args, result) {
                    Ok(outcome) => Self::finish(outcome),
                    Err(e) => {
                        self.cancel();
                        Err(e)
                    }
                }
            }
            Err(e) => {
                self.cancel();
                Err(e)
            }
        }
    }

    fn finish(outcome: ReplyOutcome) -> Result<(), RpcError> {
        match outcome {
            ReplyOutcome::Success => Ok(()),
            ReplyOutcome::Error { code, message } => Err(RpcError::Remote { code, message }),
        }
    }

    fn send_and_receive(
        &mut self,
        method: &str,
        args: &[&dyn Decomposer],
        result: &mut dyn Composer,
    ) -> Result<ReplyOutcome, RpcError> {
        let request = prepare_request(&self.domain, method, args)?;
        let stream = self.stream.as_mut().expect("connected by call()");
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        stream.write_all(&request).map_err(map_io_timeout)?;
        stream.flush().map_err(map_io_timeout)?;

        self.scanner.read_reply(stream, result).map_err(|e| {
            if e.is_timeout() {
                RpcError::IoTimeout
            } else if e.is_incomplete() {
                RpcError::ReadingResultFailed
            } else {
                RpcError::Wire(e)
            }
        })
    }
}

/// `TcpStream::connect_timeout` and timed reads/writes surface an elapsed
/// deadline as `WouldBlock`/`TimedOut`, not a dedicated error kind.
fn map_io_timeout(err: std::io::Error) -> RpcError {
    if err.kind() == std::io::ErrorKind::WouldBlock || err.kind() == std::io::ErrorKind::TimedOut {
        RpcError::IoTimeout
    } else {
        RpcError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;
    use wiretree_binary::wire;
    use wiretree_core::Node;

    fn spawn_server(reply: Vec<u8>) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf);
            socket.write_all(&reply).unwrap();
        });
        port
    }

    #[test]
    fn rpc_success_returns_value() {
        let reply = vec![wire::RPC_REPLY_OK, wire::PLAIN_INT8, 0x05, wire::TERMINATOR];
        let port = spawn_server(reply);
        let mut client = Client::new("127.0.0.1", port);
        let arg: i64 = 5;
        let mut result = Node::void();
        client.call("echo", &[&arg], &mut result).unwrap();
        assert_eq!(result.as_i64().unwrap(), 5);
    }

    #[test]
    fn read_timeout_surfaces_as_io_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            // Accept and never write a reply, so the client's read times out.
            let (_socket, _) = listener.accept().unwrap();
            thread::sleep(std::time::Duration::from_secs(2));
        });

        let mut client = Client::new("127.0.0.1", port);
        client.set_timeout(Some(std::time::Duration::from_millis(50)));
        let mut result = Node::void();
        let err = client.call("echo", &[], &mut result).unwrap_err();
        assert!(matches!(err, RpcError::IoTimeout));
    }

    #[test]
    fn wait_is_a_logic_error_without_a_selector() {
        let client = Client::new("127.0.0.1", 0);
        let err = client.wait(std::time::Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, RpcError::Logic(_)));
    }

    #[test]
    fn rpc_error_raises_remote_exception() {
        let mut reply = vec![wire::RPC_REPLY_ERROR];
        reply.extend_from_slice(&42i32.to_be_bytes());
        reply.extend_from_slice(b"Boom\0");
        reply.push(wire::TERMINATOR);
        let port = spawn_server(reply);
        let mut client = Client::new("127.0.0.1", port);
        let mut result = Node::void();
        let err = client.call("echo", &[], &mut result).unwrap_err();
        match err {
            RpcError::Remote { code, message } => {
                assert_eq!(code, 42);
                assert_eq!(message, "Boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
