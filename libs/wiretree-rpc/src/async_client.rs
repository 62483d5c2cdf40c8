use std::cell::Cell;
use std::io::Write;
use std::marker::PhantomData;
use std::net::TcpStream;
use std::time::Duration;

use wiretree_binary::{ReplyOutcome, Scanner};
use wiretree_core::{Composer, Decomposer};

use crate::error::RpcError;
use crate::framing::prepare_request;

/// "At most one outstanding call" (spec §9) as a state enum rather than a
/// mutex: a second `call` while one is in flight is a logic error, not
/// something to serialize and wait out.
#[derive(Debug, PartialEq, Eq)]
enum CallState {
    Idle,
    InFlight,
}

/// Async RPC client. Where cxxtools drives a callback chain off a selector
/// (`onConnect`/`onOutput`/`onInput`), this follows spec §9's suggested Rust
/// substitute and uses `async`/`await` directly; the blocking wire-format
/// parser from `wiretree-binary` is run via `tokio::task::block_in_place`
/// rather than re-implemented as a byte-at-a-time push state machine, since
/// a retry-from-scratch-on-partial-read loop over a pull parser would
/// re-apply partially composed fields into `result` on every retry.
///
/// Deliberately `!Sync` (never implements it): spec §9's open question (b)
/// leaves `cancel()`-vs-in-flight-callback races undefined upstream, so this
/// adopts "cancel is only ever called from the same task driving the
/// client" and enforces it by construction rather than with runtime checks.
pub struct AsyncClient {
    addr: String,
    port: u16,
    domain: Option<String>,
    stream: Option<TcpStream>,
    scanner: Scanner,
    state: CallState,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    connect_timeout_set: bool,
    _not_sync: PhantomData<Cell<()>>,
}

impl AsyncClient {
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        AsyncClient {
            addr: addr.into(),
            port,
            domain: None,
            stream: None,
            scanner: Scanner::new(),
            state: CallState::Idle,
            timeout: None,
            connect_timeout: None,
            connect_timeout_set: false,
            _not_sync: PhantomData,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// `activeProcedure() != None`-equivalent (spec §8's RPC invariant).
    pub fn is_call_in_flight(&self) -> bool {
        self.state == CallState::InFlight
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

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

    pub async fn connect(&mut self) -> Result<(), RpcError> {
        let addr = self.addr.clone();
        let port = self.port;
        let connecting = tokio::net::TcpStream::connect((addr.as_str(), port));
        let stream = match self.connect_timeout {
            Some(t) => tokio::time::timeout(t, connecting)
                .await
                .map_err(|_| RpcError::IoTimeout)??,
            None => connecting.await?,
        };
        let stream = stream.into_std()?;
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        self.stream = Some(stream);
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.stream = None;
        self.state = CallState::Idle;
    }

    /// Bounds an in-flight call with a deadline, the async substitute for
    /// cxxtools `RpcClientImpl::wait` polling a selector. Takes the future to
    /// wait on rather than being a `&self` method, since `call` already holds
    /// `&mut self` for the duration of the request.
    pub async fn wait<F: std::future::Future>(msecs: Duration, call: F) -> Result<F::Output, RpcError> {
        tokio::time::timeout(msecs, call).await.map_err(|_| RpcError::IoTimeout)
    }

    /// Requires no outstanding call (spec §4.6.3 step 2); a selector is
    /// implicit in the surrounding tokio runtime rather than a field here.
    pub async fn call(
        &mut self,
        method: &str,
        args: &[&dyn Decomposer],
        result: &mut dyn Composer,
    ) -> Result<(), RpcError> {
        if self.state == CallState::InFlight {
            return Err(RpcError::Logic("asynchronous request already running".to_string()));
        }
        self.state = CallState::InFlight;

        let was_connected = self.is_connected();
        if !was_connected {
            self.connect().await?;
        }

        let outcome = match self.send_and_receive(method, args, result) {
            Ok(outcome) => Ok(outcome),
            Err(e) if was_connected && e.is_transport_failure() => {
                tracing::debug!(error = %e, "write failed, connection is not active any more");
                self.cancel();
                self.connect().await?;
                self.state = CallState::InFlight;
                match self.send_and_receive(method, args, result) {
                    Ok(outcome) => Ok(outcome),
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
        };

        self.state = CallState::Idle;
        match outcome? {
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
        let timeout = self.timeout;
        let stream = self.stream.as_mut().expect("connected by call()");
        let scanner = &self.scanner;
        tokio::task::block_in_place(move || -> Result<ReplyOutcome, RpcError> {
            stream.set_read_timeout(timeout)?;
            stream.set_write_timeout(timeout)?;
            stream.write_all(&request).map_err(map_io_timeout)?;
            stream.flush().map_err(map_io_timeout)?;
            scanner.read_reply(stream, result).map_err(|e| {
                if e.is_timeout() {
                    RpcError::IoTimeout
                } else if e.is_incomplete() {
                    RpcError::ReadingResultFailed
                } else {
                    RpcError::Wire(e)
                }
            })
        })
    }
}

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

    #[tokio::test(flavor = "multi_thread")]
    async fn async_call_round_trips_a_value() {
        let reply = vec![wire::RPC_REPLY_OK, wire::PLAIN_INT8, 0x05, wire::TERMINATOR];
        let port = spawn_server(reply);
        let mut client = AsyncClient::new("127.0.0.1", port);
        let arg: i64 = 5;
        let mut result = Node::void();
        client.call("echo", &[&arg], &mut result).await.unwrap();
        assert_eq!(result.as_i64().unwrap(), 5);
        assert!(!client.is_call_in_flight());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_call_while_in_flight_is_a_logic_error() {
        let mut client = AsyncClient::new("127.0.0.1", 1);
        client.state = CallState::InFlight;
        let mut result = Node::void();
        let err = client.call("echo", &[], &mut result).await.unwrap_err();
        assert!(matches!(err, RpcError::Logic(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn read_timeout_surfaces_as_io_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            let (_socket, _) = listener.accept().unwrap();
            thread::sleep(std::time::Duration::from_secs(2));
        });

        let mut client = AsyncClient::new("127.0.0.1", port);
        client.set_timeout(Some(std::time::Duration::from_millis(50)));
        let mut result = Node::void();
        let err = client.call("echo", &[], &mut result).await.unwrap_err();
        assert!(matches!(err, RpcError::IoTimeout));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn wait_bounds_a_slow_call() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            let (_socket, _) = listener.accept().unwrap();
            thread::sleep(std::time::Duration::from_secs(2));
        });

        let mut client = AsyncClient::new("127.0.0.1", port);
        let mut result = Node::void();
        let call = client.call("echo", &[], &mut result);
        let err = AsyncClient::wait(std::time::Duration::from_millis(50), call)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::IoTimeout));
    }
}
