//! Black-box tests driving `Client` against a real loopback `TcpListener`,
//! grounded on `tyler-potyondy-nrf-rpc/tests/integration_test.rs`'s pattern
//! of a mock transport that records/replays whole frames. These scenarios
//! span `wiretree-core` (container blanket impls), `wiretree-binary` (wire
//! codec) and `wiretree-rpc` (client lifecycle), so they live here rather
//! than as a unit test inside a single module.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use wiretree_binary::wire;
use wiretree_core::Node;
use wiretree_rpc::Client;

fn read_request_frame(socket: &mut TcpStream) {
    let mut byte = [0u8; 1];
    loop {
        if socket.read_exact(&mut byte).is_err() {
            return;
        }
        if byte[0] == wire::TERMINATOR {
            return;
        }
    }
}

fn int_array_reply(values: &[i64]) -> Vec<u8> {
    let mut reply = vec![wire::RPC_REPLY_OK, wire::CATEGORY_ARRAY, wire::NAME_TERMINATOR, wire::PLAIN_ARRAY];
    for v in values {
        reply.push(wire::PLAIN_INT8);
        reply.push(*v as u8);
    }
    reply.push(wire::TERMINATOR); // closes the array body
    reply.push(wire::TERMINATOR); // closes the reply frame
    reply
}

#[test]
fn vector_argument_and_array_result_round_trip_over_real_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        read_request_frame(&mut socket);
        socket.write_all(&int_array_reply(&[1, 2, 3])).unwrap();
    });

    let mut client = Client::new("127.0.0.1", port);
    let args: Vec<i64> = vec![10, 20, 30];
    let mut result: Vec<i64> = Vec::new();
    client.call("sum_each", &[&args], &mut result).unwrap();

    assert_eq!(result, vec![1, 2, 3]);
}

#[test]
fn domain_scoped_call_reaches_the_server() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        let mut buf = [0u8; 512];
        let n = socket.read(&mut buf).unwrap();
        let frame = &buf[..n];

        assert_eq!(frame[0], wire::RPC_REQUEST_DOMAIN);
        let rest = &frame[1..];
        let domain_end = rest.iter().position(|&b| b == 0).unwrap();
        assert_eq!(&rest[..domain_end], b"billing");

        let reply = vec![wire::RPC_REPLY_OK, wire::PLAIN_INT8, 0x2a, wire::TERMINATOR];
        socket.write_all(&reply).unwrap();
    });

    let mut client = Client::new("127.0.0.1", port).with_domain("billing");
    let mut result = Node::void();
    client.call("answer", &[], &mut result).unwrap();

    assert_eq!(result.as_i64().unwrap(), 42);
}

#[test]
fn client_reconnects_once_after_server_drops_idle_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        // First connection: answer once, then close immediately so the
        // cached socket is dead by the time the client's second call uses it.
        let (mut first, _) = listener.accept().unwrap();
        read_request_frame(&mut first);
        let reply = vec![wire::RPC_REPLY_OK, wire::PLAIN_INT8, 0x01, wire::TERMINATOR];
        first.write_all(&reply).unwrap();
        drop(first);

        // Second connection: the client's reconnect-and-retry.
        let (mut second, _) = listener.accept().unwrap();
        read_request_frame(&mut second);
        let reply = vec![wire::RPC_REPLY_OK, wire::PLAIN_INT8, 0x02, wire::TERMINATOR];
        second.write_all(&reply).unwrap();
    });

    let mut client = Client::new("127.0.0.1", port);

    let mut first_result = Node::void();
    client.call("ping", &[], &mut first_result).unwrap();
    assert_eq!(first_result.as_i64().unwrap(), 1);

    let mut second_result = Node::void();
    client.call("ping", &[], &mut second_result).unwrap();
    assert_eq!(second_result.as_i64().unwrap(), 2);
}

#[test]
fn two_consecutive_transport_failures_surface_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        // First connection: reply once, then the socket goes stale.
        let (mut first, _) = listener.accept().unwrap();
        read_request_frame(&mut first);
        let reply = vec![wire::RPC_REPLY_OK, wire::PLAIN_INT8, 0x01, wire::TERMINATOR];
        first.write_all(&reply).unwrap();
        drop(first);

        // Second connection (the reconnect attempt): accept and immediately
        // close without replying, so the retry also fails.
        let (second, _) = listener.accept().unwrap();
        drop(second);
    });

    let mut client = Client::new("127.0.0.1", port);

    let mut first_result = Node::void();
    client.call("ping", &[], &mut first_result).unwrap();
    assert_eq!(first_result.as_i64().unwrap(), 1);

    let mut second_result = Node::void();
    let err = client.call("ping", &[], &mut second_result).unwrap_err();
    assert!(!matches!(err, wiretree_rpc::RpcError::Remote { .. }));
}

#[test]
fn remote_exception_does_not_trigger_a_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        let (mut socket, _) = listener.accept().unwrap();
        read_request_frame(&mut socket);

        let mut reply = vec![wire::RPC_REPLY_ERROR];
        reply.extend_from_slice(&7i32.to_be_bytes());
        reply.extend_from_slice(b"no such procedure\0");
        reply.push(wire::TERMINATOR);
        socket.write_all(&reply).unwrap();

        // No second accept(): if the client tried to reconnect here, this
        // thread would hang forever, failing the test by timeout.
    });

    let mut client = Client::new("127.0.0.1", port);
    let mut result = Node::void();
    let err = client.call("missing", &[], &mut result).unwrap_err();

    match err {
        wiretree_rpc::RpcError::Remote { code, message } => {
            assert_eq!(code, 7);
            assert_eq!(message, "no such procedure");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
