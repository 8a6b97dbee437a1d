//! Helpers shared by the unit tests.

use std::{
    io::{BufRead, BufReader, ErrorKind, Write},
    net::{TcpListener, TcpStream},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// How long the server waits for its one request.
const ACCEPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll for a connection until `timeout` passes.
fn accept_within(listener: &TcpListener, timeout: Duration) -> Option<TcpStream> {
    listener.set_nonblocking(true).unwrap();
    let deadline = Instant::now() + timeout;
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false).unwrap();
                stream.set_read_timeout(Some(timeout)).unwrap();
                return Some(stream);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock && Instant::now() < deadline => {
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => return None,
            Err(e) => panic!("accept failed: {}", e),
        }
    }
}

/// Answer exactly one HTTP request on a loopback port with `status` and
/// `body`.  Returns the URL to request and the server thread.  The thread
/// gives up if no request arrives within [`ACCEPT_TIMEOUT`].
pub fn serve_once(status: u16, body: &[u8]) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!(
        "http://{}/annual-enterprise.csv",
        listener.local_addr().unwrap()
    );
    let body = body.to_vec();
    let handle = thread::spawn(move || {
        let Some(mut stream) = accept_within(&listener, ACCEPT_TIMEOUT) else {
            return;
        };
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        // request line and headers, up to the blank line
        while reader.read_line(&mut line).unwrap() > 0 {
            if line == "\r\n" || line == "\n" {
                break;
            }
            line.clear();
        }
        let head = format!(
            "HTTP/1.1 {} Status\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        );
        stream.write_all(head.as_bytes()).unwrap();
        stream.write_all(&body).unwrap();
        stream.flush().unwrap();
    });
    (url, handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gives_up_without_a_request() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let started = Instant::now();
        assert!(accept_within(&listener, Duration::from_millis(50)).is_none());
        assert!(started.elapsed() < ACCEPT_TIMEOUT);
    }
}
