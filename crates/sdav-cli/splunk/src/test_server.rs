use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Serves one canned HTTP response on a local port and hands back the raw
/// request it received.
pub struct OneShot {
    pub port: u16,
    pub request: mpsc::Receiver<String>,
}

pub fn respond(status_line: &str, body: &str) -> OneShot {
    serve(Some(format!(
        "HTTP/1.1 {}\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    )))
}

/// Accepts the connection but never answers.
pub fn hang() -> OneShot {
    serve(None)
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn serve(response: Option<String>) -> OneShot {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => raw.extend_from_slice(&buf[..n]),
            }
        }
        let _ = tx.send(String::from_utf8_lossy(&raw).into_owned());

        match response {
            Some(response) => {
                let _ = stream.write_all(response.as_bytes());
            }
            None => thread::sleep(Duration::from_secs(5)),
        }
    });

    OneShot { port, request: rx }
}
