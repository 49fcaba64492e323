//! Minimal HTTP/1.1 portal for driving the real client in integration tests.
//!
//! The login POST answers with a redirect that sets the session cookie. The
//! landing page, the listing page and the archive endpoint all require it.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use reqwest::Url;

use super::{HOME_HTML, LISTING_HTML, LOGIN_HTML};

pub const EMAIL: &str = "gis@example.org";
pub const PASSWORD: &str = "s3cret";
const SESSION_COOKIE: &str = "ASPXAUTH=session-token";
const PASSWORD_FIELD: &str = "ctl00$MainContent$Password";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedRequest {
    pub method: String,
    pub path: String,
    pub had_cookie: bool,
}

pub struct PortalServer {
    pub base: Url,
    requests: Arc<Mutex<Vec<ServedRequest>>>,
}

impl PortalServer {
    pub fn requests(&self) -> Vec<ServedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_to(&self, path: &str) -> Option<ServedRequest> {
        self.requests()
            .into_iter()
            .find(|request| request.path == path)
    }
}

/// Starts the portal in a background thread. Archives are keyed by the `Name`
/// query parameter; any other name answers 404. Runs until the process exits.
pub fn start(archives: HashMap<String, Vec<u8>>) -> PortalServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let archives = Arc::new(archives);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let archives = Arc::clone(&archives);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &archives, &log));
        }
    });
    PortalServer {
        base: Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap(),
        requests,
    }
}

struct Request {
    method: String,
    target: Url,
    cookie: Option<String>,
    body: String,
}

fn handle(
    mut stream: TcpStream,
    archives: &HashMap<String, Vec<u8>>,
    log: &Mutex<Vec<ServedRequest>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(request) = read_request(&mut stream) else {
        return;
    };
    let signed_in = request
        .cookie
        .as_deref()
        .is_some_and(|cookie| cookie.split(';').any(|pair| pair.trim() == SESSION_COOKIE));
    log.lock().unwrap().push(ServedRequest {
        method: request.method.clone(),
        path: request.target.path().to_string(),
        had_cookie: signed_in,
    });

    let html = "text/html; charset=utf-8";
    match (request.method.as_str(), request.target.path()) {
        ("GET", "/Account/Login") => {
            respond(&mut stream, "200 OK", html, &[], LOGIN_HTML.as_bytes());
        }
        ("POST", "/Account/Login") => {
            if form_value(&request.body, PASSWORD_FIELD).as_deref() == Some(PASSWORD) {
                let cookie = format!("Set-Cookie: {SESSION_COOKIE}; Path=/; HttpOnly");
                respond(
                    &mut stream,
                    "302 Found",
                    html,
                    &["Location: /Default.aspx", cookie.as_str()],
                    b"",
                );
            } else {
                respond(&mut stream, "200 OK", html, &[], LOGIN_HTML.as_bytes());
            }
        }
        ("GET", "/Default.aspx" | "/gisdtview.aspx") => {
            let page = match (signed_in, request.target.path()) {
                (false, _) => LOGIN_HTML,
                (true, "/Default.aspx") => HOME_HTML,
                (true, _) => LISTING_HTML,
            };
            respond(&mut stream, "200 OK", html, &[], page.as_bytes());
        }
        ("GET", "/GetFSFile.aspx") if !signed_in => {
            respond(&mut stream, "401 Unauthorized", "text/plain", &[], b"login required");
        }
        ("GET", "/GetFSFile.aspx") => {
            let name = request
                .target
                .query_pairs()
                .find(|(key, _)| key == "Name")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_default();
            match archives.get(&name) {
                Some(bytes) => respond(
                    &mut stream,
                    "200 OK",
                    "application/x-zip-compressed",
                    &[],
                    bytes,
                ),
                None => {
                    respond(&mut stream, "404 Not Found", "text/plain", &[], b"file not found");
                }
            }
        }
        _ => respond(&mut stream, "404 Not Found", "text/plain", &[], b"no such page"),
    }
}

fn respond(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    headers: &[&str],
    body: &[u8],
) {
    let mut head = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n",
        body.len()
    );
    head.push_str("Connection: close\r\n");
    for header in headers {
        head.push_str(header);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn read_request(stream: &mut TcpStream) -> Option<Request> {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buf[..n]);
    };

    let head = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = Url::parse(&format!("http://portal.local{}", request_line.next()?)).ok()?;

    let mut cookie = None;
    let mut content_length = 0usize;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "cookie" => cookie = Some(value.trim().to_string()),
            "content-length" => content_length = value.trim().parse().unwrap_or(0),
            _ => {}
        }
    }

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }
    let end = data.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&data[header_end..end]).into_owned();

    Some(Request {
        method,
        target,
        cookie,
        body,
    })
}

fn form_value(body: &str, field: &str) -> Option<String> {
    let parsed = Url::parse(&format!("http://portal.local/?{body}")).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == field)
        .map(|(_, value)| value.into_owned())
}
