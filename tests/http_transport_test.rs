//! Integration tests for the HTTP transport against a loopback endpoint

#[cfg(feature = "http")]
mod http_tests {
    use crossbeam_channel::{unbounded, Receiver};
    use listgenie_analytics::collector::{meta, EventCollector, Metadata, Platform};
    use listgenie_analytics::platform::{
        Connectivity, HttpTransport, HttpTransportConfig, MemoryStore, Transport,
    };
    use serde_json::{json, Value};
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{SocketAddr, TcpListener};
    use std::thread;
    use std::time::Duration;

    #[derive(Debug)]
    struct CapturedRequest {
        request_line: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl CapturedRequest {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Serve every connection with `status` and report what was received.
    fn spawn_endpoint(status: u16) -> (SocketAddr, Receiver<CapturedRequest>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind listener");
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = unbounded();

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                let mut reader = BufReader::new(stream.try_clone().unwrap());

                let mut request_line = String::new();
                if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
                    continue;
                }

                let mut headers = Vec::new();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                    if let Some((k, v)) = line.trim_end().split_once(':') {
                        headers.push((k.trim().to_string(), v.trim().to_string()));
                    }
                }

                let length = headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.parse::<usize>().ok())
                    .unwrap_or(0);
                let mut body = vec![0u8; length];
                let _ = reader.read_exact(&mut body);

                let response = format!(
                    "HTTP/1.1 {status} Status\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();

                let _ = tx.send(CapturedRequest {
                    request_line: request_line.trim_end().to_string(),
                    headers,
                    body: String::from_utf8_lossy(&body).to_string(),
                });
            }
        });

        (addr, rx)
    }

    fn transport(addr: SocketAddr) -> HttpTransport {
        HttpTransport::new(HttpTransportConfig::new(
            format!("http://{addr}/collect"),
            Duration::from_secs(5),
        ))
        .expect("Failed to create transport")
    }

    fn collector(transport: &HttpTransport, online: bool) -> EventCollector {
        let platform = Platform::new(transport.clone(), MemoryStore::new(), MemoryStore::new());
        EventCollector::new(platform, online)
    }

    fn next_post(rx: &Receiver<CapturedRequest>) -> CapturedRequest {
        loop {
            let request = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("No request reached the endpoint");
            if request.request_line.starts_with("POST") {
                return request;
            }
        }
    }

    #[test]
    fn test_page_view_is_posted() {
        let (addr, rx) = spawn_endpoint(200);
        let transport = transport(addr);
        assert!(transport.is_online());

        let mut collector = collector(&transport, true);
        collector.set_path("/pricing");
        collector.record("page_view", meta([("path", json!("/pricing"))]), false);

        assert!(transport.wait_idle(Duration::from_secs(5)));
        collector.reclaim();
        assert!(collector.pending().is_empty());

        let request = next_post(&rx);
        assert!(request.request_line.starts_with("POST /collect"));
        assert_eq!(request.header("content-type"), Some("application/json"));

        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["event"], "page_view");
        assert_eq!(body["path"], "/pricing");
        assert!(body["sessionId"].as_str().is_some_and(|s| !s.is_empty()));
    }

    #[test]
    fn test_error_status_is_queued() {
        let (addr, _rx) = spawn_endpoint(500);
        let transport = transport(addr);
        let mut collector = collector(&transport, true);

        collector.record("click", Metadata::new(), false);
        assert!(transport.wait_idle(Duration::from_secs(5)));
        collector.reclaim();

        assert_eq!(collector.pending().len(), 1);
        assert_eq!(collector.pending()[0].name(), "click");
    }

    #[test]
    fn test_unreachable_endpoint() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let transport = transport(addr);
        assert!(!transport.is_online());

        let mut collector = collector(&transport, true);
        collector.record("click", Metadata::new(), false);
        assert!(transport.wait_idle(Duration::from_secs(5)));
        collector.reclaim();

        assert_eq!(collector.pending().len(), 1);
    }

    #[test]
    fn test_beacon_outlives_transport() {
        let (addr, rx) = spawn_endpoint(200);
        let transport = transport(addr);

        {
            let mut collector = collector(&transport, true);
            collector.record("time_on_page", meta([("timeOnPage", json!(1234))]), true);
        }
        assert_eq!(transport.take_failed().len(), 0);
        drop(transport);

        let request = rx
            .recv_timeout(Duration::from_secs(1))
            .expect("Beacon was not delivered before drop returned");
        let body: Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["event"], "time_on_page");
        assert_eq!(body["meta"]["timeOnPage"], 1234);
    }
}
