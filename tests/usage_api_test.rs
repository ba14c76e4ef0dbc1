use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime};

use serial_test::serial;
use tempfile::TempDir;

use cc_statusline::config::Config;
use cc_statusline::usage_api::{usage_quota, TokenProvider};

const BODY: &str = r#"{"five_hour":{"utilization":44.6,"resets_at":"2025-02-10T18:30:00+00:00"},"seven_day":{"utilization":12.0,"resets_at":null},"extra_usage":{"is_enabled":false,"monthly_limit":null,"used_credits":null}}"#;

struct StaticToken(Option<&'static str>);

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.map(str::to_string)
    }
}

struct MockServer {
    url: String,
    hits: Arc<AtomicUsize>,
    last_request: Arc<Mutex<String>>,
}

// Answers every connection with the same status and body.
fn serve(status: &'static str, body: &'static str) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/api/oauth/usage", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));
    let last_request = Arc::new(Mutex::new(String::new()));

    let (h, r) = (hits.clone(), last_request.clone());
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }
            h.fetch_add(1, Ordering::SeqCst);
            *r.lock().unwrap() = String::from_utf8_lossy(&buf).into_owned();
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    MockServer {
        url,
        hits,
        last_request,
    }
}

fn config_for(server: &MockServer, cache: &TempDir) -> Config {
    Config {
        cache_dir: cache.path().to_path_buf(),
        usage_endpoint: server.url.clone(),
        http_timeout: Duration::from_secs(2),
        ..Config::default()
    }
}

fn age_cache_file(config: &Config, by: Duration) {
    let path = config.cache_dir.join(&config.usage_cache_key);
    let file = fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() - by).unwrap();
}

#[test]
#[serial]
fn fetches_once_then_serves_from_cache() {
    let server = serve("200 OK", BODY);
    let cache = TempDir::new().unwrap();
    let config = config_for(&server, &cache);
    let tokens = StaticToken(Some("tok-123"));

    let quota = usage_quota(&config, &tokens).expect("quota");
    assert_eq!(quota.rolling_window.utilization_pct, 44.6);
    assert_eq!(quota.weekly_window.utilization_pct, 12.0);
    assert_eq!(quota.weekly_window.resets_at, None);
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);

    let again = usage_quota(&config, &tokens).expect("cached quota");
    assert_eq!(again, quota);
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);

    let request = server.last_request.lock().unwrap().to_lowercase();
    assert!(request.starts_with("get /api/oauth/usage"), "{request}");
    assert!(request.contains("authorization: bearer tok-123"));
    assert!(request.contains("anthropic-beta: oauth-2025-04-20"));
}

#[test]
#[serial]
fn server_error_falls_back_to_stale_entry() {
    let good = serve("200 OK", BODY);
    let cache = TempDir::new().unwrap();
    let tokens = StaticToken(Some("tok"));
    let first = usage_quota(&config_for(&good, &cache), &tokens).expect("quota");

    let failing = serve("500 Internal Server Error", r#"{"error":"down"}"#);
    let config = config_for(&failing, &cache);
    age_cache_file(&config, Duration::from_secs(3600));

    let stale = usage_quota(&config, &tokens).expect("stale quota");
    assert_eq!(stale, first);
    assert_eq!(failing.hits.load(Ordering::SeqCst), 1);

    let cached = fs::read_to_string(cache.path().join(&config.usage_cache_key)).unwrap();
    assert_eq!(cached, BODY);
}

#[test]
#[serial]
fn server_error_without_cache_is_absent() {
    let failing = serve("503 Service Unavailable", "");
    let cache = TempDir::new().unwrap();
    let config = config_for(&failing, &cache);

    assert_eq!(usage_quota(&config, &StaticToken(Some("tok"))), None);
    assert!(!cache.path().join(&config.usage_cache_key).exists());
}

#[test]
#[serial]
fn error_document_does_not_overwrite_cache() {
    let server = serve("200 OK", r#"{"error":{"type":"rate_limit"}}"#);
    let cache = TempDir::new().unwrap();
    let config = config_for(&server, &cache);

    assert_eq!(usage_quota(&config, &StaticToken(Some("tok"))), None);
    assert!(!cache.path().join(&config.usage_cache_key).exists());
}

#[test]
#[serial]
fn missing_token_makes_no_request() {
    let server = serve("200 OK", BODY);
    let cache = TempDir::new().unwrap();
    let config = config_for(&server, &cache);

    assert_eq!(usage_quota(&config, &StaticToken(None)), None);
    assert_eq!(server.hits.load(Ordering::SeqCst), 0);
}

#[test]
#[serial]
fn user_agent_can_be_overridden() {
    let server = serve("200 OK", BODY);
    let cache = TempDir::new().unwrap();
    let config = config_for(&server, &cache);

    unsafe { std::env::set_var("CLAUDE_STATUSLINE_USER_AGENT", "statusline-test/1.0") };
    let quota = usage_quota(&config, &StaticToken(Some("tok")));
    unsafe { std::env::remove_var("CLAUDE_STATUSLINE_USER_AGENT") };

    assert!(quota.is_some());
    let request = server.last_request.lock().unwrap().to_lowercase();
    assert!(request.contains("user-agent: statusline-test/1.0"), "{request}");
}
