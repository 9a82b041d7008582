//! Submission against a throwaway local HTTP server.
//!
//! The server accepts one connection, records the raw request and answers
//! with a canned response, so no network access is needed.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use aridex_algorithms::graph::RasterExpr;
use aridex_algorithms::result::{BandInfo, IndexResult};
use aridex_cloud::{CloudError, RemoteEvaluator, RemoteEvaluatorOptions};

/// Serve one request; returns the endpoint URL and a receiver for the
/// raw request text.
fn serve_once(status_line: &'static str, body: &'static str) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        // Read headers, then exactly Content-Length bytes of body.
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(split) = text.find("\r\n\r\n") {
                let length = text[..split]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if raw.len() >= split + 4 + length {
                    break;
                }
            }
        }
        let reply = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(reply.as_bytes()).unwrap();
        tx.send(String::from_utf8_lossy(&raw).into_owned()).unwrap();
    });

    (format!("http://{addr}/v1/layers"), rx)
}

fn result() -> IndexResult {
    IndexResult::new(
        RasterExpr::image("UMD/hansen/global_forest_change_2019_v1_7")
            .select("lossyear")
            .equals(15.0)
            .multiply(RasterExpr::pixel_area())
            .self_mask(),
        BandInfo::new("Forest Loss in 2015").with_metadata("year", 2015),
    )
}

fn body_of(raw: &str) -> serde_json::Value {
    let (_, body) = raw.split_once("\r\n\r\n").unwrap();
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn test_submit_posts_layers_with_token() {
    let (url, rx) = serve_once("200 OK", r#"{"status":"queued","task":"t-1"}"#);
    let options = RemoteEvaluatorOptions {
        token: Some("abc".into()),
        ..Default::default()
    };
    let evaluator = RemoteEvaluator::new(url, options).unwrap();

    let reply = evaluator.submit(&result()).await.unwrap();
    assert_eq!(reply["task"], "t-1");

    let raw = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(raw.starts_with("POST /v1/layers"));
    assert!(raw.to_ascii_lowercase().contains("authorization: bearer abc"));

    let body = body_of(&raw);
    let layer = &body["layers"][0];
    assert_eq!(layer["label"], "Forest Loss in 2015");
    assert_eq!(layer["metadata"]["year"], "2015");
    let graph = &layer["graph"];
    let root = graph["root"].as_u64().unwrap() as usize;
    assert_eq!(graph["nodes"][root]["op"], "update_mask");
}

#[tokio::test]
async fn test_error_status_is_surfaced_unchanged() {
    let (url, _rx) = serve_once("422 Unprocessable Entity", r#"{"error":"unknown band lossyear"}"#);
    let evaluator = RemoteEvaluator::new(url, RemoteEvaluatorOptions::default()).unwrap();

    match evaluator.submit(&result()).await {
        Err(CloudError::Remote { status, body }) => {
            assert_eq!(status, 422);
            assert_eq!(body, r#"{"error":"unknown band lossyear"}"#);
        }
        other => panic!("expected remote error, got {:?}", other),
    }
}

#[test]
fn test_blocking_submit() {
    let (url, rx) = serve_once("202 Accepted", "accepted");
    let evaluator =
        aridex_cloud::blocking::RemoteEvaluatorBlocking::new(url, RemoteEvaluatorOptions::default()).unwrap();
    let reply = evaluator.submit(&result()).unwrap();
    assert_eq!(reply, serde_json::Value::String("accepted".into()));

    let raw = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(!raw.to_ascii_lowercase().contains("authorization:"));
}
