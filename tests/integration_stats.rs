use std::{io::{Read, Write}, net::TcpListener, sync::mpsc::{channel, Receiver}, thread, time::Duration};
use riak_stats::error::TransportError;
use riak_stats::sample::MetricFamily;
use riak_stats::stats::{AllStatsSamples, MetricWhitelist, StatsEndpoint};

const CAPACITY: usize = riak_stats::DEFAULT_BUFFER_CAPACITY;
const TIMEOUT: Duration = Duration::from_secs(5);

/// Serve `response_head` and `body` to `connections` requests, and pass every request head back.
fn serve(
    response_head: String,
    body: String,
    connections: usize,
) -> (String, Receiver<String>)
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    let (tx, rx) = channel();
    thread::spawn(move || {
        for stream in listener.incoming().take(connections) {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(_) => continue,
            };
            let mut request = Vec::new();
            let mut byte = [0_u8; 1];
            while !request.ends_with(b"\r\n\r\n") {
                match stream.read(&mut byte) {
                    Ok(1) => request.push(byte[0]),
                    _ => break,
                }
            }
            tx.send(String::from_utf8_lossy(&request).to_string()).ok();
            let response = format!("{}Content-Length: {}\r\nConnection: close\r\n\r\n{}", response_head, body.len(), body);
            // the client is allowed to stop reading early.
            stream.write_all(response.as_bytes()).ok();
        }
    });
    (format!("http://{}/stats", address), rx)
}

fn serve_ok(body: String) -> (String, Receiver<String>) {
    serve("HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n".to_string(), body, 1)
}

fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    format!("http://{}/stats", listener.local_addr().unwrap())
}

fn node_stats_body() -> String {
    r#"{
    "vnode_gets": 120,
    "vnode_gets_total": 98765,
    "ring_members": ["riak@127.0.0.1"],
    "node_put_fsm_time_95": 4312,
    "pbc_connects": 2,
    "storage_backend": "riak_kv_bitcask_backend",
    "read_repairs": 0,
}
"#.to_string()
}

#[test]
fn integration_fetch_and_parse_node_stats() {
    let (url, requests) = serve_ok(node_stats_body());
    let endpoint = StatsEndpoint::new(Some(url), MetricWhitelist::node_stats());
    let samples = endpoint.read_http(CAPACITY, TIMEOUT);

    let result: Vec<(&str, i64)> = samples.iter().map(|s| (s.instance.as_str(), s.value)).collect();
    assert_eq!(result, vec![
        ("vnode_gets", 120),
        ("vnode_gets_total", 98765),
        ("node_put_fsm_time_95", 4312),
        ("pbc_connects", 2),
        ("read_repairs", 0),
    ]);
    assert!(samples.iter().all(|s| s.family == MetricFamily::NodeStats));

    let request = requests.recv_timeout(TIMEOUT).unwrap().to_ascii_lowercase();
    assert!(request.starts_with("get /stats http/1.1"));
    assert!(request.contains("accept: text/plain"));
    assert!(request.contains("user-agent: riak_stats/"));
}

#[test]
fn integration_fetch_non_success_status_is_transport_error() {
    let (url, _requests) = serve("HTTP/1.1 404 Not Found\r\n".to_string(), "\"node_gets\": 1,\n".to_string(), 1);
    let endpoint = StatsEndpoint::new(Some(url), MetricWhitelist::node_stats());
    assert!(matches!(endpoint.fetch(CAPACITY, TIMEOUT), Err(TransportError::Request { .. })));
}

#[test]
fn integration_fetch_connection_refused_is_transport_error() {
    let endpoint = StatsEndpoint::new(Some(closed_url()), MetricWhitelist::node_stats());
    assert!(matches!(endpoint.fetch(CAPACITY, TIMEOUT), Err(TransportError::Request { .. })));
    assert!(endpoint.read_http(CAPACITY, TIMEOUT).is_empty());
}

#[test]
fn integration_fetch_truncates_at_capacity() {
    let body = "\"node_gets\": 42,\n".repeat(2000);
    let (url, _requests) = serve_ok(body);
    let endpoint = StatsEndpoint::new(Some(url), MetricWhitelist::node_stats());

    let buffer = endpoint.fetch(1000, TIMEOUT).unwrap();
    assert_eq!(buffer.as_bytes().len(), 1000);
    assert!(buffer.is_full());
}

#[test]
fn integration_truncated_body_still_parses() {
    // every line is 17 bytes: 58 complete lines fit in 1000 bytes,
    // and the 59th is cut off as "node_gets": 4 which loses its only digit.
    let body = "\"node_gets\": 42,\n".repeat(2000);
    let (url, _requests) = serve_ok(body);
    let endpoint = StatsEndpoint::new(Some(url), MetricWhitelist::node_stats());

    let samples = endpoint.read_http(1000, TIMEOUT);
    assert_eq!(samples.len(), 59);
    assert!(samples[..58].iter().all(|s| s.instance == "node_gets" && s.value == 42));
    assert_eq!(samples[58].value, 0);
}

#[test]
fn integration_redirect_is_followed() {
    let (target, _requests) = serve_ok("\"queue_length\": 5,\n".to_string());
    let (url, _redirects) = serve(format!("HTTP/1.1 302 Found\r\nLocation: {}\r\n", target), String::new(), 1);
    let endpoint = StatsEndpoint::new(Some(url), MetricWhitelist::replication_stats());

    let samples = endpoint.read_http(CAPACITY, TIMEOUT);
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].instance, "queue_length");
    assert_eq!(samples[0].value, 5);
}

#[test]
fn integration_failing_endpoint_does_not_stop_the_other() {
    let (url, _requests) = serve_ok("\"queue_length\": 3,\n\"dropped_count\": 1,\n".to_string());
    let endpoints = vec![
        StatsEndpoint::new(Some(closed_url()), MetricWhitelist::node_stats()),
        StatsEndpoint::new(Some(url), MetricWhitelist::replication_stats()),
    ];

    let allstatssamples = AllStatsSamples::read_stats(&endpoints, CAPACITY, TIMEOUT, 2).unwrap();
    let mut result: Vec<(MetricFamily, &str, i64)> = allstatssamples.samples.iter()
        .map(|s| (s.family, s.instance.as_str(), s.value))
        .collect();
    result.sort_by(|a, b| a.1.cmp(b.1));
    assert_eq!(result, vec![
        (MetricFamily::ReplicationStats, "dropped_count", 1),
        (MetricFamily::ReplicationStats, "queue_length", 3),
    ]);
    assert!(allstatssamples.samples.iter().all(|s| s.timestamp.is_some()));
}
