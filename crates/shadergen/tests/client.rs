use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use shadergen::{GenerationError, GeneratorConfig, ShaderGenClient};

/// Serves one canned HTTP response and hands back the raw request it received.
fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let endpoint = format!("http://{}", listener.local_addr().expect("local addr"));
    let response = format!(
        "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept request");
        let mut reader = BufReader::new(stream);
        let mut head = String::new();
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("read header line");
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().expect("content length");
                }
            }
            let end_of_head = line == "\r\n";
            head.push_str(&line);
            if end_of_head {
                break;
            }
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).expect("read request body");

        let mut stream = reader.into_inner();
        stream
            .write_all(response.as_bytes())
            .expect("write response");
        stream.flush().expect("flush response");

        head + &String::from_utf8_lossy(&body)
    });

    (endpoint, handle)
}

fn client(endpoint: &str) -> ShaderGenClient {
    let config = GeneratorConfig::new(endpoint, Duration::from_secs(5)).expect("config");
    ShaderGenClient::new(config).expect("client")
}

#[test]
fn posts_prompt_as_json() {
    let (endpoint, server) = serve_once("200 OK", r#"{"response": "void main() {}"}"#);
    let shader = client(&endpoint).generate("swirling plasma").expect("generate");
    assert_eq!(shader.source, "void main() {}");

    let request = server.join().expect("server thread");
    assert!(request.starts_with("POST /prompt HTTP/1.1\r\n"));
    assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
    assert!(request.ends_with(r#"{"prompt":"swirling plasma"}"#));
}

#[test]
fn fenced_response_is_stripped() {
    let body = serde_json::json!({
        "response": "Sure!\n```glsl\nprecision mediump float;\nvoid main() {\n    gl_FragColor = vec4(1.0);\n}\n```\n"
    })
    .to_string();
    let (endpoint, server) = serve_once("200 OK", &body);
    let shader = client(&endpoint).generate("solid white").expect("generate");
    server.join().expect("server thread");

    assert!(shader.raw.contains("```glsl"));
    assert_eq!(
        shader.source,
        "precision mediump float;\nvoid main() {\n    gl_FragColor = vec4(1.0);\n}"
    );
}

#[test]
fn server_error_status_is_reported() {
    let (endpoint, server) = serve_once("500 Internal Server Error", r#"{"error": "boom"}"#);
    let err = client(&endpoint).generate("anything").unwrap_err();
    server.join().expect("server thread");

    match err {
        GenerationError::Status { status } => assert_eq!(status.as_u16(), 500),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[test]
fn missing_response_field_is_malformed() {
    let (endpoint, server) = serve_once("200 OK", "{}");
    let err = client(&endpoint).generate("anything").unwrap_err();
    server.join().expect("server thread");
    assert!(matches!(err, GenerationError::MalformedResponse { .. }));
}

#[test]
fn non_json_body_is_malformed() {
    let (endpoint, server) = serve_once("200 OK", "<html>oops</html>");
    let err = client(&endpoint).generate("anything").unwrap_err();
    server.join().expect("server thread");
    assert!(matches!(err, GenerationError::MalformedResponse { .. }));
}

#[test]
fn unreachable_service_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let endpoint = format!("http://{}", listener.local_addr().expect("local addr"));
    drop(listener);

    let err = client(&endpoint).generate("anything").unwrap_err();
    assert!(matches!(err, GenerationError::Transport(_)));
}
