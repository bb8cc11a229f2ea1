use std::sync::Once;
use std::time::Duration;

use bytes::Bytes;
use chat_engine::{text_stream, FailureKind, StreamError, TextStream, UpstreamBody};
use futures_util::stream;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

const HELLO: &str = "{\"message\":{\"content\":\"He\"}}\n{\"message\":{\"content\":\"llo\"}}\n{\"done\":true}\n";

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(chat_logging::initialize_for_tests);
}

fn body(chunks: Vec<Vec<u8>>) -> UpstreamBody {
    stream::iter(chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk)))).boxed()
}

fn split_at(bytes: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for &cut in cuts {
        chunks.push(bytes[start..cut].to_vec());
        start = cut;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

fn relay(chunks: Vec<Vec<u8>>) -> TextStream {
    text_stream(body(chunks), CancellationToken::new(), Duration::from_secs(5))
}

/// Drains the stream, returning all emitted bytes and the terminal error, if any.
async fn drain(mut stream: TextStream) -> (Vec<u8>, Option<StreamError>) {
    let mut out = Vec::new();
    let mut error = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(bytes) => out.extend_from_slice(&bytes),
            Err(err) => {
                assert!(error.is_none(), "stream yielded after its error");
                error = Some(err);
            }
        }
    }
    (out, error)
}

fn ndjson(deltas: &[&str]) -> String {
    let mut out = String::new();
    for delta in deltas {
        let line = serde_json::json!({"model": "m", "message": {"role": "assistant", "content": delta}, "done": false});
        out.push_str(&line.to_string());
        out.push('\n');
    }
    out.push_str(r#"{"model":"m","message":{"role":"assistant","content":""},"done":true,"eval_count":3,"total_duration":42}"#);
    out.push('\n');
    out
}

#[tokio::test]
async fn hello_scenario_yields_plain_text() {
    init_logging();
    let (out, error) = drain(relay(vec![HELLO.as_bytes().to_vec()])).await;

    assert_eq!(String::from_utf8(out).unwrap(), "Hello");
    assert_eq!(error, None);
}

#[tokio::test]
async fn one_line_split_across_three_boundaries() {
    init_logging();
    let bytes = HELLO.as_bytes();
    // All three cuts fall inside the first JSON line.
    let (out, error) = drain(relay(split_at(bytes, &[3, 12, 24]))).await;

    assert_eq!(String::from_utf8(out).unwrap(), "Hello");
    assert_eq!(error, None);
}

#[tokio::test]
async fn output_does_not_depend_on_chunking() {
    init_logging();
    let source = ndjson(&["Once ", "upon", " a ", "time", ", naïve 日本 🦀"]);
    let bytes = source.as_bytes();
    let (expected, _) = drain(relay(vec![bytes.to_vec()])).await;
    assert_eq!(
        String::from_utf8(expected.clone()).unwrap(),
        "Once upon a time, naïve 日本 🦀"
    );

    for cut in 1..bytes.len() {
        let (out, error) = drain(relay(split_at(bytes, &[cut]))).await;
        assert_eq!(error, None, "cut at {cut}");
        assert_eq!(out, expected, "cut at {cut}");
    }

    let single_bytes = bytes.iter().map(|b| vec![*b]).collect();
    let (out, error) = drain(relay(single_bytes)).await;
    assert_eq!(error, None);
    assert_eq!(out, expected);
}

/// Runs `source` through one chunk and through every two-chunk split, and
/// checks each run emits `expected` and then fails with `kind`.
async fn assert_same_output_before_error(source: &[u8], expected: &str, kind: FailureKind) {
    let mut runs = vec![vec![source.to_vec()]];
    runs.extend((1..source.len()).map(|cut| split_at(source, &[cut])));

    for (index, chunks) in runs.into_iter().enumerate() {
        let (out, error) = drain(relay(chunks)).await;
        assert_eq!(String::from_utf8(out).unwrap(), expected, "run {index}");
        assert_eq!(error.map(|err| err.kind), Some(kind.clone()), "run {index}");
    }
}

#[tokio::test]
async fn output_before_malformed_line_does_not_depend_on_chunking() {
    init_logging();
    let source = "{\"message\":{\"content\":\"ok\"}}\n{\"message\":{\"content\":\" 日本\"}}\n{bad\n{\"message\":{\"content\":\"never\"}}\n";
    assert_same_output_before_error(source.as_bytes(), "ok 日本", FailureKind::Protocol).await;
}

#[tokio::test]
async fn output_before_in_band_error_does_not_depend_on_chunking() {
    init_logging();
    let source = "{\"message\":{\"content\":\"par\"}}\n{\"message\":{\"content\":\"tial\"}}\n{\"error\":\"out of memory\"}\n";
    assert_same_output_before_error(
        source.as_bytes(),
        "partial",
        FailureKind::Upstream { status: None },
    )
    .await;
}

#[tokio::test]
async fn complete_lines_before_invalid_utf8_are_emitted() {
    init_logging();
    let mut bytes = b"{\"message\":{\"content\":\"ok\"}}\n".to_vec();
    bytes.extend_from_slice(&[0xFF]);
    bytes.extend_from_slice(b"{\"message\":{\"content\":\"never\"}}\n");
    let (out, error) = drain(relay(vec![bytes])).await;

    assert_eq!(String::from_utf8(out).unwrap(), "ok");
    assert_eq!(error.unwrap().kind, FailureKind::Protocol);
}

#[tokio::test]
async fn malformed_line_in_same_chunk_keeps_prior_delta() {
    init_logging();
    let source = "{\"message\":{\"content\":\"ok\"}}\n{bad\n";
    let mut stream = relay(vec![source.as_bytes().to_vec()]);

    assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from("ok"));
    let next = stream.next().await.unwrap();
    assert_eq!(next.unwrap_err().kind, FailureKind::Protocol);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn multibyte_character_split_at_chunk_boundary() {
    init_logging();
    let source = "{\"message\":{\"content\":\"日\"}}\n{\"done\":true}\n";
    let bytes = source.as_bytes();
    let first_byte_of_char = source.find('日').unwrap();
    let (out, error) = drain(relay(split_at(bytes, &[first_byte_of_char + 1]))).await;

    assert_eq!(error, None);
    assert_eq!(String::from_utf8(out).unwrap(), "日");
}

#[tokio::test]
async fn events_without_delta_emit_nothing() {
    init_logging();
    let source = "{\"model\":\"m\",\"message\":{\"role\":\"assistant\",\"content\":\"\"}}\n\n   \n{\"message\":{\"role\":\"assistant\"}}\n{\"done\":true}\n";
    let mut stream = relay(vec![source.as_bytes().to_vec()]);

    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn each_delta_is_its_own_item() {
    init_logging();
    let mut stream = relay(vec![HELLO.as_bytes().to_vec()]);

    assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from("He"));
    assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from("llo"));
    assert!(stream.next().await.is_none());
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn malformed_line_ends_stream_after_prior_deltas() {
    init_logging();
    let source = "{\"message\":{\"content\":\"ok\"}}\n{\"message\":\n{\"message\":{\"content\":\"never\"}}\n";
    let (out, error) = drain(relay(vec![source.as_bytes().to_vec()])).await;

    assert_eq!(String::from_utf8(out).unwrap(), "ok");
    assert_eq!(error.unwrap().kind, FailureKind::Protocol);
}

#[tokio::test]
async fn lines_after_final_event_are_ignored() {
    init_logging();
    let source = "{\"message\":{\"content\":\"a\"}}\n{\"done\":true}\nnot json\n";
    let (out, error) = drain(relay(vec![source.as_bytes().to_vec()])).await;

    assert_eq!(String::from_utf8(out).unwrap(), "a");
    assert_eq!(error, None);
}

#[tokio::test]
async fn unterminated_last_line_is_still_parsed() {
    init_logging();
    let source = "{\"message\":{\"content\":\"a\"}}\n{\"message\":{\"content\":\"b\"},\"done\":true}";
    let (out, error) = drain(relay(vec![source.as_bytes().to_vec()])).await;

    assert_eq!(String::from_utf8(out).unwrap(), "ab");
    assert_eq!(error, None);
}

#[tokio::test]
async fn close_without_final_event_keeps_output() {
    init_logging();
    let source = "{\"message\":{\"content\":\"cut \"}}\n{\"message\":{\"content\":\"short\"}}\n";
    let (out, error) = drain(relay(vec![source.as_bytes().to_vec()])).await;

    assert_eq!(String::from_utf8(out).unwrap(), "cut short");
    assert_eq!(error, None);
}

#[tokio::test]
async fn empty_body_is_upstream_error() {
    init_logging();
    let (out, error) = drain(relay(Vec::new())).await;

    assert!(out.is_empty());
    assert_eq!(error.unwrap().kind, FailureKind::Upstream { status: None });
}

#[tokio::test]
async fn invalid_utf8_is_protocol_error() {
    init_logging();
    let mut bytes = b"{\"message\":{\"content\":\"".to_vec();
    bytes.extend_from_slice(&[0xFF, 0xFE]);
    bytes.extend_from_slice(b"\"}}\n");
    let (_, error) = drain(relay(vec![bytes])).await;

    assert_eq!(error.unwrap().kind, FailureKind::Protocol);
}

#[tokio::test]
async fn in_band_error_event_ends_stream() {
    init_logging();
    let source = "{\"message\":{\"content\":\"par\"}}\n{\"error\":\"out of memory\"}\n";
    let (out, error) = drain(relay(vec![source.as_bytes().to_vec()])).await;

    assert_eq!(String::from_utf8(out).unwrap(), "par");
    let error = error.unwrap();
    assert_eq!(error.kind, FailureKind::Upstream { status: None });
    assert!(error.message.contains("out of memory"));
}

#[tokio::test]
async fn transport_error_mid_stream_keeps_prior_output() {
    init_logging();
    let chunks: Vec<Result<Bytes, StreamError>> = vec![
        Ok(Bytes::from_static(b"{\"message\":{\"content\":\"kept\"}}\n")),
        Err(StreamError {
            kind: FailureKind::Transport,
            message: "connection reset".to_string(),
        }),
        Ok(Bytes::from_static(b"{\"message\":{\"content\":\"lost\"}}\n")),
    ];
    let stream = text_stream(
        stream::iter(chunks).boxed(),
        CancellationToken::new(),
        Duration::from_secs(5),
    );
    let (out, error) = drain(stream).await;

    assert_eq!(String::from_utf8(out).unwrap(), "kept");
    assert_eq!(error.unwrap().kind, FailureKind::Transport);
}

#[tokio::test]
async fn cancellation_stops_at_fragment_boundary() {
    init_logging();
    let first = stream::iter(vec![Ok(Bytes::from_static(
        b"{\"message\":{\"content\":\"He\"}}\n{\"message\":{\"content\":\"llo\"}}\n",
    ))]);
    let upstream: UpstreamBody = first.chain(stream::pending()).boxed();
    let cancel = CancellationToken::new();
    let mut stream = text_stream(upstream, cancel.clone(), Duration::from_secs(5));

    assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from("He"));
    cancel.cancel();

    let next = stream.next().await.unwrap();
    assert_eq!(next.unwrap_err().kind, FailureKind::Cancelled);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn cancellation_while_waiting_for_upstream() {
    init_logging();
    let cancel = CancellationToken::new();
    let mut stream = text_stream(
        stream::pending().boxed(),
        cancel.clone(),
        Duration::from_secs(5),
    );

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let next = stream.next().await.unwrap();
    assert_eq!(next.unwrap_err().kind, FailureKind::Cancelled);
}

#[tokio::test]
async fn idle_upstream_times_out() {
    init_logging();
    let mut stream = text_stream(
        stream::pending().boxed(),
        CancellationToken::new(),
        Duration::from_millis(30),
    );

    let next = stream.next().await.unwrap();
    assert_eq!(next.unwrap_err().kind, FailureKind::Timeout);
    assert!(stream.next().await.is_none());
}
