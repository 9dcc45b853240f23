use std::convert::Infallible;

use actix_web::web::Bytes;
use futures::future;
use futures::stream::{Stream, StreamExt};

use crate::chat::ChunkStream;

// SSE ends a line at `\r\n`, `\r` or `\n`; each one starts a new `data:` line.
fn push_data_lines(frame: &mut String, text: &str) {
    for line in text.replace("\r\n", "\n").split(['\r', '\n']) {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
}

/// Frames one delta as `data: <delta>\n\n`. Embedded line breaks become
/// additional `data:` lines, which SSE clients join back with `\n`.
pub fn encode_delta(delta: &str) -> Bytes {
    let mut frame = String::with_capacity(delta.len() + 8);
    push_data_lines(&mut frame, delta);
    Bytes::from(frame)
}

/// The terminal event sent when the runtime fails after streaming has begun.
pub fn encode_error(detail: &str) -> Bytes {
    let mut frame = String::from("event: error\n");
    push_data_lines(&mut frame, detail);
    Bytes::from(frame)
}

/// Re-frames chunks as they arrive. There is no "done" event: the body
/// simply ends. After an error event nothing further is sent.
pub fn event_stream(chunks: ChunkStream) -> impl Stream<Item = Result<Bytes, Infallible>> {
    chunks.scan(false, |failed, item| {
        if *failed {
            return future::ready(None);
        }
        let frame = match item {
            Ok(chunk) => encode_delta(&chunk.delta),
            Err(e) => {
                *failed = true;
                encode_error(&e.to_string())
            }
        };
        future::ready(Some(Ok(frame)))
    })
}
