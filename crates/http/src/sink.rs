//! Bridges the blocking router onto an axum response.

use axum::body::{Body, Bytes};
use axum::response::Response;
use futures::SinkExt;
use futures::channel::mpsc;
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderValue};
use std::io::{self, Write};
use symserve_core::response::BINARY_CONTENT_TYPE;
use symserve_core::{PlainResponse, ResponseSink};
use tokio::sync::oneshot;

/// Chunks in flight between the blocking copy and the client.
const CHANNEL_DEPTH: usize = 4;

type Chunk = Result<Bytes, io::Error>;

/// Sink living on a blocking thread.
///
/// The response head is handed to the async side through `head`; a streamed
/// body follows through a bounded channel so the copy is paced by the client.
pub(crate) struct ChannelSink {
    head: Option<oneshot::Sender<Response>>,
    chunks: Option<mpsc::Sender<Chunk>>,
}

impl ChannelSink {
    pub(crate) fn new(head: oneshot::Sender<Response>) -> Self {
        Self {
            head: Some(head),
            chunks: None,
        }
    }

    fn commit(&mut self, response: Response) -> io::Result<()> {
        let head = self
            .head
            .take()
            .ok_or_else(|| io::Error::other("response already committed"))?;
        head.send(response)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
    }
}

impl ResponseSink for ChannelSink {
    fn send(&mut self, plain: PlainResponse) -> io::Result<()> {
        let mut response = Response::new(Body::from(plain.body));
        *response.status_mut() = plain.status;
        *response.headers_mut() = plain.headers;
        self.commit(response)
    }

    fn start_body(&mut self, status: StatusCode) -> io::Result<Box<dyn Write + '_>> {
        let (sender, receiver) = mpsc::channel(CHANNEL_DEPTH);
        let mut response = Response::new(Body::from_stream(receiver));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(BINARY_CONTENT_TYPE));
        self.commit(response)?;

        let chunks = self.chunks.insert(sender);
        Ok(Box::new(ChunkWriter { chunks }))
    }

    fn abort(&mut self, reason: &str) {
        if let Some(mut chunks) = self.chunks.take() {
            let _ = futures::executor::block_on(chunks.send(Err(io::Error::other(reason.to_string()))));
        }
    }

    fn is_committed(&self) -> bool {
        self.head.is_none()
    }
}

struct ChunkWriter<'a> {
    chunks: &'a mut mpsc::Sender<Chunk>,
}

impl Write for ChunkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        futures::executor::block_on(self.chunks.send(Ok(Bytes::copy_from_slice(buf))))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
