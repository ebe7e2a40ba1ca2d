//! Streaming reply API: yield decoded text as the body arrives.
//!
//! A streamed reply is a Markdown document sent in arbitrary byte chunks.
//! Chunk boundaries carry no meaning and may fall inside a multibyte UTF-8
//! character, so [`Utf8ChunkDecoder`] holds back an incomplete tail until
//! the next chunk completes it.
//!
//! Unlike the endpoint layer, which renders into a view, [`validate_stream`]
//! hands the caller the decoded chunks directly, for piping into a file,
//! a socket or a custom renderer.

use crate::client::ValidatorClient;
use crate::config::{ClientConfig, ResponseMode};
use crate::error::ValidateError;
use crate::payload::load_payload;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of decoded text chunks.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, ValidateError>> + Send>>;

/// Incremental UTF-8 decoder for a chunked body.
///
/// Invalid sequences become U+FFFD; an incomplete sequence at the end of a
/// chunk is kept until the next chunk (or [`finish`](Self::finish)).
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, returning every complete character available so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    out.push_str(s);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush whatever is left once the body has ended.
    pub fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }

    /// Bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

struct DecodeState<S> {
    inner: S,
    decoder: Utf8ChunkDecoder,
    url: String,
    timeout_secs: Option<u64>,
    done: bool,
}

/// Turn a raw body stream into a [`ReplyStream`] of decoded text.
///
/// The first transport error ends the stream after being yielded.
pub(crate) fn decode_body_stream<S, B>(
    url: String,
    inner: S,
    timeout_secs: Option<u64>,
) -> ReplyStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = DecodeState {
        inner,
        decoder: Utf8ChunkDecoder::new(),
        url,
        timeout_secs,
        done: false,
    };

    let s = stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        match st.inner.next().await {
            Some(Ok(bytes)) => {
                let text = st.decoder.decode(bytes.as_ref());
                debug!(
                    "Chunk: {} bytes in, {} chars out",
                    bytes.as_ref().len(),
                    text.chars().count()
                );
                Some((Ok(text), st))
            }
            Some(Err(e)) => {
                st.done = true;
                let err = match ValidateError::from_reqwest(&st.url, e, st.timeout_secs) {
                    ValidateError::Transport { url, reason } => ValidateError::Stream { url, reason },
                    other => other,
                };
                Some((Err(err), st))
            }
            None => {
                st.done = true;
                let tail = st.decoder.finish();
                if tail.is_empty() {
                    None
                } else {
                    Some((Ok(tail), st))
                }
            }
        }
    });

    Box::pin(s)
}

/// Load `path`, POST it to the streaming endpoint, and return the decoded reply.
///
/// `config.mode` is ignored: this always targets the streaming endpoint.
///
/// # Example
/// ```rust,no_run
/// use medicheck_client::{validate_stream, ClientConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ClientConfig::default();
/// let mut stream = validate_stream("summary.json", &config).await?;
/// while let Some(chunk) = stream.next().await {
///     print!("{}", chunk?);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn validate_stream(
    path: impl AsRef<Path>,
    config: &ClientConfig,
) -> Result<ReplyStream, ValidateError> {
    let path = path.as_ref();
    info!("Starting streamed validation: {}", path.display());
    let payload = load_payload(path).await?;
    let mut config = config.clone();
    config.mode = ResponseMode::Streaming;
    let client = ValidatorClient::new(config)?;
    client.submit_streaming(&payload).await
}
