//! Line framing for streamed pipeline output

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};

use crate::error::{ClientError, Result};

type ChunkStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Splits a byte stream into newline-terminated lines
///
/// Chunks may end anywhere, including inside a multi-byte character; bytes
/// are held back until their line is complete.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every line it completed, without terminators
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let rest = self.buffer.split_off(pos + 1);
            let line = std::mem::replace(&mut self.buffer, rest);
            lines.push(decode(&line));
        }
        lines
    }

    /// Returns the trailing partial line, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let line = std::mem::take(&mut self.buffer);
        Some(decode(&line))
    }
}

fn decode(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

/// Output of a pipeline run, one item per line, yielded as the server sends it
pub struct OutputLines {
    inner: Pin<Box<dyn Stream<Item = Result<String>> + Send>>,
}

struct State {
    chunks: ChunkStream,
    splitter: LineSplitter,
    pending: VecDeque<String>,
    done: bool,
}

impl OutputLines {
    pub(crate) fn new<S, B, E>(chunks: S) -> Self
    where
        S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + 'static,
        E: Into<ClientError> + 'static,
    {
        let chunks: ChunkStream = Box::pin(chunks.map(|chunk| {
            chunk
                .map(|bytes| bytes.as_ref().to_vec())
                .map_err(Into::into)
        }));

        let state = State {
            chunks,
            splitter: LineSplitter::new(),
            pending: VecDeque::new(),
            done: false,
        };

        let inner = futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(line) = state.pending.pop_front() {
                    return Some((Ok(line), state));
                }
                if state.done {
                    return None;
                }

                match state.chunks.next().await {
                    Some(Ok(bytes)) => state.pending.extend(state.splitter.push(&bytes)),
                    Some(Err(e)) => {
                        state.done = true;
                        return Some((Err(e), state));
                    }
                    None => {
                        state.done = true;
                        state.pending.extend(state.splitter.finish());
                    }
                }
            }
        });

        Self {
            inner: Box::pin(inner),
        }
    }

    /// Reads the remaining output into memory
    pub async fn collect_all(mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.next().await {
            lines.push(line?);
        }
        Ok(lines)
    }
}

impl Stream for OutputLines {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(parts: &[&'static str]) -> OutputLines {
        let items: Vec<Result<&'static [u8]>> = parts.iter().map(|p| Ok(p.as_bytes())).collect();
        OutputLines::new(futures::stream::iter(items))
    }

    #[test]
    fn test_splitter_holds_partial_lines() {
        let mut splitter = LineSplitter::new();

        assert_eq!(splitter.push(b"Initializing Ter"), Vec::<String>::new());
        assert_eq!(
            splitter.push(b"raform...\nSuccess!\r\npart"),
            vec!["Initializing Terraform...", "Success!"]
        );
        assert_eq!(splitter.finish(), Some("part".to_string()));
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_splitter_keeps_empty_lines() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push(b"a\n\nb\n"), vec!["a", "", "b"]);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_splitter_joins_split_characters() {
        let mut splitter = LineSplitter::new();
        let text = "╷ Error\n".as_bytes();

        assert!(splitter.push(&text[..1]).is_empty());
        assert_eq!(splitter.push(&text[1..]), vec!["╷ Error"]);
    }

    #[tokio::test]
    async fn test_output_lines_across_chunks() {
        let lines = chunks(&["Validating", " Terraform...\nSuc", "cess! The configuration is valid.\n"])
            .collect_all()
            .await
            .unwrap();

        assert_eq!(
            lines,
            vec![
                "Validating Terraform...",
                "Success! The configuration is valid."
            ]
        );
    }

    #[tokio::test]
    async fn test_output_lines_flushes_unterminated_tail() {
        let lines = chunks(&["one\ntwo"]).collect_all().await.unwrap();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_output_lines_stops_after_error() {
        let items: Vec<Result<&'static [u8]>> = vec![
            Ok("first\nhalf".as_bytes()),
            Err(ClientError::ParseError("connection reset".to_string())),
            Ok("never\n".as_bytes()),
        ];
        let mut lines = OutputLines::new(futures::stream::iter(items));

        assert_eq!(lines.next().await.unwrap().unwrap(), "first");
        assert!(lines.next().await.unwrap().is_err());
        assert!(lines.next().await.is_none());
    }
}
