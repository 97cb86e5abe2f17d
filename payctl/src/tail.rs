//! Polling tail over the append-only payload log.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use futures::Stream;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Delay between reads once the cursor reaches end-of-file.
pub const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Follow `path`, yielding each newline-terminated line as its raw bytes.
///
/// The file and its parent directory are created empty if absent; those
/// creation failures are the only errors surfaced before the stream exists.
/// With `from_start` the cursor begins at offset zero and replays existing
/// content, otherwise only lines appended after this call are delivered.
///
/// The stream is infinite: at end-of-file it sleeps [`POLL_INTERVAL`] and
/// retries instead of terminating, and a line is held back until its trailing
/// newline has been flushed. It ends only when dropped by the consumer
/// (which closes the file handle) or on a mid-stream read error, which is
/// yielded once before termination.
pub async fn tail(
    path: PathBuf,
    from_start: bool,
) -> std::io::Result<impl Stream<Item = std::io::Result<Vec<u8>>>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).await?;
    }
    // Append mode creates the file without truncating it; this side only
    // ever reads.
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(&path)
        .await?;
    if !from_start {
        file.seek(SeekFrom::End(0)).await?;
    }
    debug!(path = %path.display(), from_start, "tail opened");

    Ok(follow_lines(BufReader::new(file)))
}

/// Yield newline-terminated lines from `reader`, polling through end-of-file.
fn follow_lines<R>(mut reader: R) -> impl Stream<Item = std::io::Result<Vec<u8>>>
where
    R: AsyncBufRead + Unpin,
{
    async_stream::stream! {
        let mut line: Vec<u8> = Vec::new();
        loop {
            match reader.read_until(b'\n', &mut line).await {
                Ok(_) => {
                    if line.last() == Some(&b'\n') {
                        yield Ok(std::mem::take(&mut line));
                    } else {
                        // End-of-file, possibly mid-line; wait for the writer.
                        sleep(POLL_INTERVAL).await;
                    }
                }
                Err(err) => {
                    warn!(err = %err, "tail read failed");
                    yield Err(err);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions as StdOpenOptions;
    use std::io::Write;
    use std::path::Path;

    use futures::StreamExt;
    use futures::pin_mut;
    use tokio::time::timeout;

    use super::*;

    const STEP: Duration = Duration::from_secs(5);

    fn append(path: &Path, bytes: &[u8]) {
        let mut file = StdOpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .expect("open for append");
        file.write_all(bytes).expect("append");
    }

    #[tokio::test]
    async fn creates_missing_file_and_directory() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("loot").join("payload.log");

        let stream = tail(path.clone(), false).await.expect("tail");
        assert!(path.exists(), "log file must be created empty");
        pin_mut!(stream);

        append(&path, b"first\n");
        let chunk = timeout(STEP, stream.next()).await.expect("no chunk");
        assert_eq!(chunk.expect("stream open").expect("io"), b"first\n");
    }

    #[tokio::test]
    async fn from_end_skips_existing_content() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("payload.log");
        append(&path, b"A\n");

        let stream = tail(path.clone(), false).await.expect("tail");
        pin_mut!(stream);
        append(&path, b"B\n");

        let chunk = timeout(STEP, stream.next()).await.expect("no chunk");
        assert_eq!(chunk.expect("stream open").expect("io"), b"B\n");
    }

    #[tokio::test]
    async fn from_start_replays_then_follows() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("payload.log");
        append(&path, b"A\n");

        let stream = tail(path.clone(), true).await.expect("tail");
        pin_mut!(stream);

        let first = timeout(STEP, stream.next()).await.expect("no chunk");
        assert_eq!(first.expect("stream open").expect("io"), b"A\n");

        append(&path, b"B\n");
        let second = timeout(STEP, stream.next()).await.expect("no chunk");
        assert_eq!(second.expect("stream open").expect("io"), b"B\n");
    }

    /// A line is delivered only once its newline lands, in one piece.
    #[tokio::test]
    async fn partial_line_held_until_newline() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("payload.log");

        let stream = tail(path.clone(), false).await.expect("tail");
        pin_mut!(stream);

        append(&path, b"par");
        let early = timeout(POLL_INTERVAL * 3, stream.next()).await;
        assert!(early.is_err(), "partial line must not be emitted");

        append(&path, b"tial\n");
        let chunk = timeout(STEP, stream.next()).await.expect("no chunk");
        assert_eq!(chunk.expect("stream open").expect("io"), b"partial\n");
    }

    #[tokio::test]
    async fn multiple_lines_arrive_one_per_chunk() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("payload.log");

        let stream = tail(path.clone(), false).await.expect("tail");
        pin_mut!(stream);

        append(&path, b"one\ntwo\n");
        let first = timeout(STEP, stream.next()).await.expect("no chunk");
        assert_eq!(first.expect("stream open").expect("io"), b"one\n");
        let second = timeout(STEP, stream.next()).await.expect("no chunk");
        assert_eq!(second.expect("stream open").expect("io"), b"two\n");
    }

    /// Reader that fails as soon as it is polled, standing in for the log
    /// file going away under an open handle.
    struct BrokenPipe;

    impl tokio::io::AsyncRead for BrokenPipe {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe)))
        }
    }

    /// A mid-stream read failure is surfaced exactly once, then the stream
    /// terminates instead of polling forever.
    #[tokio::test]
    async fn read_error_yields_once_then_ends() {
        use std::io::Cursor;

        use tokio::io::AsyncReadExt;

        let reader = BufReader::new(Cursor::new(b"ok\n".to_vec()).chain(BrokenPipe));
        let stream = follow_lines(reader);
        pin_mut!(stream);

        let first = timeout(STEP, stream.next()).await.expect("no chunk");
        assert_eq!(first.expect("stream open").expect("io"), b"ok\n");

        let second = timeout(STEP, stream.next()).await.expect("no item");
        let err = second.expect("stream open").expect_err("read must fail");
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);

        let end = timeout(STEP, stream.next()).await.expect("no item");
        assert!(end.is_none(), "stream must end after the error");
    }

    /// Independent tailers each keep their own cursor over the same file.
    #[tokio::test]
    async fn concurrent_tailers_do_not_interfere() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("payload.log");
        append(&path, b"old\n");

        let replay = tail(path.clone(), true).await.expect("tail");
        let follow = tail(path.clone(), false).await.expect("tail");
        pin_mut!(replay);
        pin_mut!(follow);

        append(&path, b"new\n");

        let replayed = timeout(STEP, replay.next()).await.expect("no chunk");
        assert_eq!(replayed.expect("open").expect("io"), b"old\n");
        let replayed = timeout(STEP, replay.next()).await.expect("no chunk");
        assert_eq!(replayed.expect("open").expect("io"), b"new\n");

        let followed = timeout(STEP, follow.next()).await.expect("no chunk");
        assert_eq!(followed.expect("open").expect("io"), b"new\n");
    }
}
