use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Append-only text destination shared by every fetch task.
///
/// Opening (and creating) the file and writing a line happen under the same
/// lock, so concurrent callers never race on creation and their lines never
/// interleave. Relative order between callers is whatever the lock hands out.
#[derive(Debug)]
pub struct OutputSink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl OutputSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `line` followed by a newline as one unit.
    pub async fn append(&self, line: &str) -> io::Result<()> {
        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');

        let mut guard = self.file.lock().await;
        let mut file = match guard.take() {
            Some(file) => file,
            None => self.open().await?,
        };

        // A failed write drops the handle; the next caller reopens the file.
        append_record(&mut file, record.as_bytes()).await?;
        guard.replace(file);

        Ok(())
    }

    async fn open(&self) -> io::Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        log::debug!("Opened output file {}", self.path.display());
        Ok(file)
    }
}

/// File operations needed to write one record and undo a partial write.
trait RecordFile: AsyncWrite + Unpin {
    async fn current_len(&self) -> io::Result<u64>;
    async fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl RecordFile for File {
    async fn current_len(&self) -> io::Result<u64> {
        Ok(self.metadata().await?.len())
    }

    async fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len).await
    }
}

/// Write `record` in full, or cut the file back to where it started.
async fn append_record<F: RecordFile>(file: &mut F, record: &[u8]) -> io::Result<()> {
    let start = file.current_len().await?;

    let written = match file.write_all(record).await {
        Ok(()) => file.flush().await,
        Err(err) => Err(err),
    };

    if let Err(err) = written {
        if let Err(rewind) = file.truncate_to(start).await {
            log::error!("Failed to remove partial record after write error: {rewind}");
        }
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::task::{Context, Poll};

    /// In-memory file that accepts `budget` more bytes, then fails.
    struct ShortWriteFile {
        data: Vec<u8>,
        budget: usize,
    }

    impl AsyncWrite for ShortWriteFile {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            if self.budget == 0 {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk full")));
            }
            let n = buf.len().min(self.budget);
            self.budget -= n;
            self.data.extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    impl RecordFile for ShortWriteFile {
        async fn current_len(&self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        async fn truncate_to(&mut self, len: u64) -> io::Result<()> {
            self.data.truncate(len as usize);
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_write_leaves_no_partial_line() {
        let mut file = ShortWriteFile {
            data: b"MSFT:410.2\n".to_vec(),
            budget: 4,
        };

        let err = append_record(&mut file, b"AAPL:102.5\n").await.unwrap_err();

        assert_eq!(err.to_string(), "disk full");
        assert_eq!(file.data, b"MSFT:410.2\n");

        file.budget = usize::MAX;
        append_record(&mut file, b"NVDA:88\n").await.unwrap();
        assert_eq!(file.data, b"MSFT:410.2\nNVDA:88\n");
    }

    #[tokio::test]
    async fn creates_destination_on_first_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("average_prices.txt");
        assert!(!path.exists());

        let sink = OutputSink::new(&path);
        sink.append("AAPL:102.5").await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "AAPL:102.5\n");
    }

    #[tokio::test]
    async fn keeps_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("average_prices.txt");
        std::fs::write(&path, "MSFT:410.2\n").unwrap();

        let sink = OutputSink::new(&path);
        sink.append("AAPL:102.5").await.unwrap();
        sink.append("NVDA:88").await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "MSFT:410.2\nAAPL:102.5\nNVDA:88\n");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_keep_lines_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("average_prices.txt");
        let sink = Arc::new(OutputSink::new(&path));

        let mut handles = Vec::new();
        for i in 0..64 {
            let sink = Arc::clone(&sink);
            handles.push(tokio::spawn(async move {
                let line = format!("SYM{i:02}:{}", "9".repeat(200));
                sink.append(&line).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with('\n'));
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 64);

        let expected_tail = format!(":{}", "9".repeat(200));
        let symbols: HashSet<&str> = lines
            .iter()
            .map(|line| {
                assert!(line.ends_with(&expected_tail), "torn line: {line}");
                &line[..5]
            })
            .collect();
        assert_eq!(symbols.len(), 64);
    }

    #[tokio::test]
    async fn missing_parent_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("average_prices.txt");

        let sink = OutputSink::new(&path);
        let err = sink.append("AAPL:102.5").await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(!path.exists());
    }
}
