//! Test client.
//!
//! A line-oriented client for integration testing: sends command lines and
//! asserts on reply lines.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test client speaking the newline-delimited command protocol.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }

    /// Send one command line.
    pub async fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single reply line (5 second default timeout).
    pub async fn recv_line(&mut self) -> anyhow::Result<String> {
        self.recv_line_timeout(Duration::from_secs(5)).await
    }

    /// Receive a reply line with a timeout.
    pub async fn recv_line_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line))
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for reply"))??;
        if read == 0 {
            anyhow::bail!("connection closed by server");
        }
        Ok(line.trim_end().to_string())
    }

    /// Send a command and return its reply line.
    #[allow(dead_code)]
    pub async fn roundtrip(&mut self, line: &str) -> anyhow::Result<String> {
        self.send_line(line).await?;
        self.recv_line().await
    }

    /// Expect the server to close the connection (EOF) within the timeout.
    #[allow(dead_code)]
    pub async fn expect_eof(&mut self, dur: Duration) -> anyhow::Result<()> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line))
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for EOF"))??;
        if read != 0 {
            anyhow::bail!("expected EOF, got line: {line:?}");
        }
        Ok(())
    }
}
