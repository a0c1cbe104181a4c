//! A [`SerialDriver`] over tokio byte streams.
//!
//! [`StreamDriver`] services block requests on any `AsyncRead`/`AsyncWrite`
//! pair: a serial TTY opened as two file handles, a pseudo-terminal, or an
//! in-memory `tokio::io::duplex` pipe. One task per direction executes the
//! requests in order and posts completions; `close` cancels both tasks.

use bytes::{Bytes, BytesMut};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
    runtime::Handle,
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;

use super::{Completion, CompletionSender, DriverError, SerialDriver, UartConfig};

/// Serial driver backed by a reader and a writer.
#[derive(Debug)]
pub struct StreamDriver<R, W> {
    io: Option<(R, W)>,
    config: Option<UartConfig>,
    completions: Option<CompletionSender>,
    reads: Option<mpsc::UnboundedSender<usize>>,
    writes: Option<mpsc::UnboundedSender<Bytes>>,
    cancel: CancellationToken,
}

impl<R, W> StreamDriver<R, W> {
    /// Wrap a reader and a writer for the same device.
    #[must_use]
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Some((reader, writer)),
            config: None,
            completions: None,
            reads: None,
            writes: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Line settings received in `init`, if any.
    #[must_use]
    pub fn config(&self) -> Option<&UartConfig> { self.config.as_ref() }

    /// Whether the reader and writer tasks are running.
    #[must_use]
    pub fn is_open(&self) -> bool { self.reads.is_some() }
}

impl<S> StreamDriver<ReadHalf<S>, WriteHalf<S>>
where
    S: AsyncRead + AsyncWrite,
{
    /// Split a bidirectional stream into its two halves.
    #[must_use]
    pub fn from_stream(stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, writer)
    }
}

impl<R, W> SerialDriver for StreamDriver<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn init(
        &mut self,
        config: &UartConfig,
        completions: CompletionSender,
    ) -> Result<(), DriverError> {
        tracing::debug!(
            baud_rate = config.baud_rate,
            flow_control = ?config.flow_control,
            device = config.device_name.as_deref().unwrap_or("<unnamed>"),
            "stream driver configured"
        );
        self.config = Some(config.clone());
        self.completions = Some(completions);
        Ok(())
    }

    fn open(&mut self) -> Result<(), DriverError> {
        let Some(completions) = self.completions.clone() else {
            return Err(DriverError::NotInitialised);
        };
        let handle = Handle::try_current().map_err(|err| DriverError::NoRuntime(err.to_string()))?;
        let Some((reader, writer)) = self.io.take() else {
            return Err(DriverError::Closed);
        };

        let (read_tx, read_rx) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        handle.spawn(read_loop(
            reader,
            read_rx,
            completions.clone(),
            self.cancel.clone(),
        ));
        handle.spawn(write_loop(writer, write_rx, completions, self.cancel.clone()));

        self.reads = Some(read_tx);
        self.writes = Some(write_tx);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.cancel.cancel();
        self.reads = None;
        self.writes = None;
        Ok(())
    }

    fn set_baud_rate(&mut self, _baud_rate: u32) -> Result<(), DriverError> {
        Err(DriverError::Unsupported("baud rate changes on a plain byte stream"))
    }

    fn receive_block(&mut self, len: usize) {
        let queued = self.reads.as_ref().is_some_and(|tx| tx.send(len).is_ok());
        if !queued {
            tracing::warn!(len, "read requested while the device is closed");
        }
    }

    fn send_block(&mut self, frame: Bytes) {
        let len = frame.len();
        let queued = self.writes.as_ref().is_some_and(|tx| tx.send(frame).is_ok());
        if !queued {
            tracing::warn!(len, "write requested while the device is closed");
        }
    }
}

async fn read_loop<R>(
    mut reader: R,
    mut requests: mpsc::UnboundedReceiver<usize>,
    completions: CompletionSender,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let len = tokio::select! {
            () = cancel.cancelled() => break,
            request = requests.recv() => match request {
                Some(len) => len,
                None => break,
            },
        };

        let mut block = BytesMut::zeroed(len);
        let read = tokio::select! {
            () = cancel.cancelled() => break,
            read = reader.read_exact(&mut block) => read,
        };
        if let Err(error) = read {
            tracing::warn!(%error, len, "serial read failed; stopping reader");
            break;
        }
        if completions
            .complete(Completion::BlockReceived(block.freeze()))
            .await
            .is_err()
        {
            break;
        }
    }
    tracing::debug!("serial reader stopped");
}

async fn write_loop<W>(
    mut writer: W,
    mut requests: mpsc::UnboundedReceiver<Bytes>,
    completions: CompletionSender,
    cancel: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => break,
            request = requests.recv() => match request {
                Some(frame) => frame,
                None => break,
            },
        };

        let written = tokio::select! {
            () = cancel.cancelled() => break,
            written = write_frame(&mut writer, &frame) => written,
        };
        if let Err(error) = written {
            tracing::warn!(%error, len = frame.len(), "serial write failed; stopping writer");
            break;
        }
        if completions.complete(Completion::BlockSent).await.is_err() {
            break;
        }
    }
    tracing::debug!("serial writer stopped");
}

async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}
