use std::io::{self, Write};
use std::path::Path;

use async_trait::async_trait;
use env_logger::{Builder, Env, Target};
use pingora::{
    server::{ListenFds, ShutdownWatch},
    services::Service,
};
use tokio::{
    fs::{create_dir_all, metadata, File, OpenOptions},
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
};

use crate::config;

/// `Write` end of the log channel handed to env_logger
pub struct AsyncWriter {
    sender: UnboundedSender<Vec<u8>>,
}

impl Write for AsyncWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sender
            .send(buf.to_vec())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Log sink service.
///
/// Log records are pushed through a channel and appended to the configured
/// file by a background service, so request handling never blocks on disk.
pub struct Logger {
    sender: UnboundedSender<Vec<u8>>,
    receiver: UnboundedReceiver<Vec<u8>>,
    path: String,
}

impl Logger {
    pub fn new(path: impl Into<String>) -> Self {
        let (sender, receiver) = unbounded_channel::<Vec<u8>>();
        Self {
            sender,
            receiver,
            path: path.into(),
        }
    }

    fn create_async_writer(&self) -> AsyncWriter {
        AsyncWriter {
            sender: self.sender.clone(),
        }
    }

    async fn open(&self) -> io::Result<BufWriter<File>> {
        if let Some(parent) = Path::new(&self.path).parent() {
            if !parent.as_os_str().is_empty() && metadata(parent).await.is_err() {
                create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        Ok(BufWriter::new(file))
    }
}

fn builder(conf: &config::Log) -> Builder {
    let mut builder = Builder::from_env(Env::default());
    builder.filter_level(conf.level_filter());
    builder
}

/// Install the global logger.
///
/// Logs go to stderr unless `log.path` is set, in which case the returned
/// [`Logger`] service must be added to the server to drain records to disk.
/// `RUST_LOG` still overrides the configured level per module.
pub fn init_logger(conf: &config::Log) -> Option<Logger> {
    let mut builder = builder(conf);

    match &conf.path {
        Some(path) => {
            let logger = Logger::new(path.clone());
            builder
                .target(Target::Pipe(Box::new(logger.create_async_writer())))
                .init();
            Some(logger)
        }
        None => {
            builder.init();
            None
        }
    }
}

/// Write out records still queued after the sink loop stopped
async fn drain_pending<W>(receiver: &mut UnboundedReceiver<Vec<u8>>, out: &mut W) -> io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Ok(data) = receiver.try_recv() {
        out.write_all(&data).await?;
        written += 1;
    }
    Ok(written)
}

#[async_trait]
impl Service for Logger {
    async fn start_service(&mut self, _fds: Option<ListenFds>, mut shutdown: ShutdownWatch) {
        let mut file = match self.open().await {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", self.path, e);
                return;
            }
        };

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        log::info!("Shutdown signal received, stopping write log");
                        break;
                    }
                },

                data = self.receiver.recv() => {
                    match data {
                        Some(data) => {
                            if let Err(e) = file.write_all(&data).await {
                                eprintln!("Failed to write to log file: {}", e);
                            }
                        }
                        None => break,
                    }
                }
            }
        }

        if let Err(e) = drain_pending(&mut self.receiver, &mut file).await {
            eprintln!("Failed to write to log file: {}", e);
        }

        if let Err(e) = file.flush().await {
            eprintln!("Failed to flush log file: {}", e);
        }
    }

    fn name(&self) -> &'static str {
        "log sync"
    }

    fn threads(&self) -> Option<usize> {
        Some(1)
    }
}
