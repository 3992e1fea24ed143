//! eventsink: reads newline-delimited records from stdin and writes them to
//! rotating, periodically-synced files under the configured base directory.

use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use eventsink_core::Result;
use eventsink_core::flusher::FileFlusher;
use eventsink_core::forwarder::Forwarder;
use eventsink_fs::FsFileManager;

use crate::settings::Settings;

mod settings;
mod setup_tracing;

const RECORD_CHANNEL_SIZE: usize = 500;

#[tokio::main]
async fn main() {
    setup_tracing::register();

    if let Err(e) = run().await {
        error!(?e, "Eventsink exited with an error");
        std::process::exit(1);
    }
    info!("Gracefully Exiting...");
}

async fn run() -> Result<()> {
    let settings = Settings::load()?;
    info!(
        base_dir = %settings.base_dir.display(),
        config = ?settings.flush,
        "Starting eventsink"
    );

    let manager = FsFileManager::new(settings.base_dir.clone()).await?;
    let flusher = FileFlusher::new(settings.flush.clone(), manager).await;

    let cln_token = CancellationToken::new();
    let shutdown_handle = tokio::spawn({
        let cln_token = cln_token.clone();
        async move {
            shutdown_signal().await;
            cln_token.cancel();
        }
    });

    let (records_tx, records_rx) = mpsc::channel(RECORD_CHANNEL_SIZE);
    let reader_handle = tokio::spawn(read_records(records_tx));

    Forwarder::new(
        flusher,
        ReceiverStream::new(records_rx),
        settings.heartbeat_interval,
        cln_token,
    )
    .run()
    .await;

    // The reader may still be blocked on stdin after a signal-driven stop.
    reader_handle.abort();
    if !shutdown_handle.is_finished() {
        shutdown_handle.abort();
    }
    Ok(())
}

/// Feeds stdin lines into the record channel; ends the stream on EOF.
async fn read_records(records_tx: mpsc::Sender<Bytes>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if records_tx.send(Bytes::from(line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                info!("Reached end of input");
                break;
            }
            Err(e) => {
                error!(%e, "Failed to read from stdin");
                break;
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("Received Ctrl+C signal");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal");
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
