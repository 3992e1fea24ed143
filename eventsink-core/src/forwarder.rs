//! Drives one [`ItemProcessor`] from a record stream plus a heartbeat
//! interval, honoring the pause/continue directive contract.

use std::time::Duration;

use bytes::Bytes;
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::processor::{Directive, ItemProcessor};

/// The scheduler side of the directive contract: pulls records from the
/// stream while the processor says `Continue`, stops pulling after a
/// `Pause`, and only heartbeats until a heartbeat returns `Continue` again.
/// On stream end or cancellation it invokes `cleanup` exactly once.
pub struct Forwarder<P> {
    processor: P,
    records: ReceiverStream<Bytes>,
    heartbeat_interval: Duration,
    cln_token: CancellationToken,
}

impl<P> Forwarder<P>
where
    P: ItemProcessor,
{
    pub fn new(
        processor: P,
        records: ReceiverStream<Bytes>,
        heartbeat_interval: Duration,
        cln_token: CancellationToken,
    ) -> Self {
        Self {
            processor,
            records,
            heartbeat_interval,
            cln_token,
        }
    }

    /// Runs until the record stream ends or the token is cancelled, then
    /// cleans the processor up.
    pub async fn run(mut self) {
        let mut heartbeat = interval(self.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut paused = false;
        loop {
            tokio::select! {
                _ = self.cln_token.cancelled() => {
                    info!("Cancellation token received, stopping the forwarder");
                    break;
                }
                _ = heartbeat.tick() => {
                    match self.processor.heartbeat().await {
                        Directive::Continue if paused => {
                            info!("Sink available again, resuming records");
                            paused = false;
                        }
                        Directive::Pause if !paused => {
                            warn!("Sink paused on heartbeat, holding records");
                            paused = true;
                        }
                        Directive::Continue | Directive::Pause => {}
                    }
                }
                maybe_record = self.records.next(), if !paused => {
                    let Some(record) = maybe_record else {
                        info!("Record stream ended, stopping the forwarder");
                        break;
                    };
                    if self.processor.process(record).await == Directive::Pause {
                        warn!("Sink paused, holding records until a heartbeat succeeds");
                        paused = true;
                    }
                }
            }
        }
        self.processor.cleanup().await;
        info!("Forwarder stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use tokio::sync::mpsc;

    use super::*;

    /// Processor that replays scripted directives and records every call.
    struct ScriptedProcessor {
        process_script: VecDeque<Directive>,
        heartbeat_script: VecDeque<Directive>,
        processed: Arc<Mutex<Vec<Bytes>>>,
        cleanups: Arc<AtomicUsize>,
    }

    impl ScriptedProcessor {
        fn new(
            process_script: Vec<Directive>,
            heartbeat_script: Vec<Directive>,
        ) -> (Self, Arc<Mutex<Vec<Bytes>>>, Arc<AtomicUsize>) {
            let processed = Arc::new(Mutex::new(Vec::new()));
            let cleanups = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    process_script: process_script.into(),
                    heartbeat_script: heartbeat_script.into(),
                    processed: Arc::clone(&processed),
                    cleanups: Arc::clone(&cleanups),
                },
                processed,
                cleanups,
            )
        }
    }

    impl ItemProcessor for ScriptedProcessor {
        async fn process(&mut self, record: Bytes) -> Directive {
            self.processed.lock().expect("processed lock").push(record);
            self.process_script.pop_front().unwrap_or(Directive::Continue)
        }

        async fn heartbeat(&mut self) -> Directive {
            self.heartbeat_script
                .pop_front()
                .unwrap_or(Directive::Continue)
        }

        async fn cleanup(self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_forwards_until_stream_end() {
        let (processor, processed, cleanups) = ScriptedProcessor::new(vec![], vec![]);
        let (tx, rx) = mpsc::channel(10);
        for payload in [b"one".as_ref(), b"two", b"three"] {
            tx.send(Bytes::from_static(payload)).await.expect("send");
        }
        drop(tx);

        Forwarder::new(
            processor,
            ReceiverStream::new(rx),
            Duration::from_secs(1),
            CancellationToken::new(),
        )
        .run()
        .await;

        let processed = processed.lock().expect("processed lock");
        assert_eq!(processed.len(), 3);
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_holds_records_until_heartbeat_continues() {
        // Second record pauses; one heartbeat reports Pause before the sink
        // comes back. All records must still arrive, in order.
        let (processor, processed, cleanups) = ScriptedProcessor::new(
            vec![Directive::Continue, Directive::Pause],
            vec![Directive::Pause, Directive::Continue],
        );
        let (tx, rx) = mpsc::channel(10);
        for payload in [b"r1".as_ref(), b"r2", b"r3"] {
            tx.send(Bytes::from_static(payload)).await.expect("send");
        }
        drop(tx);

        Forwarder::new(
            processor,
            ReceiverStream::new(rx),
            Duration::from_secs(1),
            CancellationToken::new(),
        )
        .run()
        .await;

        let processed = processed.lock().expect("processed lock");
        assert_eq!(
            processed.as_slice(),
            [
                Bytes::from_static(b"r1"),
                Bytes::from_static(b"r2"),
                Bytes::from_static(b"r3")
            ]
        );
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_and_cleans_up() {
        let (processor, _processed, cleanups) = ScriptedProcessor::new(vec![], vec![]);
        // Keep the sender alive so the stream never ends on its own.
        let (_tx, rx) = mpsc::channel::<Bytes>(10);
        let cln_token = CancellationToken::new();
        cln_token.cancel();

        Forwarder::new(
            processor,
            ReceiverStream::new(rx),
            Duration::from_secs(1),
            cln_token,
        )
        .run()
        .await;

        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    }
}
