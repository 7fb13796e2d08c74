use crate::acquisition::link::ByteLink;
use crate::framing::{FrameSynchronizer, PacketFormat};
use crate::telemetry::SessionMetrics;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const READ_CHUNK: usize = 512;

/// Event stream flowing from the reader thread to the consumer.
#[derive(Debug, PartialEq, Eq)]
pub enum ReaderEvent {
    Frame(Vec<u8>),
    /// Hard link failure: the connection is closed and the loop has ended.
    /// Reconnection is an explicit external action.
    Disconnected,
}

/// Control handle for the dedicated read-loop thread.
pub struct ReaderHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReaderHandle {
    /// Signals the loop to exit after its current bounded read, then joins.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(true)
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owns the hardware link and feeds aligned frames into a bounded queue.
pub struct AcquisitionReader;

impl AcquisitionReader {
    /// Spawns the read loop.
    ///
    /// `handshake` bytes, if any, are written once before reading starts —
    /// only the reader thread ever writes to the link. When the queue is
    /// full the oldest frame is dropped so the physical read loop never
    /// stalls.
    pub fn spawn(
        mut link: Box<dyn ByteLink>,
        format: PacketFormat,
        queue_capacity: usize,
        handshake: Option<Vec<u8>>,
        metrics: Arc<SessionMetrics>,
    ) -> (Receiver<ReaderEvent>, ReaderHandle) {
        let (tx, rx) = bounded(queue_capacity.max(1));
        let drain = rx.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let thread = thread::spawn(move || {
            if let Some(bytes) = handshake {
                if let Err(e) = link.write_all(&bytes) {
                    warn!("handshake write failed: {e}");
                    let _ = tx.send(ReaderEvent::Disconnected);
                    metrics.record_disconnect();
                    return;
                }
            }

            let mut sync = FrameSynchronizer::new(format);
            let mut reported_sync_errors = 0u64;
            let mut chunk = [0u8; READ_CHUNK];

            while !stop_flag.load(Ordering::SeqCst) {
                match link.read(&mut chunk) {
                    // timeout: no data inside the bound, keep looping
                    Ok(0) => continue,
                    Ok(n) => {
                        sync.extend(&chunk[..n]);
                        while let Some(frame) = sync.next_frame() {
                            metrics.record_frame_synced();
                            push_frame(&tx, &drain, frame, &metrics);
                        }
                        let errors = sync.sync_errors();
                        metrics.add_sync_errors(errors - reported_sync_errors);
                        reported_sync_errors = errors;
                    }
                    Err(e) => {
                        warn!("link read failed, closing session input: {e}");
                        metrics.record_disconnect();
                        push_event(&tx, &drain, ReaderEvent::Disconnected);
                        return;
                    }
                }
            }
            debug!("reader loop stopped on request");
        });

        (
            rx,
            ReaderHandle {
                stop,
                thread: Some(thread),
            },
        )
    }
}

fn push_frame(
    tx: &Sender<ReaderEvent>,
    drain: &Receiver<ReaderEvent>,
    frame: Vec<u8>,
    metrics: &SessionMetrics,
) {
    if let Err(TrySendError::Full(event)) = tx.try_send(ReaderEvent::Frame(frame)) {
        // sacrifice the oldest queued frame rather than block the read loop
        let _ = drain.try_recv();
        metrics.record_queue_overflow();
        let _ = tx.try_send(event);
    }
}

fn push_event(tx: &Sender<ReaderEvent>, drain: &Receiver<ReaderEvent>, event: ReaderEvent) {
    if let Err(TrySendError::Full(event)) = tx.try_send(event) {
        let _ = drain.try_recv();
        let _ = tx.try_send(event);
    }
}
