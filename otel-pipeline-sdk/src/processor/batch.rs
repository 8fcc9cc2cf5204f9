//! # Batch Processor
//!
//! The `BatchProcessor` buffers records from any number of producer threads
//! in a bounded queue and exports them in batches from one dedicated
//! background thread.
//!
//! An export is triggered when `max_export_batch_size` records are queued,
//! every `scheduled_delay`, on `force_flush`, and at shutdown. Producers never
//! wait on the exporter: a full queue drops the record and counts it, unless
//! [`QueueFullPolicy::Block`] is configured.
//!
//! The worker runs inside a telemetry-suppressed [`Context`], so records
//! produced while exporting (for example by an instrumented HTTP client) are
//! discarded instead of being fed back into the queue.

use super::config::{BatchConfig, QueueFullPolicy};
use super::Processor;
use crate::context::Context;
use crate::error::{SdkError, SdkResult};
use crate::export::Exporter;
use crate::record::Record;
use crate::{otel_debug, otel_error, otel_warn};

use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Capacity of the control channel.
const CONTROL_CHANNEL_CAPACITY: usize = 64;

/// Messages sent between application threads and the worker thread.
#[derive(Debug)]
enum BatchMessage {
    /// Sent ONLY when the number of queued records has reached `max_export_batch_size`.
    ExportRecords(Arc<AtomicBool>),
    /// Export everything queued, then reply.
    ForceFlush(SyncSender<SdkResult>),
    /// Export everything queued, shut the exporter down, reply and exit.
    Shutdown(SyncSender<SdkResult>),
}

/// Exports records in batches from a background thread.
///
/// ```
/// use otel_pipeline_sdk::export::InMemoryExporter;
/// use otel_pipeline_sdk::processor::{BatchConfigBuilder, BatchProcessor, Processor};
/// use std::time::Duration;
///
/// let exporter = InMemoryExporter::default();
/// let processor = BatchProcessor::builder(exporter.clone())
///     .with_batch_config(
///         BatchConfigBuilder::default()
///             .with_max_queue_size(2048)
///             .with_max_export_batch_size(512)
///             .with_scheduled_delay(Duration::from_secs(5))
///             .build(),
///     )
///     .build();
///
/// processor.shutdown().unwrap();
/// assert_eq!(exporter.shutdown_count(), 1);
/// ```
pub struct BatchProcessor {
    record_sender: SyncSender<Record>,
    message_sender: SyncSender<BatchMessage>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    export_timeout: Duration,
    export_message_sent: Arc<AtomicBool>,
    // Records counted as queued. Incremented before the send so the worker
    // never decrements below zero.
    current_batch_size: Arc<AtomicUsize>,
    max_export_batch_size: usize,
    max_queue_size: usize,
    queue_full_policy: QueueFullPolicy,
    dropped_records_count: AtomicUsize,
    is_shutdown: AtomicBool,
}

impl Debug for BatchProcessor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("max_queue_size", &self.max_queue_size)
            .field("max_export_batch_size", &self.max_export_batch_size)
            .field("queue_full_policy", &self.queue_full_policy)
            .field("is_shutdown", &self.is_shutdown)
            .finish()
    }
}

impl Processor for BatchProcessor {
    fn on_end(&self, record: Record) {
        if Context::is_current_telemetry_suppressed() {
            return;
        }
        if self.is_shutdown.load(Ordering::Relaxed) {
            otel_debug!(
                name: "BatchProcessor.OnEnd.AfterShutdown",
                message = "Records are being emitted after shutdown. They will not be exported."
            );
            return;
        }

        self.current_batch_size.fetch_add(1, Ordering::Relaxed);
        let enqueued = match self.queue_full_policy {
            QueueFullPolicy::DropAndCount => match self.record_sender.try_send(record) {
                Ok(_) => true,
                Err(TrySendError::Full(_)) => {
                    // The first drop emits a warning; shutdown reports the total.
                    if self.dropped_records_count.fetch_add(1, Ordering::Relaxed) == 0 {
                        otel_warn!(name: "BatchProcessor.RecordDroppingStarted",
                            message = "BatchProcessor dropped a record due to queue full. No further warning will be emitted until shutdown, which reports the total count.");
                    }
                    false
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.warn_worker_gone();
                    false
                }
            },
            QueueFullPolicy::Block => match self.record_sender.send(record) {
                Ok(_) => true,
                Err(_) => {
                    self.warn_worker_gone();
                    false
                }
            },
        };
        if !enqueued {
            self.current_batch_size.fetch_sub(1, Ordering::Relaxed);
            return;
        }

        if self.current_batch_size.load(Ordering::Relaxed) >= self.max_export_batch_size
            && !self.export_message_sent.load(Ordering::Relaxed)
            && !self.export_message_sent.swap(true, Ordering::Relaxed)
        {
            // Reset when the worker handles the message; also reset here if
            // it could not be sent so a later record can retry.
            if self
                .message_sender
                .try_send(BatchMessage::ExportRecords(
                    self.export_message_sent.clone(),
                ))
                .is_err()
            {
                self.export_message_sent.store(false, Ordering::Relaxed);
            }
        }
    }

    fn force_flush_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        let (sender, receiver) = mpsc::sync_channel(1);
        match self
            .message_sender
            .try_send(BatchMessage::ForceFlush(sender))
        {
            Ok(_) => receiver.recv_timeout(timeout).map_err(|err| {
                if err == RecvTimeoutError::Timeout {
                    otel_debug!(
                        name: "BatchProcessor.ForceFlush.Timeout",
                        timeout_in_millisecs = timeout.as_millis()
                    );
                    SdkError::Timeout(timeout)
                } else {
                    SdkError::InternalFailure(format!("{err}"))
                }
            })?,
            Err(TrySendError::Full(_)) => {
                otel_debug!(
                    name: "BatchProcessor.ForceFlush.ControlChannelFull",
                    message = "Control message to flush the worker thread could not be sent as the control channel is full."
                );
                Err(SdkError::InternalFailure(
                    "ForceFlush cannot be performed as the control channel is full. This can occur if force_flush/shutdown is called repeatedly without the previous call finishing.".into(),
                ))
            }
            Err(TrySendError::Disconnected(_)) => {
                otel_debug!(
                    name: "BatchProcessor.ForceFlush.AlreadyShutdown",
                    message = "ForceFlush invoked after the worker thread exited."
                );
                Err(SdkError::AlreadyShutdown)
            }
        }
    }

    fn force_flush(&self) -> SdkResult {
        self.force_flush_with_timeout(self.export_timeout)
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self.is_shutdown.swap(true, Ordering::SeqCst) {
            otel_warn!(
                name: "BatchProcessor.Shutdown.AlreadyShutdown",
                message = "Shutdown is being invoked more than once. This is a no-op, but indicates a potential issue in the application's lifecycle management."
            );
            return Ok(());
        }

        let dropped_records = self.dropped_records_count.load(Ordering::Relaxed);
        if dropped_records > 0 {
            otel_warn!(
                name: "BatchProcessor.RecordsDropped",
                dropped_records_count = dropped_records,
                max_queue_size = self.max_queue_size,
                message = "Records were dropped due to a full queue. The count is the total over the lifetime of this processor. Consider increasing the queue size and/or decreasing the scheduled delay."
            );
        }

        let (sender, receiver) = mpsc::sync_channel(1);
        match self.message_sender.try_send(BatchMessage::Shutdown(sender)) {
            Ok(_) => match receiver.recv_timeout(timeout) {
                Ok(result) => {
                    self.join_worker();
                    result
                }
                Err(RecvTimeoutError::Timeout) => {
                    otel_error!(
                        name: "BatchProcessor.Shutdown.Timeout",
                        message = "BatchProcessor shutdown timed out. The worker keeps draining in the background."
                    );
                    Err(SdkError::Timeout(timeout))
                }
                Err(err) => {
                    otel_error!(
                        name: "BatchProcessor.Shutdown.Error",
                        error = format!("{err}")
                    );
                    Err(SdkError::InternalFailure(format!("{err}")))
                }
            },
            Err(TrySendError::Full(_)) => {
                // Allow the caller to retry once the control channel drains.
                self.is_shutdown.store(false, Ordering::SeqCst);
                otel_debug!(
                    name: "BatchProcessor.Shutdown.ControlChannelFull",
                    message = "Control message to shutdown the worker thread could not be sent as the control channel is full."
                );
                Err(SdkError::InternalFailure(
                    "Shutdown cannot be performed as the control channel is full.".into(),
                ))
            }
            Err(TrySendError::Disconnected(_)) => {
                otel_debug!(
                    name: "BatchProcessor.Shutdown.WorkerGone",
                    message = "The worker thread is not running; nothing to shut down."
                );
                Err(SdkError::AlreadyShutdown)
            }
        }
    }

    fn shutdown(&self) -> SdkResult {
        self.shutdown_with_timeout(self.export_timeout)
    }
}

impl BatchProcessor {
    pub(crate) fn new<E>(exporter: E, config: BatchConfig) -> Self
    where
        E: Exporter + 'static,
    {
        let (record_sender, record_receiver) = mpsc::sync_channel::<Record>(config.max_queue_size);
        let (message_sender, message_receiver) =
            mpsc::sync_channel::<BatchMessage>(CONTROL_CHANNEL_CAPACITY);
        let max_queue_size = config.max_queue_size;
        let max_export_batch_size = config.max_export_batch_size;
        let export_timeout = config.max_export_timeout;
        let queue_full_policy = config.queue_full_policy;
        let current_batch_size = Arc::new(AtomicUsize::new(0));
        let current_batch_size_for_thread = current_batch_size.clone();

        let spawned = thread::Builder::new()
            .name("Pipeline.BatchProcessor".to_string())
            .spawn(move || {
                let _suppress_guard = Context::enter_telemetry_suppressed_scope();
                let worker = Worker {
                    exporter,
                    receiver: record_receiver,
                    batch: Vec::with_capacity(config.max_export_batch_size),
                    last_export_time: Instant::now(),
                    current_batch_size: current_batch_size_for_thread,
                    config,
                };
                worker.run(message_receiver);
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                // The receivers were dropped with the closure; every send
                // now reports a disconnected worker.
                otel_error!(
                    name: "BatchProcessor.ThreadSpawnFailed",
                    error = format!("{err}")
                );
                None
            }
        };

        BatchProcessor {
            record_sender,
            message_sender,
            handle: Mutex::new(handle),
            export_timeout,
            export_message_sent: Arc::new(AtomicBool::new(false)),
            current_batch_size,
            max_export_batch_size,
            max_queue_size,
            queue_full_policy,
            dropped_records_count: AtomicUsize::new(0),
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Create a new batch processor builder
    pub fn builder<E>(exporter: E) -> BatchProcessorBuilder<E>
    where
        E: Exporter,
    {
        BatchProcessorBuilder {
            exporter,
            config: Default::default(),
        }
    }

    /// Records dropped so far because the queue was full.
    pub fn dropped_records_count(&self) -> usize {
        self.dropped_records_count.load(Ordering::Relaxed)
    }

    fn warn_worker_gone(&self) {
        otel_warn!(
            name: "BatchProcessor.OnEnd.WorkerGone",
            message = "The worker thread has exited. Records will not be exported."
        );
    }

    fn join_worker(&self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            if handle.join().is_err() {
                otel_error!(name: "BatchProcessor.Shutdown.WorkerPanicked");
            }
        }
    }
}

/// State owned by the background thread.
struct Worker<E> {
    exporter: E,
    receiver: mpsc::Receiver<Record>,
    batch: Vec<Record>,
    last_export_time: Instant,
    current_batch_size: Arc<AtomicUsize>,
    config: BatchConfig,
}

impl<E: Exporter> Worker<E> {
    fn run(mut self, message_receiver: mpsc::Receiver<BatchMessage>) {
        otel_debug!(
            name: "BatchProcessor.ThreadStarted",
            interval_in_millisecs = self.config.scheduled_delay.map_or(0, |d| d.as_millis()),
            max_export_batch_size = self.config.max_export_batch_size,
            max_queue_size = self.config.max_queue_size,
        );

        loop {
            let message = match self.config.scheduled_delay {
                Some(delay) => {
                    let remaining_time = delay
                        .checked_sub(self.last_export_time.elapsed())
                        .unwrap_or(Duration::ZERO);
                    message_receiver.recv_timeout(remaining_time)
                }
                None => message_receiver
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };

            match message {
                Ok(BatchMessage::ExportRecords(export_message_sent)) => {
                    // Reset the flag now that the message has been processed.
                    export_message_sent.store(false, Ordering::Relaxed);
                    otel_debug!(name: "BatchProcessor.ExportingDueToBatchSize");
                    self.export_queued();
                }
                Ok(BatchMessage::ForceFlush(sender)) => {
                    otel_debug!(name: "BatchProcessor.ExportingDueToForceFlush");
                    self.export_queued();
                    let _ = sender.send(Ok(()));
                }
                Ok(BatchMessage::Shutdown(sender)) => {
                    otel_debug!(name: "BatchProcessor.ExportingDueToShutdown");
                    self.export_queued();
                    let result = self.exporter.shutdown();
                    let _ = sender.send(result);
                    otel_debug!(
                        name: "BatchProcessor.ThreadExiting",
                        reason = "ShutdownRequested"
                    );
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    otel_debug!(name: "BatchProcessor.ExportingDueToTimer");
                    self.export_queued();
                    self.last_export_time = Instant::now();
                }
                Err(RecvTimeoutError::Disconnected) => {
                    // The processor was dropped without shutdown. Whatever
                    // is still queued can be drained before exiting.
                    self.drain_all();
                    let _ = self.exporter.shutdown();
                    otel_debug!(
                        name: "BatchProcessor.ThreadExiting",
                        reason = "MessageSenderDisconnected"
                    );
                    break;
                }
            }
        }
        otel_debug!(name: "BatchProcessor.ThreadStopped");
    }

    /// Export the records counted as queued when called, in batches of at
    /// most `max_export_batch_size`, preserving queue order.
    fn export_queued(&mut self) {
        let target = self.current_batch_size.load(Ordering::Relaxed);
        let mut total_exported: usize = 0;

        while total_exported < target {
            while let Ok(record) = self.receiver.try_recv() {
                self.batch.push(record);
                if self.batch.len() == self.config.max_export_batch_size {
                    break;
                }
            }

            let count = self.batch.len();
            if count == 0 {
                // Counted by a producer whose send has not landed yet.
                break;
            }
            total_exported += count;
            self.export_batch();
            self.current_batch_size.fetch_sub(count, Ordering::Relaxed);
        }
    }

    /// Export everything left in the queue regardless of the counter.
    fn drain_all(&mut self) {
        loop {
            while let Ok(record) = self.receiver.try_recv() {
                self.batch.push(record);
                if self.batch.len() == self.config.max_export_batch_size {
                    break;
                }
            }
            if self.batch.is_empty() {
                return;
            }
            self.export_batch();
        }
    }

    fn export_batch(&mut self) {
        self.last_export_time = Instant::now();
        if self.batch.is_empty() {
            return;
        }
        let batch = std::mem::replace(
            &mut self.batch,
            Vec::with_capacity(self.config.max_export_batch_size),
        );
        let batch_size = batch.len();
        // Failures are final here: retries already happened in the exporter.
        if let Err(err) = self.exporter.export(batch) {
            otel_error!(
                name: "BatchProcessor.ExportError",
                batch_size = batch_size,
                error = format!("{err}")
            );
        }
    }
}

///
/// A builder for creating [`BatchProcessor`] instances.
///
#[derive(Debug)]
pub struct BatchProcessorBuilder<E> {
    exporter: E,
    config: BatchConfig,
}

impl<E> BatchProcessorBuilder<E>
where
    E: Exporter + 'static,
{
    /// Set the BatchConfig for [`BatchProcessorBuilder`]
    pub fn with_batch_config(self, config: BatchConfig) -> Self {
        BatchProcessorBuilder { config, ..self }
    }

    /// Build a batch processor
    pub fn build(self) -> BatchProcessor {
        BatchProcessor::new(self.exporter, self.config)
    }
}
