//! The asynchronous messaging fabric (§4.6): bounded send/receive queues, a fixed worker pool,
//! and a delivery thread that fans responses out to application callbacks.
//!
//! The bounded-FIFO-with-back-pressure design is grounded in the original stack's own queue
//! primitive: a fixed-capacity ring buffer that rejects pushes once full rather than blocking
//! forever.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    browse::BrowseEvent,
    config::Callbacks,
    error::{Error, Result},
    service::{ServiceRequest, ServiceResponse},
    subscription::{Notification, SubscriptionId},
};

/// Default worker pool size on the client side (§5).
pub const DEFAULT_WORKER_COUNT: usize = 2;

/// A queued outbound request, tagged with its monotonically increasing `message_id` (§4.6).
pub struct OutboundMessage {
    pub message_id: u64,
    pub request: ServiceRequest,
}

/// A fixed-capacity FIFO that rejects pushes once full instead of blocking (§4.6 back-pressure).
///
/// Mirrors a bounded ring buffer: `push` is the `enqueue` side, `pop` the `dequeue` side, and
/// fullness is checked before insertion rather than after, so the queue never silently grows.
struct BoundedQueue<T> {
    capacity: usize,
    items: std::collections::VecDeque<T>,
}

impl<T> BoundedQueue<T> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            items: std::collections::VecDeque::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    fn push(&mut self, item: T) -> Result<()> {
        if self.is_full() {
            return Err(Error::resource_unavailable("queue is full"));
        }
        self.items.push_back(item);
        Ok(())
    }

    fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }
}

/// A queued inbound response (§4.6).
pub enum InboundMessage {
    Response { message_id: u64, response: ServiceResponse },
    /// One monitored-item notification, fanned out of a `Publish` response (§4.4) so the delivery
    /// thread can invoke `Callbacks::monitored_item` per notification instead of per batch.
    MonitoredItemNotification { subscription_id: SubscriptionId, notification: Notification },
    /// One surviving browse reference, for fabric-driven browse consumers (§4.8); `browse()`
    /// itself runs synchronously against a `Transport` and does not go through this queue, but a
    /// consumer that wants browse results delivered on the fabric's delivery thread can push them
    /// here with [`MessagingFabric::deliver_browse_result`].
    BrowseResult { message_id: u64, event: BrowseEvent },
    Error { message_id: u64, error: Error },
}

/// The send/receive queues and worker/delivery thread pool for one client session (§4.6, §5).
///
/// All network I/O is confined to worker threads; `send_request` only ever blocks briefly while
/// the send queue has room (§5 "Suspension points").
pub struct MessagingFabric {
    send_queue: Mutex<BoundedQueue<OutboundMessage>>,
    receive_queue: Mutex<BoundedQueue<InboundMessage>>,
    next_message_id: AtomicU64,
    callbacks: Callbacks,
}

impl MessagingFabric {
    #[must_use]
    pub fn new(queue_capacity: usize, callbacks: Callbacks) -> Self {
        Self {
            send_queue: Mutex::new(BoundedQueue::new(queue_capacity)),
            receive_queue: Mutex::new(BoundedQueue::new(queue_capacity)),
            next_message_id: AtomicU64::new(1),
            callbacks,
        }
    }

    /// Assigns the next monotonic `message_id` and enqueues the request. Fails with
    /// `BadResourceUnavailable` rather than blocking indefinitely when the send queue is full.
    pub fn send_request(&self, request: ServiceRequest) -> Result<u64> {
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        self.send_queue.lock().push(OutboundMessage { message_id, request })?;
        Ok(message_id)
    }

    fn dequeue_request(&self) -> Option<OutboundMessage> {
        self.send_queue.lock().pop()
    }

    fn enqueue_response(&self, message: InboundMessage) -> Result<()> {
        self.receive_queue.lock().push(message)
    }

    /// Pushes one browse reference for delivery on the fabric's delivery thread (§4.8), for
    /// callers that drive browse through the fabric rather than synchronously.
    pub fn deliver_browse_result(&self, message_id: u64, event: BrowseEvent) -> Result<()> {
        self.enqueue_response(InboundMessage::BrowseResult { message_id, event })
    }

    /// One worker-thread iteration (§5): dequeues a single request and runs `handle` against the
    /// transport, enqueueing the outcome for the delivery thread. A `Publish` response is fanned
    /// out into one `MonitoredItemNotification` per notification rather than delivered as a single
    /// opaque `Response`, so `Callbacks::monitored_item` fires once per item (§4.4). Returns
    /// `false` when there was nothing to do, so callers can back off.
    pub fn run_worker_once(&self, handle: impl FnOnce(ServiceRequest) -> Result<ServiceResponse>) -> bool {
        let Some(outbound) = self.dequeue_request() else {
            return false;
        };
        match handle(outbound.request) {
            Ok(ServiceResponse::Publish(batches)) => {
                for (subscription_id, _sequence_number, notifications) in batches {
                    for notification in notifications {
                        let _ = self.enqueue_response(InboundMessage::MonitoredItemNotification { subscription_id, notification });
                    }
                }
            }
            Ok(response) => {
                let _ = self.enqueue_response(InboundMessage::Response { message_id: outbound.message_id, response });
            }
            Err(error) => {
                let _ = self.enqueue_response(InboundMessage::Error { message_id: outbound.message_id, error });
            }
        }
        true
    }

    /// One delivery-thread iteration (§5): drains a single response and invokes the matching
    /// registered callback. Returns `false` when there was nothing to deliver.
    pub fn run_delivery_once(&self) -> bool {
        let Some(message) = self.receive_queue.lock().pop() else {
            return false;
        };
        match message {
            InboundMessage::Response { response, .. } => {
                if let Some(callback) = &self.callbacks.response {
                    callback(&response);
                }
            }
            InboundMessage::MonitoredItemNotification { subscription_id, notification } => {
                if let Some(callback) = &self.callbacks.monitored_item {
                    callback(subscription_id, &notification);
                }
            }
            InboundMessage::BrowseResult { event, .. } => {
                if let Some(callback) = &self.callbacks.browse {
                    callback(&event);
                }
            }
            InboundMessage::Error { error, .. } => {
                if let Some(callback) = &self.callbacks.error {
                    callback(&error);
                }
            }
        }
        true
    }
}

/// Spawns the fixed worker pool and delivery thread described in §5, driving `handle` for every
/// dequeued request until `running` is cleared.
pub fn spawn_workers(
    fabric: Arc<MessagingFabric>,
    worker_count: usize,
    running: Arc<std::sync::atomic::AtomicBool>,
    handle: impl Fn(ServiceRequest) -> Result<ServiceResponse> + Send + Sync + 'static,
) -> Vec<std::thread::JoinHandle<()>> {
    let handle = Arc::new(handle);
    let mut handles = Vec::with_capacity(worker_count + 1);
    for _ in 0..worker_count.max(1) {
        let fabric = Arc::clone(&fabric);
        let running = Arc::clone(&running);
        let handle = Arc::clone(&handle);
        handles.push(std::thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                if !fabric.run_worker_once(|request| handle(request)) {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                }
            }
        }));
    }
    let fabric = Arc::clone(&fabric);
    let delivery_running = Arc::clone(&running);
    handles.push(std::thread::spawn(move || {
        while delivery_running.load(Ordering::Relaxed) {
            if !fabric.run_delivery_once() {
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
        }
    }));
    handles
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::MessagingFabric;
    use crate::config::{Callbacks, ConfigBuilder};
    use crate::service::{ReadItem, ServiceRequest, ServiceResponse};
    use crate::subscription::{ClientHandle, Notification};
    use crate::ua::AttributeId;

    fn read_request() -> ServiceRequest {
        ServiceRequest::Read(vec![ReadItem {
            node_id: crate::ua::NodeId::NULL,
            attribute_id: AttributeId::VALUE,
            index_range: None,
            diagnostic_info: None,
        }])
    }

    #[test]
    fn send_request_fails_when_queue_is_full() {
        let fabric = MessagingFabric::new(1, Callbacks::default());
        fabric.send_request(read_request()).unwrap();
        let result = fabric.send_request(ServiceRequest::Read(vec![]));
        assert!(result.is_err());
    }

    #[test]
    fn message_ids_are_monotonic() {
        let fabric = MessagingFabric::new(8, Callbacks::default());
        let first = fabric.send_request(ServiceRequest::Read(vec![])).unwrap();
        let second = fabric.send_request(ServiceRequest::Read(vec![])).unwrap();
        assert!(second > first);
    }

    #[test]
    fn publish_response_fans_out_to_per_notification_callbacks() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        let callbacks = ConfigBuilder::new()
            .on_monitored_item(move |_subscription_id, _notification| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build()
            .callbacks;
        let fabric = MessagingFabric::new(8, callbacks);
        fabric.send_request(ServiceRequest::Publish).unwrap();

        let notification = Notification {
            client_handle: 1 as ClientHandle,
            value: crate::node_store::DataValue::good(crate::ua::Variant::Empty),
            overflow: false,
        };
        let delivered_once = fabric.run_worker_once(|_request| {
            Ok(ServiceResponse::Publish(vec![(7, 1, vec![notification.clone(), notification])]))
        });
        assert!(delivered_once);
        while fabric.run_delivery_once() {}
        assert_eq!(delivered.load(Ordering::SeqCst), 2);
    }
}
