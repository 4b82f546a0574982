//! Per-session subscription and monitored-item state (§4.4).

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::{
    error::{Error, Result},
    node_store::DataValue,
    ua::{AttributeId, NodeId, StatusCode},
};

pub type SubscriptionId = u32;
pub type MonitoredItemId = u32;
pub type ClientHandle = u32;

/// How a monitored item decides a new sample is worth reporting (§4.4).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deadband {
    None,
    Absolute(f64),
    Percent(f64),
}

impl Deadband {
    fn trips(self, previous: Option<&DataValue>, current: &DataValue) -> bool {
        let Some(previous) = previous else { return true };
        if previous.status != current.status {
            return true;
        }
        match self {
            Self::None => previous.value != current.value,
            Self::Absolute(_) | Self::Percent(_) => match Self::numeric_delta(previous, current) {
                Some(delta) => self.exceeds(delta, previous),
                None => previous.value != current.value,
            },
        }
    }

    fn exceeds(self, delta: f64, previous: &DataValue) -> bool {
        match self {
            Self::None => true,
            Self::Absolute(band) => delta > band,
            Self::Percent(percent) => {
                let Some(base) = Self::numeric_value(previous) else {
                    return true;
                };
                base == 0.0 || (delta / base.abs()) * 100.0 > percent
            }
        }
    }

    fn numeric_value(value: &DataValue) -> Option<f64> {
        match &value.value {
            crate::ua::Variant::Scalar(scalar) => match scalar {
                crate::ua::Scalar::Double(v) => Some(*v),
                crate::ua::Scalar::Float(v) => Some(f64::from(*v)),
                _ => None,
            },
            _ => None,
        }
    }

    fn numeric_delta(previous: &DataValue, current: &DataValue) -> Option<f64> {
        Some((Self::numeric_value(previous)? - Self::numeric_value(current)?).abs())
    }
}

/// A single queued notification.
#[derive(Debug, Clone)]
pub struct Notification {
    pub client_handle: ClientHandle,
    pub value: DataValue,
    /// Set when this notification displaced an older one that was dropped for a full queue.
    pub overflow: bool,
}

/// A server-side sampler attached to one node attribute (§4.4, GLOSSARY).
pub struct MonitoredItem {
    client_handle: ClientHandle,
    node_id: NodeId,
    attribute_id: AttributeId,
    sampling_interval: f64,
    queue_size: usize,
    deadband: Deadband,
    queue: VecDeque<Notification>,
    last_reported: Option<DataValue>,
    /// Permanently latched once the target node is deleted (§3 invariant); the item stops
    /// sampling but is not removed, so clients can still observe the terminal status.
    node_gone: bool,
}

impl MonitoredItem {
    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    #[must_use]
    pub const fn attribute_id(&self) -> AttributeId {
        self.attribute_id
    }

    /// Clamps the requested sampling interval up to `minimum`, per the "silently revised upward"
    /// boundary behaviour (§8); returns the interval actually in effect.
    fn apply_minimum_sampling_interval(&mut self, minimum: f64) -> f64 {
        if self.sampling_interval < minimum {
            self.sampling_interval = minimum;
        }
        self.sampling_interval
    }

    /// Called once per sampling tick with the current reading; appends a notification if the
    /// deadband rule trips.
    fn sample(&mut self, current: DataValue) {
        if self.node_gone {
            return;
        }
        if !self.deadband.trips(self.last_reported.as_ref(), &current) {
            return;
        }
        let mut overflow = false;
        if self.queue.len() >= self.queue_size.max(1) {
            self.queue.pop_front();
            overflow = true;
        }
        self.queue.push_back(Notification {
            client_handle: self.client_handle,
            value: current.clone(),
            overflow,
        });
        self.last_reported = Some(current);
    }

    fn mark_node_gone(&mut self) {
        self.node_gone = true;
        self.last_reported = Some(DataValue {
            value: crate::ua::Variant::Empty,
            source_timestamp: crate::ua::DateTime::EPOCH,
            server_timestamp: crate::ua::DateTime::EPOCH,
            status: StatusCode::BAD_NODE_ID_UNKNOWN,
        });
    }

    fn drain(&mut self) -> Vec<Notification> {
        self.queue.drain(..).collect()
    }
}

/// Parameters accepted by [`SubscriptionStore::create_monitored_item`].
pub struct MonitoredItemRequest {
    pub client_handle: ClientHandle,
    pub node_id: NodeId,
    pub attribute_id: AttributeId,
    pub sampling_interval: f64,
    pub queue_size: usize,
    pub deadband: Deadband,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubscriptionState {
    Create,
    Active,
    Closed,
}

/// Client-owned aggregator of monitored items with its own publishing cadence (§4.4, GLOSSARY).
pub struct Subscription {
    id: SubscriptionId,
    publishing_interval: f64,
    lifetime_count: u32,
    max_keep_alive_count: u32,
    max_notifications_per_publish: u32,
    priority: u8,
    publishing_enabled: bool,
    state: SubscriptionState,
    ticks_since_publish: u32,
    monitored_items: HashMap<MonitoredItemId, MonitoredItem>,
    next_item_id: MonitoredItemId,
    next_sequence_number: u64,
    /// Retains the last 100 published sequences for `Republish` (§4.4).
    retained: VecDeque<(u64, Vec<Notification>)>,
}

const REPUBLISH_RETENTION: usize = 100;

impl Subscription {
    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub const fn priority(&self) -> u8 {
        self.priority
    }

    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self.state, SubscriptionState::Closed)
    }

    /// `Modify` (§4.4): updates parameters in place, never the id.
    pub fn modify(
        &mut self,
        publishing_interval: f64,
        lifetime_count: u32,
        max_keep_alive_count: u32,
        max_notifications_per_publish: u32,
        priority: u8,
    ) {
        self.publishing_interval = publishing_interval;
        self.lifetime_count = lifetime_count;
        self.max_keep_alive_count = max_keep_alive_count;
        self.max_notifications_per_publish = max_notifications_per_publish;
        self.priority = priority;
        self.ticks_since_publish = 0;
    }

    pub fn set_publishing_enabled(&mut self, enabled: bool) {
        self.publishing_enabled = enabled;
    }

    /// Advances the subscription's keep-alive clock by one sampling tick; returns `true` once the
    /// subscription should move to `Closed` because no publish request arrived in time.
    fn tick_keep_alive(&mut self) -> bool {
        self.ticks_since_publish += 1;
        let max_ticks = self.lifetime_count.max(1);
        self.ticks_since_publish >= max_ticks
    }
}

/// Owns the subscriptions for one session (§4.4, §5 "per-session ... serialised by a single
/// mutex each").
#[derive(Default)]
pub struct SubscriptionStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    subscriptions: HashMap<SubscriptionId, Subscription>,
    next_id: SubscriptionId,
}

impl SubscriptionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `CreateSubscription` (§4.4): state starts `Active` immediately, matching the seed scenario
    /// of three successive Good responses for create/modify/delete with no separate activation
    /// step exposed to the caller.
    pub fn create_subscription(
        &self,
        publishing_interval: f64,
        lifetime_count: u32,
        max_keep_alive_count: u32,
        max_notifications_per_publish: u32,
        priority: u8,
    ) -> SubscriptionId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscriptions.insert(
            id,
            Subscription {
                id,
                publishing_interval,
                lifetime_count,
                max_keep_alive_count,
                max_notifications_per_publish,
                priority,
                publishing_enabled: true,
                state: SubscriptionState::Active,
                ticks_since_publish: 0,
                monitored_items: HashMap::new(),
                next_item_id: 0,
                next_sequence_number: 1,
                retained: VecDeque::new(),
            },
        );
        id
    }

    pub fn modify_subscription(
        &self,
        id: SubscriptionId,
        publishing_interval: f64,
        lifetime_count: u32,
        max_keep_alive_count: u32,
        max_notifications_per_publish: u32,
        priority: u8,
    ) -> Result<()> {
        let mut inner = self.inner.lock();
        let subscription = inner
            .subscriptions
            .get_mut(&id)
            .ok_or(Error::StatusCode(StatusCode::BAD_SUBSCRIPTION_ID_INVALID))?;
        subscription.modify(
            publishing_interval,
            lifetime_count,
            max_keep_alive_count,
            max_notifications_per_publish,
            priority,
        );
        Ok(())
    }

    /// `DeleteSubscription` (§4.4): terminal; also drops every monitored item it owned.
    pub fn delete_subscription(&self, id: SubscriptionId) -> Result<()> {
        let mut inner = self.inner.lock();
        inner
            .subscriptions
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::StatusCode(StatusCode::BAD_SUBSCRIPTION_ID_INVALID))
    }

    pub fn create_monitored_item(
        &self,
        subscription_id: SubscriptionId,
        request: MonitoredItemRequest,
        minimum_sampling_interval: f64,
    ) -> Result<(MonitoredItemId, f64)> {
        let mut inner = self.inner.lock();
        let subscription = inner
            .subscriptions
            .get_mut(&subscription_id)
            .ok_or(Error::StatusCode(StatusCode::BAD_SUBSCRIPTION_ID_INVALID))?;

        let item_id = subscription.next_item_id;
        subscription.next_item_id += 1;
        let mut item = MonitoredItem {
            client_handle: request.client_handle,
            node_id: request.node_id,
            attribute_id: request.attribute_id,
            sampling_interval: request.sampling_interval,
            queue_size: request.queue_size,
            deadband: request.deadband,
            queue: VecDeque::new(),
            last_reported: None,
            node_gone: false,
        };
        let revised_interval = item.apply_minimum_sampling_interval(minimum_sampling_interval);
        subscription.monitored_items.insert(item_id, item);
        Ok((item_id, revised_interval))
    }

    pub fn delete_monitored_item(&self, subscription_id: SubscriptionId, item_id: MonitoredItemId) -> Result<()> {
        let mut inner = self.inner.lock();
        let subscription = inner
            .subscriptions
            .get_mut(&subscription_id)
            .ok_or(Error::StatusCode(StatusCode::BAD_SUBSCRIPTION_ID_INVALID))?;
        subscription
            .monitored_items
            .remove(&item_id)
            .map(|_| ())
            .ok_or(Error::StatusCode(StatusCode::BAD_MONITORED_ITEM_ID_INVALID))
    }

    /// Applies new sampling parameters to an existing monitored item (§4.4 ModifyMonitoredItems);
    /// returns the revised sampling interval after clamping to `minimum_sampling_interval`.
    pub fn modify_monitored_item(
        &self,
        subscription_id: SubscriptionId,
        item_id: MonitoredItemId,
        sampling_interval: f64,
        queue_size: usize,
        deadband: Deadband,
        minimum_sampling_interval: f64,
    ) -> Result<f64> {
        let mut inner = self.inner.lock();
        let subscription = inner
            .subscriptions
            .get_mut(&subscription_id)
            .ok_or(Error::StatusCode(StatusCode::BAD_SUBSCRIPTION_ID_INVALID))?;
        let item = subscription
            .monitored_items
            .get_mut(&item_id)
            .ok_or(Error::StatusCode(StatusCode::BAD_MONITORED_ITEM_ID_INVALID))?;
        item.sampling_interval = sampling_interval;
        item.queue_size = queue_size;
        item.deadband = deadband;
        Ok(item.apply_minimum_sampling_interval(minimum_sampling_interval))
    }

    /// One sampling tick across every active subscription: `read` is called once per monitored
    /// item to fetch the current attribute value. Also advances keep-alive bookkeeping and closes
    /// subscriptions whose lifetime has elapsed without a publish.
    pub fn sample_all(&self, mut read: impl FnMut(&NodeId, AttributeId) -> Result<DataValue>) {
        let mut inner = self.inner.lock();
        let mut closed = Vec::new();
        for (id, subscription) in &mut inner.subscriptions {
            if subscription.tick_keep_alive() {
                subscription.state = SubscriptionState::Closed;
                closed.push(*id);
                continue;
            }
            if !subscription.publishing_enabled {
                continue;
            }
            for item in subscription.monitored_items.values_mut() {
                if item.node_gone {
                    continue;
                }
                match read(&item.node_id, item.attribute_id) {
                    Ok(value) => item.sample(value),
                    Err(Error::StatusCode(StatusCode::BAD_NODE_ID_UNKNOWN)) => item.mark_node_gone(),
                    Err(_) => {}
                }
            }
        }
        for id in closed {
            inner.subscriptions.remove(&id);
        }
    }

    /// `Publish` (§4.4, §5): drains pending notifications across every subscription owned by this
    /// session, ordered by subscription priority (highest first, ties by ascending id).
    pub fn publish(&self) -> Vec<(SubscriptionId, u64, Vec<Notification>)> {
        let mut inner = self.inner.lock();
        let mut order: Vec<SubscriptionId> = inner.subscriptions.keys().copied().collect();
        order.sort_by_key(|id| {
            let subscription = &inner.subscriptions[id];
            (std::cmp::Reverse(subscription.priority), *id)
        });

        let mut batches = Vec::new();
        for id in order {
            let subscription = inner.subscriptions.get_mut(&id).expect("id came from this map");
            subscription.ticks_since_publish = 0;
            let mut notifications = Vec::new();
            for item in subscription.monitored_items.values_mut() {
                notifications.extend(item.drain());
                if notifications.len() >= subscription.max_notifications_per_publish.max(1) as usize {
                    break;
                }
            }
            if notifications.is_empty() {
                continue;
            }
            let sequence_number = subscription.next_sequence_number;
            subscription.next_sequence_number += 1;
            subscription.retained.push_back((sequence_number, notifications.clone()));
            if subscription.retained.len() > REPUBLISH_RETENTION {
                subscription.retained.pop_front();
            }
            batches.push((id, sequence_number, notifications));
        }
        batches
    }

    /// `Republish` (§4.4): retransmits a previously sent notification batch if it is still within
    /// the retention window.
    pub fn republish(&self, subscription_id: SubscriptionId, sequence_number: u64) -> Result<Vec<Notification>> {
        let inner = self.inner.lock();
        let subscription = inner
            .subscriptions
            .get(&subscription_id)
            .ok_or(Error::StatusCode(StatusCode::BAD_SUBSCRIPTION_ID_INVALID))?;
        subscription
            .retained
            .iter()
            .find(|(seq, _)| *seq == sequence_number)
            .map(|(_, notifications)| notifications.clone())
            .ok_or(Error::StatusCode(StatusCode::BAD_MESSAGE_NOT_AVAILABLE))
    }

    /// Propagates a node deletion (§3 invariant): every monitored item targeting `node_id` across
    /// every subscription is permanently marked `BadNodeIdUnknown`.
    pub fn mark_node_deleted(&self, node_id: &NodeId) {
        let mut inner = self.inner.lock();
        for subscription in inner.subscriptions.values_mut() {
            for item in subscription.monitored_items.values_mut() {
                if item.node_id() == node_id {
                    item.mark_node_gone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Deadband, MonitoredItemRequest, SubscriptionStore};
    use crate::node_store::DataValue;
    use crate::ua::{AttributeId, NodeId, Scalar, StatusCode, Variant};

    #[test]
    fn create_modify_delete_lifecycle() {
        let store = SubscriptionStore::new();
        let id = store.create_subscription(100.0, 10, 5, 10, 0);
        store.modify_subscription(id, 500.0, 10, 5, 10, 0).unwrap();
        store.delete_subscription(id).unwrap();
        assert!(store.delete_subscription(id).is_err());
    }

    #[test]
    fn sampling_below_minimum_is_revised_upward() {
        let store = SubscriptionStore::new();
        let sub_id = store.create_subscription(100.0, 10, 5, 10, 0);
        let (_, revised) = store
            .create_monitored_item(
                sub_id,
                MonitoredItemRequest {
                    client_handle: 1,
                    node_id: NodeId::numeric(1, 1),
                    attribute_id: AttributeId::VALUE,
                    sampling_interval: 10.0,
                    queue_size: 4,
                    deadband: Deadband::None,
                },
                50.0,
            )
            .unwrap();
        assert_eq!(revised, 50.0);
    }

    #[test]
    fn deleted_node_permanently_marks_item_bad() {
        let store = SubscriptionStore::new();
        let sub_id = store.create_subscription(100.0, 10, 5, 10, 0);
        let node_id = NodeId::numeric(1, 7);
        store
            .create_monitored_item(
                sub_id,
                MonitoredItemRequest {
                    client_handle: 1,
                    node_id: node_id.clone(),
                    attribute_id: AttributeId::VALUE,
                    sampling_interval: 100.0,
                    queue_size: 4,
                    deadband: Deadband::None,
                },
                0.0,
            )
            .unwrap();

        store.mark_node_deleted(&node_id);
        store.sample_all(|_, _| Ok(DataValue::good(Variant::Scalar(Scalar::Boolean(true)))));
        let batches = store.publish();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].2[0].value.status, StatusCode::BAD_NODE_ID_UNKNOWN);
    }

    #[test]
    fn modify_monitored_item_revises_sampling_interval() {
        let store = SubscriptionStore::new();
        let sub_id = store.create_subscription(100.0, 10, 5, 10, 0);
        let (item_id, _) = store
            .create_monitored_item(
                sub_id,
                MonitoredItemRequest {
                    client_handle: 1,
                    node_id: NodeId::numeric(1, 1),
                    attribute_id: AttributeId::VALUE,
                    sampling_interval: 100.0,
                    queue_size: 4,
                    deadband: Deadband::None,
                },
                0.0,
            )
            .unwrap();

        let revised = store
            .modify_monitored_item(sub_id, item_id, 10.0, 8, Deadband::None, 25.0)
            .unwrap();
        assert_eq!(revised, 25.0);
    }

    #[test]
    fn delete_unknown_monitored_item_reports_item_invalid() {
        let store = SubscriptionStore::new();
        let sub_id = store.create_subscription(100.0, 10, 5, 10, 0);
        let error = store.delete_monitored_item(sub_id, 999).unwrap_err();
        assert_eq!(error.status_code(), StatusCode::BAD_MONITORED_ITEM_ID_INVALID);
    }
}
