use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    marker::PhantomData,
    sync::{
        mpsc::{self, channel, Receiver, Sender},
        Arc,
    },
};

type Message = Arc<dyn Any + Send + Sync + 'static>;

/// An in-process telemetry bus that allows publishing and subscribing to values on named topics.
/// Each topic name is allocated to a single type, attempts to subscribe and publish to the same topic with
/// different types will panic!
///
/// Values are queued by publishers and handed out to subscribers on the next call to [`PubSub::tick`].
pub struct PubSub {
    topics: HashMap<String, Topic>,
}

struct Topic {
    value_type: TypeId,
    value_name: &'static str,
    incoming_sender: Sender<Message>,
    incoming_recv: Receiver<Message>,
    outgoing: Vec<Sender<Message>>,
}

impl Topic {
    fn new<T: Any + Send + Sync + 'static>() -> Self {
        // create the channel where items will be sent to when published
        let (send, recv) = channel();

        Self {
            value_type: TypeId::of::<T>(),
            value_name: type_name::<T>(),
            incoming_sender: send,
            incoming_recv: recv,
            outgoing: Vec::new(),
        }
    }
}

/// Joins a table name and a key into the full topic name, e.g. `"Photon Multitag Stats/TranslationStdDevX"`.
pub fn topic_name(table: &str, key: &str) -> String {
    format!("{table}/{key}")
}

pub struct Subscription<T: Any + Send + Sync + 'static> {
    topic: String,
    reciever: Receiver<Message>,
    _phantom: PhantomData<T>,
}

impl<T: Any + Send + Sync + 'static> Subscription<T> {
    /// Tries to receive a value from the subscribed topic, but will not block if no data is available.
    pub fn try_recv(&mut self) -> Option<Arc<T>> {
        match self.reciever.try_recv() {
            Ok(value) => Some(
                value
                    .downcast::<T>()
                    .expect("Received value was not of the expected type"),
            ),
            Err(e) => {
                match e {
                    mpsc::TryRecvError::Empty => {}
                    mpsc::TryRecvError::Disconnected => {
                        tracing::debug!(topic = %self.topic, "subscription disconnected");
                    }
                }
                None
            }
        }
    }

    /// Drains everything that is queued and returns only the most recent value.
    pub fn try_recv_latest(&mut self) -> Option<Arc<T>> {
        let mut latest = None;
        while let Some(value) = self.try_recv() {
            latest = Some(value);
        }
        latest
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[derive(Clone)]
pub struct Publisher<T: Any + Send + Sync + 'static> {
    topic: String,
    send: Sender<Message>,
    _p: PhantomData<T>,
}

impl<T: Any + Send + Sync + 'static> Publisher<T> {
    /// Publishes a value wrapped in an `Arc` to the topic. If the bus has been dropped the value is discarded.
    pub fn publish(&mut self, value: Arc<T>) {
        if self.send.send(value).is_err() {
            tracing::warn!(topic = %self.topic, "telemetry bus is gone, discarding value");
        }
    }

    /// Shorthand for publishing a plain value.
    pub fn set(&mut self, value: T) {
        self.publish(Arc::new(value));
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// A named group of topics. All topics registered through a table are prefixed with its name.
pub struct Table<'a> {
    pubsub: &'a mut PubSub,
    name: String,
}

impl<'a> Table<'a> {
    /// Register as a publisher of `key` within this table.
    pub fn publish<T: Any + Send + Sync + 'static>(&mut self, key: &str) -> Publisher<T> {
        self.pubsub.publish(&topic_name(&self.name, key))
    }

    /// Subscribe to `key` within this table.
    pub fn subscribe<T: Any + Send + Sync + 'static>(&mut self, key: &str) -> Subscription<T> {
        self.pubsub.subscribe(&topic_name(&self.name, key))
    }
}

impl Default for PubSub {
    fn default() -> Self {
        Self::new()
    }
}

impl PubSub {
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    fn get_topic_by_name_or_insert<T: Any + Send + Sync + 'static>(
        &mut self,
        topic: &str,
    ) -> &mut Topic {
        let t = self
            .topics
            .entry(topic.into())
            .or_insert_with(Topic::new::<T>);

        // make sure this topic was not previously claimed with a different type.
        assert!(
            t.value_type == TypeId::of::<T>(),
            "Topic {topic} already claimed by type '{}', but current type is '{}'",
            t.value_name,
            type_name::<T>()
        );

        t
    }

    /// Register as a publisher of the specific type to the topic name. Panics if the topic has already been allocated to values of a different type.
    pub fn publish<T: Any + Send + Sync + 'static>(&mut self, topic: &str) -> Publisher<T> {
        let t = self.get_topic_by_name_or_insert::<T>(topic);

        Publisher {
            topic: topic.to_string(),
            send: t.incoming_sender.clone(),
            _p: PhantomData,
        }
    }

    /// Subscribe to messages of the specific type on the topic name. Panics if the topic has already been allocated to values of a different type.
    pub fn subscribe<T: Any + Send + Sync + 'static>(&mut self, topic: &str) -> Subscription<T> {
        let t = self.get_topic_by_name_or_insert::<T>(topic);

        // create a channel for receiving the published messages
        let (send, recv) = channel();

        t.outgoing.push(send);

        Subscription {
            topic: topic.to_owned(),
            reciever: recv,
            _phantom: PhantomData,
        }
    }

    /// Opens the table with the given name for registering publishers and subscribers.
    pub fn table(&mut self, name: &str) -> Table<'_> {
        Table {
            pubsub: self,
            name: name.to_owned(),
        }
    }

    /// Returns true if a topic with this name has been registered by anyone.
    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.contains_key(topic)
    }

    /// Proceses and distributes messages to all subscribers.
    pub fn tick(&mut self) {
        for (topic, t) in self.topics.iter_mut() {
            // read all the incoming messages and distribute them by cloning the Arc's
            while let Ok(v) = t.incoming_recv.try_recv() {
                // subscriptions that were dropped are removed here
                let before = t.outgoing.len();
                t.outgoing.retain(|s| s.send(v.clone()).is_ok());
                if t.outgoing.len() != before {
                    tracing::debug!(
                        topic = %topic,
                        dropped = before - t.outgoing.len(),
                        "removed closed subscriptions"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn delivers_to_all_subscribers_on_tick() {
        let mut ps = PubSub::new();
        let mut s1 = ps.subscribe::<f64>("test");
        let mut s2 = ps.subscribe::<f64>("test");
        let mut p = ps.publish::<f64>("test");

        p.set(1.5);
        assert!(s1.try_recv().is_none(), "nothing is delivered before tick");

        ps.tick();

        assert_eq!(*s1.try_recv().unwrap(), 1.5);
        assert_eq!(*s2.try_recv().unwrap(), 1.5);
        assert!(s1.try_recv().is_none());
    }

    #[test]
    fn table_prefixes_topic_names() {
        let mut ps = PubSub::new();
        let mut publisher = ps.table("Stats").publish::<f64>("TranslationStdDevX");
        assert_eq!(publisher.topic(), "Stats/TranslationStdDevX");
        assert!(ps.has_topic("Stats/TranslationStdDevX"));

        let mut sub = ps.table("Stats").subscribe::<f64>("TranslationStdDevX");
        assert_eq!(sub.topic(), topic_name("Stats", "TranslationStdDevX"));
        publisher.set(0.25);
        ps.tick();
        assert_eq!(*sub.try_recv().unwrap(), 0.25);
    }

    #[test]
    fn latest_skips_older_values() {
        let mut ps = PubSub::new();
        let mut sub = ps.subscribe::<[f64; 2]>("pair");
        let mut p = ps.publish::<[f64; 2]>("pair");

        p.set([1.0, 2.0]);
        p.set([3.0, 4.0]);
        ps.tick();

        assert_eq!(*sub.try_recv_latest().unwrap(), [3.0, 4.0]);
        assert!(sub.try_recv_latest().is_none());
    }

    #[test]
    fn dropped_subscription_does_not_break_others() {
        let mut ps = PubSub::new();
        let dropped = ps.subscribe::<u32>("value");
        let mut kept = ps.subscribe::<u32>("value");
        let mut p = ps.publish::<u32>("value");
        drop(dropped);

        p.set(7);
        ps.tick();
        assert_eq!(*kept.try_recv().unwrap(), 7);
    }

    #[test]
    fn publishing_after_bus_is_dropped_is_silent() {
        let mut ps = PubSub::new();
        let mut p = ps.publish::<f64>("value");
        drop(ps);
        p.set(1.0);
    }

    #[test]
    #[should_panic(expected = "already claimed")]
    fn conflicting_topic_types_panic() {
        let mut ps = PubSub::new();
        let _p = ps.publish::<f64>("value");
        let _s = ps.subscribe::<u32>("value");
    }
}
