use pubsub::PubSub;

/// A Node is an entity that can publish and react to subscribed messages.
///
/// All nodes are driven from the same loop, one call to [`Node::update`] per tick followed by
/// a tick of the bus, so nothing in here needs to be thread safe.
pub trait Node {
    /// Allows the Node to update itself and perform logic. Should be kept brief since it runs once per tick.
    ///
    /// The bus is handed in so nodes can register topics they only discover at runtime.
    fn update(&mut self, _pubsub: &mut PubSub) {}

    /// Sources return true once they have nothing more to publish. The runner stops shortly after.
    fn finished(&self) -> bool {
        false
    }

    /// Called when the Node should terminate.
    fn terminate(&mut self) {}
}

pub trait NodeConfig {
    /// Constructs a new Node object. This should also subscribe or request permission to
    /// publish via the Publish/Subscribe mechanism.
    fn instantiate(&self, pubsub: &mut PubSub) -> anyhow::Result<Box<dyn Node>>;
}
