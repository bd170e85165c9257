//! Broker subscriptions owned by a single robot mode.

use log::debug;
use std::sync::{Arc, Weak};

use crate::events::{BrokerError, EventArgs, EventBroker, HandlerId};

/// Subscriptions made by a mode on entry and released on exit, or when the mode is disposed.
#[derive(Default)]
pub(super) struct Subscriptions {
    broker: Weak<EventBroker>,

    ids: Vec<(&'static str, HandlerId)>,
}

impl Subscriptions {
    pub fn add<F>(
        &mut self,
        broker: &Arc<EventBroker>,
        event: &'static str,
        f: F,
    ) -> Result<(), BrokerError>
    where
        F: Fn(&EventArgs) + Send + Sync + 'static,
    {
        self.broker = Arc::downgrade(broker);
        let id = broker.subscribe_fn(event, f)?;
        self.ids.push((event, id));
        Ok(())
    }

    pub fn release(&mut self) {
        let broker = match self.broker.upgrade() {
            Some(b) => b,
            None => {
                self.ids.clear();
                return;
            }
        };

        for (event, id) in self.ids.drain(..) {
            if let Err(e) = broker.unsubscribe(event, id) {
                debug!("Could not unsubscribe from {}: {}", event, e);
            }
        }
    }
}
