use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use hirehelp_schema::AppEvent;
use tokio::sync::{mpsc, RwLock};

#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum Topic {
    MessageAppended,
    ConversationReset,
    ConfigReplaced,
    VoiceStateChanged,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::MessageAppended,
        Topic::ConversationReset,
        Topic::ConfigReplaced,
        Topic::VoiceStateChanged,
    ];

    pub fn from_event(event: &AppEvent) -> Self {
        match event {
            AppEvent::MessageAppended { .. } => Topic::MessageAppended,
            AppEvent::ConversationReset { .. } => Topic::ConversationReset,
            AppEvent::ConfigReplaced { .. } => Topic::ConfigReplaced,
            AppEvent::VoiceStateChanged { .. } => Topic::VoiceStateChanged,
        }
    }
}

type Subscriber = mpsc::Sender<AppEvent>;
type Subscribers = Arc<RwLock<HashMap<Topic, Vec<Subscriber>>>>;

pub struct EventBus {
    subscribers: Subscribers,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    pub async fn subscribe(&self, topic: Topic) -> mpsc::Receiver<AppEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut subs = self.subscribers.write().await;
        subs.entry(topic).or_default().push(tx);
        rx
    }

    /// One receiver fed by every topic, in publish order.
    pub async fn subscribe_all(&self) -> mpsc::Receiver<AppEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut subs = self.subscribers.write().await;
        for topic in Topic::ALL {
            subs.entry(topic).or_default().push(tx.clone());
        }
        rx
    }

    pub async fn publish(&self, event: AppEvent) -> Result<()> {
        publish_to(&self.subscribers, event).await
    }

    pub fn publisher(&self) -> BusPublisher {
        BusPublisher {
            subscribers: self.subscribers.clone(),
        }
    }
}

#[derive(Clone)]
pub struct BusPublisher {
    subscribers: Subscribers,
}

impl BusPublisher {
    pub async fn publish(&self, event: AppEvent) -> Result<()> {
        publish_to(&self.subscribers, event).await
    }
}

async fn publish_to(subscribers: &Subscribers, event: AppEvent) -> Result<()> {
    let topic = Topic::from_event(&event);
    let mut subs = subscribers.write().await;
    if let Some(list) = subs.get_mut(&topic) {
        // Closed receivers are pruned; full ones drop the event.
        list.retain(|tx| !tx.is_closed());
        for tx in list.iter() {
            if tx.try_send(event.clone()).is_err() {
                tracing::debug!(?topic, "subscriber queue full, event dropped");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hirehelp_schema::{Message, VoiceState};
    use tokio::time::{timeout, Duration};
    use uuid::Uuid;

    fn appended() -> AppEvent {
        AppEvent::MessageAppended {
            message: Message::assistant("hello"),
        }
    }

    #[tokio::test]
    async fn publish_to_no_subscribers_succeeds() {
        let bus = EventBus::new(8);
        assert!(bus.publish(appended()).await.is_ok());
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe(Topic::MessageAppended).await;

        bus.publish(appended()).await.unwrap();

        let received = timeout(Duration::from_millis(100), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(received, AppEvent::MessageAppended { .. }));
    }

    #[tokio::test]
    async fn different_topics_no_crosstalk() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe(Topic::ConfigReplaced).await;

        bus.publish(appended()).await.unwrap();

        let received = timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(received.is_err());
    }

    #[tokio::test]
    async fn subscribe_all_sees_every_topic_in_order() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe_all().await;
        let publisher = bus.publisher();

        publisher.publish(appended()).await.unwrap();
        publisher
            .publish(AppEvent::VoiceStateChanged {
                session_id: Uuid::new_v4(),
                state: VoiceState::Connecting,
            })
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert!(matches!(first, AppEvent::MessageAppended { .. }));
        assert!(matches!(
            second,
            AppEvent::VoiceStateChanged {
                state: VoiceState::Connecting,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned() {
        let bus = EventBus::new(8);
        let rx = bus.subscribe(Topic::MessageAppended).await;
        drop(rx);

        bus.publish(appended()).await.unwrap();

        let subs = bus.subscribers.read().await;
        assert!(subs[&Topic::MessageAppended].is_empty());
    }

    #[tokio::test]
    async fn channel_backpressure_drops_when_full() {
        let bus = EventBus::new(1);
        let mut rx = bus.subscribe(Topic::MessageAppended).await;

        bus.publish(appended()).await.unwrap();
        bus.publish(appended()).await.unwrap();

        let first = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(first.is_ok());
        let second = timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(second.is_err());
    }
}
