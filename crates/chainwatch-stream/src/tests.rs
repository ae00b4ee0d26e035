use crate::broker::StreamBroker;
use crate::dedup::DedupSet;
use std::collections::HashMap;
use std::time::Duration;

fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn publish_consume_ack_cycle() {
    let broker = StreamBroker::new();
    let id = broker.publish("events", fields(&[("event_id", "e1")]));

    let batch = broker
        .consume("events", "g1", "w1", Duration::from_millis(100), 10)
        .await;
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].id, id);
    assert_eq!(batch[0].field("event_id"), Some("e1"));
    assert_eq!(broker.pending_count("events", "g1"), 1);

    // Already delivered to this group: nothing new until redelivery.
    let again = broker
        .consume("events", "g1", "w2", Duration::from_millis(100), 10)
        .await;
    assert!(again.is_empty());

    assert_eq!(broker.ack("events", "g1", &[id]), 1);
    assert_eq!(broker.pending_count("events", "g1"), 0);
    // Acking twice is harmless.
    assert_eq!(broker.ack("events", "g1", &[id]), 0);
}

#[tokio::test(start_paused = true)]
async fn fifo_order_within_stream() {
    let broker = StreamBroker::new();
    for i in 0..5 {
        broker.publish("events", fields(&[("n", &i.to_string())]));
    }
    let batch = broker
        .consume("events", "g1", "w1", Duration::from_millis(10), 10)
        .await;
    let ns: Vec<&str> = batch.iter().filter_map(|e| e.field("n")).collect();
    assert_eq!(ns, vec!["0", "1", "2", "3", "4"]);
}

#[tokio::test(start_paused = true)]
async fn batch_size_is_respected() {
    let broker = StreamBroker::new();
    for i in 0..7 {
        broker.publish("events", fields(&[("n", &i.to_string())]));
    }
    let first = broker
        .consume("events", "g1", "w1", Duration::from_millis(10), 3)
        .await;
    assert_eq!(first.len(), 3);
    let second = broker
        .consume("events", "g1", "w1", Duration::from_millis(10), 10)
        .await;
    assert_eq!(second.len(), 4);
    assert_eq!(second[0].field("n"), Some("3"));
}

#[tokio::test(start_paused = true)]
async fn groups_each_see_every_entry() {
    let broker = StreamBroker::new();
    broker.publish("events", fields(&[("event_id", "e1")]));

    let a = broker
        .consume("events", "group_a", "w1", Duration::from_millis(10), 10)
        .await;
    let b = broker
        .consume("events", "group_b", "w1", Duration::from_millis(10), 10)
        .await;
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn consume_blocks_until_timeout_on_empty_stream() {
    let broker = StreamBroker::new();
    let batch = broker
        .consume("events", "g1", "w1", Duration::from_secs(5), 10)
        .await;
    assert!(batch.is_empty());
}

#[tokio::test(start_paused = true)]
async fn blocked_consumer_wakes_on_publish() {
    let broker = std::sync::Arc::new(StreamBroker::new());
    let consumer = {
        let broker = broker.clone();
        tokio::spawn(async move {
            broker
                .consume("events", "g1", "w1", Duration::from_secs(30), 10)
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    broker.publish("events", fields(&[("event_id", "e1")]));
    let batch = consumer.await.unwrap();
    assert_eq!(batch.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn unacked_entry_is_claimable_after_idle() {
    let broker = StreamBroker::new();
    let id = broker.publish("events", fields(&[("event_id", "e1")]));

    let batch = broker
        .consume("events", "g1", "w1", Duration::from_millis(10), 10)
        .await;
    assert_eq!(batch.len(), 1);
    // w1 dies without acking.

    // Not idle long enough yet.
    assert!(broker
        .claim("events", "g1", "w2", Duration::from_secs(300))
        .is_empty());

    tokio::time::advance(Duration::from_secs(301)).await;

    let claimed = broker.claim("events", "g1", "w2", Duration::from_secs(300));
    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].id, id);

    // The idle clock was reset on claim: a concurrent peer gets nothing.
    let raced = broker.claim("events", "g1", "w3", Duration::from_secs(300));
    assert!(raced.is_empty());

    assert_eq!(broker.ack("events", "g1", &[id]), 1);
}

#[tokio::test(start_paused = true)]
async fn dedup_set_if_absent_with_ttl() {
    let dedup = DedupSet::new();
    let ttl = Duration::from_secs(60);

    assert!(dedup.insert("fp-1", ttl));
    assert!(!dedup.insert("fp-1", ttl), "second insert within TTL");
    assert!(dedup.contains("fp-1"));

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(!dedup.contains("fp-1"));
    assert!(dedup.insert("fp-1", ttl), "insert after expiry");
}

#[tokio::test(start_paused = true)]
async fn broker_dedup_round_trip() {
    let broker = StreamBroker::new();
    let ttl = Duration::from_secs(172_800);
    assert!(broker.check_and_set("abc123", ttl));
    assert!(!broker.check_and_set("abc123", ttl));
}
