use std::time::Duration;

use mdviewer_engine::{ChangeNotifier, ChangeSignal, WatcherId};

fn signal(watcher: u64, seq: u64) -> ChangeSignal {
    ChangeSignal {
        watcher: WatcherId(watcher),
        seq,
    }
}

#[test]
fn pending_signals_coalesce_into_one() {
    let notifier = ChangeNotifier::new();
    let mut sub = notifier.subscribe();

    for seq in 1..=5 {
        assert_eq!(notifier.notify(signal(1, seq)), 1);
    }

    assert_eq!(sub.try_recv(), Some(signal(1, 5)));
    assert_eq!(sub.try_recv(), None);
}

#[test]
fn duplicate_signals_are_dropped() {
    let notifier = ChangeNotifier::new();
    let mut sub = notifier.subscribe();

    assert_eq!(notifier.notify(signal(1, 2)), 1);
    assert_eq!(sub.try_recv(), Some(signal(1, 2)));

    assert_eq!(notifier.notify(signal(1, 2)), 0);
    assert_eq!(notifier.notify(signal(1, 1)), 0);
    assert_eq!(sub.try_recv(), None);
}

#[test]
fn restarted_watcher_is_not_a_duplicate() {
    let notifier = ChangeNotifier::new();
    let mut sub = notifier.subscribe();

    notifier.notify(signal(1, 7));
    sub.try_recv();

    assert_eq!(notifier.notify(signal(2, 1)), 1);
    assert_eq!(sub.try_recv(), Some(signal(2, 1)));
}

#[test]
fn every_subscriber_gets_the_signal() {
    let notifier = ChangeNotifier::new();
    let mut a = notifier.subscribe();
    let mut b = notifier.subscribe();

    assert_eq!(notifier.notify(signal(1, 1)), 2);
    assert_eq!(a.try_recv(), Some(signal(1, 1)));
    assert_eq!(b.try_recv(), Some(signal(1, 1)));
}

#[test]
fn unsubscribed_consumer_is_released() {
    let notifier = ChangeNotifier::new();
    let kept = notifier.subscribe();
    let gone = notifier.subscribe();
    assert_eq!(notifier.subscriber_count(), 2);

    gone.unsubscribe();
    assert_eq!(notifier.subscriber_count(), 1);
    assert_eq!(notifier.notify(signal(1, 1)), 1);

    drop(kept);
    assert_eq!(notifier.subscriber_count(), 0);
    assert_eq!(notifier.notify(signal(1, 2)), 0);
}

#[tokio::test]
async fn close_drains_pending_then_ends() {
    let notifier = ChangeNotifier::new();
    let mut sub = notifier.subscribe();

    notifier.notify(signal(1, 1));
    notifier.close();

    assert_eq!(sub.recv().await, Some(signal(1, 1)));
    assert_eq!(sub.recv().await, None);
    assert_eq!(notifier.notify(signal(1, 2)), 0);

    let mut late = notifier.subscribe();
    assert_eq!(late.recv().await, None);
}

#[tokio::test]
async fn signal_crosses_from_background_thread() {
    let notifier = ChangeNotifier::new();
    let mut sub = notifier.subscribe();

    let producer = notifier.clone();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        producer.notify(signal(3, 1));
    });

    let received = tokio::time::timeout(Duration::from_secs(2), sub.recv())
        .await
        .expect("signal delivered");
    assert_eq!(received, Some(signal(3, 1)));
}
