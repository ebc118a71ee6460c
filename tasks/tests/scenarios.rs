//! End-to-end scenarios against an in-memory transport, covering the
//! concrete cases named in the testable-properties section: happy path,
//! retry to exhaustion, retry success, delayed ordering, delayed
//! past-time rejection, periodic duplicate registration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use transport::InMemoryProvider;

use tasks::{RetryPolicy, Tasks, TasksError};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn recording_handler(calls: Arc<Mutex<Vec<HashMap<String, String>>>>) -> tasks::TaskHandler {
    Arc::new(move |params| {
        calls.lock().unwrap().push(params.clone());
        Ok(())
    })
}

fn failing_handler(
    remaining_failures: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<HashMap<String, String>>>>,
) -> tasks::TaskHandler {
    Arc::new(move |params| {
        calls.lock().unwrap().push(params.clone());

        if remaining_failures.load(Ordering::SeqCst) > 0 {
            remaining_failures.fetch_sub(1, Ordering::SeqCst);
            Err("handler configured to fail".into())
        } else {
            Ok(())
        }
    })
}

async fn wait_until(mut predicate: impl FnMut() -> bool, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while !predicate() {
        if tokio::time::Instant::now() >= deadline {
            panic!("condition not met within timeout");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn s1_happy_path() {
    init_tracing();
    let provider: Arc<dyn transport::Provider> = Arc::new(InMemoryProvider::new());
    let cancellation = CancellationToken::new();

    let scheduler = Tasks::builder()
        .with_provider(provider)
        .with_topic("tasks.default")
        .with_cancellation(cancellation.clone())
        .build()
        .unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    scheduler.register_handler("t", recording_handler(calls.clone())).await.unwrap();
    scheduler.start().await.unwrap();

    let mut params = HashMap::new();
    params.insert("k".to_string(), "v".to_string());
    scheduler.create("t", params).await.unwrap();

    wait_until(|| !calls.lock().unwrap().is_empty(), Duration::from_secs(1)).await;

    let observed = calls.lock().unwrap();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].get("k"), Some(&"v".to_string()));

    cancellation.cancel();
}

#[tokio::test(start_paused = true)]
async fn s2_retry_to_exhaustion() {
    init_tracing();
    let provider: Arc<dyn transport::Provider> = Arc::new(InMemoryProvider::new());
    let cancellation = CancellationToken::new();

    let retry_policy = RetryPolicy {
        initial_interval: Duration::from_millis(100),
        backoff_coefficient: 2.0,
        maximum_interval: Duration::from_secs(10),
        maximum_attempts: 3,
    };

    let scheduler = Tasks::builder()
        .with_provider(provider)
        .with_topic("tasks.default")
        .with_cancellation(cancellation.clone())
        .with_retry_policy(retry_policy)
        .build()
        .unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    // Always fails: remaining_failures never reaches 0.
    let always_fails = Arc::new(AtomicUsize::new(usize::MAX));
    scheduler
        .register_handler("t", failing_handler(always_fails, calls.clone()))
        .await
        .unwrap();
    scheduler.start().await.unwrap();

    scheduler.create("t", HashMap::new()).await.unwrap();

    // One immediate call, then three retries at 100/200/400ms.
    for _ in 0..4 {
        tokio::time::advance(Duration::from_millis(500)).await;
    }

    wait_until(|| calls.lock().unwrap().len() >= 4, Duration::from_secs(5)).await;

    let observed = calls.lock().unwrap();
    assert_eq!(observed.len(), 4);
    assert_eq!(observed.last().unwrap().get("attempts"), Some(&"3".to_string()));

    cancellation.cancel();
}

#[tokio::test(start_paused = true)]
async fn s3_retry_then_success() {
    init_tracing();
    let provider: Arc<dyn transport::Provider> = Arc::new(InMemoryProvider::new());
    let cancellation = CancellationToken::new();

    let retry_policy = RetryPolicy {
        initial_interval: Duration::from_millis(50),
        backoff_coefficient: 2.0,
        maximum_interval: Duration::from_secs(10),
        maximum_attempts: 5,
    };

    let scheduler = Tasks::builder()
        .with_provider(provider)
        .with_topic("tasks.default")
        .with_cancellation(cancellation.clone())
        .with_retry_policy(retry_policy)
        .build()
        .unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let remaining_failures = Arc::new(AtomicUsize::new(2));
    scheduler
        .register_handler("t", failing_handler(remaining_failures, calls.clone()))
        .await
        .unwrap();
    scheduler.start().await.unwrap();

    scheduler.create("t", HashMap::new()).await.unwrap();

    for _ in 0..3 {
        tokio::time::advance(Duration::from_millis(200)).await;
    }

    wait_until(|| calls.lock().unwrap().len() >= 3, Duration::from_secs(5)).await;

    assert_eq!(calls.lock().unwrap().len(), 3);

    cancellation.cancel();
}

#[tokio::test(start_paused = true)]
async fn s4_delayed_ordering() {
    init_tracing();
    let provider: Arc<dyn transport::Provider> = Arc::new(InMemoryProvider::new());
    let cancellation = CancellationToken::new();

    let scheduler = Tasks::builder()
        .with_provider(provider)
        .with_topic("tasks.default")
        .with_cancellation(cancellation.clone())
        .build()
        .unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    for name in ["a", "b", "c"] {
        let order = order.clone();
        let name_owned = name.to_string();
        scheduler
            .register_handler(
                name,
                Arc::new(move |_params| {
                    order.lock().unwrap().push(name_owned.clone());
                    Ok(())
                }),
            )
            .await
            .unwrap();
    }
    scheduler.start().await.unwrap();

    let now = Utc::now();
    scheduler
        .create_delayed(None, "a", HashMap::new(), now + chrono::Duration::seconds(3))
        .await
        .unwrap();
    scheduler
        .create_delayed(None, "b", HashMap::new(), now + chrono::Duration::seconds(1))
        .await
        .unwrap();
    scheduler
        .create_delayed(None, "c", HashMap::new(), now + chrono::Duration::seconds(2))
        .await
        .unwrap();

    for _ in 0..4 {
        tokio::time::advance(Duration::from_secs(1)).await;
    }

    wait_until(|| order.lock().unwrap().len() >= 3, Duration::from_secs(5)).await;

    assert_eq!(*order.lock().unwrap(), vec!["b".to_string(), "c".to_string(), "a".to_string()]);

    cancellation.cancel();
}

#[tokio::test]
async fn s5_delayed_past_time_rejected() {
    init_tracing();
    let provider: Arc<dyn transport::Provider> = Arc::new(InMemoryProvider::new());
    let cancellation = CancellationToken::new();

    let scheduler = Tasks::builder()
        .with_provider(provider)
        .with_topic("tasks.default")
        .with_cancellation(cancellation.clone())
        .build()
        .unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    scheduler.register_handler("t", recording_handler(calls.clone())).await.unwrap();
    scheduler.start().await.unwrap();

    let err = scheduler
        .create_delayed(None, "t", HashMap::new(), Utc::now() - chrono::Duration::hours(1))
        .await
        .unwrap_err();

    assert!(matches!(err, TasksError::CreateDelayedError));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(calls.lock().unwrap().is_empty());

    cancellation.cancel();
}

#[tokio::test]
async fn s6_periodic_duplicate_registration_rejected() {
    init_tracing();
    let provider: Arc<dyn transport::Provider> = Arc::new(InMemoryProvider::new());
    let cancellation = CancellationToken::new();

    let scheduler = Tasks::builder()
        .with_provider(provider)
        .with_topic("tasks.default")
        .with_cancellation(cancellation.clone())
        .build()
        .unwrap();

    let now = Utc::now();
    scheduler
        .create_scheduled("p", HashMap::new(), now, chrono::Duration::hours(1))
        .await
        .unwrap();

    let err = scheduler
        .create_scheduled("p", HashMap::new(), now, chrono::Duration::minutes(1))
        .await
        .unwrap_err();

    assert!(matches!(err, TasksError::ScheduledAlreadyRegistered(name) if name == "p"));
}
