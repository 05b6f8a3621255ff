//! End-to-end tests for routing, middleware, backpressure and shutdown.

mod common;

use common::{channel_listener, eventually, tracked_job};
use foo_worker::{
    handler_fn, middleware_fn, Job, JobError, JobHandler, ListenerError, ListenerFailurePolicy,
    Worker, WorkerConfig, WorkerError, WorkerState,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

fn counting_handler(calls: &Arc<AtomicU32>) -> JobHandler {
    let calls = calls.clone();
    handler_fn(move |_ctx, _job| {
        let calls = calls.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    })
}

#[tokio::test]
async fn test_demo_jobs_are_handled_and_completed() {
    let (listener, mut probe) = channel_listener();
    let calls = Arc::new(AtomicU32::new(0));
    let done = Arc::new(AtomicU32::new(0));

    let mut worker = Worker::new(listener, WorkerConfig::default());
    worker.handle("demo", counting_handler(&calls));
    worker.run().await.unwrap();

    let (sink, _stop) = probe.connected().await;
    for i in 1..=3 {
        sink.send(tracked_job("demo", &format!(r#"{{"faker": {i}}}"#), &done))
            .await
            .unwrap();
    }

    assert!(eventually(|| done.load(Ordering::SeqCst) == 3).await);
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    worker.stop().await.unwrap();
    assert_eq!(done.load(Ordering::SeqCst), 3);
    assert!(probe.is_closed());
}

#[tokio::test]
async fn test_failed_job_is_not_completed_and_loop_survives() {
    let (listener, mut probe) = channel_listener();
    let done = Arc::new(AtomicU32::new(0));
    let ok_calls = Arc::new(AtomicU32::new(0));
    let failures = Arc::new(AtomicU32::new(0));

    let mut worker = Worker::new(listener, WorkerConfig::default());
    let failed = failures.clone();
    worker.handle_fn("demo", move |_ctx, _job| {
        let failed = failed.clone();
        async move {
            failed.fetch_add(1, Ordering::SeqCst);
            Err(JobError::ExecutionFailed("always fails".into()))
        }
    });
    worker.handle("healthy", counting_handler(&ok_calls));
    worker.run().await.unwrap();

    let (sink, _stop) = probe.connected().await;
    sink.send(tracked_job("demo", "1", &done)).await.unwrap();
    sink.send(tracked_job("healthy", "2", &done)).await.unwrap();

    assert!(eventually(|| ok_calls.load(Ordering::SeqCst) == 1).await);
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    // Only the healthy job was completed.
    assert!(eventually(|| done.load(Ordering::SeqCst) == 1).await);
    assert_eq!(worker.state(), WorkerState::Running);

    worker.stop().await.unwrap();
    assert_eq!(done.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unroutable_job_is_dropped_silently() {
    let (listener, mut probe) = channel_listener();
    let done = Arc::new(AtomicU32::new(0));
    let calls = Arc::new(AtomicU32::new(0));
    let middleware_calls = Arc::new(AtomicU32::new(0));

    let mut worker = Worker::new(listener, WorkerConfig::default());
    let seen = middleware_calls.clone();
    worker.use_middleware([middleware_fn(move |next: JobHandler| {
        let seen = seen.clone();
        handler_fn(move |ctx, job| {
            seen.fetch_add(1, Ordering::SeqCst);
            next(ctx, job)
        })
    })]);
    worker.handle("demo", counting_handler(&calls));
    worker.run().await.unwrap();

    let (sink, _stop) = probe.connected().await;
    sink.send(tracked_job("unknown", "lost", &done)).await.unwrap();
    sink.send(tracked_job("demo", "kept", &done)).await.unwrap();

    assert!(eventually(|| calls.load(Ordering::SeqCst) == 1).await);
    assert!(eventually(|| done.load(Ordering::SeqCst) == 1).await);
    assert_eq!(middleware_calls.load(Ordering::SeqCst), 1);
    assert_eq!(worker.state(), WorkerState::Running);

    worker.stop().await.unwrap();
}

#[tokio::test]
async fn test_middleware_runs_in_registration_order() {
    let (listener, mut probe) = channel_listener();
    let log = Arc::new(Mutex::new(Vec::<String>::new()));

    let layer = |name: &'static str| {
        let log = log.clone();
        middleware_fn(move |next: JobHandler| {
            let log = log.clone();
            handler_fn(move |ctx, job| {
                let next = next.clone();
                let log = log.clone();
                async move {
                    log.lock().push(format!("{name}>"));
                    let result = next(ctx, job).await;
                    log.lock().push(format!("<{name}"));
                    result
                }
            })
        })
    };

    let mut worker = Worker::new(listener, WorkerConfig::default());
    worker.use_middleware([layer("m1")]);
    worker.use_middleware([layer("m2")]);
    let inner = log.clone();
    worker.handle_fn("demo", move |_ctx, _job| {
        let inner = inner.clone();
        async move {
            inner.lock().push("handler".to_string());
            Ok(())
        }
    });
    worker.run().await.unwrap();

    let (sink, _stop) = probe.connected().await;
    sink.send(Job::new("demo", "a")).await.unwrap();
    sink.send(Job::new("demo", "b")).await.unwrap();

    assert!(eventually(|| log.lock().len() == 10).await);
    worker.stop().await.unwrap();

    let expected = ["m1>", "m2>", "handler", "<m2", "<m1"];
    let log = log.lock();
    assert_eq!(&log[..5], &expected);
    assert_eq!(&log[5..], &expected);
}

#[tokio::test]
async fn test_full_queue_blocks_producer() {
    const CAPACITY: usize = 2;

    let (listener, mut probe) = channel_listener();
    let gate = Arc::new(Semaphore::new(0));
    let (started_tx, mut started_rx) = mpsc::unbounded_channel::<String>();

    let mut worker = Worker::new(listener, WorkerConfig::with_queue_size(CAPACITY));
    let handler_gate = gate.clone();
    worker.handle_fn("demo", move |_ctx, job: Job| {
        let gate = handler_gate.clone();
        let started = started_tx.clone();
        async move {
            let _ = started.send(job.payload_lossy().into_owned());
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
            Ok(())
        }
    });
    worker.run().await.unwrap();

    let (sink, _stop) = probe.connected().await;
    assert_eq!(sink.capacity(), CAPACITY);

    // The first job is taken off the queue and parks in the handler.
    sink.send(Job::new("demo", "0")).await.unwrap();
    assert_eq!(started_rx.recv().await.unwrap(), "0");

    for i in 1..=CAPACITY {
        sink.send(Job::new("demo", i.to_string())).await.unwrap();
    }

    let overflow = tokio::time::timeout(
        Duration::from_millis(100),
        sink.send(Job::new("demo", "overflow")),
    )
    .await;
    assert!(overflow.is_err(), "producer must block while the queue is full");

    // Freeing one slot lets the blocked producer through.
    gate.add_permits(1);
    assert_eq!(started_rx.recv().await.unwrap(), "1");
    tokio::time::timeout(
        Duration::from_secs(1),
        sink.send(Job::new("demo", "overflow")),
    )
    .await
    .expect("producer should be released")
    .unwrap();

    gate.add_permits(CAPACITY + 2);
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_finishes_in_flight_job_and_drops_the_rest() {
    let (listener, mut probe) = channel_listener();
    let gate = Arc::new(Semaphore::new(0));
    let done = Arc::new(AtomicU32::new(0));
    let (started_tx, mut started_rx) = mpsc::unbounded_channel::<String>();

    let mut worker = Worker::new(listener, WorkerConfig::default());
    let handler_gate = gate.clone();
    worker.handle_fn("demo", move |_ctx, job: Job| {
        let gate = handler_gate.clone();
        let started = started_tx.clone();
        async move {
            let _ = started.send(job.payload_lossy().into_owned());
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
            Ok(())
        }
    });
    worker.run().await.unwrap();

    let (sink, stop_signal) = probe.connected().await;
    sink.send(tracked_job("demo", "in-flight", &done)).await.unwrap();
    assert_eq!(started_rx.recv().await.unwrap(), "in-flight");
    sink.send(tracked_job("demo", "queued", &done)).await.unwrap();

    let stopping = tokio::spawn(async move {
        let result = worker.stop().await;
        (worker, result)
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!stopping.is_finished(), "stop must wait for the in-flight job");

    gate.add_permits(1);
    let (worker, result) = tokio::time::timeout(Duration::from_secs(2), stopping)
        .await
        .expect("stop should complete")
        .unwrap();
    result.unwrap();

    assert_eq!(worker.state(), WorkerState::Stopped);
    assert_eq!(done.load(Ordering::SeqCst), 1);
    assert!(started_rx.try_recv().is_err(), "queued job must not start");
    assert!(stop_signal.is_stopped());
    assert!(probe.is_closed());

    let late = sink.send(Job::new("demo", "late")).await;
    assert!(matches!(late, Err(ListenerError::QueueClosed)));
}

#[tokio::test]
async fn test_done_failure_does_not_stop_the_loop() {
    let (listener, mut probe) = channel_listener();
    let calls = Arc::new(AtomicU32::new(0));
    let done = Arc::new(AtomicU32::new(0));

    let mut worker = Worker::new(listener, WorkerConfig::default());
    worker.handle("demo", counting_handler(&calls));
    worker.run().await.unwrap();

    let (sink, _stop) = probe.connected().await;
    sink.send(
        Job::new("demo", "nack")
            .with_done(|| async { Err(JobError::Completion("broker rejected ack".into())) }),
    )
    .await
    .unwrap();
    sink.send(tracked_job("demo", "ack", &done)).await.unwrap();

    assert!(eventually(|| done.load(Ordering::SeqCst) == 1).await);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn test_listener_error_is_logged_by_default() {
    let (listener, mut probe) = channel_listener();
    let calls = Arc::new(AtomicU32::new(0));

    let mut worker = Worker::new(listener, WorkerConfig::default());
    worker.handle("demo", counting_handler(&calls));
    worker.run().await.unwrap();

    let (sink, stop) = probe.connected().await;
    sink.report(ListenerError::Produce("lost connection".into()));
    sink.send(Job::new("demo", "after error")).await.unwrap();

    assert!(eventually(|| calls.load(Ordering::SeqCst) == 1).await);
    assert_eq!(worker.state(), WorkerState::Running);
    assert!(!stop.is_stopped());
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn test_listener_error_shuts_down_when_configured() {
    let (listener, mut probe) = channel_listener();
    let config = WorkerConfig::default().on_listener_error(ListenerFailurePolicy::Shutdown);

    let mut worker = Worker::new(listener, config);
    worker.handle_fn("demo", |_ctx, _job| async { Ok(()) });
    worker.run().await.unwrap();

    let (sink, stop) = probe.connected().await;
    sink.report(ListenerError::Produce("lost connection".into()));

    assert!(eventually(|| worker.state() == WorkerState::Stopped).await);
    assert!(stop.is_stopped());

    let err = worker.stop().await.unwrap_err();
    assert!(matches!(err, WorkerError::Listener(ListenerError::Produce(_))));
    assert!(probe.is_closed());
    // A second stop is a no-op.
    worker.stop().await.unwrap();
}

#[tokio::test]
async fn test_independent_workers_share_nothing() {
    let (first_listener, mut first_probe) = channel_listener();
    let (second_listener, mut second_probe) = channel_listener();
    let first_calls = Arc::new(AtomicU32::new(0));
    let second_calls = Arc::new(AtomicU32::new(0));

    let mut first = Worker::new(first_listener, WorkerConfig::with_queue_size(1));
    first.handle("demo", counting_handler(&first_calls));
    let mut second = Worker::new(second_listener, WorkerConfig::with_queue_size(1));
    second.handle("other", counting_handler(&second_calls));

    first.run().await.unwrap();
    second.run().await.unwrap();
    let (first_sink, _) = first_probe.connected().await;
    let (second_sink, _) = second_probe.connected().await;

    first_sink.send(Job::new("demo", "1")).await.unwrap();
    first_sink.send(Job::new("other", "dropped")).await.unwrap();
    second_sink.send(Job::new("other", "2")).await.unwrap();

    assert!(eventually(|| first_calls.load(Ordering::SeqCst) == 1).await);
    assert!(eventually(|| second_calls.load(Ordering::SeqCst) == 1).await);

    first.stop().await.unwrap();
    assert_eq!(second.state(), WorkerState::Running);
    second.stop().await.unwrap();
}

#[tokio::test]
async fn test_panicking_handler_still_stops_listener() {
    let (listener, mut probe) = channel_listener();
    let mut worker = Worker::new(listener, WorkerConfig::default());
    worker.handle_fn("demo", |_ctx, job: Job| async move {
        assert!(job.payload().is_empty(), "handler blew up");
        Ok(())
    });
    worker.run().await.unwrap();

    let (sink, stop_signal) = probe.connected().await;
    sink.send(Job::new("demo", "boom")).await.unwrap();
    assert!(eventually(|| sink.is_closed()).await);

    let err = worker.stop().await.unwrap_err();
    assert!(matches!(err, WorkerError::Join(_)));
    assert!(stop_signal.is_stopped());
    assert!(probe.is_closed());
    assert_eq!(worker.state(), WorkerState::Stopped);
}
