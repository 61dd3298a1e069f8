use super::*;
use crate::extractor::ExtractError;
use crate::load::{LoadMonitor, ResourceSample, ResourceSampler, SampleError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;
use tokio::time::Instant;

struct Fixed(f64);

impl ResourceSampler for Fixed {
    fn sample(&mut self) -> Result<ResourceSample, SampleError> {
        ResourceSample::checked(self.0, 10.0)
    }
}

/// Drive the monitor to a level using the default 75/80/70 thresholds.
fn set_load(monitor: &LoadMonitor, level: LoadLevel) {
    let cpu = match level {
        LoadLevel::Normal => 10.0,
        LoadLevel::Warn => 77.0,
        LoadLevel::Throttle => 95.0,
    };
    monitor.tick(&mut Fixed(cpu));
    assert_eq!(monitor.level(), level);
}

#[derive(Default)]
struct FakeExtractor {
    not_ready: bool,
    fail: bool,
    rows: Vec<Row>,
    work: Duration,
    escalate: Option<Arc<LoadMonitor>>,
    runs: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    polls: StdMutex<Vec<Duration>>,
    run_started: StdMutex<Option<Instant>>,
}

#[async_trait]
impl Extractor for FakeExtractor {
    fn target(&self) -> &str {
        "fake://quotes"
    }

    async fn is_ready(&self, timeout: Duration, poll: Duration) -> bool {
        self.polls.lock().unwrap().push(poll);
        if self.not_ready {
            tokio::time::sleep(timeout).await;
            return false;
        }
        true
    }

    async fn run(&self) -> Result<Vec<Row>, ExtractError> {
        self.run_started.lock().unwrap().get_or_insert_with(Instant::now);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.runs.fetch_add(1, Ordering::SeqCst);
        if !self.work.is_zero() {
            tokio::time::sleep(self.work).await;
        }
        if let Some(monitor) = &self.escalate {
            set_load(monitor, LoadLevel::Throttle);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            return Err(ExtractError::Unavailable("page crashed".into()));
        }
        Ok(self.rows.clone())
    }
}

fn quotes() -> Vec<Row> {
    vec![Row::named("Gold", "2350.1"), Row::named("Brent", "80.4")]
}

fn pipeline_with(extractor: Arc<FakeExtractor>, capacity: usize) -> Arc<RequestPipeline> {
    let ctx = GateContext::new(
        Arc::new(LoadMonitor::default()),
        Default::default(),
        capacity,
    );
    Arc::new(RequestPipeline::new(Arc::new(ctx), extractor))
}

#[tokio::test(start_paused = true)]
async fn test_normal_level_never_caches() {
    let extractor = Arc::new(FakeExtractor {
        rows: quotes(),
        ..Default::default()
    });
    let pipeline = pipeline_with(extractor.clone(), 1);

    for _ in 0..2 {
        let resp = pipeline.handle(QuotesRequest::default()).await.unwrap();
        assert_eq!(resp.source, ResponseSource::Fresh);
        assert_eq!(resp.payload.level, LoadLevel::Normal);
        assert!(resp.payload.ok);
        assert_eq!(resp.payload.rows, quotes());
    }
    assert_eq!(extractor.runs.load(Ordering::SeqCst), 2);
    assert_eq!(pipeline.context().cache().stats().stores, 0);
}

#[tokio::test(start_paused = true)]
async fn test_throttle_serves_recent_result_from_cache() {
    let extractor = Arc::new(FakeExtractor {
        rows: quotes(),
        ..Default::default()
    });
    let pipeline = pipeline_with(extractor.clone(), 1);
    set_load(pipeline.context().monitor(), LoadLevel::Throttle);

    let first = pipeline.handle(QuotesRequest::default()).await.unwrap();
    assert_eq!(first.source, ResponseSource::Fresh);
    assert_eq!(first.payload.level, LoadLevel::Throttle);

    tokio::time::advance(Duration::from_millis(500)).await;
    let second = pipeline.handle(QuotesRequest::default()).await.unwrap();
    assert_eq!(second.source, ResponseSource::Cache);
    assert!(Arc::ptr_eq(&first.payload, &second.payload));
    assert_eq!(extractor.runs.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_millis(2000)).await;
    let third = pipeline.handle(QuotesRequest::default()).await.unwrap();
    assert_eq!(third.source, ResponseSource::Fresh);
    assert_eq!(extractor.runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cache_entry_ignored_once_level_returns_to_normal() {
    let extractor = Arc::new(FakeExtractor {
        rows: quotes(),
        ..Default::default()
    });
    let pipeline = pipeline_with(extractor.clone(), 1);
    set_load(pipeline.context().monitor(), LoadLevel::Warn);
    pipeline.handle(QuotesRequest::default()).await.unwrap();

    set_load(pipeline.context().monitor(), LoadLevel::Normal);
    let resp = pipeline.handle(QuotesRequest::default()).await.unwrap();
    assert_eq!(resp.source, ResponseSource::Fresh);
    assert_eq!(extractor.runs.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_admission_timeout_reports_level() {
    let pipeline = pipeline_with(Arc::new(FakeExtractor::default()), 1);
    set_load(pipeline.context().monitor(), LoadLevel::Throttle);
    let _held = pipeline
        .context()
        .limiter()
        .admit(Duration::from_secs(1))
        .await
        .unwrap();

    let err = pipeline.handle(QuotesRequest::default()).await.unwrap_err();
    assert_eq!(
        err,
        PipelineError::AdmissionTimeout {
            level: LoadLevel::Throttle,
            waited: Duration::from_millis(750),
        }
    );
    assert_eq!(err.to_string(), "Server is busy (level=throttle). Retry soon.");
    assert_eq!(pipeline.context().limiter().snapshot().inflight, 1);
}

#[tokio::test(start_paused = true)]
async fn test_readiness_timeout_releases_slot() {
    let extractor = Arc::new(FakeExtractor {
        not_ready: true,
        ..Default::default()
    });
    let pipeline = pipeline_with(extractor.clone(), 1);
    let request = QuotesRequest {
        ready_timeout: Duration::from_millis(300),
        ..Default::default()
    };

    let err = pipeline.handle(request).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ExtractionTimeout { timeout, .. } if timeout == Duration::from_millis(300)
    ));
    assert_eq!(extractor.runs.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.context().limiter().snapshot().inflight, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_extraction_degrades_to_empty_rows() {
    let extractor = Arc::new(FakeExtractor {
        fail: true,
        ..Default::default()
    });
    let pipeline = pipeline_with(extractor, 1);

    let resp = pipeline.handle(QuotesRequest::default()).await.unwrap();
    assert!(resp.payload.ok);
    assert!(resp.payload.rows.is_empty());
    assert!(matches!(resp.source, ResponseSource::Degraded { ref reason } if reason.contains("page crashed")));
    assert_eq!(pipeline.context().limiter().snapshot().inflight, 0);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_rows_removed_in_order() {
    let extractor = Arc::new(FakeExtractor {
        rows: vec![
            Row::named("Gold", "1"),
            Row::named("Oil", "2"),
            Row::named("Gold", "1"),
        ],
        ..Default::default()
    });
    let pipeline = pipeline_with(extractor, 1);

    let resp = pipeline.handle(QuotesRequest::default()).await.unwrap();
    assert_eq!(
        resp.payload.rows,
        vec![Row::named("Gold", "1"), Row::named("Oil", "2")]
    );
}

#[tokio::test(start_paused = true)]
async fn test_resource_section_is_serialized() {
    let extractor = Arc::new(FakeExtractor {
        rows: quotes(),
        work: Duration::from_millis(100),
        ..Default::default()
    });
    let pipeline = pipeline_with(extractor.clone(), 3);

    let handles: Vec<_> = (0..3)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.handle(QuotesRequest::default()).await })
        })
        .collect();
    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    assert_eq!(extractor.runs.load(Ordering::SeqCst), 3);
    assert_eq!(extractor.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_request_releases_slot() {
    let extractor = Arc::new(FakeExtractor {
        work: Duration::from_secs(10),
        ..Default::default()
    });
    let pipeline = pipeline_with(extractor, 1);

    let task = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.handle(QuotesRequest::default()).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(pipeline.context().limiter().snapshot().inflight, 1);

    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());
    assert_eq!(pipeline.context().limiter().snapshot().inflight, 0);
}

#[tokio::test(start_paused = true)]
async fn test_level_reread_when_storing() {
    let monitor = Arc::new(LoadMonitor::default());
    let extractor = Arc::new(FakeExtractor {
        rows: quotes(),
        escalate: Some(Arc::clone(&monitor)),
        ..Default::default()
    });
    let ctx = Arc::new(GateContext::new(monitor, Default::default(), 1));
    let pipeline = RequestPipeline::new(Arc::clone(&ctx), extractor);

    // Entered at Normal; throttle kicks in while extracting.
    let resp = pipeline.handle(QuotesRequest::default()).await.unwrap();
    assert_eq!(resp.payload.level, LoadLevel::Throttle);
    assert_eq!(ctx.cache().stats().stores, 1);
}

#[tokio::test(start_paused = true)]
async fn test_poll_interval_raised_to_level_floor() {
    let extractor = Arc::new(FakeExtractor {
        rows: quotes(),
        ..Default::default()
    });
    let pipeline = pipeline_with(extractor.clone(), 1);
    let request = QuotesRequest {
        poll_interval: Duration::from_millis(150),
        ..Default::default()
    };

    pipeline.handle(request).await.unwrap();
    set_load(pipeline.context().monitor(), LoadLevel::Warn);
    pipeline.handle(request).await.unwrap();
    // Let the warn result age out so the throttle request extracts again.
    tokio::time::advance(Duration::from_secs(3)).await;
    set_load(pipeline.context().monitor(), LoadLevel::Throttle);
    let resp = pipeline.handle(request).await.unwrap();
    assert_eq!(resp.source, ResponseSource::Fresh);

    assert_eq!(
        *extractor.polls.lock().unwrap(),
        vec![
            Duration::from_millis(150),
            Duration::from_millis(250),
            Duration::from_millis(400),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_throttle_delays_extraction_after_admission() {
    let extractor = Arc::new(FakeExtractor {
        rows: quotes(),
        ..Default::default()
    });
    let pipeline = pipeline_with(extractor.clone(), 1);
    set_load(pipeline.context().monitor(), LoadLevel::Throttle);

    let started = Instant::now();
    pipeline.handle(QuotesRequest::default()).await.unwrap();

    let run_started = extractor.run_started.lock().unwrap().unwrap();
    assert!(run_started - started >= Duration::from_millis(350));
}

#[tokio::test(start_paused = true)]
async fn test_normal_extracts_without_delay() {
    let extractor = Arc::new(FakeExtractor {
        rows: quotes(),
        ..Default::default()
    });
    let pipeline = pipeline_with(extractor.clone(), 1);

    let started = Instant::now();
    pipeline.handle(QuotesRequest::default()).await.unwrap();

    let run_started = extractor.run_started.lock().unwrap().unwrap();
    assert_eq!(run_started - started, Duration::ZERO);
}

#[test]
fn test_target_readable_outside_resource_section() {
    let pipeline = pipeline_with(Arc::new(FakeExtractor::default()), 1);
    assert_eq!(pipeline.target(), "fake://quotes");
}

#[test]
fn test_payload_wire_shape() {
    let payload = QuotesPayload {
        ok: true,
        rows: vec![Row::named("Gold", "1")],
        level: LoadLevel::Warn,
    };
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["ok"], true);
    assert_eq!(json["level"], "warn");
    assert_eq!(json["rows"][0]["Name"], "Gold");
}
