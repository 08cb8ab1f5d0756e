use diffuse::{
    OwnerConfig, PresentationSink, RasterBuffer, Rgba8Premul, ShadowEngine, ShadowEngineOpts,
    ShadowRecipe, ShadowSurface, Size, SnapshotSource,
};
use std::sync::{Arc, Condvar, Mutex, Once, Weak};
use std::time::Duration;

/// Degrade paths report through `tracing` debug/trace events; capture them
/// in test output.
fn init_tracing() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Source whose snapshots block until the test opens the gate, making
/// "refresh while a build is in flight" deterministic.
struct GatedSource {
    gate: Mutex<bool>,
    cond: Condvar,
}

impl GatedSource {
    fn new() -> Self {
        Self {
            gate: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    fn open(&self) {
        *self.gate.lock().unwrap() = true;
        self.cond.notify_all();
    }
}

impl SnapshotSource for GatedSource {
    fn snapshot(&self, _scale: f32) -> Option<RasterBuffer> {
        let guard = self.gate.lock().unwrap();
        // Bounded wait so a wedged test fails instead of hanging the pool.
        let (guard, timed_out) = self
            .cond
            .wait_timeout_while(guard, Duration::from_secs(20), |open| !*open)
            .unwrap();
        drop(guard);
        if timed_out.timed_out() {
            return None;
        }
        Some(RasterBuffer::solid(Rgba8Premul::opaque(200, 200, 200), 16, 16, 1.0).unwrap())
    }
}

#[derive(Default)]
struct RecordingSink(Mutex<Vec<Option<ShadowSurface>>>);

impl PresentationSink for RecordingSink {
    fn present(&self, surface: Option<ShadowSurface>) {
        self.0.lock().unwrap().push(surface);
    }
}

impl RecordingSink {
    fn surfaces(&self) -> Vec<Option<ShadowSurface>> {
        self.0.lock().unwrap().clone()
    }
}

fn gated_config(source: &Arc<GatedSource>, sink: &Arc<RecordingSink>) -> OwnerConfig {
    OwnerConfig {
        bounds: Size::new(24.0, 24.0),
        device_scale: 1.0,
        corner_radius: 0.0,
        recipe: ShadowRecipe::default(),
        identity: None,
        source: Arc::downgrade(source) as Weak<dyn SnapshotSource>,
        sink: Arc::downgrade(sink) as Weak<dyn PresentationSink>,
    }
}

#[test]
fn zero_size_content_presents_no_shadow() {
    struct EmptyViewSource;
    impl SnapshotSource for EmptyViewSource {
        fn snapshot(&self, _scale: f32) -> Option<RasterBuffer> {
            Some(RasterBuffer::solid(Rgba8Premul::opaque(1, 1, 1), 8, 8, 1.0).unwrap())
        }
    }

    init_tracing();
    let source = Arc::new(EmptyViewSource);
    let sink = Arc::new(RecordingSink::default());
    let mut engine = ShadowEngine::new(ShadowEngineOpts::default()).unwrap();
    let owner = engine
        .register(OwnerConfig {
            bounds: Size::ZERO,
            device_scale: 1.0,
            corner_radius: 0.0,
            recipe: ShadowRecipe::default(),
            identity: None,
            source: Arc::downgrade(&source) as Weak<dyn SnapshotSource>,
            sink: Arc::downgrade(&sink) as Weak<dyn PresentationSink>,
        })
        .unwrap();

    engine.request_refresh(owner).unwrap();
    engine.settle(Duration::from_secs(10)).unwrap();

    let surfaces = sink.surfaces();
    assert_eq!(surfaces.len(), 1);
    assert!(surfaces[0].is_none(), "sink must be told to clear the shadow");
}

#[test]
fn refresh_during_build_discards_the_stale_result() {
    init_tracing();
    let source = Arc::new(GatedSource::new());
    let sink = Arc::new(RecordingSink::default());
    let mut engine = ShadowEngine::new(ShadowEngineOpts {
        workers: Some(2),
        ..Default::default()
    })
    .unwrap();
    let owner = engine.register(gated_config(&source, &sink)).unwrap();

    engine.request_refresh(owner).unwrap();
    let tick = engine.tick();
    assert_eq!(tick.dispatched, 1);

    // Supersede the in-flight build, then let snapshots through.
    let mut recipe = ShadowRecipe::default();
    recipe.set_brightness(0.0);
    engine.set_recipe(owner, recipe).unwrap();
    engine.request_refresh(owner).unwrap();
    source.open();

    engine.settle(Duration::from_secs(10)).unwrap();

    let surfaces = sink.surfaces();
    assert_eq!(surfaces.len(), 1, "stale completion must not be displayed");
    let img = &surfaces[0].as_ref().unwrap().image;
    let center = img.pixel(img.width() / 2, img.height() / 2).unwrap();
    // brightness 0 casts a black silhouette; the first build's grey never
    // reaches the sink.
    assert_eq!((center.r, center.g, center.b), (0, 0, 0));

    let stats = engine.stats();
    assert_eq!(stats.builds, 2);
    assert_eq!(stats.stale_discards, 1);
}

#[test]
fn removing_an_owner_mid_build_drops_the_result() {
    init_tracing();
    let source = Arc::new(GatedSource::new());
    let sink = Arc::new(RecordingSink::default());
    let mut engine = ShadowEngine::new(ShadowEngineOpts {
        workers: Some(1),
        ..Default::default()
    })
    .unwrap();
    let owner = engine.register(gated_config(&source, &sink)).unwrap();

    engine.request_refresh(owner).unwrap();
    engine.tick();
    engine.remove(owner).unwrap();
    source.open();

    // The orphaned completion is discarded on whichever tick sees it.
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while engine.stats().stale_discards == 0 {
        assert!(std::time::Instant::now() < deadline, "completion never drained");
        engine.tick();
        std::thread::sleep(Duration::from_millis(5));
    }

    assert!(sink.surfaces().is_empty());
}

#[test]
fn dropped_sink_turns_handoff_into_a_no_op() {
    init_tracing();
    let source = Arc::new(GatedSource::new());
    source.open();
    let sink = Arc::new(RecordingSink::default());
    let mut engine = ShadowEngine::new(ShadowEngineOpts::default()).unwrap();
    let owner = engine.register(gated_config(&source, &sink)).unwrap();

    drop(sink);
    engine.request_refresh(owner).unwrap();
    engine.settle(Duration::from_secs(10)).unwrap();

    assert_eq!(engine.stats().dead_sink_drops, 1);
}

#[test]
fn settle_times_out_instead_of_hanging() {
    init_tracing();
    let source = Arc::new(GatedSource::new());
    let sink = Arc::new(RecordingSink::default());
    let mut engine = ShadowEngine::new(ShadowEngineOpts {
        workers: Some(1),
        ..Default::default()
    })
    .unwrap();
    let owner = engine.register(gated_config(&source, &sink)).unwrap();

    engine.request_refresh(owner).unwrap();
    let err = engine
        .settle(Duration::from_millis(50))
        .expect_err("gate is closed, settle cannot finish");
    assert!(err.to_string().contains("schedule error"));

    // Unblock the worker so teardown does not wait on the gate.
    source.open();
    engine.settle(Duration::from_secs(10)).unwrap();
}
