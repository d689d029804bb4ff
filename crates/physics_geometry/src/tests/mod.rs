//! End-to-end pipeline scenarios
//!
//! Unit tests live next to each module; these exercise several stages at
//! once through the public API.

mod lifecycle;

use crate::builder::GeometryBuilder;
use crate::config::GeometrySettings;
use crate::scene::testing::RecordingScene;
use crate::scene::GeometrySceneEvents;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) fn test_settings() -> GeometrySettings {
    GeometrySettings::default()
        .with_worker_threads(2)
        .with_pool_floor_size(0)
        .with_tick_budget(0.05)
}

pub(crate) fn initialized_builder(settings: GeometrySettings) -> (GeometryBuilder, Arc<RecordingScene>) {
    crate::foundation::logging::init();
    let scene = Arc::new(RecordingScene::default());
    let events: Arc<dyn GeometrySceneEvents> = scene.clone();
    let mut builder = GeometryBuilder::new(settings).unwrap();
    builder.initialize(Arc::downgrade(&events));
    (builder, scene)
}

/// Tick until nothing is queued or in flight, or fail after ten seconds
pub(crate) fn tick_until_settled(builder: &mut GeometryBuilder) {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        builder.tick(1.0 / 60.0);
        let stats = builder.stats();
        let settled = stats.launch_queue == 0
            && stats.cache.in_flight == 0
            && stats.waiting_for_geometry == 0
            && stats.waiting_for_material == 0;
        if settled {
            return;
        }
        assert!(Instant::now() < deadline, "pipeline did not settle: {stats:?}");
        std::thread::sleep(Duration::from_millis(1));
    }
}
