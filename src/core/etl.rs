use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::RunMonitor;
use tokio::sync::Mutex;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: Mutex<RunMonitor>,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: Mutex::new(RunMonitor::new(monitor_enabled)),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting points harvest");

        // Extract
        let harvest = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} dancers and {} upcoming events ({} requests)",
            harvest.dancers.len(),
            harvest.upcoming_events.len(),
            harvest.requests_made
        );
        self.monitor.lock().await.log_phase("Extract completed");

        // Transform
        let dataset = self.pipeline.transform(harvest).await?;
        tracing::info!(
            "🔄 Transformed into {} dancers and {} events",
            dataset.dancers_count,
            dataset.events_count
        );
        self.monitor.lock().await.log_phase("Transform completed");

        // Load
        let output_path = self.pipeline.load(dataset).await?;
        tracing::info!("📁 Output saved to: {}", output_path);

        let mut monitor = self.monitor.lock().await;
        monitor.log_phase("Load completed");
        monitor.log_final();

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Dataset, DivisionProgression, Harvest};
    use crate::utils::error::PointsError;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubPipeline {
        fail_extract: bool,
        loads: AtomicUsize,
    }

    fn empty_dataset() -> Dataset {
        Dataset {
            last_updated: String::new(),
            roles: BTreeMap::new(),
            divisions: BTreeMap::new(),
            ordered_skill_divisions: Vec::new(),
            dancers: Vec::new(),
            dancers_count: 0,
            events: Vec::new(),
            events_count: 0,
            top_dancers_by_points_gained_recently: Vec::new(),
            upcoming_events: Vec::new(),
            new_dancers_over_time: Vec::new(),
            division_progression: DivisionProgression::default(),
        }
    }

    #[async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<Harvest> {
            if self.fail_extract {
                return Err(PointsError::CacheCorrupt {
                    path: "raw_responses.json.zip".to_string(),
                    reason: "truncated".to_string(),
                });
            }
            Ok(Harvest::default())
        }

        async fn transform(&self, _harvest: Harvest) -> Result<Dataset> {
            Ok(empty_dataset())
        }

        async fn load(&self, _dataset: Dataset) -> Result<String> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok("./output/database.json".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_returns_output_path() {
        let engine = EtlEngine::new(StubPipeline {
            fail_extract: false,
            loads: AtomicUsize::new(0),
        });
        assert_eq!(engine.run().await.unwrap(), "./output/database.json");
        assert_eq!(engine.pipeline().loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extract_failure_stops_before_load() {
        let engine = EtlEngine::new_with_monitoring(
            StubPipeline {
                fail_extract: true,
                loads: AtomicUsize::new(0),
            },
            true,
        );
        let err = engine.run().await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(engine.pipeline().loads.load(Ordering::SeqCst), 0);
    }
}
