//! Background monitor loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::SettingsHandle;
use crate::monitoring::alerts::{AlertLevel, AlertThrottle};
use crate::monitoring::features::{FeatureSettings, VOICE_NOTIFICATION, ZOMBIE_DETECTION};
use crate::monitoring::{
    CommandDetector, Detector, MonitorStart, MonitoringControl, MonitoringError,
};
use crate::observability::metrics;
use crate::ws::{ConnectionManager, ServerMessage};

/// Clears the active flag when the loop task ends, including by panic.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct RunningMonitor {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct MonitoringService {
    settings: SettingsHandle,
    features: Arc<FeatureSettings>,
    connections: ConnectionManager,
    detector: OnceCell<Arc<dyn Detector>>,
    running: Mutex<Option<RunningMonitor>>,
    active: Arc<AtomicBool>,
}

impl MonitoringService {
    /// Detection runs the configured command, built on first start.
    pub fn new(
        settings: SettingsHandle,
        features: Arc<FeatureSettings>,
        connections: ConnectionManager,
    ) -> Self {
        Self {
            settings,
            features,
            connections,
            detector: OnceCell::new(),
            running: Mutex::new(None),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_detector(mut self, detector: Arc<dyn Detector>) -> Self {
        self.detector = OnceCell::with_value(detector);
        self
    }

    fn detector(&self) -> Result<Arc<dyn Detector>, MonitoringError> {
        self.detector
            .get_or_try_init(|| {
                let detector = CommandDetector::from_config(&self.settings.load().monitoring)?;
                tracing::info!(?detector, "Detector initialized");
                Ok::<_, MonitoringError>(Arc::new(detector) as Arc<dyn Detector>)
            })
            .cloned()
    }
}

#[async_trait]
impl MonitoringControl for MonitoringService {
    async fn start_monitoring(&self) -> Result<MonitorStart, MonitoringError> {
        let mut running = self.running.lock().await;
        if running.as_ref().is_some_and(|m| !m.handle.is_finished()) {
            tracing::info!("Monitoring already running");
            return Ok(MonitorStart::AlreadyRunning);
        }

        let detector = self.detector()?;
        let interval =
            Duration::from_millis(self.settings.load().monitoring.frame_interval_ms);
        let monitor = MonitorLoop {
            detector,
            settings: self.settings.clone(),
            features: self.features.clone(),
            connections: self.connections.clone(),
            throttle: AlertThrottle::default(),
        };

        let (stop, stop_rx) = oneshot::channel();
        self.active.store(true, Ordering::SeqCst);
        let guard = ActiveGuard(self.active.clone());
        let handle = tokio::spawn(async move {
            let _guard = guard;
            monitor.run(interval, stop_rx).await;
        });

        *running = Some(RunningMonitor { stop, handle });
        tracing::info!(interval_ms = interval.as_millis() as u64, "Monitoring started");
        Ok(MonitorStart::Started)
    }

    async fn stop_monitoring(&self) -> Result<(), MonitoringError> {
        let Some(monitor) = self.running.lock().await.take() else {
            tracing::debug!("Monitoring not running");
            return Ok(());
        };

        let _ = monitor.stop.send(());
        let joined = monitor.handle.await;
        self.active.store(false, Ordering::SeqCst);
        joined.map_err(|e| MonitoringError::Task(e.to_string()))?;

        tracing::info!("Monitoring stopped");
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

struct MonitorLoop {
    detector: Arc<dyn Detector>,
    settings: SettingsHandle,
    features: Arc<FeatureSettings>,
    connections: ConnectionManager,
    throttle: AlertThrottle,
}

impl MonitorLoop {
    async fn run(mut self, interval: Duration, mut stop: oneshot::Receiver<()>) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = &mut stop => break,
                _ = self.tick() => {}
            }
        }
        tracing::debug!("Monitor loop exiting");
    }

    async fn tick(&mut self) {
        if !self.features.is_enabled(ZOMBIE_DETECTION) {
            return;
        }

        let count = match self.detector.detect().await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(error = %e, "Detection failed");
                return;
            }
        };

        let Some(level) = AlertLevel::classify(count) else {
            return;
        };

        let cooldown = level.cooldown(&self.settings.load().monitoring.cooldowns);
        if !self.throttle.should_fire(level, cooldown, Instant::now()) {
            tracing::debug!(level = level.as_str(), count, "Alert throttled");
            return;
        }

        metrics::record_alert(level.as_str());
        tracing::info!(level = level.as_str(), count, "Zombie alert");
        self.connections.notify(level.notification(count));

        if self.features.is_enabled(VOICE_NOTIFICATION) {
            let (text, emotion) = level.voice_line(count);
            self.connections.broadcast(ServerMessage::speak(text, emotion));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use serde_json::json;
    use tokio::sync::mpsc::error::TryRecvError;

    struct FixedDetector {
        count: u32,
        fail: bool,
        calls: AtomicU32,
    }

    impl FixedDetector {
        fn new(count: u32) -> Arc<Self> {
            Arc::new(Self {
                count,
                fail: false,
                calls: AtomicU32::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                count: 0,
                fail: true,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Detector for FixedDetector {
        async fn detect(&self) -> Result<u32, MonitoringError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(MonitoringError::InvalidOutput("noise".into()))
            } else {
                Ok(self.count)
            }
        }
    }

    struct PanickingDetector;

    #[async_trait]
    impl Detector for PanickingDetector {
        async fn detect(&self) -> Result<u32, MonitoringError> {
            panic!("camera driver crashed");
        }
    }

    fn service(detector: Arc<FixedDetector>) -> (MonitoringService, ConnectionManager, Arc<FeatureSettings>) {
        let connections = ConnectionManager::new();
        let features = Arc::new(FeatureSettings::new());
        let service = MonitoringService::new(
            SettingsHandle::default(),
            features.clone(),
            connections.clone(),
        )
        .with_detector(detector);
        (service, connections, features)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_stop_lifecycle() {
        let (service, _connections, _features) = service(FixedDetector::new(0));

        assert!(!service.is_active());
        assert_eq!(service.start_monitoring().await.unwrap(), MonitorStart::Started);
        assert!(service.is_active());
        assert_eq!(
            service.start_monitoring().await.unwrap(),
            MonitorStart::AlreadyRunning
        );

        service.stop_monitoring().await.unwrap();
        assert!(!service.is_active());
        service.stop_monitoring().await.unwrap();

        assert_eq!(service.start_monitoring().await.unwrap(), MonitorStart::Started);
        service.stop_monitoring().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_is_broadcast_then_throttled() {
        let detector = FixedDetector::new(12);
        let (service, connections, _features) = service(detector.clone());
        let (_id, mut rx) = connections.register();

        service.start_monitoring().await.unwrap();
        time::sleep(Duration::from_millis(10)).await;

        let notification = serde_json::to_value(rx.recv().await.unwrap()).unwrap();
        assert_eq!(notification["type"], "notification");
        assert_eq!(notification["data"]["messageType"], "error");

        let speak = serde_json::to_value(rx.recv().await.unwrap()).unwrap();
        assert_eq!(speak["type"], "speak");
        assert_eq!(speak["emotion"], json!("surprised"));

        // Horde cooldown is 8 s; frames every 500 ms keep detecting.
        time::sleep(Duration::from_secs(3)).await;
        assert!(detector.calls() > 1);
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        time::sleep(Duration::from_secs(6)).await;
        let again = serde_json::to_value(rx.recv().await.unwrap()).unwrap();
        assert_eq!(again["type"], "notification");

        service.stop_monitoring().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_voice_line_respects_toggle() {
        let (service, connections, features) = service(FixedDetector::new(2));
        features.update(VOICE_NOTIFICATION, &json!(false)).unwrap();
        let (_id, mut rx) = connections.register();

        service.start_monitoring().await.unwrap();
        time::sleep(Duration::from_millis(10)).await;
        service.stop_monitoring().await.unwrap();

        let first = serde_json::to_value(rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["type"], "notification");
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test(start_paused = true)]
    async fn test_detection_toggle_skips_detector() {
        let detector = FixedDetector::new(7);
        let (service, _connections, features) = service(detector.clone());
        features.update(ZOMBIE_DETECTION, &json!("off")).unwrap();

        service.start_monitoring().await.unwrap();
        time::sleep(Duration::from_secs(2)).await;
        service.stop_monitoring().await.unwrap();

        assert_eq!(detector.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detector_errors_do_not_stop_loop() {
        let detector = FixedDetector::failing();
        let (service, _connections, _features) = service(detector.clone());

        service.start_monitoring().await.unwrap();
        time::sleep(Duration::from_millis(1_600)).await;

        assert!(service.is_active());
        assert!(detector.calls() >= 3);
        service.stop_monitoring().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_loop_is_not_reported_active() {
        let service = MonitoringService::new(
            SettingsHandle::default(),
            Arc::new(FeatureSettings::new()),
            ConnectionManager::new(),
        )
        .with_detector(Arc::new(PanickingDetector));

        service.start_monitoring().await.unwrap();
        time::sleep(Duration::from_millis(10)).await;

        assert!(!service.is_active());
        assert!(matches!(
            service.stop_monitoring().await,
            Err(MonitoringError::Task(_))
        ));
        assert!(!service.is_active());
    }

    #[tokio::test]
    async fn test_missing_detector_command_fails_start() {
        let service = MonitoringService::new(
            SettingsHandle::default(),
            Arc::new(FeatureSettings::new()),
            ConnectionManager::new(),
        );
        assert!(matches!(
            service.start_monitoring().await,
            Err(MonitoringError::NoDetector)
        ));
        assert!(!service.is_active());
    }
}
