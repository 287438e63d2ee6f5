//! The grab loop
//!
//! A [`Grabber`] owns one camera's [`GrabberConfig`] and runs ticks against
//! it. Each tick:
//!
//! 1. stamps a [`GrabRequest`] with the URL and the clock's current time,
//! 2. asks the configured downloader for the image,
//! 3. on failure, consults the [`IgnorePolicy`]: ignorable errors become a
//!    result record with `error` set, anything else aborts the tick,
//! 4. runs the handler chain over the record.
//!
//! [`Grabber::run`] repeats ticks with a fixed sleep in between. Ticks never
//! overlap; a slow download pushes the next tick back.

mod clock;
mod config;
mod ignore;

pub use clock::{Clock, FixedClock, RecordingSleeper, Sleeper, SystemClock, TokioSleeper};
pub use config::{
    DEFAULT_EVERY_SECS, DEFAULT_SAVE_DIR, DEFAULT_SAVE_FILENAME, DEFAULT_TIMEOUT_SECS,
    GrabberConfig, default_result_handlers,
};
pub use ignore::{IgnorePolicy, RECOMMENDED_IGNORED_STATUSES, should_ignore};

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::download::DownloadError;
use crate::handlers::{ChainError, GrabRequest, HandlerError, ResultRecord, run_chain};
use crate::observability::TickStats;
use crate::template::TemplateError;

/// Why a tick was aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrabError {
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("save path template failed: {0}")]
    Template(#[from] TemplateError),

    #[error("result handler '{handler}' failed: {source}")]
    Handler {
        handler: String,
        #[source]
        source: HandlerError,
    },
}

impl From<ChainError> for GrabError {
    fn from(err: ChainError) -> Self {
        match err.source {
            HandlerError::Template(template) => GrabError::Template(template),
            source => GrabError::Handler {
                handler: err.handler,
                source,
            },
        }
    }
}

/// Periodically grabs one camera.
pub struct Grabber {
    config: GrabberConfig,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    last_error: Option<GrabError>,
    last_result: Option<ResultRecord>,
    stats: TickStats,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Grabber {
    pub fn new(config: GrabberConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
            last_error: None,
            last_result: None,
            stats: TickStats::new(),
            shutdown: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Stop [`run`](Self::run) once `true` is sent on the channel.
    ///
    /// Checked before each tick and while sleeping; a tick in progress is
    /// always finished.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown
            .as_ref()
            .is_some_and(|shutdown| *shutdown.borrow())
    }

    pub fn config(&self) -> &GrabberConfig {
        &self.config
    }

    /// Changes take effect from the next tick.
    pub fn config_mut(&mut self) -> &mut GrabberConfig {
        &mut self.config
    }

    /// The error that aborted the most recent tick, cleared by a successful one.
    pub fn last_error(&self) -> Option<&GrabError> {
        self.last_error.as_ref()
    }

    /// Terminal record of the most recent tick, `None` if it was aborted.
    pub fn last_result(&self) -> Option<&ResultRecord> {
        self.last_result.as_ref()
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    pub fn build_request(&self) -> GrabRequest {
        GrabRequest {
            url: self.config.url.clone(),
            requested_at: self.clock.now(),
        }
    }

    /// Run one request → download → classify → handle cycle.
    pub async fn tick(&mut self) -> Result<ResultRecord, GrabError> {
        self.stats.tick_started();

        match self.run_tick().await {
            Ok(record) => {
                if record.is_saved {
                    self.stats.image_saved();
                }
                self.last_error = None;
                self.last_result = Some(record.clone());
                Ok(record)
            }
            Err(err) => {
                warn!(url = %self.config.url, error = %err, "Tick aborted");
                self.stats.tick_failed();
                self.last_error = Some(err.clone());
                self.last_result = None;
                Err(err)
            }
        }
    }

    async fn run_tick(&mut self) -> Result<ResultRecord, GrabError> {
        let request = self.build_request();
        debug!(url = %request.url, requested_at = %request.requested_at, "Tick started");

        let record = match self
            .config
            .downloader
            .download(&request.url, &self.config)
            .await
        {
            Ok(image) => {
                self.stats.image_received();
                ResultRecord::succeeded(&request, image)
            }
            Err(err) if should_ignore(&err, &self.config.ignore) => {
                info!(url = %request.url, kind = err.kind(), error = %err, "Ignoring download error");
                self.stats.error_ignored();
                ResultRecord::failed(&request, err)
            }
            Err(err) => return Err(err.into()),
        };

        let handlers = self.config.handler_chain();
        let record = run_chain(&handlers, record, &self.config).await?;

        Ok(record)
    }

    /// Sleep for the configured interval, waking early on shutdown.
    pub async fn wait_interval(&mut self) {
        let interval = self.config.interval();
        match self.shutdown.as_mut() {
            // A dropped sender disables the second branch; the sleep still runs
            Some(shutdown) => tokio::select! {
                _ = self.sleeper.sleep(interval) => {}
                Ok(()) = shutdown.changed() => {}
            },
            None => self.sleeper.sleep(interval).await,
        }
    }

    /// Tick, sleep `every` seconds, repeat.
    ///
    /// Stops after `max_iterations` ticks when given, or when shutdown is
    /// requested (see [`with_shutdown`](Self::with_shutdown)), otherwise runs
    /// until a tick fails or the future is dropped. A failed tick ends the
    /// loop with its error; whether to start again is up to the caller.
    pub async fn run(&mut self, max_iterations: Option<u64>) -> Result<(), GrabError> {
        info!(
            url = %self.config.url,
            every = self.config.every,
            max_iterations,
            "Grabber started"
        );

        let mut completed: u64 = 0;
        while max_iterations.is_none_or(|max| completed < max) && !self.shutdown_requested() {
            self.tick().await?;
            completed += 1;
            self.wait_interval().await;
        }

        info!(url = %self.config.url, ticks = completed, "Grabber finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{GrabbedImage, ImageDownloader, sample_jpeg};
    use crate::handlers::{CallbackHandler, ResultHandler, SaveImageHandler};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Hands out a scripted sequence of outcomes, repeating the last one.
    struct ScriptedDownloader {
        outcomes: Mutex<Vec<Result<Vec<u8>, DownloadError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedDownloader {
        fn new(outcomes: Vec<Result<Vec<u8>, DownloadError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn always_jpeg() -> Self {
            Self::new(vec![Ok(sample_jpeg())])
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageDownloader for ScriptedDownloader {
        async fn download(
            &self,
            url: &str,
            _config: &GrabberConfig,
        ) -> Result<GrabbedImage, DownloadError> {
            self.calls.lock().unwrap().push(url.to_string());
            let outcome = {
                let mut outcomes = self.outcomes.lock().unwrap();
                if outcomes.len() > 1 {
                    outcomes.remove(0)
                } else {
                    outcomes[0].clone()
                }
            };
            Ok(GrabbedImage::decode(outcome?)?)
        }
    }

    fn fixed_time() -> DateTime<FixedOffset> {
        let naive = NaiveDate::from_ymd_opt(2017, 1, 2)
            .unwrap()
            .and_hms_micro_opt(12, 13, 14, 987_654)
            .unwrap();
        FixedOffset::east_opt(0)
            .unwrap()
            .from_local_datetime(&naive)
            .unwrap()
    }

    fn grabber(
        downloader: Arc<ScriptedDownloader>,
        store: Arc<MemoryStore>,
    ) -> (Grabber, Arc<RecordingSleeper>) {
        let save: Arc<dyn ResultHandler> = Arc::new(SaveImageHandler::with_store(store));
        let config = GrabberConfig::builder()
            .url("http://cam.example/out.jpg")
            .every(5.0)
            .save_dir("out")
            .save_filename("{Y}{m}{d}/{H}/{Y}{m}{d}-{H}{M}{S}-{f}.jpg")
            .ignore(IgnorePolicy::strict())
            .downloader(downloader)
            .default_result_handlers(vec![save])
            .build();
        let sleeper = Arc::new(RecordingSleeper::new());
        let grabber = Grabber::new(config)
            .with_clock(Arc::new(FixedClock(fixed_time())))
            .with_sleeper(sleeper.clone());
        (grabber, sleeper)
    }

    #[tokio::test]
    async fn test_run_five_ticks_saves_five_times() {
        let downloader = Arc::new(ScriptedDownloader::always_jpeg());
        let store = Arc::new(MemoryStore::new());
        let (mut grabber, sleeper) = grabber(downloader.clone(), store.clone());

        grabber.run(Some(5)).await.unwrap();

        let expected = PathBuf::from("out/20170102/12/20170102-121314-987654.jpg");
        assert_eq!(store.writes(), vec![expected; 5]);
        assert_eq!(sleeper.calls(), vec![Duration::from_secs(5); 5]);
        assert_eq!(downloader.calls().len(), 5);
        assert_eq!(
            grabber.stats(),
            TickStats {
                ticks: 5,
                images: 5,
                ignored_errors: 0,
                saved: 5,
                failures: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_zero_iterations_does_nothing() {
        let downloader = Arc::new(ScriptedDownloader::always_jpeg());
        let (mut grabber, sleeper) = grabber(downloader.clone(), Arc::new(MemoryStore::new()));

        grabber.run(Some(0)).await.unwrap();

        assert!(downloader.calls().is_empty());
        assert!(sleeper.calls().is_empty());
    }

    /// Sends shutdown from inside the `n`th sleep.
    struct StopDuringSleep {
        shutdown: watch::Sender<bool>,
        stop_at: usize,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl Sleeper for StopDuringSleep {
        async fn sleep(&self, _duration: Duration) {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call == self.stop_at {
                self.shutdown.send_replace(true);
            }
        }
    }

    #[tokio::test]
    async fn test_run_stops_when_shutdown_sent() {
        let downloader = Arc::new(ScriptedDownloader::always_jpeg());
        let (tx, rx) = watch::channel(false);
        let sleeper = Arc::new(StopDuringSleep {
            shutdown: tx,
            stop_at: 2,
            calls: Mutex::new(0),
        });
        let (grabber, _) = grabber(downloader.clone(), Arc::new(MemoryStore::new()));
        let mut grabber = grabber.with_sleeper(sleeper).with_shutdown(rx);

        grabber.run(None).await.unwrap();

        assert!(grabber.shutdown_requested());
        assert_eq!(downloader.calls().len(), 2);
        assert_eq!(grabber.stats().ticks, 2);
    }

    #[tokio::test]
    async fn test_run_skips_tick_when_already_shut_down() {
        let downloader = Arc::new(ScriptedDownloader::always_jpeg());
        let (tx, rx) = watch::channel(false);
        let (grabber, sleeper) = grabber(downloader.clone(), Arc::new(MemoryStore::new()));
        let mut grabber = grabber.with_shutdown(rx);
        tx.send_replace(true);

        grabber.run(Some(3)).await.unwrap();

        assert!(downloader.calls().is_empty());
        assert!(sleeper.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_shutdown_sender_keeps_sleeping() {
        let downloader = Arc::new(ScriptedDownloader::always_jpeg());
        let (tx, rx) = watch::channel(false);
        let (grabber, sleeper) = grabber(downloader.clone(), Arc::new(MemoryStore::new()));
        let mut grabber = grabber.with_shutdown(rx);
        drop(tx);

        grabber.run(Some(3)).await.unwrap();

        assert_eq!(downloader.calls().len(), 3);
        assert_eq!(sleeper.calls(), vec![Duration::from_secs(5); 3]);
    }

    #[tokio::test]
    async fn test_ignored_timeout_completes_tick() {
        let downloader = Arc::new(ScriptedDownloader::new(vec![Err(DownloadError::Timeout(
            "operation timed out".to_string(),
        ))]));
        let store = Arc::new(MemoryStore::new());
        let (mut grabber, _) = grabber(downloader, store.clone());
        grabber.config_mut().ignore.timeout = true;

        let record = grabber.tick().await.unwrap();

        assert!(record.image.is_none());
        assert!(matches!(record.error, Some(DownloadError::Timeout(_))));
        assert!(!record.is_saved);
        assert!(record.save_path_full.is_some());
        assert!(store.ops().is_empty());
        assert!(grabber.last_error().is_none());
        assert_eq!(grabber.stats().ignored_errors, 1);
    }

    #[tokio::test]
    async fn test_unignored_error_aborts_tick() {
        let downloader = Arc::new(ScriptedDownloader::new(vec![Err(DownloadError::HttpStatus {
            code: 404,
            reason: "Not Found".to_string(),
        })]));
        let store = Arc::new(MemoryStore::new());
        let (mut grabber, _) = grabber(downloader, store.clone());

        let ran = Arc::new(Mutex::new(false));
        let flag = ran.clone();
        let spy: Arc<dyn ResultHandler> = Arc::new(CallbackHandler::new("spy", move |_, _| {
            *flag.lock().unwrap() = true;
            Ok(None)
        }));
        grabber.config_mut().extra_result_handlers.push(spy);

        let err = grabber.tick().await.unwrap_err();

        assert_eq!(
            err,
            GrabError::Download(DownloadError::HttpStatus {
                code: 404,
                reason: "Not Found".to_string()
            })
        );
        assert_eq!(grabber.last_error(), Some(&err));
        assert!(grabber.last_result().is_none());
        assert!(!*ran.lock().unwrap());
        assert!(store.ops().is_empty());
        assert_eq!(grabber.stats().failures, 1);
    }

    #[tokio::test]
    async fn test_ignored_status_flag_can_be_flipped_between_ticks() {
        let downloader = Arc::new(ScriptedDownloader::new(vec![Err(DownloadError::HttpStatus {
            code: 503,
            reason: "Service Unavailable".to_string(),
        })]));
        let (mut grabber, _) = grabber(downloader, Arc::new(MemoryStore::new()));

        grabber.config_mut().ignore.set_status(503, true);
        let record = grabber.tick().await.unwrap();
        assert_eq!(record.error.as_ref().and_then(DownloadError::status_code), Some(503));

        grabber.config_mut().ignore.set_status(503, false);
        assert!(grabber.tick().await.is_err());
    }

    #[tokio::test]
    async fn test_run_stops_on_failure_and_recovers() {
        let downloader = Arc::new(ScriptedDownloader::new(vec![
            Ok(sample_jpeg()),
            Err(DownloadError::Network("connection refused".to_string())),
            Ok(sample_jpeg()),
        ]));
        let (mut grabber, sleeper) = grabber(downloader, Arc::new(MemoryStore::new()));

        let err = grabber.run(Some(5)).await.unwrap_err();
        assert!(matches!(err, GrabError::Download(DownloadError::Network(_))));
        assert_eq!(sleeper.calls().len(), 1);
        assert!(grabber.last_error().is_some());

        grabber.tick().await.unwrap();
        assert!(grabber.last_error().is_none());
        assert!(grabber.last_result().is_some_and(|r| r.is_saved));
    }

    #[tokio::test]
    async fn test_handler_error_aborts_tick() {
        let downloader = Arc::new(ScriptedDownloader::always_jpeg());
        let (mut grabber, _) = grabber(downloader, Arc::new(MemoryStore::new()));
        let failing: Arc<dyn ResultHandler> = Arc::new(CallbackHandler::new("notify", |_, _| {
            Err(HandlerError::Failed("queue full".to_string()))
        }));
        grabber.config_mut().extra_result_handlers.push(failing);

        let err = grabber.tick().await.unwrap_err();
        assert_eq!(
            err,
            GrabError::Handler {
                handler: "notify".to_string(),
                source: HandlerError::Failed("queue full".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_template_error_surfaces_as_template() {
        let downloader = Arc::new(ScriptedDownloader::always_jpeg());
        let (mut grabber, _) = grabber(downloader, Arc::new(MemoryStore::new()));
        grabber.config_mut().save_filename = "{Y}/{bogus}.jpg".to_string();

        let err = grabber.tick().await.unwrap_err();
        assert_eq!(
            err,
            GrabError::Template(TemplateError::UnknownToken("bogus".to_string()))
        );
    }

    #[tokio::test]
    async fn test_explicit_handlers_replace_defaults() {
        let downloader = Arc::new(ScriptedDownloader::always_jpeg());
        let store = Arc::new(MemoryStore::new());
        let (mut grabber, _) = grabber(downloader, store.clone());
        let tag: Arc<dyn ResultHandler> = Arc::new(CallbackHandler::new("tag", |result, _| {
            let mut result = result.clone();
            result.insert_metadata("camera", "front");
            Ok(Some(result))
        }));
        grabber.config_mut().result_handlers = Some(vec![tag]);

        let record = grabber.tick().await.unwrap();

        assert!(store.ops().is_empty());
        assert!(record.save_path.is_none());
        assert_eq!(record.metadata("camera"), Some(&serde_json::json!("front")));
    }

    #[test]
    fn test_build_request_uses_clock() {
        let (grabber, _) = grabber(
            Arc::new(ScriptedDownloader::always_jpeg()),
            Arc::new(MemoryStore::new()),
        );
        let request = grabber.build_request();
        assert_eq!(request.url, "http://cam.example/out.jpg");
        assert_eq!(request.requested_at, fixed_time());
    }
}
