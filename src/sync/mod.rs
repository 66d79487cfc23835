pub mod manual;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{
    client::ClipRemote,
    clip::{ClipSubmission, Source},
    clipboard::{read_clipboard, write_clipboard, ClipboardBackend},
    ClipSyncError, Result, DEFAULT_POLL_INTERVAL_MS,
};

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How often the local clipboard is checked for changes.
    pub watch_interval: Duration,
    /// How often the server is asked for its latest clip.
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            watch_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Clipboard empty or holding something other than text/image.
    Empty,
    Unchanged,
    Pushed,
    /// Server refused the value; it is not sent again until it changes.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Server has no clip yet.
    Empty,
    /// Latest clip came from a pc; never applied back.
    OwnOrigin,
    AlreadyApplied,
    Applied,
    /// Clip data could not be turned into a clipboard value; skipped until
    /// the server holds a different clip.
    Unapplicable,
}

#[derive(Debug, Default)]
struct SyncState {
    /// Fingerprint of the last local value observed or written by us.
    last_seen_local: Option<String>,
    /// Fingerprint of the last remote clip applied locally.
    last_applied_remote: Option<String>,
}

/// Keeps the local clipboard and the server's latest clip in step.
pub struct SyncAgent<C: ?Sized, R: ?Sized> {
    clipboard: Arc<C>,
    remote: Arc<R>,
    config: SyncConfig,
    state: Mutex<SyncState>,
}

impl<C, R> SyncAgent<C, R>
where
    C: ClipboardBackend + ?Sized + 'static,
    R: ClipRemote + ?Sized,
{
    pub fn new(clipboard: Arc<C>, remote: Arc<R>, config: SyncConfig) -> Self {
        Self {
            clipboard,
            remote,
            config,
            state: Mutex::new(SyncState::default()),
        }
    }

    /// Pushes the local clipboard if it changed since the last cycle.
    ///
    /// Network failures leave the state alone so the value is retried next
    /// tick. A value the server rejects is marked seen and not retried.
    pub async fn watch_once(&self) -> Result<WatchOutcome> {
        let mut state = self.state.lock().await;

        let snapshot = match read_clipboard(self.clipboard.clone()).await? {
            Some(s) => s,
            None => return Ok(WatchOutcome::Empty),
        };

        if state.last_seen_local.as_deref() == Some(snapshot.fingerprint.as_str()) {
            return Ok(WatchOutcome::Unchanged);
        }

        let fingerprint = snapshot.fingerprint.clone();
        let clip_type = snapshot.clip_type();

        let pushed = match snapshot.into_content() {
            Ok(content) => {
                self.remote
                    .push(&ClipSubmission::new(content, Source::Pc))
                    .await
            }
            Err(e) => Err(e),
        };

        match pushed {
            Ok(()) => {
                state.last_seen_local = Some(fingerprint);
                info!("Pushed local {} clip to server", clip_type);
                Ok(WatchOutcome::Pushed)
            }
            Err(ClipSyncError::MalformedRequest(reason)) => {
                state.last_seen_local = Some(fingerprint);
                warn!("Server rejected local {} clip: {}", clip_type, reason);
                Ok(WatchOutcome::Rejected)
            }
            Err(ClipSyncError::ImageProcessing(e)) => {
                state.last_seen_local = Some(fingerprint);
                warn!("Cannot encode local {} clip: {}", clip_type, e);
                Ok(WatchOutcome::Rejected)
            }
            Err(e) => Err(e),
        }
    }

    /// Applies the server's latest clip locally if it is new and not ours.
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let mut state = self.state.lock().await;

        let clip = match self.remote.latest().await? {
            Some(c) => c,
            None => return Ok(PollOutcome::Empty),
        };

        if clip.source == Source::Pc {
            return Ok(PollOutcome::OwnOrigin);
        }

        let remote_fingerprint = clip.fingerprint();
        if state.last_applied_remote.as_deref() == Some(remote_fingerprint.as_str()) {
            return Ok(PollOutcome::AlreadyApplied);
        }

        match write_clipboard(self.clipboard.clone(), clip.content()).await {
            Ok(local_fingerprint) => {
                // Recording the local fingerprint too keeps the next watch
                // cycle from pushing this value straight back.
                state.last_applied_remote = Some(remote_fingerprint);
                state.last_seen_local = Some(local_fingerprint);

                info!("Pulled {} clip from {} into clipboard", clip.clip_type, clip.source);
                Ok(PollOutcome::Applied)
            }
            Err(e @ (ClipSyncError::Decode(_) | ClipSyncError::ImageProcessing(_))) => {
                state.last_applied_remote = Some(remote_fingerprint);
                warn!(
                    "Skipping {} clip from {} that cannot be applied: {}",
                    clip.clip_type, clip.source, e
                );
                Ok(PollOutcome::Unapplicable)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs both cycles until `shutdown` turns true or its sender is dropped.
    ///
    /// The two timers share one task, so cycles never overlap.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }

        let mut watch_timer = interval(self.config.watch_interval);
        watch_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut poll_timer = interval(self.config.poll_interval);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Sync agent started (watch: {:?}, poll: {:?})",
            self.config.watch_interval, self.config.poll_interval
        );

        loop {
            tokio::select! {
                _ = watch_timer.tick() => {
                    match self.watch_once().await {
                        Ok(outcome) => debug!("Watch cycle: {:?}", outcome),
                        Err(e) => warn!("Push skipped this cycle: {}", e),
                    }
                }
                _ = poll_timer.tick() => {
                    match self.poll_once().await {
                        Ok(outcome) => debug!("Poll cycle: {:?}", outcome),
                        Err(e) => warn!("Poll skipped this cycle: {}", e),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Sync agent stopped");
    }
}
