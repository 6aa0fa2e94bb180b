use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::{DeviceHandle, DeviceProvider};

use super::events::SessionEvent;
use super::loop_worker::{capture_loop, LoopContext, WEBCAM_WARNING};
use super::state::{CaptureStatus, LoopReport};

/// Stopped/Running state machine around one capture loop task.
pub struct CaptureController {
    provider: Arc<dyn DeviceProvider>,
    device_index: u32,
    context: LoopContext,
    handle: Option<JoinHandle<LoopReport>>,
    cancel_token: Option<CancellationToken>,
}

impl CaptureController {
    pub fn new(provider: Arc<dyn DeviceProvider>, device_index: u32, context: LoopContext) -> Self {
        Self {
            provider,
            device_index,
            context,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn status(&self) -> CaptureStatus {
        match &self.handle {
            Some(handle) if !handle.is_finished() => CaptureStatus::Running,
            _ => CaptureStatus::Stopped,
        }
    }

    /// Open the device and spawn the loop.
    ///
    /// A failed open leaves the controller Stopped and surfaces a warning.
    pub async fn start(&mut self) -> Result<()> {
        self.reap().await?;
        if self.handle.is_some() {
            bail!("capture already active");
        }

        let provider = Arc::clone(&self.provider);
        let index = self.device_index;
        let opened = tokio::task::spawn_blocking(move || provider.open(index))
            .await
            .context("device open worker failed to join")?;

        let device = match opened {
            Ok(device) => DeviceHandle::new(index, device),
            Err(err) => {
                warn!("could not open capture device {index}: {err}");
                let _ = self.context.events.send(SessionEvent::Warning {
                    message: WEBCAM_WARNING.to_string(),
                });
                return Err(err).context("failed to open capture device");
            }
        };

        // Announced before the loop exists, so its own events always follow.
        info!("capture started on device {index}");
        let _ = self
            .context
            .events
            .send(SessionEvent::CaptureStarted { device_index: index });

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(
            device,
            self.context.clone(),
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Signal the loop and wait for it to wind down.
    ///
    /// Returns `None` when there was nothing to stop.
    pub async fn stop(&mut self) -> Result<Option<LoopReport>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("capture loop task failed to join")
                .map(Some)
        } else {
            Ok(None)
        }
    }

    pub async fn toggle(&mut self) -> Result<CaptureStatus> {
        match self.status() {
            CaptureStatus::Running => {
                self.stop().await?;
            }
            CaptureStatus::Stopped => {
                self.start().await?;
            }
        }
        Ok(self.status())
    }

    /// Collect a loop that ended on its own, e.g. after a device failure.
    async fn reap(&mut self) -> Result<Option<LoopReport>> {
        let finished = self
            .handle
            .as_ref()
            .map_or(false, |handle| handle.is_finished());
        if !finished {
            return Ok(None);
        }

        self.cancel_token = None;
        let Some(handle) = self.handle.take() else {
            return Ok(None);
        };
        let report = handle.await.context("capture loop task failed to join")?;
        info!("reaped finished capture loop: {:?}", report.exit);
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fakes::{Read, ScriptedProvider};
    use crate::pipeline::loop_worker::test_support::{drain, harness, Harness, ScriptedAnalyzer};
    use crate::pipeline::state::LoopExit;

    fn setup(provider: ScriptedProvider) -> (CaptureController, Arc<ScriptedProvider>, Harness) {
        let provider = Arc::new(provider);
        let h = harness(ScriptedAnalyzer::new(vec![]), 1);
        let controller = CaptureController::new(provider.clone(), 0, h.ctx.clone());
        (controller, provider, h)
    }

    #[tokio::test]
    async fn stop_while_stopped_is_a_noop() {
        let (mut controller, provider, _h) = setup(ScriptedProvider::new(vec![]));
        assert_eq!(controller.status(), CaptureStatus::Stopped);
        assert!(controller.stop().await.unwrap().is_none());
        assert!(controller.stop().await.unwrap().is_none());
        assert_eq!(provider.counters.opens(), 0);
    }

    #[tokio::test]
    async fn start_then_stop_releases_device_once() {
        let (mut controller, provider, _h) = setup(ScriptedProvider::new(vec![]));

        controller.start().await.unwrap();
        assert_eq!(controller.status(), CaptureStatus::Running);
        assert!(controller.start().await.is_err());

        let report = controller.stop().await.unwrap().expect("a report");
        assert_eq!(report.exit, LoopExit::Cancelled);
        assert_eq!(controller.status(), CaptureStatus::Stopped);
        assert_eq!(provider.counters.opens(), 1);
        assert_eq!(provider.counters.releases(), 1);

        assert!(controller.stop().await.unwrap().is_none());
        assert_eq!(provider.counters.releases(), 1);
    }

    #[tokio::test]
    async fn toggle_flips_between_states() {
        let (mut controller, provider, _h) = setup(ScriptedProvider::new(vec![]));

        assert_eq!(controller.toggle().await.unwrap(), CaptureStatus::Running);
        assert_eq!(controller.toggle().await.unwrap(), CaptureStatus::Stopped);
        assert_eq!(controller.toggle().await.unwrap(), CaptureStatus::Running);
        controller.stop().await.unwrap();

        assert_eq!(provider.counters.opens(), 2);
        assert_eq!(provider.counters.releases(), 2);
    }

    #[tokio::test]
    async fn open_failure_warns_and_stays_stopped() {
        let mut provider = ScriptedProvider::new(vec![]);
        provider.unavailable = true;
        let (mut controller, _provider, mut h) = setup(provider);

        assert!(controller.start().await.is_err());
        assert_eq!(controller.status(), CaptureStatus::Stopped);
        assert_eq!(
            drain(&mut h.events),
            vec![SessionEvent::Warning {
                message: WEBCAM_WARNING.into()
            }]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn started_event_precedes_loop_events() {
        let (mut controller, _provider, mut h) =
            setup(ScriptedProvider::new(vec![Read::Fail]));

        for _ in 0..200 {
            controller.start().await.unwrap();
            let report = controller.stop().await.unwrap().expect("a report");
            assert_eq!(report.frames_processed, 0);

            let events = drain(&mut h.events);
            assert!(matches!(
                events.first(),
                Some(SessionEvent::CaptureStarted { device_index: 0 })
            ));
            assert!(matches!(
                events.last(),
                Some(SessionEvent::CaptureStopped { .. })
            ));
        }
    }

    #[tokio::test]
    async fn device_failure_stops_on_its_own_and_can_restart() {
        let (mut controller, provider, _h) =
            setup(ScriptedProvider::new(vec![Read::Frame, Read::Fail]));

        controller.start().await.unwrap();
        while controller.status() == CaptureStatus::Running {
            tokio::task::yield_now().await;
        }
        assert_eq!(provider.counters.releases(), 1);

        // Restart reaps the finished loop and opens a fresh device.
        controller.start().await.unwrap();
        let report = controller.stop().await.unwrap().expect("a report");
        assert!(report.frames_processed <= 1);
        assert_eq!(provider.counters.opens(), 2);
        assert_eq!(provider.counters.releases(), 2);
    }
}
