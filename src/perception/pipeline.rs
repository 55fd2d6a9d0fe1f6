use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use super::{Caption, Frame, FrameObservation, PerceptionServices};
use crate::config::ModeratorConfig;
use crate::sampling::motion_between;

/// Runs the per-frame models on a bounded pool of blocking workers.
///
/// Perception never fails the run: a frame whose models error out, time out
/// or never start because the run was cancelled contributes the neutral
/// [`FrameObservation::default`] or an empty caption, and the failure is
/// logged. A worker slot is held until the model call returns, even after
/// its frame has timed out, so a hung model never gets more than
/// `max_workers` threads.
#[derive(Debug, Clone)]
pub struct PerceptionPipeline {
    services: PerceptionServices,
    workers: Arc<Semaphore>,
    max_workers: usize,
    frame_timeout: Duration,
}

impl PerceptionPipeline {
    pub fn new(services: PerceptionServices, config: &ModeratorConfig) -> Self {
        let max_workers = config.max_workers.max(1);
        PerceptionPipeline {
            services,
            workers: Arc::new(Semaphore::new(max_workers)),
            max_workers,
            frame_timeout: config.frame_timeout(),
        }
    }

    pub fn services(&self) -> &PerceptionServices {
        &self.services
    }

    /// Upper bound on a whole stage over `frames`: one timeout per round of
    /// workers plus one round of slack.
    fn stage_budget(&self, frames: usize) -> Duration {
        let rounds = frames.div_ceil(self.max_workers) + 1;
        self.frame_timeout
            .saturating_mul(u32::try_from(rounds).unwrap_or(u32::MAX))
    }

    /// One observation per input frame, in input order.
    pub async fn observe_frames(
        &self,
        frames: &[Arc<Frame>],
        cancel: &CancellationToken,
    ) -> Vec<FrameObservation> {
        if frames.is_empty() {
            return Vec::new();
        }

        let stage = cancel.child_token();
        let slots: Arc<DashMap<usize, FrameObservation>> = Arc::new(DashMap::new());
        let mut tasks = JoinSet::new();

        for (slot, frame) in frames.iter().enumerate() {
            let frame = Arc::clone(frame);
            let previous = slot.checked_sub(1).map(|prev| Arc::clone(&frames[prev]));
            let services = self.services.clone();
            let workers = Arc::clone(&self.workers);
            let slots = Arc::clone(&slots);
            let stage = stage.clone();
            let limit = self.frame_timeout;

            tasks.spawn(async move {
                let permit = tokio::select! {
                    permit = workers.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                    _ = stage.cancelled() => return,
                };
                if stage.is_cancelled() {
                    return;
                }

                let index = frame.index;
                let work = task::spawn_blocking(move || {
                    let _permit = permit;
                    observe_frame(&services, &frame, previous.as_deref())
                });
                match timeout(limit, work).await {
                    Ok(Ok(Ok(observation))) => {
                        slots.insert(slot, observation);
                    }
                    Ok(Ok(Err(err))) => {
                        log::warn!("perception failed for frame {}: {:#}", index, err);
                    }
                    Ok(Err(err)) => {
                        log::warn!("perception worker for frame {} panicked: {}", index, err);
                    }
                    Err(_) => {
                        log::warn!(
                            "perception for frame {} timed out after {} ms",
                            index,
                            limit.as_millis()
                        );
                    }
                }
            });
        }

        let budget = self.stage_budget(frames.len());
        if timeout(budget, drain(&mut tasks)).await.is_err() {
            log::warn!(
                "perception stalled after {} ms, skipping frames still waiting for a worker",
                budget.as_millis()
            );
            stage.cancel();
            drain(&mut tasks).await;
        }

        if cancel.is_cancelled() {
            log::warn!(
                "perception cancelled with {} of {} frames observed",
                slots.len(),
                frames.len()
            );
        }

        (0..frames.len())
            .map(|slot| {
                slots
                    .remove(&slot)
                    .map(|(_, observation)| observation)
                    .unwrap_or_default()
            })
            .collect()
    }

    /// One caption per input frame, in input order. Tries a single batched
    /// call first and falls back to captioning frames one by one.
    pub async fn caption_frames(&self, frames: &[Arc<Frame>]) -> Vec<Caption> {
        if frames.is_empty() {
            return Vec::new();
        }

        match self.caption_batch(frames).await {
            Ok(captions) => return captions,
            Err(err) => log::warn!("batch captioning failed, captioning per frame: {:#}", err),
        }

        stream::iter(frames.iter().cloned())
            .map(|frame| self.caption_one(frame))
            .buffered(self.max_workers)
            .collect()
            .await
    }

    /// The batch occupies every worker, so per-frame captioning cannot start
    /// until a timed-out batch call has actually returned.
    async fn caption_batch(&self, frames: &[Arc<Frame>]) -> Result<Vec<Caption>> {
        let captioner = Arc::clone(&self.services.captioner);
        let batch = frames.to_vec();
        let expected = batch.len();
        let limit = self.frame_timeout.saturating_mul(u32::try_from(expected).unwrap_or(u32::MAX));
        let workers = Arc::clone(&self.workers);
        let all = u32::try_from(self.max_workers).unwrap_or(u32::MAX);

        let run = async move {
            let permit = workers.acquire_many_owned(all).await?;
            let captions = task::spawn_blocking(move || {
                let _permit = permit;
                captioner.caption_batch(&batch)
            })
            .await??;
            Ok::<_, anyhow::Error>(captions)
        };
        let captions = timeout(limit, run)
            .await
            .map_err(|_| anyhow!("timed out after {} ms", limit.as_millis()))??;

        if captions.len() != expected {
            return Err(anyhow!(
                "expected {} captions, got {}",
                expected,
                captions.len()
            ));
        }
        Ok(captions)
    }

    async fn caption_one(&self, frame: Arc<Frame>) -> Caption {
        let captioner = Arc::clone(&self.services.captioner);
        let workers = Arc::clone(&self.workers);
        let index = frame.index;

        let run = async move {
            let permit = workers.acquire_owned().await?;
            let caption = task::spawn_blocking(move || {
                let _permit = permit;
                captioner.caption(&frame)
            })
            .await??;
            Ok::<_, anyhow::Error>(caption)
        };

        match timeout(self.frame_timeout, run).await {
            Ok(Ok(caption)) => caption,
            Ok(Err(err)) => {
                log::warn!("captioning failed for frame {}: {:#}", index, err);
                Caption::default()
            }
            Err(_) => {
                log::warn!("captioning frame {} timed out", index);
                Caption::default()
            }
        }
    }
}

async fn drain(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = joined {
            log::warn!("perception task aborted: {}", err);
        }
    }
}

fn observe_frame(
    services: &PerceptionServices,
    frame: &Frame,
    previous: Option<&Frame>,
) -> Result<FrameObservation> {
    let motion = previous
        .map(|prev| motion_between(&prev.image, &frame.image))
        .unwrap_or(0.0);
    let pose = services.pose.estimate(frame)?;
    let visual = services.detector.inspect(frame)?;

    Ok(FrameObservation {
        motion,
        pose,
        visual,
    })
}
