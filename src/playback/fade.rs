use super::MediaHandle;
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

/// Interval between fade steps
pub const FADE_TICK: Duration = Duration::from_millis(50);

/// Volume change applied per step
pub const FADE_STEP: f32 = 0.05;

const VOLUME_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

/// Identifies one fade; ticks carrying any other id are stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FadeId(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FadeProgress {
    /// The tick belongs to a cancelled or finished fade
    Stale,
    /// Volume moved one step
    Stepped(f32),
    /// Volume reached its bound; the fade is over
    Completed(FadeDirection),
}

/// Receives tick notifications. Returning `false` stops the ticker.
pub type TickSink = Arc<dyn Fn(FadeId) -> bool + Send + Sync>;

/// Next volume for one fade step and whether the fade is finished.
///
/// Fading in never overshoots `target`; fading out lands on exactly zero.
pub fn step_volume(current: f32, direction: FadeDirection, target: f32, step: f32) -> (f32, bool) {
    match direction {
        FadeDirection::In => {
            let target = target.clamp(0.0, 1.0);
            let next = (current + step).min(target);
            if current >= target || next >= target - VOLUME_EPSILON {
                (target, true)
            } else {
                (next, false)
            }
        }
        FadeDirection::Out => {
            let next = current - step;
            if next <= VOLUME_EPSILON {
                (0.0, true)
            } else {
                (next, false)
            }
        }
    }
}

struct ActiveFade {
    id: FadeId,
    session: u64,
    direction: FadeDirection,
    target: f32,
    ticker: JoinHandle<()>,
}

/// Owns the single in-flight fade.
///
/// The controller only schedules ticks; the owner feeds each tick back in
/// through [`FadeController::on_tick`] together with the handle to adjust.
/// Starting a fade cancels whatever fade was running before it.
pub struct FadeController {
    tick: Duration,
    step: f32,
    sink: TickSink,
    next_id: u64,
    active: Option<ActiveFade>,
}

impl FadeController {
    pub fn new(tick: Duration, step: f32, sink: TickSink) -> Self {
        Self {
            tick,
            step,
            sink,
            next_id: 0,
            active: None,
        }
    }

    /// Raise the volume of `session` towards `target`
    pub fn fade_in(&mut self, session: u64, target: f32) -> FadeId {
        self.begin(session, FadeDirection::In, target)
    }

    /// Lower the volume of `session` to silence
    pub fn fade_out(&mut self, session: u64) -> FadeId {
        self.begin(session, FadeDirection::Out, 0.0)
    }

    fn begin(&mut self, session: u64, direction: FadeDirection, target: f32) -> FadeId {
        self.cancel();

        self.next_id += 1;
        let id = FadeId(self.next_id);
        let ticker = spawn_ticker(self.tick, id, Arc::clone(&self.sink));
        debug!("Fade {:?} started for session {} (target {:.2})", direction, session, target);

        self.active = Some(ActiveFade {
            id,
            session,
            direction,
            target,
            ticker,
        });
        id
    }

    /// Stop the running fade, if any, returning its direction
    pub fn cancel(&mut self) -> Option<FadeDirection> {
        self.active.take().map(|fade| {
            fade.ticker.abort();
            fade.direction
        })
    }

    pub fn direction(&self) -> Option<FadeDirection> {
        self.active.as_ref().map(|fade| fade.direction)
    }

    /// Move the goal of a running fade-in. Fade-outs always end at silence.
    pub fn retarget(&mut self, target: f32) -> bool {
        match self.active.as_mut() {
            Some(fade) if fade.direction == FadeDirection::In => {
                fade.target = target.clamp(0.0, 1.0);
                true
            }
            _ => false,
        }
    }

    /// Apply one step of fade `id` to `handle`, which must belong to `session`
    pub fn on_tick(&mut self, id: FadeId, session: u64, handle: &mut dyn MediaHandle) -> FadeProgress {
        let (direction, target) = match self.active.as_ref() {
            Some(fade) if fade.id == id && fade.session == session => (fade.direction, fade.target),
            _ => return FadeProgress::Stale,
        };

        let (volume, done) = step_volume(handle.volume(), direction, target, self.step);
        handle.set_volume(volume);

        if done {
            self.cancel();
            debug!("Fade {:?} completed for session {} at {:.2}", direction, session, volume);
            FadeProgress::Completed(direction)
        } else {
            FadeProgress::Stepped(volume)
        }
    }
}

impl Drop for FadeController {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn spawn_ticker(tick: Duration, id: FadeId, sink: TickSink) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval_at(Instant::now() + tick, tick);
        loop {
            interval.tick().await;
            if !sink(id) {
                break;
            }
        }
    })
}
