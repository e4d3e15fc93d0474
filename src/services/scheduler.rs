use std::{future::Future, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::info;

/// Handle on a spawned periodic task.
///
/// Dropping the handle stops the task at its next suspension point;
/// [`TaskHandle::shutdown`] stops it and waits for it to wind down.
pub struct TaskHandle {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    /// Stop the loop and wait for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.handle.await;
    }
}

/// Spawn `tick` at a fixed `period` once `ready` turns true.
///
/// Ticks never overlap: the next one waits for the previous to complete, and
/// a slow tick delays the schedule instead of bunching missed runs. The first
/// tick fires as soon as the task is armed.
pub fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut ready: watch::Receiver<bool>,
    mut tick: F,
) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let handle = tokio::spawn(async move {
        while !*ready.borrow_and_update() {
            tokio::select! {
                changed = ready.changed() => {
                    if changed.is_err() {
                        // readiness source dropped before firing; never arm
                        return;
                    }
                }
                _ = stop_rx.changed() => return,
            }
        }

        info!(task = name, period_secs = period.as_secs(), "task armed; starting periodic loop");

        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = timer.tick() => tick().await,
                _ = stop_rx.changed() => {
                    info!(task = name, "task stopping");
                    return;
                }
            }
        }
    });

    TaskHandle {
        stop: stop_tx,
        handle,
    }
}
