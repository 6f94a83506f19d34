use std::cmp::min;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use sre_tunnel_core::prelude::DelegatedShutdownListener;
use tokio::time::Instant;

use crate::report::IterationBudget;

/// Displays a progress bar while a time bounded run is active to show the user how long is left.
pub(crate) fn start_progress(planned_runtime: Duration, shutdown_listener: DelegatedShutdownListener) {
    let style = match ProgressStyle::with_template(
        "{spinner:.green} [{wide_bar:.cyan/blue}] [{elapsed_precise} / {planned_runtime}]",
    ) {
        Ok(style) => style,
        Err(e) => {
            log::warn!("Not showing progress, invalid progress style: {e}");
            return;
        }
    };

    let hours = planned_runtime.as_secs() / 3600;
    let minutes = (planned_runtime.as_secs() % 3600) / 60;
    let seconds = planned_runtime.as_secs() % 60;
    let style = style
        .with_key("planned_runtime", move |_state: &ProgressState, w: &mut dyn Write| {
            // Writing to the progress bar's buffer can't meaningfully fail
            let _ = write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds);
        })
        .progress_chars("#>-");

    spawn_progress_thread(shutdown_listener, move |start_time| {
        let pb = ProgressBar::new(planned_runtime.as_secs());
        pb.set_style(style.clone());
        move || {
            let new = min(start_time.elapsed().as_secs(), planned_runtime.as_secs());
            pb.set_position(new);
            pb.clone()
        }
    });
}

/// Displays a progress bar while an iteration bounded run is active, counting claimed iterations.
pub(crate) fn start_iteration_progress(
    budget: Arc<IterationBudget>,
    bound: u64,
    shutdown_listener: DelegatedShutdownListener,
) {
    let style = match ProgressStyle::with_template(
        "{spinner:.green} [{wide_bar:.cyan/blue}] [{pos} / {len} iterations, {elapsed_precise}]",
    ) {
        Ok(style) => style.progress_chars("#>-"),
        Err(e) => {
            log::warn!("Not showing progress, invalid progress style: {e}");
            return;
        }
    };

    spawn_progress_thread(shutdown_listener, move |_start_time| {
        let pb = ProgressBar::new(bound);
        pb.set_style(style.clone());
        move || {
            pb.set_position(min(budget.claimed(), bound));
            pb.clone()
        }
    });
}

fn spawn_progress_thread<M, U>(shutdown_listener: DelegatedShutdownListener, make_updater: M)
where
    M: FnOnce(Instant) -> U + Send + 'static,
    U: FnMut() -> ProgressBar,
{
    let spawned = std::thread::Builder::new()
        .name("progress".to_string())
        .spawn(move || {
            let mut update = make_updater(Instant::now());

            loop {
                let pb = update();
                if shutdown_listener.should_shutdown() {
                    log::trace!("Progress thread shutting down");
                    pb.finish_and_clear();
                    break;
                }

                std::thread::sleep(Duration::from_millis(250));
            }
        });

    if let Err(e) = spawned {
        log::warn!("Failed to start progress thread: {e:?}");
    }
}
