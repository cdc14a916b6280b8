//! Background refresh of scheduled widgets.
//!
//! One OS thread per session polls the enabled widgets every tick and runs
//! each due `update` synchronously. Results land in the widget's pending
//! buffer; the render path picks them up on its own cadence.
//!
//! There is no timeout on `update`. A widget whose `update` never returns
//! stops refreshing, and because updates run one after another, so do the
//! widgets after it in the same pass. Rendering is unaffected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::widget::Widget;

/// Name of the widget whose `update` is running, shared with the handle.
type Running = Arc<Mutex<Option<String>>>;

/// Due-time bookkeeping over a fixed set of widgets.
///
/// [`tick`](Scheduler::tick) takes the current instant as an argument so it
/// can be driven by a synthetic clock.
#[derive(Debug)]
pub struct Scheduler {
    entries: Vec<Entry>,
    stop: Arc<AtomicBool>,
    running: Running,
}

#[derive(Debug)]
struct Entry {
    widget: Arc<Widget>,
    last_run: Option<Instant>,
}

impl Entry {
    fn is_due(&self, now: Instant) -> bool {
        match (self.last_run, self.widget.interval()) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(last), Some(interval)) => now.saturating_duration_since(last) >= interval,
        }
    }
}

impl Scheduler {
    /// Schedule every enabled widget in `widgets` that has an `update`
    /// callback and initialised cleanly.
    pub fn new<'a>(
        widgets: impl IntoIterator<Item = &'a Arc<Widget>>,
        stop: Arc<AtomicBool>,
    ) -> Self {
        let entries = widgets
            .into_iter()
            .filter(|w| w.is_enabled() && w.is_scheduled() && !w.init_failed())
            .map(|widget| Entry {
                widget: widget.clone(),
                last_run: None,
            })
            .collect();
        Self {
            entries,
            stop,
            running: Running::default(),
        }
    }

    /// Number of widgets under management.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no widget is scheduled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the stop flag is set.
    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Run one pass: every widget due at `now` is updated, in order.
    ///
    /// The stop flag is honoured before each widget, so a stop abandons the
    /// rest of the pass. Returns how many updates ran.
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut ran = 0;
        for entry in &mut self.entries {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            if !entry.is_due(now) {
                continue;
            }
            entry.last_run = Some(now);
            tracing::debug!(widget = %entry.widget.name(), "update");
            *self.running.lock() = Some(entry.widget.name().to_string());
            entry.widget.run_update();
            *self.running.lock() = None;
            ran += 1;
        }
        ran
    }

    /// Move this scheduler onto its own thread, ticking every `period`.
    pub fn spawn(mut self, period: Duration) -> std::io::Result<SchedulerHandle> {
        let stop = self.stop.clone();
        let running = self.running.clone();
        let thread = thread::Builder::new()
            .name("dashgrid-scheduler".into())
            .spawn(move || {
                tracing::debug!(widgets = self.len(), "scheduler started");
                while !self.is_stopped() {
                    self.tick(Instant::now());
                    thread::sleep(period);
                }
                tracing::debug!("scheduler stopped");
            })?;
        Ok(SchedulerHandle {
            stop,
            running,
            thread: Some(thread),
        })
    }
}

/// A running scheduler thread.
///
/// Dropping the handle sets the stop flag but does not wait.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop: Arc<AtomicBool>,
    running: Running,
    thread: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Ask the thread to stop. Idempotent.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// The widget whose `update` is running right now, if any.
    pub fn running(&self) -> Option<String> {
        self.running.lock().clone()
    }

    /// Stop the thread and wait up to `grace` for it to finish.
    ///
    /// If the thread is still inside an `update` when the grace period runs
    /// out it is left to finish on its own and [`Detached`] names the widget.
    pub fn shutdown(mut self, grace: Duration) -> Result<(), Detached> {
        self.stop();
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        let deadline = Instant::now() + grace;
        while !thread.is_finished() {
            if Instant::now() >= deadline {
                let widget = self.running();
                tracing::warn!(?grace, ?widget, "scheduler did not stop in time; detaching it");
                return Err(Detached { widget });
            }
            thread::sleep(Duration::from_millis(5));
        }
        if thread.join().is_err() {
            tracing::error!("scheduler thread panicked");
        }
        Ok(())
    }
}

/// A scheduler thread that outlived its shutdown grace period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detached {
    /// Widget whose `update` was still running.
    pub widget: Option<String>,
}

impl std::fmt::Display for Detached {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.widget {
            Some(name) => write!(f, "widget \"{name}\" was still updating when the session ended"),
            None => f.write_str("a widget update was still running when the session ended"),
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dimensions::BaseDimensions;
    use crate::error::WidgetError;
    use crate::plugin::{Content, Plugin};

    fn widget(name: &str, interval: Option<f64>, plugin: &Plugin) -> Arc<Widget> {
        let mut config = Config::new(name, name, BaseDimensions::new(0, 0, 5, 5));
        if let Some(seconds) = interval {
            config = config.with_interval(seconds);
        }
        Arc::new(plugin.build(config, Arc::default()))
    }

    fn fast() -> Plugin {
        Plugin::new(|_, _| Ok(())).with_update(|_| Ok(Content::new(())))
    }

    fn simulate(scheduler: &mut Scheduler, start: Instant, total: Duration, step: Duration) {
        let mut elapsed = Duration::ZERO;
        while elapsed <= total {
            scheduler.tick(start + elapsed);
            elapsed += step;
        }
    }

    #[test]
    fn intervals_drive_publish_counts() {
        let plugin = fast();
        let widgets = [
            widget("one", Some(1.0), &plugin),
            widget("five", Some(5.0), &plugin),
            widget("once", None, &plugin),
        ];
        let mut scheduler = Scheduler::new(&widgets, Arc::default());
        simulate(
            &mut scheduler,
            Instant::now(),
            Duration::from_millis(5200),
            Duration::from_millis(50),
        );
        assert!(widgets[0].publish_count() >= 5);
        assert!(widgets[1].publish_count() >= 1);
        assert_eq!(widgets[2].publish_count(), 1);
    }

    #[test]
    fn publishes_track_floor_of_elapsed_over_interval() {
        let plugin = fast();
        let widgets = [widget("w", Some(0.5), &plugin)];
        let mut scheduler = Scheduler::new(&widgets, Arc::default());
        simulate(
            &mut scheduler,
            Instant::now(),
            Duration::from_secs(10),
            Duration::from_millis(10),
        );
        let expected = 20_i64;
        let actual = i64::try_from(widgets[0].publish_count()).unwrap();
        assert!((actual - expected).abs() <= 1, "got {actual} publishes");
    }

    #[test]
    fn static_and_disabled_widgets_are_not_scheduled() {
        let static_plugin = Plugin::new(|_, _| Ok(()));
        let plugin = fast();
        let disabled = {
            let config = Config::new("off", "off", BaseDimensions::new(0, 0, 5, 5)).with_enabled(false);
            Arc::new(plugin.build(config, Arc::default()))
        };
        let widgets = [widget("static", None, &static_plugin), disabled];
        let mut scheduler = Scheduler::new(&widgets, Arc::default());
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.tick(Instant::now()), 0);
        assert_eq!(widgets[1].publish_count(), 0);
    }

    #[test]
    fn errors_are_published_and_retried_on_schedule() {
        let plugin = Plugin::new(|_, _| Ok(())).with_update(|_| Err(WidgetError::failed("down")));
        let widgets = [widget("flaky", Some(1.0), &plugin)];
        let mut scheduler = Scheduler::new(&widgets, Arc::default());
        let start = Instant::now();
        scheduler.tick(start);
        scheduler.tick(start + Duration::from_millis(1000));
        assert_eq!(widgets[0].publish_count(), 2);
        assert_eq!(widgets[0].pending(), Some(Err(WidgetError::failed("down"))));
    }

    #[test]
    fn stop_flag_abandons_the_pass() {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let stopping = Plugin::new(|_, _| Ok(())).with_update(move |_| {
            flag.store(true, Ordering::Relaxed);
            Ok(Content::new(()))
        });
        let widgets = [widget("first", None, &stopping), widget("second", None, &fast())];
        let mut scheduler = Scheduler::new(&widgets, stop);
        assert_eq!(scheduler.tick(Instant::now()), 1);
        assert_eq!(widgets[1].publish_count(), 0);
    }

    #[test]
    fn thread_runs_and_shuts_down() {
        let plugin = fast();
        let widgets = [widget("w", Some(0.01), &plugin)];
        let handle = Scheduler::new(&widgets, Arc::default())
            .spawn(Duration::from_millis(2))
            .unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while widgets[0].publish_count() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(handle.shutdown(Duration::from_secs(1)), Ok(()));
        assert!(widgets[0].publish_count() >= 3);
    }

    #[test]
    fn hung_update_does_not_block_shutdown_forever() {
        let plugin = Plugin::new(|_, _| Ok(())).with_update(|_| {
            thread::sleep(Duration::from_millis(500));
            Ok(Content::new(()))
        });
        let widgets = [widget("slow", None, &plugin)];
        let handle = Scheduler::new(&widgets, Arc::default())
            .spawn(Duration::from_millis(1))
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        let started = Instant::now();
        assert_eq!(handle.running().as_deref(), Some("slow"));
        let detached = handle.shutdown(Duration::from_millis(20)).unwrap_err();
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(detached.widget.as_deref(), Some("slow"));
        assert_eq!(
            detached.to_string(),
            "widget \"slow\" was still updating when the session ended"
        );
    }
}
