use capsweep::engine::progress::{Progress, ProgressCallback};
use capsweep::engine::report::PointStatus;
use indicatif::{ProgressBar, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use tracing::warn;

#[derive(Clone)]
pub struct CliProgressHandler {
    pb: Arc<Mutex<ProgressBar>>,
    failures: Arc<Mutex<u64>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        let pb = ProgressBar::new(0)
            .with_style(Self::bar_style())
            .with_message("Initializing...");
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.finish_and_clear();

        Self {
            pb: Arc::new(Mutex::new(pb)),
            failures: Arc::new(Mutex::new(0)),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let pb_clone = self.pb.clone();
        let failures_clone = self.failures.clone();

        Box::new(move |progress: Progress| {
            let Ok(mut pb_guard) = pb_clone.lock() else {
                warn!("Progress bar mutex was poisoned. Cannot update progress.");
                return;
            };

            match progress {
                Progress::SweepStart { total_points } => {
                    pb_guard.reset();
                    pb_guard.set_length(total_points);
                    pb_guard.set_position(0);
                    pb_guard.set_style(Self::bar_style());
                    pb_guard.set_message("Sweeping");
                }
                Progress::PointStart { identity, .. } => {
                    pb_guard.set_message(identity);
                }
                Progress::PointFinish { status } => {
                    if status != PointStatus::Succeeded {
                        if let Ok(mut failures) = failures_clone.lock() {
                            *failures += 1;
                        }
                        pb_guard.println(format!("  ✗ {} ({:?})", pb_guard.message(), status));
                    }
                    pb_guard.inc(1);
                }
                Progress::SweepFinish => {
                    let failures = failures_clone.lock().map(|f| *f).unwrap_or(0);
                    if failures == 0 {
                        pb_guard.finish_with_message("✓ Done");
                    } else {
                        pb_guard.finish_with_message(format!("Done with {} failure(s)", failures));
                    }
                }
                Progress::Message(msg) => {
                    if !pb_guard.is_finished() {
                        pb_guard.println(format!("  {}", msg));
                    } else {
                        pb_guard.set_message(msg);
                    }
                }
            }
        })
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<36} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .expect("Failed to create bar style template")
            .with_key(
                "eta",
                |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                    write!(w, "{:.1}s", state.eta().as_secs_f64()).unwrap()
                },
            )
            .progress_chars("##-")
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn handler_initializes_in_a_clean_state() {
        let handler = CliProgressHandler::new();
        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.length(), Some(0));
        assert!(pb.is_finished());
    }

    #[test]
    fn callback_tracks_sweep_points() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::SweepStart { total_points: 3 });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.length(), Some(3));
            assert_eq!(pb.position(), 0);
            assert!(!pb.is_finished());
        }

        callback(Progress::PointStart {
            index: 0,
            identity: "MOD_DL_CU-plane_20M_55.14".to_string(),
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.message(), "MOD_DL_CU-plane_20M_55.14");
        }

        callback(Progress::PointFinish {
            status: PointStatus::Succeeded,
        });
        {
            let pb = handler.pb.lock().unwrap();
            assert_eq!(pb.position(), 1);
        }

        callback(Progress::SweepFinish);
        {
            let pb = handler.pb.lock().unwrap();
            assert!(pb.is_finished());
            assert_eq!(pb.message(), "✓ Done");
        }
    }

    #[test]
    fn failed_points_are_counted_in_final_message() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        callback(Progress::SweepStart { total_points: 2 });
        callback(Progress::PointFinish {
            status: PointStatus::RunFailed,
        });
        callback(Progress::PointFinish {
            status: PointStatus::ArchiveFailed,
        });
        callback(Progress::SweepFinish);

        let pb = handler.pb.lock().unwrap();
        assert_eq!(pb.position(), 2);
        assert_eq!(pb.message(), "Done with 2 failure(s)");
        assert_eq!(*handler.failures.lock().unwrap(), 2);
    }

    #[test]
    fn callback_is_thread_safe() {
        let handler = CliProgressHandler::new();
        let callback = handler.get_callback();

        thread::spawn(move || {
            callback(Progress::SweepStart { total_points: 1 });
            callback(Progress::PointFinish {
                status: PointStatus::Succeeded,
            });
            callback(Progress::SweepFinish);
        })
        .join()
        .unwrap();

        let pb = handler.pb.lock().unwrap();
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✓ Done");
    }
}
