// src/watch.rs

use std::path::Path;

use crate::config;
use crate::error::RunError;
use crate::orchestrator::{self, BuildOpts};
use tracing::{debug, error, info};

fn paths_to_watch(config_file: &str, config: &config::Config) -> Vec<String> {
    vec![
        config_file.to_string(),
        config.content_dir.clone(),
        config.assets_dir.clone(),
        format!("themes/{}", config.theme),
    ]
}

/// Watch for file changes and rebuild automatically (macOS only)
#[cfg(target_os = "macos")]
pub(crate) fn watch(config_file: &str, include_drafts: bool) -> Result<(), RunError> {
    use std::sync::mpsc::channel;
    use std::thread;
    use std::time::{Duration, Instant};

    let root = Path::new(".");
    let config_path = Path::new(config_file);
    let config = config::load_config(config_path)?;
    let watched = paths_to_watch(config_file, &config);

    let opts = BuildOpts {
        incremental: true,
        include_drafts,
        ..BuildOpts::default()
    };

    info!("watch::start {:?}", watched);
    info!("watch::info press Ctrl+C to stop");
    if include_drafts {
        info!("watch::drafts including draft content");
    }

    if let Err(e) = orchestrator::build(root, config_path, &opts) {
        error!("Initial build failed: {:?}", e);
    }

    let (sender, receiver) = channel();

    let _watcher_thread = thread::spawn(move || {
        let fsevent = fsevent::FsEvent::new(watched);
        fsevent.observe(sender);
    });

    let mut last_build = Instant::now();
    let debounce_duration = Duration::from_millis(500);

    loop {
        match receiver.recv() {
            Ok(events) => {
                if last_build.elapsed() < debounce_duration {
                    debug!("watch::debounce skipping rebuild");
                    continue;
                }

                info!("watch::change event_id: {}", events.event_id);
                debug!("watch::change {:?}", events);
                last_build = Instant::now();

                if let Err(e) = orchestrator::build(root, config_path, &opts) {
                    error!("Build failed: {:?}", e);
                }
            }
            Err(e) => {
                error!("Watch error: {:?}", e);
                break;
            }
        }
    }

    Ok(())
}

#[cfg(not(target_os = "macos"))]
pub(crate) fn watch(_config_file: &str, _include_drafts: bool) -> Result<(), RunError> {
    eprintln!("Watch mode is only supported on macOS");
    std::process::exit(1);
}
