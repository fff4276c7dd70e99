// verity/src/commands/serve.rs
//
// `serve --watch`: re-plans and re-runs the whole project every time a
// model or schema file changes. Debounces bursts of events (editors tend
// to fire several in a row for one save) behind a short settle window.

use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use tracing::{error, info, warn};

const DEBOUNCE: Duration = Duration::from_millis(300);

pub async fn execute(project_dir: &Path, watch: bool) -> anyhow::Result<()> {
    run_once(project_dir).await;

    if !watch {
        return Ok(());
    }

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
        if let Ok(event) = event {
            let _ = tx.send(event);
        }
    })?;
    watcher.watch(project_dir, RecursiveMode::Recursive)?;

    info!(path = ?project_dir, "watching for model changes");

    loop {
        let Ok(first_event) = rx.recv() else {
            break;
        };
        if !is_relevant(&first_event) {
            continue;
        }

        // Drain whatever else arrives within the debounce window so one
        // editor save (often several filesystem events) triggers one run.
        std::thread::sleep(DEBOUNCE);
        while rx.try_recv().is_ok() {}

        run_once(project_dir).await;
    }

    Ok(())
}

fn is_relevant(event: &notify::Event) -> bool {
    event.paths.iter().any(|p| {
        matches!(
            p.extension().and_then(|e| e.to_str()),
            Some("sql") | Some("yml") | Some("yaml")
        )
    })
}

async fn run_once(project_dir: &Path) {
    info!("re-planning project");
    match super::run::execute(project_dir, Vec::new(), false, Vec::new()).await {
        Ok(()) => info!("run finished"),
        Err(e) => {
            warn!(error = %e, "run failed, continuing to watch");
            error!("{e:?}");
        }
    }
}
