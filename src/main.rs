//! md-checkboxes - Main Entry Point
//!
//! Standalone host: opens markdown files, writes preview pages wired to the
//! callback endpoint, and applies checkbox toggles to the files on disk.

#[cfg(not(target_arch = "wasm32"))]
mod cli;

#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use clap::Parser;
    use log::error;
    use std::process::ExitCode;

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = cli::Cli::parse();
    match host::run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod host {
    use crate::cli::Command;
    use log::{debug, info, warn};
    use md_checkboxes::carrier::Carrier;
    use md_checkboxes::config::{get_data_dir, load_config, APP_NAME};
    use md_checkboxes::document::DocumentId;
    use md_checkboxes::error::{BestEffortExt, Error, Result, ResultExt};
    use md_checkboxes::preview::{FileStorage, HttpTransport, MarkRequest, ToggleMirror};
    use md_checkboxes::render::{render_preview_document, PreviewEndpoint, RenderEnv};
    use md_checkboxes::server::CallbackEndpoint;
    use md_checkboxes::session::EditorSession;
    use md_checkboxes::workspace::{Workspace, WorkspaceWatcher};
    use std::collections::HashSet;
    use std::fs;
    use std::io::{self, Read};
    use std::path::{Path, PathBuf};
    use std::process::ExitCode;
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(500);

    pub fn run(command: Command) -> Result<ExitCode> {
        match command {
            Command::Serve {
                paths,
                out,
                script,
                port,
            } => serve(paths, out, script, port),
            Command::Render {
                file,
                port,
                nonce,
                source,
                script,
                out,
            } => render(&file, port, nonce, source, script, out),
            Command::Mark {
                port,
                nonce,
                line,
                checked,
                source,
            } => mark(port, nonce, line, checked, source),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // serve
    // ─────────────────────────────────────────────────────────────────────────

    /// A written preview page and the document it shows.
    struct PreviewPage {
        id: DocumentId,
        source_path: PathBuf,
        page_path: PathBuf,
    }

    fn serve(
        paths: Vec<PathBuf>,
        out: Option<PathBuf>,
        script: Option<String>,
        port: Option<u16>,
    ) -> Result<ExitCode> {
        let mut settings = load_config();
        if let Some(port) = port {
            settings.port = port;
        }

        let workspace = Arc::new(Workspace::new(settings.clone()));
        let session = Arc::new(EditorSession::new());
        let tracker = session.clone();
        workspace.on_did_change_active(move |doc| tracker.track_focus(doc));

        let paths = if paths.is_empty() {
            vec![std::env::current_dir()?]
        } else {
            paths
        };

        let mut opened = Vec::new();
        let mut watch_roots = Vec::new();
        for path in &paths {
            if path.is_dir() {
                opened.extend(workspace.open_folder(path)?);
                watch_roots.push(fs::canonicalize(path)?);
            } else {
                opened.push(workspace.open_path(path)?);
                if let Some(parent) = fs::canonicalize(path)?.parent() {
                    watch_roots.push(parent.to_path_buf());
                }
            }
        }
        if opened.is_empty() {
            return Err(Error::Application("No markdown documents to serve".to_string()));
        }
        workspace.focus(&opened[0])?;

        let mut endpoint = CallbackEndpoint::new(workspace.clone(), session);
        let port = endpoint.listen(&settings)?;
        let preview = endpoint
            .preview_endpoint()
            .ok_or(Error::EndpointState("endpoint is not listening"))?;

        let out_dir = match out {
            Some(dir) => dir,
            None => get_data_dir()?.join("previews"),
        };
        fs::create_dir_all(&out_dir)?;

        let pages = plan_pages(&opened, &out_dir);
        for page in &pages {
            write_page(&workspace, page, &preview, script.as_deref())?;
            println!("{}", page.page_path.display());
        }
        println!("Listening on 127.0.0.1:{} (close stdin to stop)", port);

        let watchers: Vec<WorkspaceWatcher> = if settings.watch_files {
            dedup(watch_roots)
                .into_iter()
                .filter_map(|root| {
                    WorkspaceWatcher::new(root)
                        .map(Some)
                        .unwrap_or_warn_default(None, "File watching disabled")
                })
                .collect()
        } else {
            Vec::new()
        };

        let (stop_tx, stop_rx) = mpsc::channel();
        thread::spawn(move || {
            let mut sink = Vec::new();
            let _ = io::stdin().read_to_end(&mut sink);
            let _ = stop_tx.send(());
        });

        loop {
            match stop_rx.recv_timeout(WATCH_POLL_INTERVAL) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
            for watcher in &watchers {
                let events = watcher.poll_events();
                if events.is_empty() {
                    continue;
                }
                workspace.apply_events(&events);
                let changed: HashSet<PathBuf> = events
                    .iter()
                    .filter_map(|event| event.path())
                    .map(|path| fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf()))
                    .collect();
                for page in pages.iter().filter(|p| changed.contains(&p.source_path)) {
                    if let Err(err) = write_page(&workspace, page, &preview, script.as_deref()) {
                        warn!("Failed to refresh {}: {}", page.page_path.display(), err);
                    }
                }
            }
        }

        info!("Shutting down {}", APP_NAME);
        endpoint.dispose();
        Ok(ExitCode::SUCCESS)
    }

    fn dedup(roots: Vec<PathBuf>) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        roots
            .into_iter()
            .filter(|root| seen.insert(root.clone()))
            .collect()
    }

    /// One page per document, named after the file; clashing names get a
    /// numeric suffix.
    fn plan_pages(ids: &[DocumentId], out_dir: &Path) -> Vec<PreviewPage> {
        let mut used = HashSet::new();
        ids.iter()
            .filter_map(|id| {
                let source_path = id.to_path()?;
                let stem = source_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "preview".to_string());
                let mut name = format!("{}.html", stem);
                let mut n = 2;
                while !used.insert(name.clone()) {
                    name = format!("{}-{}.html", stem, n);
                    n += 1;
                }
                Some(PreviewPage {
                    id: id.clone(),
                    source_path,
                    page_path: out_dir.join(name),
                })
            })
            .collect()
    }

    fn write_page(
        workspace: &Workspace,
        page: &PreviewPage,
        endpoint: &PreviewEndpoint,
        script: Option<&str>,
    ) -> Result<()> {
        let markdown = workspace.text(&page.id)?;
        let env = RenderEnv::new().with("resourceUri", page.id.as_str());
        let title = page
            .source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let html = render_preview_document(&markdown, title.as_deref(), &env, endpoint, script);
        fs::write(&page.page_path, html).map_err(|source| Error::FileWrite {
            path: page.page_path.clone(),
            source,
        })?;
        debug!("Wrote {}", page.page_path.display());
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // render / mark
    // ─────────────────────────────────────────────────────────────────────────

    fn render(
        file: &Path,
        port: u16,
        nonce: String,
        source: Option<String>,
        script: Option<String>,
        out: Option<PathBuf>,
    ) -> Result<ExitCode> {
        let markdown = fs::read_to_string(file).map_err(|source| Error::FileRead {
            path: file.to_path_buf(),
            source,
        })?;
        let source = match source {
            Some(source) => source,
            None => DocumentId::from_path(file)?.to_string(),
        };
        let env = RenderEnv::new().with("resourceUri", source);
        let title = file.file_name().map(|name| name.to_string_lossy().into_owned());
        let html = render_preview_document(
            &markdown,
            title.as_deref(),
            &env,
            &PreviewEndpoint::new(port, nonce),
            script.as_deref(),
        );

        match out {
            Some(path) => fs::write(&path, html).map_err(|source| Error::FileWrite {
                path: path.clone(),
                source,
            })?,
            None => println!("{}", html),
        }
        Ok(ExitCode::SUCCESS)
    }

    fn mark(port: u16, nonce: String, line: i64, checked: bool, source: String) -> Result<ExitCode> {
        let settings = load_config();
        let carrier = Carrier::new(port, nonce, source.clone());
        let request = MarkRequest::new(&carrier, source, line, checked);

        let status = HttpTransport::new().send_blocking(&request)?;
        println!("{}", status);

        match FileStorage::in_data_dir(&settings.mirror_file) {
            Ok(storage) => {
                ToggleMirror::new(storage)
                    .record(&line.to_string(), checked)
                    .absorb("Checkbox mirror");
            }
            Err(err) => debug!("No mirror storage: {}", err),
        }

        Ok(if status == 200 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }
}
