use crate::context;
use anyhow::Context;
use pdl_core::instances::InstanceRecord;
use pdl_core::paths;
use std::path::Path;
use std::sync::Arc;

pub fn run(root: &Path, port: Option<u16>) -> anyhow::Result<()> {
    let ws = context::open(root)?;
    let port = port.unwrap_or(ws.config.server.port);
    let info = ws.selection.info.clone();
    let registry = paths::instances_dir_for(&info.shared_path);
    let app_state = pdl_server::AppState::new(
        root.to_path_buf(),
        Arc::new(ws.engine),
        info,
        ws.config,
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
            .await
            .with_context(|| format!("failed to bind port {port}"))?;
        let actual_port = listener.local_addr()?.port();

        let record = InstanceRecord::current(&app_state.root, Some(actual_port));
        record
            .write(&registry)
            .context("failed to register this instance")?;

        println!(
            "pdl server ({} store) -> http://localhost:{actual_port}  (PID {})",
            app_state.storage.backend, record.pid
        );

        let result = tokio::select! {
            res = pdl_server::serve_on(app_state, listener) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        };

        if let Err(e) = record.remove(&registry) {
            tracing::warn!(error = %e, "could not remove instance record");
        }
        result
    })
}
