//! Self-diagnostic report: resolved configuration, paths and key presence.
//! Safe to paste; contains no secrets.

use crate::config::WindlassConfig;
use crate::paths::WindlassPaths;
use eyre::Context as _;
use serde_json::json;
use std::io::Write as _;

pub fn run(json_output: bool) -> eyre::Result<()> {
    let paths = WindlassPaths::discover()?;
    let cfg = WindlassConfig::load(&paths)?;
    let node_urls = cfg.node.resolved_urls(cfg.network);

    let report = json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
        "network": cfg.network.as_str(),
        "node_urls": node_urls,
        "key_source": cfg.key_source(),
        "extractor_model": cfg.extractor.model,
        "confirm_timeout_secs": cfg.executor.confirm_timeout_secs,
        "paths": {
            "config_dir": paths.config_dir,
            "data_dir": paths.data_dir,
            "log_file": paths.log_file,
        },
    });

    let mut out = std::io::stdout().lock();
    if json_output {
        writeln!(out, "{report}").context("write doctor report")?;
        return Ok(());
    }

    let pretty = serde_json::to_string_pretty(&report).context("serialize doctor report")?;
    writeln!(out, "{pretty}").context("write doctor report")?;
    Ok(())
}
