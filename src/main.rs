//! Kiln - a content build pipeline for static sites.

use anyhow::{Result, bail};
use clap::Parser;
use kiln::cli::Cli;
use kiln::config::SiteConfig;
use kiln::error::ConfigError;
use kiln::filters::{FilterRegistry, register_builtins};
use kiln::log;
use kiln::minify::BasicCssMinifier;
use kiln::plugins::{PluginRegistry, feed::FeedPlugin, image::ImagePlugin, nav::NavPlugin};
use kiln::plugins::image::ResizeTransformer;
use kiln::template::FileTemplates;
use kiln::{build::build_site, watch::watch_for_changes};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let mut filters = FilterRegistry::new();
    register_builtins(&mut filters, Arc::new(BasicCssMinifier))?;
    let plugins = make_plugins()?;

    let run_pass = || -> Result<bool> {
        // Fresh engine per pass so template edits are picked up
        let engine = FileTemplates::new(config.templates_dir());
        let summary = build_site(&config, &engine, &filters, &plugins)?;
        Ok(summary.ok())
    };

    let mut clean = run_pass()?;

    if cli.is_watch() {
        watch_for_changes(&config, |_changed| {
            clean = run_pass()?;
            Ok(())
        })?;
    }

    // Exit status reflects whether any render error occurred
    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &Cli) -> Result<SiteConfig> {
    let root = cli.root.clone().unwrap_or_else(|| "./".into());
    let config_path = root.join(&cli.config);

    if !config_path.exists() {
        bail!("Config file not found: {}", config_path.display());
    }

    let mut config = SiteConfig::from_path(&config_path)?;
    config.update_with_cli(cli);
    config.validate()?;
    Ok(config)
}

/// The built-in plugin stack, in run order.
fn make_plugins() -> Result<PluginRegistry, ConfigError> {
    let mut plugins = PluginRegistry::new();
    plugins.register(Box::new(NavPlugin))?;
    plugins.register(Box::new(FeedPlugin))?;
    plugins.register(Box::new(ImagePlugin::new(Arc::new(ResizeTransformer))))?;
    log!("build"; "plugins: {}", plugins.names().join(", "));
    Ok(plugins)
}
