//! Dashlight - highlight em-dashes and friends in HTML pages

#[cfg(feature = "watch")]
mod watcher;

use anyhow::{Context, Result};
use clap::Parser;
use dashlight_core::html;
use dashlight_core::{BridgeStats, Config, MutationBridge, Strategy};
use std::path::{Path, PathBuf};

/// Mark dash-like punctuation in an HTML document
#[derive(Parser, Debug)]
#[command(name = "dashlight")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the HTML file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,

    /// Read configuration from this file instead of the platform location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// windowed-span or block-mark
    #[arg(long, value_name = "STRATEGY")]
    strategy: Option<Strategy>,

    /// Characters kept on each side of a dash in windowed mode
    #[arg(long, value_name = "N")]
    radius: Option<usize>,

    /// Also match the en-dash (U+2013)
    #[arg(long)]
    en_dash: bool,

    /// Also match a double hyphen "--"
    #[arg(long)]
    double_hyphen: bool,

    /// HTML fragment appended to <body> after the initial sweep (repeatable)
    #[arg(long, value_name = "HTML")]
    inject: Vec<String>,

    /// Regenerate the output whenever FILE changes
    #[cfg(feature = "watch")]
    #[arg(long)]
    watch: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };
    apply_overrides(&mut config, &args);

    render(&args, &config)?;

    #[cfg(feature = "watch")]
    {
        if args.watch {
            watch(&args, &config)?;
        }
    }

    Ok(())
}

/// Command line flags win over the config file
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(strategy) = args.strategy {
        config.strategy = strategy;
    }
    if let Some(radius) = args.radius {
        config.window_radius = radius;
    }
    if args.en_dash {
        config.pattern.en_dash = true;
    }
    if args.double_hyphen {
        config.pattern.double_hyphen = true;
    }
}

/// Highlight the input once and write it out
fn render(args: &Args, config: &Config) -> Result<()> {
    let source = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read file: {}", args.file.display()))?;

    let (output, stats) = highlight(&source, config, &args.inject)?;
    log::info!(
        "{}: {} highlight(s), {} marker span(s), {} failed",
        args.file.display(),
        stats.highlighted,
        stats.markers,
        stats.failed
    );

    write_output(args.output.as_deref(), &output)
}

/// Initial sweep, then each injected fragment through the incremental path
fn highlight(source: &str, config: &Config, inject: &[String]) -> Result<(String, BridgeStats)> {
    let mut doc = html::parse_document(source)?;
    let mut bridge = MutationBridge::from_config(config)?;
    let root = doc.body().unwrap_or_else(|| doc.root());

    let mut stats = bridge.start(&mut doc, root);
    for fragment in inject {
        for node in html::parse_fragment(&mut doc, fragment)? {
            doc.append_child(root, node)
                .context("Failed to insert injected fragment")?;
        }
        stats.merge(bridge.pump(&mut doc));
    }

    Ok((html::serialize(&doc), stats))
}

fn write_output(path: Option<&Path>, output: &str) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, output)
            .with_context(|| format!("Failed to write output: {}", path.display())),
        None => {
            println!("{output}");
            Ok(())
        }
    }
}

#[cfg(feature = "watch")]
fn watch(args: &Args, config: &Config) -> Result<()> {
    use std::time::Duration;

    let watcher = watcher::InputWatcher::new(&args.file, Duration::from_millis(250))?;
    log::info!("watching {}", watcher.path().display());

    loop {
        watcher.wait_for_change()?;
        if let Err(e) = render(args, config) {
            log::error!("Failed to regenerate output: {e:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args_for(file: &Path) -> Args {
        Args::parse_from(["dashlight", file.to_str().unwrap()])
    }

    #[test]
    fn test_overrides_apply() {
        let args = Args::parse_from([
            "dashlight",
            "page.html",
            "--strategy",
            "block-mark",
            "--radius",
            "2",
            "--en-dash",
        ]);
        let mut config = Config::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.strategy, Strategy::BlockMark);
        assert_eq!(config.window_radius, 2);
        assert!(config.pattern.en_dash);
        assert!(!config.pattern.double_hyphen);
    }

    #[test]
    fn test_bad_strategy_rejected() {
        let result = Args::try_parse_from(["dashlight", "page.html", "--strategy", "bold"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_injected_fragment_goes_through_bridge() -> Result<()> {
        let (output, stats) = highlight(
            "<p>first\u{2014}one</p>",
            &Config::default(),
            &["<div>new\u{2014}content</div>".to_string()],
        )?;

        assert_eq!(stats.highlighted, 2);
        assert_eq!(output.matches("class=\"emdash-highlight\"").count(), 2);
        Ok(())
    }

    #[test]
    fn test_render_writes_output_file() -> Result<()> {
        let mut input = NamedTempFile::new()?;
        input.write_all("<p>a\u{2014}b</p>".as_bytes())?;
        let output = NamedTempFile::new()?;

        let mut args = args_for(input.path());
        args.output = Some(output.path().to_path_buf());
        render(&args, &Config::default())?;

        let written = std::fs::read_to_string(output.path())?;
        assert!(written.contains("<span class=\"emdash-highlight\""));
        Ok(())
    }
}
