use crate::config::load_config;
use crate::editor::TopologyEditor;
use crate::intent::{ScriptLine, parse_script};
use crate::snap::PortLayout;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "vtop",
    version,
    about = "Apply a switch/VLAN topology intent script and print the resulting topology"
)]
pub struct Args {
    /// Intent script, or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "summary")]
    pub output_format: OutputFormat,

    /// Config JSON file (snap threshold, faceplate geometry, spawn positions)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Log rejected intents and carry on instead of stopping at the first one
    #[arg(short = 'k', long = "keep-going")]
    pub keep_going: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Summary,
    Json,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_filter(filter),
        )
        .try_init();
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let input = read_input(args.input.as_deref())?;
    let script = parse_script(&input)?;
    if script.is_empty() {
        warn!("script contains no intents");
    }

    let mut editor = TopologyEditor::new(config);
    debug!(
        snap_threshold = editor.config().snap.threshold,
        intents = script.len(),
        "applying script"
    );
    let rejected = execute(&mut editor, &script, args.keep_going)?;
    if rejected > 0 {
        warn!(rejected, "some intents were rejected");
    }
    let topology = editor.topology();
    info!(
        switches = topology.switches.len(),
        cables = topology.cables.len(),
        floating = topology.free_terminals().count(),
        "script applied"
    );

    let rendered = render(&editor, args.output_format)?;
    write_output(&rendered, args.output.as_deref())
}

/// Applies every scripted intent in order. Returns how many were rejected,
/// which is always 0 unless `keep_going` is set.
pub fn execute<L: PortLayout>(
    editor: &mut TopologyEditor<L>,
    script: &[ScriptLine],
    keep_going: bool,
) -> Result<usize> {
    let mut rejected = 0;
    for line in script {
        match editor.apply(&line.intent) {
            Ok(outcome) => info!(line = line.line, ?outcome, "applied"),
            Err(err) if keep_going => {
                warn!(line = line.line, text = %line.text, %err, "intent rejected");
                rejected += 1;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("line {}: `{}`", line.line, line.text));
            }
        }
    }
    Ok(rejected)
}

pub fn render<L: PortLayout>(editor: &TopologyEditor<L>, format: OutputFormat) -> Result<String> {
    let view = editor.view();
    match format {
        OutputFormat::Summary => Ok(view.summary()),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&view)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return std::fs::read_to_string(path)
                .with_context(|| format!("reading script {}", path.display()));
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
switch
switch
cable sw-1 1 sw-2 1 direction=a-to-b
attach sw-1 1 label=Blocked
attach sw-1 2 label=Desk
"#;

    #[test]
    fn stops_at_first_rejection() {
        let script = parse_script(SCRIPT).unwrap();
        let mut editor = TopologyEditor::default();
        let err = execute(&mut editor, &script, false).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("line 5"));
        assert!(message.contains("already occupied"));
        assert!(editor.topology().terminals.is_empty());
    }

    #[test]
    fn keep_going_skips_rejections() {
        let script = parse_script(SCRIPT).unwrap();
        let mut editor = TopologyEditor::default();
        let rejected = execute(&mut editor, &script, true).unwrap();
        assert_eq!(rejected, 1);
        assert_eq!(editor.topology().terminals.len(), 1);
        assert_eq!(editor.topology().terminals[0].label, "Desk");
    }

    #[test]
    fn renders_json_view() {
        let script = parse_script(SCRIPT).unwrap();
        let mut editor = TopologyEditor::default();
        execute(&mut editor, &script, true).unwrap();
        let json = render(&editor, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["cables"][0]["label"], "SW-1 P1 ↔ SW-2 P1");
        assert_eq!(value["switches"][1]["traffic"]["p-1"]["hasReceive"], true);
        let summary = render(&editor, OutputFormat::Summary).unwrap();
        assert!(summary.contains("cable SW-1 P1 ↔ SW-2 P1"));
    }
}
