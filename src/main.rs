use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chartspec::geo::fetch::BoundarySource;
use chartspec::{data, export, render_spec, ChartSpec, OutputFormat, RenderOptions, Row};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Svg,
    Png,
    Text,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Svg => OutputFormat::Svg,
            Format::Png => OutputFormat::Png,
            Format::Text => OutputFormat::Text,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "chartspec")]
#[command(about = "Render a JSON chart spec as SVG, PNG or text", long_about = None)]
struct Args {
    /// Chart spec file (reads stdin when omitted or "-")
    spec: Option<PathBuf>,

    /// CSV (or JSON array) file whose rows replace the spec's data
    #[arg(long)]
    data: Option<PathBuf>,

    /// Thumbnail rendering: fixed size, no axes, legend or popups
    #[arg(long)]
    compact: bool,

    /// Width of the host area in pixels
    #[arg(long)]
    width: Option<u32>,

    #[arg(long, value_enum, default_value = "svg")]
    format: Format,

    /// Leave choropleths on their loading placeholder instead of fetching boundaries
    #[arg(long)]
    no_fetch: bool,

    /// Directory that local boundary paths resolve against; without it only
    /// http(s) boundary URLs are fetched
    #[arg(long)]
    boundaries_dir: Option<PathBuf>,

    /// Boundary fetch timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Table page to show (1-based)
    #[arg(long)]
    page: Option<usize>,

    /// Click a table column header; repeat to cycle asc, desc, off
    #[arg(long)]
    sort_column: Vec<String>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let text = read_spec(args.spec.as_ref())?;
    let mut spec = ChartSpec::from_json(&text).context("Failed to parse chart spec")?;

    if let Some(path) = &args.data {
        spec.data = read_rows(path)?;
        debug!(rows = spec.data.len(), path = %path.display(), "Replaced spec data");
    }

    let options = RenderOptions {
        container_width: args.width,
        compact: args.compact,
        format: args.format.into(),
        fetch_timeout_secs: args.timeout,
        fetch_boundaries: !args.no_fetch,
        boundaries_dir: args.boundaries_dir.clone(),
    };

    let source = options.boundary_source();
    let source: Option<&dyn BoundarySource> = options.fetch_boundaries.then_some(&source as &dyn BoundarySource);
    let mut view = render_spec(spec, &options, source);

    if let Some(table) = view.table_mut() {
        for column in &args.sort_column {
            table.toggle_sort(column);
        }
        if let Some(page) = args.page {
            table.set_page(page.saturating_sub(1));
        }
    }
    if view.is_loading() && options.fetch_boundaries {
        warn!("Boundaries could not be loaded");
    }

    let bytes = export::encode(view.container(), options.format).context("Failed to encode output")?;

    // Write to stdout
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(&bytes).context("Failed to write output to stdout")?;
    if options.format != OutputFormat::Png && !bytes.is_empty() {
        handle.write_all(b"\n").context("Failed to write output to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;

    Ok(())
}

fn read_spec(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) if p.as_os_str() != "-" => {
            fs::read_to_string(p).with_context(|| format!("Failed to read {}", p.display()))
        }
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read spec from stdin")?;
            Ok(text)
        }
    }
}

fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        let value: serde_json::Value =
            serde_json::from_reader(file).with_context(|| format!("Failed to parse {}", path.display()))?;
        return data::rows_from_json(&value);
    }
    data::rows_from_csv(file).context("Failed to read CSV data")
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("chartspec=debug")
        } else {
            EnvFilter::new("chartspec=warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(io::stderr))
        .with(filter)
        .init();
}
