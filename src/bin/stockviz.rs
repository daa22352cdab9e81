use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use stockviz::config::{CollisionConfig, Movement};
use stockviz::{stats, storage, viz};

#[derive(Parser, Debug)]
#[command(
    name = "stockviz",
    version,
    about = "Render annotated stock charts with collision-free labels"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a chart (and optionally save the label layout and print stats).
    Plot(PlotArgs),
    /// Print summary statistics for a price file.
    Summary(SummaryArgs),
}

#[derive(Args, Debug)]
struct PlotArgs {
    /// CSV with header `date,close[,volume]`.
    #[arg(short, long)]
    input: PathBuf,
    /// Chart output path (.svg or .png).
    #[arg(short, long)]
    out: PathBuf,
    /// Symbol shown in the title and legend (default: input file stem).
    #[arg(long)]
    symbol: Option<String>,
    #[arg(long, default_value_t = 1000)]
    width: u32,
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Moving-average windows separated by comma or semicolon (e.g., 20,50). Empty for none.
    #[arg(long, default_value = "20,50")]
    ma: String,
    /// Draw volume bars on a twin axis.
    #[arg(long, default_value_t = false)]
    volume: bool,
    /// Label movement axes: x, y or xy.
    #[arg(long)]
    movement: Option<Movement>,
    #[arg(long)]
    obstacle_padding: Option<f64>,
    #[arg(long)]
    label_padding: Option<f64>,
    #[arg(long)]
    max_iterations: Option<usize>,
    /// Pixel displacement beyond which a connector is drawn.
    #[arg(long)]
    connector_threshold: Option<f64>,
    /// JSON collision config; flags above override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Outline everything the collision engine sees.
    #[arg(long, default_value_t = false)]
    debug: bool,
    /// Number locale for ticks and labels (en, de, fr, ...).
    #[arg(long, default_value = "en")]
    locale: String,
    /// Save resolved label positions as JSON.
    #[arg(long)]
    layout_out: Option<PathBuf>,
    /// Print summary statistics to stdout.
    #[arg(long, default_value_t = false)]
    stats: bool,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    #[arg(short, long)]
    input: PathBuf,
    #[arg(long)]
    symbol: Option<String>,
    /// Print as JSON instead of text.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn parse_windows(s: &str) -> Result<Vec<usize>> {
    s.split([',', ';'])
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(|x| {
            x.parse::<usize>()
                .map_err(|_| anyhow::anyhow!("invalid --ma window `{x}`"))
        })
        .collect()
}

fn symbol_for(input: &std::path::Path, symbol: Option<String>) -> String {
    symbol.unwrap_or_else(|| {
        input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("series")
            .to_uppercase()
    })
}

fn print_summary(s: &stats::Summary) {
    println!(
        "{}  count={}  first={} last={}  min={} max={} mean={} median={}  change={}%",
        s.symbol,
        s.count,
        fmt_opt(s.first),
        fmt_opt(s.last),
        fmt_opt(s.min),
        fmt_opt(s.max),
        fmt_opt(s.mean),
        fmt_opt(s.median),
        fmt_opt(s.change_pct)
    );
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Plot(args) => cmd_plot(args),
        Command::Summary(args) => cmd_summary(args),
    }
}

fn collision_config(args: &PlotArgs) -> Result<CollisionConfig> {
    let mut cfg = match &args.config {
        Some(path) => CollisionConfig::from_path(path)?,
        None => CollisionConfig::default(),
    };
    if let Some(m) = args.movement {
        cfg.movement = m;
    }
    if let Some(p) = args.obstacle_padding {
        cfg.obstacle_padding = p;
    }
    if let Some(p) = args.label_padding {
        cfg.label_padding = p;
    }
    if let Some(n) = args.max_iterations {
        cfg.max_iterations = n;
    }
    if let Some(t) = args.connector_threshold {
        cfg.connector.threshold = t;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn cmd_plot(args: PlotArgs) -> Result<()> {
    let symbol = symbol_for(&args.input, args.symbol.clone());
    let series = storage::load_csv(&args.input, &symbol)?;
    let opts = viz::ChartOptions {
        width: args.width,
        height: args.height,
        title: None,
        locale: args.locale.clone(),
        moving_averages: parse_windows(&args.ma)?,
        volume: args.volume,
        debug: args.debug,
        collision: collision_config(&args)?,
        ..viz::ChartOptions::default()
    };

    let report = viz::plot_annotated(&series, &args.out, &opts)?;
    eprintln!(
        "Wrote chart to {} ({} labels, {} passes, {} unresolved)",
        args.out.display(),
        report.placements.len(),
        report.resolve.passes,
        report.resolve.unresolved
    );

    if let Some(path) = args.layout_out.as_ref() {
        storage::save_layout_json(&report.placements, path)?;
        eprintln!("Saved label layout to {}", path.display());
    }

    if args.stats {
        print_summary(&stats::summary(&series));
    }
    Ok(())
}

fn cmd_summary(args: SummaryArgs) -> Result<()> {
    let symbol = symbol_for(&args.input, args.symbol);
    let series = storage::load_csv(&args.input, &symbol)?;
    let summary = stats::summary(&series);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}
