//! catalog-press: JSON catalog to paginated HTML and print-ready PDF.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use catalog_press::assets::{AssetResolver, file_uri};
use catalog_press::builder::{BuildOptions, build_model_bundle};
use catalog_press::export::{Engine, ExportReport, PdfConfig, export_pdf};
use catalog_press::loader::load_catalog;
use catalog_press::pipeline::render_document;
use catalog_press::template::TemplateSet;
use catalog_press::types::RuntimeSettings;
use catalog_press::Error;

#[derive(Parser)]
#[command(name = "catalog-press")]
#[command(version, about = "Render a product catalog to HTML and PDF", long_about = None)]
#[command(after_help = "EXAMPLES:
    catalog-press catalog.json                   HTML and PDF under output/
    catalog-press catalog.json --no-pdf          HTML only
    catalog-press catalog.json --engine direct   PDF through WeasyPrint")]
struct Cli {
    /// Catalog JSON file
    #[arg(value_name = "JSON")]
    input: PathBuf,

    /// Where to write the assembled HTML
    #[arg(long, value_name = "PATH", default_value = "output/catalog.html")]
    out_html: PathBuf,

    /// Where to write the PDF
    #[arg(long, value_name = "PATH", default_value = "output/catalog.pdf")]
    out_pdf: PathBuf,

    /// Stop after writing the HTML
    #[arg(long)]
    no_pdf: bool,

    /// Directory of `*.html.hbs` overrides
    #[arg(long, value_name = "DIR", default_value = "templates")]
    templates: PathBuf,

    /// PDF engine
    #[arg(long, value_enum, env = "CATALOG_PRESS_ENGINE", default_value = "chromium")]
    engine: Engine,

    /// Omit the front and back covers
    #[arg(long)]
    no_cover: bool,

    /// Emit one spec-table page per model
    #[arg(long)]
    model_pages: bool,

    /// Seconds to wait for pagination before printing anyway
    #[arg(long, value_name = "SECS", default_value_t = 20)]
    pdf_timeout: u64,

    /// WeasyPrint executable for the direct engine
    #[arg(long, value_name = "BIN", env = "WEASYPRINT_BIN", default_value = "weasyprint")]
    weasyprint: String,

    /// Also write the built block list as JSON
    #[arg(long, value_name = "PATH")]
    dump_blocks: Option<PathBuf>,

    /// Suppress status messages
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// More log output (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(cli: &Cli) -> Result<(), Error> {
    let catalog = load_catalog(&cli.input)?;

    let mut options = BuildOptions::from_settings(&catalog.settings);
    options.include_cover = !cli.no_cover;
    options.model_pages |= cli.model_pages;

    let out_dir = output_dir(&cli.out_html)?;
    let runtime = RuntimeSettings {
        assets_base: file_uri(&out_dir),
        use_pagedjs: cli.engine.uses_pagedjs(),
        has_cover: !cli.no_cover,
    };
    let bundle = build_model_bundle(catalog, options).with_runtime(runtime);
    status(cli, "Built", &format!("{} block(s)", bundle.blocks().len()));

    if let Some(path) = &cli.dump_blocks {
        let json = serde_json::to_string_pretty(bundle.blocks())
            .map_err(|e| write_error(path, std::io::Error::other(e)))?;
        std::fs::write(path, json).map_err(|e| write_error(path, e))?;
        status(cli, "Dumped", &path.display().to_string());
    }

    let assets = AssetResolver::new(&out_dir);
    let templates = TemplateSet::load(Some(&cli.templates))?;
    let html = render_document(&bundle, &templates, &assets)?;
    std::fs::write(&cli.out_html, html).map_err(|e| write_error(&cli.out_html, e))?;
    status(cli, "Wrote", &cli.out_html.display().to_string());

    if cli.no_pdf {
        return Ok(());
    }

    let config = PdfConfig {
        pagination_timeout: Duration::from_secs(cli.pdf_timeout),
        weasyprint_bin: cli.weasyprint.clone(),
        ..PdfConfig::default()
    };
    let rt = tokio::runtime::Runtime::new().map_err(Error::Runtime)?;
    let report = rt.block_on(export_pdf(&cli.out_html, &cli.out_pdf, cli.engine, &config))?;
    report_pdf(cli, &report);
    Ok(())
}

/// Create the HTML output directory and return it as an absolute path.
fn output_dir(out_html: &Path) -> Result<PathBuf, Error> {
    let parent = out_html
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
    std::path::absolute(parent).map_err(|e| write_error(parent, e))
}

fn write_error(path: &Path, source: std::io::Error) -> Error {
    Error::Write {
        path: path.to_path_buf(),
        source,
    }
}

fn status(cli: &Cli, verb: &str, detail: &str) {
    if !cli.quiet {
        println!("{:>8} {detail}", verb.green().bold());
    }
}

fn report_pdf(cli: &Cli, report: &ExportReport) {
    let detail = format!("{} ({} KiB)", report.path.display(), report.bytes.div_ceil(1024));
    if report.degraded {
        if !cli.quiet {
            println!("{:>8} {detail}, pagination timed out", "Degraded".yellow().bold());
        }
    } else {
        status(cli, "Exported", &detail);
    }
}
