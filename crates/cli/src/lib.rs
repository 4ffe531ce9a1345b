use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sigplace_core::{
    outgoing_signatures, AnnotationId, EditorConfig, ScreenPoint, SidecarBackend, Signature,
};
use sigplace_render::PdfPage;
use sigplace_ui::{PlacementEditor, ViewerState};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Upper bound on frames spent waiting for the first render
const MAX_SETTLE_FRAMES: u32 = 100_000;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Parser)]
#[command(name = "sigplace")]
#[command(about = "Place signature images on a PDF page")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Editor configuration file (JSON).
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable page metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render the page with its signatures to a PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1.0)]
        zoom: f32,
        /// Width of the viewport the page is fitted into.
        #[arg(long, value_name = "PX")]
        viewport_width: Option<f32>,
        #[arg(long, value_name = "RATIO")]
        dpr: Option<f32>,
        /// Signatures JSON; defaults to the sidecar next to FILE.
        #[arg(long, value_name = "JSON")]
        signatures: Option<PathBuf>,
        /// Draw the alignment grid.
        #[arg(long)]
        grid: bool,
        /// Draw signature N (0-based) as selected.
        #[arg(long, value_name = "N")]
        select: Option<usize>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Drag signature N from one screen point to another and print the result.
    Place {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Signatures JSON; defaults to the sidecar next to FILE.
        #[arg(long, value_name = "JSON")]
        signatures: Option<PathBuf>,
        #[arg(long, value_name = "N")]
        index: usize,
        #[arg(long, value_name = "X,Y", value_parser = parse_point)]
        from: ScreenPoint,
        #[arg(long, value_name = "X,Y", value_parser = parse_point)]
        to: ScreenPoint,
        #[arg(long)]
        snap: bool,
        #[arg(long, value_name = "UNITS")]
        grid_size: Option<f32>,
        /// Write the result to the sidecar next to FILE.
        #[arg(long)]
        save: bool,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    rotation: u16,
    page_size_pt: PageSizeOutput,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Render { file, zoom, viewport_width, dpr, signatures, grid, select, output } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(dpr) = dpr {
                config = config.with_device_pixel_ratio(dpr);
            }
            config.show_grid = grid;
            config.validate()?;
            let options = RenderOptions { zoom, viewport_width, select };
            run_render(&file, config, signatures.as_deref(), &options, output.as_deref())
        }
        Commands::Place { file, signatures, index, from, to, snap, grid_size, save } => {
            let config = load_config(cli.config.as_deref())?;
            let grid_size = grid_size.unwrap_or(config.grid_size);
            let config = config.with_grid(grid_size, false, snap);
            config.validate()?;
            run_place(&file, config, signatures.as_deref(), index, from, to, save)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // A logger may already be installed when embedded; keep it.
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
}

fn load_config(path: Option<&Path>) -> Result<EditorConfig> {
    let config = match path {
        Some(path) => EditorConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn parse_point(value: &str) -> Result<ScreenPoint, String> {
    let (x, y) = value.split_once(',').ok_or_else(|| format!("expected X,Y, got {value:?}"))?;
    let parse = |part: &str| part.trim().parse::<f32>().map_err(|err| format!("{part:?}: {err}"));
    Ok(ScreenPoint::new(parse(x)?, parse(y)?))
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let page = PdfPage::from_bytes(bytes).context("failed to open PDF")?;
    let size = page.size();

    let payload = InfoOutput {
        path: file.display().to_string(),
        page_count: page.page_count(),
        rotation: page.rotation(),
        page_size_pt: PageSizeOutput { width: size.width, height: size.height },
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

struct RenderOptions {
    zoom: f32,
    viewport_width: Option<f32>,
    select: Option<usize>,
}

fn run_render(
    file: &Path,
    config: EditorConfig,
    signatures: Option<&Path>,
    options: &RenderOptions,
    output: Option<&Path>,
) -> Result<()> {
    let mut session = Session::open(file, config, signatures)?;
    let now = session.now;
    if let Some(width) = options.viewport_width {
        session.editor.set_container_width(width, now);
    }
    session.editor.set_zoom(options.zoom, now);
    session.settle()?;

    if let Some(index) = options.select {
        let id = session.annotation_at(index)?;
        session.editor.select(Some(id))?;
    }
    session.settle()?;

    let image = session.editor.composite().context("no page surface was rendered")?;
    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());
    Ok(())
}

fn run_place(
    file: &Path,
    config: EditorConfig,
    signatures: Option<&Path>,
    index: usize,
    from: ScreenPoint,
    to: ScreenPoint,
    save: bool,
) -> Result<()> {
    let mut session = Session::open(file, config, signatures)?;
    let expected = session.annotation_at(index)?;

    match session.editor.pointer_down(from) {
        Some(id) if id == expected => {}
        _ => anyhow::bail!("signature {index} is not under {},{}", from.x, from.y),
    }
    session.editor.pointer_move(to);
    let commit = session.editor.pointer_up(Some(to)).context("drag was not committed")?;
    log::info!("signature {index} moved to {},{}", commit.origin.x, commit.origin.y);

    let placed = if save {
        session.editor.save(&mut SidecarBackend).context("failed to save signatures")?.signatures
    } else {
        outgoing_signatures(session.editor.signatures().iter())
    };
    println!("{}", serde_json::to_string_pretty(&placed)?);
    Ok(())
}

/// Headless editor over one PDF, driven by a synthetic clock
struct Session {
    editor: PlacementEditor,
    now: Instant,
}

impl Session {
    fn open(file: &Path, config: EditorConfig, signatures: Option<&Path>) -> Result<Self> {
        ensure_pdf_exists(file)?;

        let mut document = SidecarBackend.load(file).context("failed to load document")?;
        if let Some(path) = signatures {
            document.signatures = read_signatures(path)?;
        }
        let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;

        let mut editor = PlacementEditor::new(config);
        editor.open_bytes(document, bytes).context("failed to open PDF")?;

        let mut session = Self { editor, now: Instant::now() };
        session.settle()?;
        Ok(session)
    }

    /// Run frames until the page is rendered and nothing is pending
    ///
    /// The clock advances one frame interval per frame, so debounced
    /// renders come due on their own.
    fn settle(&mut self) -> Result<()> {
        for _ in 0..MAX_SETTLE_FRAMES {
            let changes = self.editor.frame(self.now);
            self.now += FRAME_INTERVAL;
            match self.editor.state() {
                ViewerState::CannotRender(message) => anyhow::bail!("failed to render page: {message}"),
                ViewerState::Ready if !changes.any() && !self.editor.is_rendering() => return Ok(()),
                _ => {}
            }
        }
        anyhow::bail!("page did not finish rendering")
    }

    fn annotation_at(&self, index: usize) -> Result<AnnotationId> {
        self.editor
            .store()
            .iter()
            .nth(index)
            .map(|annotation| annotation.id())
            .with_context(|| format!("no signature at index {index}"))
    }
}

fn read_signatures(path: &Path) -> Result<Vec<Signature>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let signatures: Vec<Signature> = serde_json::from_str(&contents)
        .with_context(|| format!("invalid signatures JSON in {}", path.display()))?;
    Ok(signatures)
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_render_output(file: &Path) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-signed.png"))
}
