use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use textmorph::{
    CarryMode, CommandTranslator, Ease, FfmpegMuxer, ModelVariant, NoopTranslator, NullMuxer,
    Pipeline, ReferenceBackend, Resolution, RunConfig, SpectralGenerator, Translator, VideoMuxer,
};

#[derive(Parser, Debug)]
#[command(name = "textmorph", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Optimize one image per phrase and render the looping transition video.
    Run(RunArgs),
    /// Re-render the transition video of a finished run from its manifest.
    Interpolate(InterpolateArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Phrase file, one phrase per line (`#` comments and blank lines skipped).
    #[arg(short = 't', long = "in-txt")]
    in_txt: PathBuf,

    /// JSON run configuration used as the base; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Phrase whose similarity is subtracted from the loss.
    #[arg(long = "in-txt0")]
    anti_text: Option<String>,

    /// Output directory [default: _out].
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Output size as W-H, or a single value for a square [default: 1280-720].
    #[arg(short, long)]
    size: Option<Resolution>,

    /// Parameter snapshot to start the first phrase from.
    #[arg(short, long)]
    resume: Option<PathBuf>,

    /// Final video length in seconds [default: 180].
    #[arg(short, long)]
    length: Option<u32>,

    /// Export a preview frame every this many steps [default: 1].
    #[arg(long)]
    fstep: Option<u32>,

    /// Translate phrases before encoding.
    #[arg(long)]
    translate: bool,

    /// Translation command; the target language is appended as the last argument.
    #[arg(long, default_value = "trans -b")]
    translate_cmd: String,

    /// Target language for --translate [default: en].
    #[arg(long)]
    target_lang: Option<String>,

    /// Keep the scratch checkpoint after the run.
    #[arg(long)]
    save_checkpoints: bool,

    /// Video frame rate [default: 25].
    #[arg(long)]
    fps: Option<u32>,

    /// Only log warnings and errors.
    #[arg(short, long)]
    quiet: bool,

    /// Encoder variant: ViT-B/32, RN50, RN50x4 or RN101 [default: ViT-B/32].
    #[arg(short, long)]
    model: Option<ModelVariant>,

    /// Optimizer steps per phrase [default: 200].
    #[arg(long)]
    steps: Option<u32>,

    /// Augmented views per step, before variant scaling [default: 200].
    #[arg(long)]
    samples: Option<usize>,

    /// Learning rate [default: 0.05].
    #[arg(long)]
    lrate: Option<f32>,

    /// Let crops extend past the frame edge.
    #[arg(long)]
    overscan: bool,

    /// Carry-over between phrases: none, all or last [default: none].
    #[arg(long)]
    keep: Option<CarryMode>,

    /// Contrast of exported previews [default: 1.0].
    #[arg(long)]
    contrast: Option<f32>,

    /// Per-step noise scale; 0 disables noise [default: 0.02].
    #[arg(long)]
    noise: Option<f32>,

    /// RNG seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Transition easing: sine or linear [default: sine].
    #[arg(long)]
    ease: Option<Ease>,

    /// Write frames only; do not invoke ffmpeg.
    #[arg(long)]
    skip_video: bool,
}

#[derive(Parser, Debug)]
struct InterpolateArgs {
    /// Work directory of a finished run (holds manifest.json).
    #[arg(long)]
    work_dir: PathBuf,

    /// Override the video length in seconds.
    #[arg(short, long)]
    length: Option<u32>,

    /// Override the frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Override the transition easing.
    #[arg(long)]
    ease: Option<Ease>,

    #[arg(long)]
    skip_video: bool,

    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Interpolate(args) => cmd_interpolate(args),
    }
}

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "textmorph=info" } else { "textmorph=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_target(false)
        .init();
    Ok(())
}

fn read_config_json(path: &Path) -> anyhow::Result<RunConfig> {
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let cfg: RunConfig =
        serde_json::from_reader(BufReader::new(f)).with_context(|| "parse config JSON")?;
    Ok(cfg)
}

fn make_muxer(skip_video: bool) -> Box<dyn VideoMuxer> {
    if skip_video {
        return Box::new(NullMuxer);
    }
    if !textmorph::is_ffmpeg_on_path() {
        tracing::warn!("ffmpeg not found on PATH; videos will not be written");
    }
    Box::new(FfmpegMuxer::default())
}

fn resolve_config(args: RunArgs) -> anyhow::Result<(RunConfig, String)> {
    let mut cfg = match &args.config {
        Some(path) => read_config_json(path)?,
        None => RunConfig::default(),
    };
    cfg.in_txt = args.in_txt;
    if let Some(v) = args.anti_text {
        cfg.anti_text = Some(v);
    }
    if let Some(v) = args.out_dir {
        cfg.out_dir = v;
    }
    if let Some(v) = args.size {
        cfg.size = v;
    }
    if let Some(v) = args.resume {
        cfg.resume = Some(v);
    }
    if let Some(v) = args.length {
        cfg.length = v;
    }
    if let Some(v) = args.fstep {
        cfg.fstep = v;
    }
    if let Some(v) = args.target_lang {
        cfg.target_lang = v;
    }
    if let Some(v) = args.fps {
        cfg.fps = v;
    }
    if let Some(v) = args.model {
        cfg.model = v;
    }
    if let Some(v) = args.steps {
        cfg.steps = v;
    }
    if let Some(v) = args.samples {
        cfg.samples = v;
    }
    if let Some(v) = args.lrate {
        cfg.lrate = v;
    }
    if let Some(v) = args.keep {
        cfg.keep = v;
    }
    if let Some(v) = args.contrast {
        cfg.contrast = v;
    }
    if let Some(v) = args.noise {
        cfg.noise = v;
    }
    if let Some(v) = args.seed {
        cfg.seed = Some(v);
    }
    if let Some(v) = args.ease {
        cfg.ease = v;
    }
    cfg.translate |= args.translate;
    cfg.save_checkpoints |= args.save_checkpoints;
    cfg.overscan |= args.overscan;
    cfg.skip_video |= args.skip_video;
    if args.quiet {
        cfg.verbose = false;
    }
    cfg.validate()?;
    Ok((cfg, args.translate_cmd))
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let (cfg, translate_cmd) = resolve_config(args)?;
    init_logging(cfg.verbose)?;

    let translator: Box<dyn Translator> = if cfg.translate {
        Box::new(CommandTranslator::from_command_line(&translate_cmd)?)
    } else {
        Box::new(NoopTranslator)
    };
    let muxer = make_muxer(cfg.skip_video);
    let mut backend = ReferenceBackend::new(cfg.model)?;

    let summary = Pipeline::new(&cfg, &mut backend, translator.as_ref(), muxer.as_ref()).run()?;
    println!(
        "wrote {} phrases and {} transition frames to {}",
        summary.phrases.len(),
        summary.final_frames,
        summary.work_dir.display()
    );
    if !cfg.skip_video {
        println!("final video: {}", summary.final_video.display());
    }
    Ok(())
}

fn cmd_interpolate(args: InterpolateArgs) -> anyhow::Result<()> {
    init_logging(!args.quiet)?;
    let muxer = make_muxer(args.skip_video);
    // Snapshots are generator parameters; no encoder is needed to render them.
    let generator = SpectralGenerator::default();

    let frames = textmorph::interpolate_from_manifest(&args.work_dir, &generator, muxer.as_ref(), |m| {
        if let Some(v) = args.length {
            m.length = v;
        }
        if let Some(v) = args.fps {
            m.fps = v;
        }
        if let Some(v) = args.ease {
            m.ease = v;
        }
    })?;
    println!("wrote {frames} transition frames to {}", args.work_dir.join("_final").display());
    Ok(())
}
