use std::{
    fmt,
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::atomic::{AtomicUsize, Ordering},
};

use clap::{Parser, ValueEnum};
use num_traits::AsPrimitive;
use string_weave::{
    cache, layout, score, solver, target,
    verboser::{Message, Verboser},
    ChordCache, ChordTable, Evaluator, Float, Layout, Ramp, Score, Solver, Step, Target,
};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input image path.
    #[arg()]
    input: PathBuf,

    /// Number of pegs around the circle.
    #[arg(short, long, default_value_t = 300)]
    pegs: usize,

    /// Distance to darkness function.
    #[arg(short, long, default_value_t = ScoreKind::Ramp)]
    score: ScoreKind,

    /// Score parameters, `x1,y1` for step and `x1,y1,x2,y2` for ramp.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    params: Vec<f64>,

    /// Directory where evaluated chord tables are kept between runs.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Output directory, `output` next to the input by default.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Precision of calculations (Single/Double).
    #[arg(long, default_value_t = Precision::Double)]
    precision: Precision,

    /// Also write an svg drawing of the walk.
    #[arg(long)]
    svg: bool,

    /// Also write a G-code program for the winding machine.
    #[arg(long)]
    gcode: bool,

    /// Write the influence map of every chord leaving this peg as png.
    #[arg(long)]
    dump_chords: Option<usize>,
}

#[derive(Clone, Copy, Debug)]
enum ScoreKind {
    Step,
    Ramp,
}

impl ValueEnum for ScoreKind {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Step, Self::Ramp]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Step => clap::builder::PossibleValue::new("Step").alias("step"),
            Self::Ramp => clap::builder::PossibleValue::new("Ramp").alias("ramp"),
        })
    }
}

impl fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step => f.write_str("Step"),
            Self::Ramp => f.write_str("Ramp"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Precision {
    Single,
    Double,
}

impl ValueEnum for Precision {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Single, Self::Double]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Single => clap::builder::PossibleValue::new("Single")
                .alias("single")
                .alias("f32"),
            Self::Double => clap::builder::PossibleValue::new("Double")
                .alias("double")
                .alias("f64"),
        })
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single => f.write_str("Single"),
            Self::Double => f.write_str("Double"),
        }
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{kind} score takes {expected} parameters, got {found}")]
    ParamCount {
        kind: ScoreKind,
        expected: usize,
        found: usize,
    },
    #[error("Peg {peg} does not exist, the layout has {pegs} pegs")]
    UnknownPeg { peg: usize, pegs: usize },
    #[error("Invalid input file name [{0}]")]
    InputName(PathBuf),
    #[error(transparent)]
    Score(#[from] score::Error),
    #[error(transparent)]
    Target(#[from] target::Error),
    #[error(transparent)]
    Layout(#[from] layout::Error),
    #[error(transparent)]
    Cache(#[from] cache::Error),
    #[error(transparent)]
    Solver(#[from] solver::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Plain progress lines on stderr.
struct Progress {
    percent: AtomicUsize,
}

impl Progress {
    fn new() -> Self {
        Self {
            percent: AtomicUsize::new(usize::MAX),
        }
    }
}

impl Verboser for Progress {
    fn verbose(&self, message: Message<'_>) {
        match message {
            Message::CachingPegs(count) => eprintln!("Placing {count} pegs"),
            Message::Evaluating { done, total } => {
                let percent = done * 100 / total.max(1);
                if self.percent.swap(percent, Ordering::Relaxed) != percent {
                    eprint!("\rEvaluating chords {percent}%");
                    if done == total {
                        eprintln!();
                    }
                }
            }
            Message::LoadingCache(path) => eprintln!("Loading chords from {}", path.display()),
            Message::StoringCache(path) => eprintln!("Storing chords to {}", path.display()),
            Message::Solving { step, peg } => eprint!("\r{step} ({peg})"),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();
    let result = match args.precision {
        Precision::Single => with_precision::<f32>(&args),
        Precision::Double => with_precision::<f64>(&args),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn with_precision<T: Float>(args: &Args) -> Result<(), CliError>
where
    f64: AsPrimitive<T>,
    u8: AsPrimitive<T>,
    usize: AsPrimitive<T>,
{
    let params: Vec<T> = args.params.iter().map(|param| param.as_()).collect();
    match args.score {
        ScoreKind::Step => {
            let score = match params[..] {
                [] => Step::default(),
                [x1, y1] => Step::new(x1, y1)?,
                _ => return Err(param_count(args.score, 2, params.len())),
            };
            with_score(args, score)
        }
        ScoreKind::Ramp => {
            let score = match params[..] {
                [] => Ramp::default(),
                [x1, y1, x2, y2] => Ramp::new(x1, y1, x2, y2)?,
                _ => return Err(param_count(args.score, 4, params.len())),
            };
            with_score(args, score)
        }
    }
}

fn param_count(kind: ScoreKind, expected: usize, found: usize) -> CliError {
    CliError::ParamCount {
        kind,
        expected,
        found,
    }
}

fn with_score<T: Float, S: Score<T>>(args: &Args, score: S) -> Result<(), CliError>
where
    usize: AsPrimitive<T>,
{
    let progress = Progress::new();
    let target = Target::open(&args.input)?;
    let layout = Layout::new(target.radius(), args.pegs)?;
    log::info!(
        "Solving [{}] with radius {} and {} pegs, score {}",
        args.input.display(),
        layout.radius(),
        layout.pegs(),
        score.key()
    );

    let table = match &args.cache_dir {
        Some(dir) => ChordCache::new(dir).load_or_evaluate::<T, _>(layout, &score, &progress)?,
        None => Evaluator::<_, T>::new(layout, &score, &progress).evaluate(&progress),
    };

    let file_name = args
        .input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| CliError::InputName(args.input.clone()))?;
    let out_folder = match &args.output {
        Some(dir) => dir.clone(),
        None => args
            .input
            .parent()
            .unwrap_or(Path::new("."))
            .join("output"),
    };
    fs::create_dir_all(&out_folder)?;

    if let Some(peg) = args.dump_chords {
        dump_chords(&table, peg, &out_folder.join(format!("{file_name}_chords")))?;
    }

    let solution = Solver::new(&table, &target)?.solve(&progress);
    eprintln!();
    eprintln!("Solved with {} strings", solution.chords());

    fs::write(
        out_folder.join(format!("{file_name}.pins")),
        solution.build_instructions(),
    )?;
    solution
        .build_image()
        .save(out_folder.join(format!("{file_name}-exact.png")))?;
    if args.svg {
        svg::save(
            out_folder.join(format!("{file_name}.svg")),
            &solution.build_svg(0.5),
        )?;
    }
    if args.gcode {
        fs::write(
            out_folder.join(format!("{file_name}.gcode")),
            solution.build_gcode(),
        )?;
    }
    log::info!("Results written to [{}]", out_folder.display());
    Ok(())
}

fn dump_chords(table: &ChordTable, peg: usize, dir: &Path) -> Result<(), CliError> {
    let pegs = table.layout().pegs();
    if peg >= pegs {
        return Err(CliError::UnknownPeg { peg, pegs });
    }
    fs::create_dir_all(dir)?;
    for other in (0..pegs).filter(|&other| other != peg) {
        if let Some(image) = table.render(peg, other) {
            image.save(dir.join(format!("{peg}_{other}.png")))?;
        }
    }
    log::info!("Dumped {} chords to [{}]", pegs - 1, dir.display());
    Ok(())
}
