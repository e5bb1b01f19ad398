use std::{fs, path::PathBuf};

use anyhow::Context;
use chart_loader::ParseSettings;
use chart_schema::{Difficulty, FiveFretGuitarFret, Instrument, InstrumentDifficulty, SongChart};
use clap::{Args, Parser, Subcommand, ValueEnum};
use judge_engine::EnginePreset;

mod inspect;
mod simulate;

#[derive(Debug, Parser)]
#[command(name = "chart")]
#[command(about = "Rhythm game chart tools", long_about = None)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a JSON summary of a chart; `-o` writes the full normalized song
    Inspect {
        #[command(flatten)]
        load: LoadArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Reduce a five fret difficulty and print it as JSON
    Downsample {
        #[command(flatten)]
        load: LoadArgs,
        #[arg(short, long, value_enum, default_value_t = InstrumentArg::Guitar)]
        instrument: InstrumentArg,
        #[arg(long, value_enum, default_value_t = TargetArg::Hard)]
        to: TargetArg,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Play a difficulty with the bot and report the result
    Simulate {
        #[command(flatten)]
        load: LoadArgs,
        #[arg(short, long, value_enum, default_value_t = InstrumentArg::Guitar)]
        instrument: InstrumentArg,
        #[arg(short, long, value_enum, default_value_t = DifficultyArg::Expert)]
        difficulty: DifficultyArg,
        /// Preset name (default, casual, precision) or path to a preset JSON file
        #[arg(short, long, default_value = "default")]
        preset: String,
        /// Feed perfectly timed inputs from an input thread instead of running the bot
        #[arg(long)]
        autoplay: bool,
    },
}

#[derive(Debug, Args)]
struct LoadArgs {
    /// `.chart` or `.mid` notes file
    input: PathBuf,
    /// Natural HOPO distance in ticks
    #[arg(long)]
    hopo_threshold: Option<u32>,
    /// Sustains shorter than this many ticks are dropped
    #[arg(long)]
    sustain_cutoff: Option<u32>,
    /// Keep absent difficulties absent instead of generating them
    #[arg(long)]
    no_generate: bool,
}

impl LoadArgs {
    fn settings(&self) -> ParseSettings {
        ParseSettings {
            hopo_threshold: self.hopo_threshold,
            sustain_cutoff_threshold: self.sustain_cutoff,
            generate_missing_difficulties: !self.no_generate,
            ..ParseSettings::default()
        }
    }

    fn load(&self) -> anyhow::Result<SongChart> {
        chart_loader::load_file(&self.input, &self.settings())
            .map_err(|e| anyhow::anyhow!(e.to_string()))
            .with_context(|| format!("load failed: {}", self.input.display()))
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum InstrumentArg {
    Guitar,
    Coop,
    Rhythm,
    Bass,
    Keys,
    Drums,
}

impl From<InstrumentArg> for Instrument {
    fn from(arg: InstrumentArg) -> Self {
        match arg {
            InstrumentArg::Guitar => Instrument::FiveFretGuitar,
            InstrumentArg::Coop => Instrument::FiveFretCoopGuitar,
            InstrumentArg::Rhythm => Instrument::FiveFretRhythm,
            InstrumentArg::Bass => Instrument::FiveFretBass,
            InstrumentArg::Keys => Instrument::Keys,
            InstrumentArg::Drums => Instrument::Drums,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
    Expert,
    ExpertPlus,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Difficulty::Easy,
            DifficultyArg::Medium => Difficulty::Medium,
            DifficultyArg::Hard => Difficulty::Hard,
            DifficultyArg::Expert => Difficulty::Expert,
            DifficultyArg::ExpertPlus => Difficulty::ExpertPlus,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum TargetArg {
    Hard,
    Medium,
    Easy,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Inspect { load, output } => {
            let song = load.load()?;
            let summary = inspect::summarize(&song);
            println!("{}", serde_json::to_string_pretty(&summary).context("failed to serialize summary")?);

            if let Some(out_path) = output {
                let json = serde_json::to_string_pretty(&song).context("failed to serialize song")?;
                fs::write(&out_path, json).with_context(|| format!("failed to write: {}", out_path.display()))?;
            }
        }
        Command::Downsample {
            load,
            instrument,
            to,
            output,
        } => {
            let song = load.load()?;
            let instrument = Instrument::from(instrument);
            let expert = song
                .five_fret
                .get(&instrument)
                .and_then(|track| track.get(Difficulty::Expert))
                .with_context(|| format!("no expert {instrument:?} track in {}", load.input.display()))?;

            let reduced = downsample(expert, &song, to);
            log::info!(
                "downsampled {} expert chords to {} {:?} chords",
                expert.chord_count(),
                reduced.chord_count(),
                to
            );

            let json = serde_json::to_string_pretty(&reduced).context("failed to serialize difficulty")?;
            match output {
                Some(out_path) => {
                    fs::write(&out_path, json).with_context(|| format!("failed to write: {}", out_path.display()))?
                }
                None => println!("{json}"),
            }
        }
        Command::Simulate {
            load,
            instrument,
            difficulty,
            preset,
            autoplay,
        } => {
            let song = load.load()?;
            let preset = resolve_preset(&preset)?;
            simulate::run_simulation(&song, instrument.into(), difficulty.into(), &preset, autoplay)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn downsample(
    expert: &InstrumentDifficulty<FiveFretGuitarFret>,
    song: &SongChart,
    to: TargetArg,
) -> InstrumentDifficulty<FiveFretGuitarFret> {
    let hard = chart_loader::downsample_expert_to_hard(expert, &song.sync);
    if to == TargetArg::Hard {
        return hard;
    }
    let medium = chart_loader::downsample_hard_to_medium(&hard, &song.sync);
    if to == TargetArg::Medium {
        return medium;
    }
    chart_loader::downsample_medium_to_easy(&medium, &song.sync)
}

fn resolve_preset(preset: &str) -> anyhow::Result<EnginePreset> {
    if let Some(preset) = EnginePreset::by_name(preset) {
        return Ok(preset);
    }
    EnginePreset::load(preset)
        .map_err(|e| anyhow::anyhow!(e.to_string()))
        .with_context(|| format!("failed to load preset: {preset}"))
}
