use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use ndarray::prelude::*;
use ndarray_npy::WriteNpyExt;
use rayon::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use snack_track::{
    audio, cancellable_gateway_for, snack_formants, snack_pitch, CancelToken, EstimatorGateway,
    FormantParams, PitchParams, SnackConfig, SnackMethod,
};

/// Exit code after SIGINT or SIGTERM, as shells report it.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// directory for the .npy results.
    #[clap(short, long, global = true, default_value = ".")]
    output_dir: PathBuf,

    #[clap(flatten)]
    toolkit: ToolkitArgs,
}

#[derive(Subcommand)]
enum Command {
    /// F0 and voicing, saved as a (2, data_len) array.
    Pitch {
        /// input wav files.
        #[clap(required = true)]
        inputs: Vec<PathBuf>,

        /// frame shift in milliseconds.
        #[clap(long, default_value_t = 1.)]
        frame_shift: f64,

        /// window size in milliseconds.
        #[clap(long, default_value_t = 25.)]
        window_size: f64,

        /// maximum F0 in Hz.
        #[clap(long, default_value_t = 500.)]
        max_pitch: f64,

        /// minimum F0 in Hz.
        #[clap(long, default_value_t = 40.)]
        min_pitch: f64,
    },
    /// sF1..sF4 and sB1..sB4, saved as a (8, data_len) array.
    Formant {
        /// input wav files.
        #[clap(required = true)]
        inputs: Vec<PathBuf>,

        /// frame shift in milliseconds.
        #[clap(long, default_value_t = 1.)]
        frame_shift: f64,

        /// window size in milliseconds.
        #[clap(long, default_value_t = 25.)]
        window_size: f64,

        /// pre-emphasis factor.
        #[clap(long, default_value_t = 0.96)]
        pre_emphasis: f64,

        /// LPC order.
        #[clap(long, default_value_t = 12)]
        lpc_order: usize,
    },
}

/// Overrides of the SNACK_* environment variables.
#[derive(Args)]
struct ToolkitArgs {
    /// how to call Snack: exe, tcl or embedded.
    #[clap(short, long, global = true)]
    method: Option<SnackMethod>,

    /// command starting the Tcl shell.
    #[clap(long, global = true)]
    tcl_shell: Option<String>,

    /// directory holding the Snack library.
    #[clap(long, global = true)]
    snack_lib_path: Option<PathBuf>,

    /// path of snack.exe.
    #[clap(long, global = true)]
    exe_path: Option<PathBuf>,

    /// run Snack on a private copy of each input.
    #[clap(long, global = true)]
    isolate: bool,
}

impl ToolkitArgs {
    fn apply(self, config: &mut SnackConfig) {
        if let Some(method) = self.method {
            config.method = method;
        }
        if let Some(shell) = self.tcl_shell {
            config.tcl_shell_cmd = shell;
        }
        if self.snack_lib_path.is_some() {
            config.snack_lib_path = self.snack_lib_path;
        }
        if let Some(exe_path) = self.exe_path {
            config.exe_path = exe_path;
        }
        config.isolate |= self.isolate;
    }
}

enum Job {
    Pitch(PitchParams),
    Formant(FormantParams),
}

impl Job {
    fn frame_shift(&self) -> f64 {
        match self {
            Job::Pitch(params) => params.frame_shift,
            Job::Formant(params) => params.frame_shift,
        }
    }

    fn suffix(&self) -> &'static str {
        match self {
            Job::Pitch(_) => "pitch",
            Job::Formant(_) => "formant",
        }
    }

    fn analyse(&self, gateway: &dyn EstimatorGateway, wav: &Path) -> anyhow::Result<Array2<f64>> {
        let info = audio::probe(wav)?;
        let data_len = info.data_len(self.frame_shift());
        let result = match self {
            Job::Pitch(params) => snack_pitch(gateway, wav, data_len, params)?.to_array()?,
            Job::Formant(params) => snack_formants(gateway, wav, data_len, params)?.to_array()?,
        };
        Ok(result)
    }

    fn run(
        &self,
        gateway: &dyn EstimatorGateway,
        wav: &Path,
        output_dir: &Path,
    ) -> anyhow::Result<PathBuf> {
        let result = self.analyse(gateway, wav)?;
        let stem = wav
            .file_stem()
            .with_context(|| format!("{} has no file name", wav.display()))?;
        let mut out_name = stem.to_os_string();
        out_name.push(format!(".{}.npy", self.suffix()));
        let out_path = output_dir.join(out_name);

        let writer = io::BufWriter::new(
            File::create(&out_path)
                .with_context(|| format!("could not create {}", out_path.display()))?,
        );
        result
            .write_npy(writer)
            .with_context(|| format!("failed to write {}", out_path.display()))?;
        Ok(out_path)
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "snack_track=info".into()))
        .with(fmt::layer().with_writer(io::stderr))
        .init();

    match try_main() {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = SnackConfig::from_env()?;
    cli.toolkit.apply(&mut config);

    // Running Snack processes are killed on interrupt, so their scratch files
    // are removed before exit.
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel())
            .context("could not install the interrupt handler")?;
    }
    let gateway = cancellable_gateway_for(&config, &cancel)?;

    let (job, inputs) = match cli.command {
        Command::Pitch {
            inputs,
            frame_shift,
            window_size,
            max_pitch,
            min_pitch,
        } => {
            let params = PitchParams {
                frame_shift,
                window_size,
                max_pitch,
                min_pitch,
            };
            params.validate()?;
            (Job::Pitch(params), inputs)
        }
        Command::Formant {
            inputs,
            frame_shift,
            window_size,
            pre_emphasis,
            lpc_order,
        } => {
            let params = FormantParams {
                frame_shift,
                window_size,
                pre_emphasis,
                lpc_order,
            };
            params.validate()?;
            (Job::Formant(params), inputs)
        }
    };
    fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("could not create {}", cli.output_dir.display()))?;

    let inputs: BTreeSet<_> = inputs.into_iter().collect();
    let n_failed = inputs
        .par_iter()
        .filter(|wav| {
            if cancel.is_cancelled() {
                return true;
            }
            match job.run(gateway.as_ref(), wav, &cli.output_dir) {
                Ok(out_path) => {
                    info!(input = %wav.display(), output = %out_path.display(), "done");
                    false
                }
                Err(e) => {
                    error!(input = %wav.display(), "{e:#}");
                    true
                }
            }
        })
        .count();

    if cancel.is_cancelled() {
        warn!("interrupted, {n_failed} of {} files not processed", inputs.len());
        return Ok(ExitCode::from(EXIT_INTERRUPTED));
    }
    if n_failed > 0 {
        error!("{n_failed} of {} files failed", inputs.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
