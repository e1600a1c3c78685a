mod protocol;

use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use facecrop_core::detection::domain::detector_tuning::TuningProfile;
use facecrop_core::detection::domain::face_detector::FaceDetector;
use facecrop_core::detection::infrastructure::model_resolver::{self, ModelLocations};
use facecrop_core::detection::infrastructure::rustface_detector::RustfaceDetector;
use facecrop_core::extraction::infrastructure::png_face_writer::PngFaceWriter;
use facecrop_core::pipeline::batch_executor::{BatchExecutor, SequentialBatchExecutor};
use facecrop_core::pipeline::check_face_use_case::CheckFaceUseCase;
use facecrop_core::pipeline::extract_faces_use_case::ExtractFacesUseCase;
use facecrop_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use facecrop_core::source::infrastructure::source_resolver::SourceResolver;

use protocol::{CheckJob, CheckResponse, ExtractJob, ExtractResponse, JobFailure, MODEL_UNAVAILABLE};

/// Face presence checks and face extraction as JSON jobs.
///
/// The job request is read from the positional argument, or from stdin
/// when it is omitted. The response is a single JSON object on stdout.
#[derive(Parser)]
#[command(name = "facecrop")]
struct Cli {
    /// Detection model file, tried before the built-in locations.
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Download the model from this URL if no local copy loads.
    #[arg(long, global = true)]
    model_url: Option<String>,

    /// Worker threads for batch extraction (0 = one per core).
    #[arg(long, global = true, default_value = "1")]
    workers: usize,

    /// Per-source timeout for remote images, in seconds.
    #[arg(long, global = true, default_value = "30")]
    timeout_secs: u64,

    /// Detector profile: strict or loose (default depends on the job).
    #[arg(long, global = true)]
    tuning: Option<TuningProfile>,

    /// Context margin around each extracted face, as a fraction of its width.
    #[arg(long, global = true, default_value = "0.1")]
    margin: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether one image contains a clear face.
    Check {
        /// JSON request: {"image_path", "min_face_size"?, "confidence_threshold"?}
        request: Option<String>,
    },
    /// Extract every clear face from a batch of images.
    Extract {
        /// JSON request: {"image_paths", "output_dir"?, "min_face_size"?, "confidence_threshold"?}
        request: Option<String>,
    },
}

impl Command {
    fn request(&self) -> Option<&str> {
        match self {
            Command::Check { request } | Command::Extract { request } => request.as_deref(),
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            log::error!("{e}");
            match serde_json::to_string(&JobFailure::new(e.as_ref())) {
                Ok(json) => println!("{json}"),
                Err(_) => println!(r#"{{"success":false,"message":"job failed"}}"#),
            }
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<String, Box<dyn std::error::Error>> {
    validate(cli)?;
    let raw = read_request(cli.command.request())?;

    match cli.command {
        Command::Check { .. } => run_check(cli, &raw),
        Command::Extract { .. } => run_extract(cli, &raw),
    }
}

fn run_check(cli: &Cli, raw: &str) -> Result<String, Box<dyn std::error::Error>> {
    let job: CheckJob = serde_json::from_str(raw)?;
    let request = match job.into_request() {
        Ok(request) => request,
        Err(response) => return to_json(&response),
    };

    let Some(detector) = build_detector(cli) else {
        return to_json(&CheckResponse::failure(MODEL_UNAVAILABLE));
    };

    let mut use_case = CheckFaceUseCase::new(Arc::new(build_loader(cli)?), detector);
    if let Some(profile) = cli.tuning {
        use_case = use_case.with_tuning(profile.tuning());
    }

    let report = use_case.execute(&request);
    log::info!("{}", report.message);
    to_json(&CheckResponse::from(report))
}

fn run_extract(cli: &Cli, raw: &str) -> Result<String, Box<dyn std::error::Error>> {
    let job: ExtractJob = serde_json::from_str(raw)?;
    let request = match job.into_request() {
        Ok(request) => request,
        Err(response) => return to_json(&response),
    };

    let Some(detector) = build_detector(cli) else {
        return to_json(&ExtractResponse::failure(MODEL_UNAVAILABLE));
    };

    let mut use_case = ExtractFacesUseCase::new(
        Arc::new(build_loader(cli)?),
        detector,
        Arc::new(PngFaceWriter::new()),
        build_executor(cli.workers),
    )
    .with_margin(cli.margin);
    if let Some(profile) = cli.tuning {
        use_case = use_case.with_tuning(profile.tuning());
    }

    let result = use_case.execute(&request);
    log::info!("{}", result.message());
    to_json(&ExtractResponse::from(&result))
}

/// Resolves the model once for the whole job. `None` means every
/// location failed, which the caller reports as a well-formed result.
fn build_detector(cli: &Cli) -> Option<Arc<dyn FaceDetector>> {
    let locations = ModelLocations {
        explicit: cli.model.clone(),
        download_url: cli.model_url.clone(),
    };
    match model_resolver::resolve(&locations) {
        Ok(model) => {
            log::info!("Using face detection model {}", model.origin().display());
            Some(Arc::new(RustfaceDetector::new(model)))
        }
        Err(e) => {
            log::error!("{e}");
            None
        }
    }
}

fn build_loader(cli: &Cli) -> Result<SourceResolver, Box<dyn std::error::Error>> {
    Ok(SourceResolver::new(Duration::from_secs(cli.timeout_secs))?)
}

fn build_executor(workers: usize) -> Box<dyn BatchExecutor> {
    if workers == 1 {
        Box::new(SequentialBatchExecutor::new())
    } else {
        Box::new(ThreadedBatchExecutor::new(workers))
    }
}

fn read_request(arg: Option<&str>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(raw) = arg {
        return Ok(raw.to_string());
    }
    let mut raw = String::new();
    std::io::stdin().read_to_string(&mut raw)?;
    Ok(raw)
}

fn to_json<T: Serialize>(response: &T) -> Result<String, Box<dyn std::error::Error>> {
    Ok(serde_json::to_string(response)?)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.timeout_secs == 0 {
        return Err("--timeout-secs must be positive".into());
    }
    if !(0.0..=1.0).contains(&cli.margin) {
        return Err(format!("Margin must be between 0.0 and 1.0, got {}", cli.margin).into());
    }
    Ok(())
}
