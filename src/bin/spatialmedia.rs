use anyhow::Context;
use clap::Parser;
use spatialmedia::{Crop, Metadata, SpatialAudioMetadata, StereoMode, Summary, inject_metadata, read_metadata, spherical};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const EXIT_FAILED: u8 = 1;
const EXIT_NO_INPUT: u8 = 3;
const EXIT_NO_OUTPUT: u8 = 4;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Spherical video and spatial audio metadata for MP4/MOV files",
    long_about = "By default prints out spatial media metadata from the input file.\n\
                  With --inject, writes a copy of the input carrying new metadata to the output file.\n\
                  Spherical video RFC: https://github.com/google/spatial-media/blob/master/docs/spherical-video-rfc.md"
)]
struct Args {
    /// Inject spatial media metadata into the input file (.mp4 or .mov) and save the result to the output file
    #[arg(short = 'j', long)]
    inject: bool,

    /// Input file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file, required with --inject
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stereo mode: none (mono frame), top-bottom (left eye on top) or left-right (left eye on the left)
    #[arg(short, long, default_value = "none", help_heading = "Spherical Video")]
    stereo: StereoMode,

    /// Crop region as "w:h:f_w:f_h:x:y": CroppedAreaImageWidthPixels, CroppedAreaImageHeightPixels,
    /// FullPanoWidthPixels, FullPanoHeightPixels, CroppedAreaLeftPixels, CroppedAreaTopPixels
    #[arg(short, long, help_heading = "Spherical Video")]
    crop: Option<Crop>,

    /// First-order periphonic ambisonics with ACN channel ordering and SN3D normalization.
    /// The file must contain a 4-channel audio track laid out that way.
    #[arg(short = 'a', long, help_heading = "Spatial Audio")]
    spatial_audio: bool,

    /// Print the metadata report as JSON
    #[arg(long)]
    json: bool,

    /// Debug logging on stderr (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let Some(input) = args.input.as_deref() else {
        eprintln!("Please provide an input file.");
        return ExitCode::from(EXIT_NO_INPUT);
    };

    let result = if args.inject {
        let Some(output) = args.output.as_deref() else {
            eprintln!("Injecting metadata requires both input and output file.");
            return ExitCode::from(EXIT_NO_OUTPUT);
        };
        run_inject(&args, input, output)
    } else {
        run_report(input, args.json)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(EXIT_FAILED)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose { "spatialmedia=debug" } else { "spatialmedia=info" }.to_string()
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_inject(args: &Args, input: &Path, output: &Path) -> anyhow::Result<()> {
    // An all-zero crop means full frame.
    let crop = args.crop.filter(|c| !c.is_empty());
    let xml = spherical::encode(args.stereo, crop).context("Failed to generate metadata")?;

    let mut metadata = Metadata::new(xml).context("Failed to generate metadata")?;
    if args.spatial_audio {
        metadata = metadata.with_audio(SpatialAudioMetadata::default());
    }

    inject_metadata(input, output, &metadata)
        .with_context(|| format!("Could not inject metadata into {}", output.display()))?;
    println!("Saved file with spatial media metadata to {}", output.display());
    Ok(())
}

fn run_report(input: &Path, json: bool) -> anyhow::Result<()> {
    let summary = read_metadata(input).with_context(|| format!("Could not read {}", input.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_human(input, &summary);
    }
    if summary.has_errors() {
        anyhow::bail!("{} carries metadata that could not be decoded", input.display());
    }
    Ok(())
}

fn print_human(path: &Path, summary: &Summary) {
    println!("Processing: {}", path.display());

    match &summary.spherical {
        Some(m) => {
            println!("Spherical video metadata:");
            println!("  Spherical: {}", m.spherical);
            println!("  Stitched: {}", m.stitched);
            if let Some(sw) = &m.stitching_software {
                println!("  StitchingSoftware: {sw}");
            }
            println!("  ProjectionType: {}", m.projection_type);
            println!("  StereoMode: {}", m.stereo_mode);
            if let Some(c) = &m.crop {
                println!("  CroppedAreaImageWidthPixels: {}", c.width);
                println!("  CroppedAreaImageHeightPixels: {}", c.height);
                println!("  FullPanoWidthPixels: {}", c.full_width);
                println!("  FullPanoHeightPixels: {}", c.full_height);
                println!("  CroppedAreaLeftPixels: {}", c.left);
                println!("  CroppedAreaTopPixels: {}", c.top);
            }
        }
        None => match &summary.spherical_error {
            Some(e) => println!("Spherical video metadata present but unreadable: {e}"),
            None => println!("No spherical metadata found"),
        },
    }

    match &summary.spatial_audio {
        Some(a) => {
            println!("Spatial audio metadata:");
            println!("  Ambisonic type: {:?}", a.ambisonic_type);
            println!("  Ambisonic order: {}", a.order);
            println!("  Channel ordering: {:?}", a.channel_ordering);
            println!("  Normalization: {:?}", a.normalization);
            println!("  Channel map: {:?}", a.channel_map);
        }
        None => match &summary.spatial_audio_error {
            Some(e) => println!("Spatial audio metadata present but unreadable: {e}"),
            None => println!("No spatial audio metadata found"),
        },
    }
}
