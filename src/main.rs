use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use video_moderator::{AnalysisReport, ModeratorConfig, VideoAnalyzer};

#[derive(Parser, Debug)]
#[command(name = "video-moderator")]
#[command(version, about = "Tiered SAFE / REVIEW / UNSAFE moderation for a video clip", long_about = None)]
struct Cli {
    /// Video (or still image) to analyse
    video: PathBuf,
    /// Config file path
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the full report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Seconds between candidate frames
    #[arg(long)]
    interval: Option<f64>,
    /// Frame budget; longer clips may use more
    #[arg(long)]
    max_frames: Option<usize>,
}

fn load_config(cli: &Cli) -> Result<ModeratorConfig> {
    let mut config = ModeratorConfig::load(cli.config.as_deref()).map_err(|e| anyhow!(e))?;
    if let Some(interval) = cli.interval {
        if !(interval.is_finite() && interval > 0.0) {
            return Err(anyhow!("--interval must be positive, got {}", interval));
        }
        config.sample_interval_secs = interval;
    }
    if let Some(max_frames) = cli.max_frames {
        config.max_frames = max_frames.max(1);
    }
    Ok(config)
}

fn print_report(report: &AnalysisReport) {
    println!("Frames sampled : {}", report.frames_sampled);
    println!(
        "Fast filter    : suspicious={} motion={:.2} dark_ratio={:.2}",
        report.fast_filter.suspicious, report.fast_filter.motion_score, report.fast_filter.dark_ratio
    );
    println!("Intent score   : {:.3}", report.intent_score);
    println!("Audio risk     : {:.2}", report.signals.audio.audio_risk);
    for stage in &report.timings.stages {
        println!("  {:<12} {} ms", stage.stage, stage.elapsed_ms);
    }

    println!();
    println!("Policy scores:");
    for (kind, result) in report.risks.iter() {
        println!("  {:<20} {:.3}", kind.as_str(), result.score);
        for reason in &result.reasons {
            println!("    - {}", reason);
        }
    }

    println!();
    println!("================ FINAL RESULT ================");
    println!("DECISION : {}", report.decision);
    println!("MAX RISK : {:.2}", report.explanation.max_risk);
    println!(
        "CATEGORY : {}",
        report
            .explanation
            .category
            .map(|kind| kind.as_str())
            .unwrap_or("none")
    );
    for reason in &report.explanation.reasons {
        println!("REASON   : {}", reason);
    }
    println!("TIME     : {:.2} s", report.timings.total_ms as f64 / 1000.0);
    println!("==============================================");
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let analyzer = VideoAnalyzer::with_defaults(config);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, finishing with frames observed so far");
            ctrl_c.cancel();
        }
    });

    let report = analyzer
        .analyze(&cli.video, &cancel)
        .await
        .with_context(|| format!("failed to analyse {}", cli.video.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
