use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use auditrep_aws::{AuditManagerClient, AwsSession, AwsSettings, S3ObjectStorage, SnsNotifier, StaticCredentials};
use auditrep_core::{FilterCriteria, RunOutcome, RunSummary};
use auditrep_runner::{doctor, scenario, Config, RunRequest, Runner};
use auditrep_services::SystemClock;

#[derive(Parser)]
#[command(name = "auditrep", version, about = "Generate AWS Audit Manager assessment reports")]
struct Cli {
    /// Config file (defaults to ./auditrep.toml when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Associate evidence with a new assessment report and wait for it
    Generate {
        /// Name of the ACTIVE assessment
        #[arg(long)]
        name: String,
        /// Keep only automatically collected evidence
        #[arg(long)]
        exclude_manual: bool,
        /// Comma separated account ids to keep
        #[arg(long)]
        account_ids: Option<String>,
        /// Only process the most recent evidence folders
        #[arg(long)]
        latest_only: bool,
        /// SNS topic to publish the report URL to
        #[arg(long)]
        sns_topic: Option<String>,
        #[arg(long)]
        region: Option<String>,
    },

    /// Check credentials, region and Audit Manager account status
    Doctor {
        #[arg(long)]
        region: Option<String>,
    },

    /// Run the pipeline offline against a fixture scenario directory
    Simulate {
        #[arg(long)]
        scenario: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let cfg = Config::resolve(cli.config.as_deref(), &cwd)?;

    match cli.cmd {
        Command::Generate { name, exclude_manual, account_ids, latest_only, sns_topic, region } => {
            let req = RunRequest::new(name, FilterCriteria::from_args(account_ids.as_deref(), exclude_manual), latest_only)?;
            let session = AwsSession::connect(&settings(&cfg, region))?;
            let client = AuditManagerClient::new(&session);
            let objects = S3ObjectStorage::new(&session);
            let clock = SystemClock;
            let notifier = sns_topic.map(|arn| SnsNotifier::new(&session, arn));

            let mut runner = Runner::new(&cfg, &client, &objects, &clock);
            if let Some(n) = &notifier {
                runner = runner.with_notifier(n);
            }
            report(runner.run(&req)?)?;
        }
        Command::Doctor { region } => {
            let session = AwsSession::connect(&settings(&cfg, region))?;
            println!("Region: {}", session.region().unwrap_or("-"));
            doctor(&AuditManagerClient::new(&session))?;
            println!("OK");
        }
        Command::Simulate { scenario: dir } => {
            let res = scenario::simulate(&dir, &cfg)?;
            println!("Outcome: {}", res.outcome_label());
            match &res.outcome {
                Ok(outcome) => print_summary(outcome.summary()),
                Err(e) => println!("Error: {}", e),
            }
            if dir.join("expected.yaml").exists() {
                let exp = scenario::load_expected(&dir)?;
                let problems = scenario::check(&exp, &res);
                for p in &problems {
                    println!("MISMATCH {}", p);
                }
                if !problems.is_empty() {
                    bail!("scenario {} does not match expected.yaml", exp.scenario_id);
                }
                println!("Scenario {} matches expected.yaml", exp.scenario_id);
            }
        }
    }

    Ok(())
}

/// Config file values with the `--region` flag taking precedence.
fn settings(cfg: &Config, region: Option<String>) -> AwsSettings {
    let static_credentials = match (&cfg.aws.access_key_id, &cfg.aws.secret_access_key) {
        (Some(id), Some(secret)) => Some(StaticCredentials { access_key_id: id.clone(), secret_access_key: secret.clone() }),
        _ => None,
    };
    AwsSettings { region: region.or_else(|| cfg.aws.region.clone()), profile: cfg.aws.profile.clone(), static_credentials }
}

fn report(outcome: RunOutcome) -> anyhow::Result<()> {
    print_summary(outcome.summary());
    match outcome {
        RunOutcome::Complete { report_id, url, .. } => {
            info!(%report_id, "assessment report ready");
            println!("Report {} is ready", report_id);
            println!("{}", serde_json::to_string_pretty(&url).context("encode report url")?);
        }
        RunOutcome::Failed { report_id, .. } => {
            bail!("assessment report {} generation failed", report_id);
        }
        RunOutcome::TimedOut { report_id, .. } => {
            println!(
                "Report {} is still being generated; check Audit Manager or the assessment's S3 destination later",
                report_id
            );
        }
    }
    Ok(())
}

fn print_summary(s: &RunSummary) {
    println!("Folders processed: {}", s.folders_processed);
    println!("Folder associations: {}", s.folder_associations);
    println!("Batch association calls: {}", s.batch_calls);
    println!("Evidence associated: {}", s.evidence_associated);
    println!("Evidence exported: {}", s.evidence_exported);
    if let Some(loc) = &s.export {
        println!("Evidence CSV: s3://{}/{}", loc.bucket, loc.key);
    }
}
