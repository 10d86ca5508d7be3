use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use squadrs::config::AnalyticsConfig;
use squadrs::input::{parse_date, read_json, read_optional_list, write_json};
use squadrs::logging::{init_logging, LogLevel};
use squadrs::models::{AthleteProfile, MedicalRestriction, RawAthlete, ReadinessSnapshot, WorkloadSession};
use squadrs::performance::PerformanceObservation;
use squadrs::error::ErrorSeverity;
use squadrs::{AlertSeverity, RiskStatus, SquadRsError, WorkloadAnalytics};

/// SquadRS - Athlete Workload & Grouping CLI
///
/// Builds athlete profiles, clusters squads into training groups and tracks
/// workload risk (ACWR, EWMA, recovery and fatigue alerts).
#[derive(Parser)]
#[command(name = "squadrs")]
#[command(author = "SquadRS Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Athlete workload analytics and training group planner", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build athlete profiles from a roster
    Profiles {
        #[command(flatten)]
        roster: RosterArgs,
    },

    /// Cluster athletes into similar groups
    Cluster {
        #[command(flatten)]
        roster: RosterArgs,

        /// Maximum number of clusters (defaults to the configured value)
        #[arg(short)]
        k: Option<usize>,

        /// Seed for reproducible results
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Distribute athletes across training sessions
    Distribute {
        #[command(flatten)]
        roster: RosterArgs,

        /// Strategy (balanced, fitness-based, position-based, recovery-focused)
        #[arg(short = 't', long, default_value = "balanced")]
        strategy: String,

        /// Number of sessions
        #[arg(short = 'n', long, default_value = "2")]
        sessions: usize,

        /// Seed for reproducible results
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Workload risk report (ACWR, EWMA, recovery, alerts)
    Risk {
        /// Workload sessions (JSON list)
        #[arg(short, long)]
        sessions: PathBuf,

        /// Roster used for recovery capacity and restrictions
        #[arg(long)]
        athletes: Option<PathBuf>,

        /// Performance observations (JSON list)
        #[arg(long)]
        performance: Option<PathBuf>,

        /// Only report this athlete
        #[arg(short, long)]
        athlete: Option<String>,

        /// Reference date (YYYY-MM-DD), defaults to each athlete's newest session
        #[arg(short, long)]
        date: Option<String>,
    },
}

#[derive(clap::Args)]
struct RosterArgs {
    /// Athlete roster (JSON list)
    #[arg(short, long)]
    athletes: PathBuf,

    /// Readiness snapshots (JSON list)
    #[arg(short, long)]
    readiness: Option<PathBuf>,

    /// Medical restrictions (JSON list)
    #[arg(long)]
    restrictions: Option<PathBuf>,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Fitness")]
    fitness: String,
    #[tabled(rename = "Risk")]
    injury_risk: String,
    #[tabled(rename = "Load")]
    current_load: String,
    #[tabled(rename = "Fatigue")]
    fatigue: String,
    #[tabled(rename = "Avail.")]
    availability: String,
}

impl From<&AthleteProfile> for ProfileRow {
    fn from(p: &AthleteProfile) -> Self {
        ProfileRow {
            id: p.id.clone(),
            name: p.name.clone(),
            position: p.position.clone(),
            fitness: format!("{:.0}", p.fitness.overall),
            injury_risk: format!("{:.0}", p.injury_risk),
            current_load: format!("{:.0}", p.current_load),
            fatigue: format!("{:.0}", p.fatigue),
            availability: format!("{:.0}", p.availability),
        }
    }
}

#[derive(Tabled)]
struct RiskRow {
    #[tabled(rename = "Athlete")]
    athlete: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "ACWR")]
    ratio: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Trend")]
    trend: String,
    #[tabled(rename = "EWMA")]
    ewma: String,
    #[tabled(rename = "Fatigue")]
    fatigue: String,
    #[tabled(rename = "Recovery (h)")]
    recovery_hours: String,
    #[tabled(rename = "Next")]
    next_intensity: String,
}

fn load_config(path: Option<&Path>) -> Result<AnalyticsConfig> {
    match path {
        Some(path) => AnalyticsConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(AnalyticsConfig::load_or_default()),
    }
}

fn load_roster(
    analytics: &WorkloadAnalytics,
    roster: &RosterArgs,
) -> Result<Vec<AthleteProfile>> {
    let athletes: Vec<RawAthlete> = read_json(&roster.athletes)?;
    let readiness: Vec<ReadinessSnapshot> = read_optional_list(roster.readiness.as_deref())?;
    let restrictions: Vec<MedicalRestriction> =
        read_optional_list(roster.restrictions.as_deref())?;

    Ok(analytics.build_profiles(&athletes, &readiness, &restrictions))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    write_json(std::io::stdout().lock(), value)?;
    Ok(())
}

/// Print a failed command's error, using the friendlier message for known errors
fn report_error(err: &anyhow::Error) {
    let Some(error) = err.downcast_ref::<SquadRsError>() else {
        tracing::error!(error = %err, "Command failed");
        eprintln!("{} {:#}", "error:".red().bold(), err);
        return;
    };

    let severity = error.severity();
    match severity.to_tracing_level() {
        tracing::Level::WARN => tracing::warn!(error = %error, "Command failed"),
        _ => tracing::error!(error = %error, ?severity, "Command failed"),
    }
    let label = match severity {
        ErrorSeverity::Critical => "fatal:".red().bold(),
        ErrorSeverity::Error => "error:".red().bold(),
        ErrorSeverity::Warning => "error:".yellow().bold(),
    };
    eprintln!("{} {}", label, error.user_message());
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        report_error(&err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref())?;
    if cli.verbose > 0 {
        config.logging.level = LogLevel::from_verbosity(cli.verbose);
    }
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Profiles { roster } => {
            let analytics = WorkloadAnalytics::with_config(config);
            let profiles = load_roster(&analytics, &roster)?;

            if cli.json {
                return print_json(&profiles);
            }
            println!("{}", "Athlete profiles".green().bold());
            let rows: Vec<ProfileRow> = profiles.iter().map(ProfileRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }

        Commands::Cluster { roster, k, seed } => {
            config.seed = seed.or(config.seed);
            let k = k.unwrap_or(config.clustering.default_k);
            let analytics = WorkloadAnalytics::with_config(config);
            let profiles = load_roster(&analytics, &roster)?;
            let clusters = analytics.cluster(&profiles, k);

            if cli.json {
                return print_json(&clusters);
            }
            println!(
                "{}",
                format!("{} athletes in {} clusters", profiles.len(), clusters.len())
                    .blue()
                    .bold()
            );
            for cluster in &clusters {
                println!(
                    "\n{} {} athletes, recommended load {:.0}%",
                    format!("Cluster {}:", cluster.id + 1).bold(),
                    cluster.len(),
                    cluster.recommended_load
                );
                for characteristic in &cluster.characteristics {
                    println!("  - {}", characteristic);
                }
                let rows: Vec<ProfileRow> = cluster.members.iter().map(ProfileRow::from).collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }

        Commands::Distribute {
            roster,
            strategy,
            sessions,
            seed,
        } => {
            config.seed = seed.or(config.seed);
            let analytics = WorkloadAnalytics::with_config(config);
            let profiles = load_roster(&analytics, &roster)?;
            let result = analytics.distribute(&profiles, &strategy, sessions);

            if cli.json {
                return print_json(&result);
            }
            println!("{}", format!("Strategy: {}", result.strategy).cyan().bold());
            println!("{}", result.reasoning);
            println!("Confidence: {:.0}%", result.confidence_score);

            for warning in &result.warnings {
                println!("{} {}", "warning:".yellow().bold(), warning);
            }

            for group in &result.session_groups {
                println!(
                    "\n{} ({} athletes, {} intensity)",
                    group.name.bold(),
                    group.len(),
                    group.intensity
                );
                if !group.equipment.is_empty() {
                    println!("  Equipment: {}", group.equipment.join(", "));
                }
                for note in &group.notes {
                    println!("  - {}", note.dimmed());
                }
                let rows: Vec<ProfileRow> = group.members.iter().map(ProfileRow::from).collect();
                println!("{}", Table::new(rows).with(Style::rounded()));
            }

            if !result.alternative_options.is_empty() {
                println!("\n{}", "Alternatives".bold());
                for alternative in &result.alternative_options {
                    println!(
                        "  {} ({:.0}%): + {} / - {}",
                        alternative.strategy,
                        alternative.confidence_score,
                        alternative.pros.join("; "),
                        alternative.cons.join("; ")
                    );
                }
            }
        }

        Commands::Risk {
            sessions,
            athletes,
            performance,
            athlete,
            date,
        } => {
            let date: Option<NaiveDate> = date.as_deref().map(parse_date).transpose()?;
            let analytics = WorkloadAnalytics::with_config(config);

            if let Some(path) = athletes {
                let roster: Vec<RawAthlete> = read_json(&path)?;
                analytics.build_profiles(&roster, &[], &[]);
            }
            let records: Vec<WorkloadSession> = read_json(&sessions)?;
            for record in records {
                analytics.add_workload_session(record);
            }
            let observations: Vec<PerformanceObservation> =
                read_optional_list(performance.as_deref())?;
            for observation in observations {
                analytics.add_performance_observation(observation);
            }

            let ids = match athlete {
                Some(id) => vec![id],
                None => analytics.tracker().athlete_ids(),
            };
            let as_of = date.and_then(|d| d.and_hms_opt(12, 0, 0)).map(|t| t.and_utc());

            let acwr = analytics.get_acwr_batch(&ids, date);
            let ewma = analytics.get_ewma_batch(&ids, date);
            let recovery = analytics.predict_recovery_batch(&ids, as_of);
            let alerts = analytics.get_alerts_batch(&ids, as_of);

            if cli.json {
                let report: Vec<serde_json::Value> = ids
                    .iter()
                    .enumerate()
                    .map(|(i, id)| {
                        serde_json::json!({
                            "athlete_id": id,
                            "acwr": acwr[i],
                            "ewma": ewma[i],
                            "recovery": recovery[i],
                            "alerts": alerts[i],
                        })
                    })
                    .collect();
                return print_json(&report);
            }

            let rows: Vec<RiskRow> = ids
                .iter()
                .enumerate()
                .map(|(i, id)| RiskRow {
                    athlete: id.clone(),
                    date: acwr[i].date.to_string(),
                    ratio: format!("{:.2}", acwr[i].ratio),
                    status: acwr[i].status.to_string(),
                    trend: acwr[i].trend.to_string(),
                    ewma: format!("{:.1}", ewma[i].current),
                    fatigue: format!("{:.0}", recovery[i].current_fatigue),
                    recovery_hours: format!("{:.0}", recovery[i].estimated_recovery_hours),
                    next_intensity: recovery[i].next_session.intensity.to_string(),
                })
                .collect();
            println!("{}", "Workload risk".magenta().bold());
            println!("{}", Table::new(rows).with(Style::rounded()));

            let elevated = acwr.iter().filter(|r| r.status == RiskStatus::VeryHighRisk).count();
            if elevated > 0 {
                println!(
                    "{}",
                    format!("{} athlete(s) with very high ACWR", elevated).red().bold()
                );
            }

            for (id, athlete_alerts) in ids.iter().zip(&alerts) {
                for alert in athlete_alerts {
                    let severity = match alert.severity {
                        AlertSeverity::Critical => alert.severity.to_string().red().bold(),
                        AlertSeverity::Warning => alert.severity.to_string().yellow(),
                        AlertSeverity::Info => alert.severity.to_string().blue(),
                    };
                    println!("[{}] {}: {}", severity, id, alert.message);
                    for recommendation in &alert.recommendations {
                        println!("    - {}", recommendation);
                    }
                }
            }
        }
    }

    Ok(())
}
