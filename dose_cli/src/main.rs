use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use dose_core::*;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "doselog")]
#[command(about = "Medication stock and dose tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Manage the medication catalogue
    #[command(subcommand)]
    Med(MedCommand),

    /// Enroll a user in a medication and plan its doses
    Enroll {
        #[arg(long)]
        user: Uuid,

        #[arg(long)]
        medication: Uuid,

        /// Boxes owned
        #[arg(long)]
        boxes: u32,

        /// Intake as slot:amount, e.g. morning:1 (repeatable)
        #[arg(long = "schedule", required = true)]
        schedules: Vec<IntakeSchedule>,

        /// Treatment duration in days
        #[arg(long)]
        days: u32,
    },

    /// Inspect or change enrollments
    #[command(subcommand)]
    Enrollment(EnrollmentCommand),

    /// List dose logs of an enrollment (newest first)
    Logs {
        enrollment: Uuid,

        /// First day to include (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Day after the last one to include (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,
    },

    /// Show the doses planned for one day (today by default)
    Today {
        enrollment: Uuid,

        /// Day to show instead of today (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Mark a dose as taken
    Take { dose_log: Uuid },

    /// Show stock and depletion figures of an enrollment
    Stats { enrollment: Uuid },

    /// Export the dose logs of an enrollment to CSV
    Export {
        enrollment: Uuid,

        /// Output file (defaults to <data-dir>/exports/<enrollment>.csv)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Rewrite the data files down to their latest records
    Compact,
}

#[derive(Subcommand)]
enum UserCommand {
    /// Register a user
    Add { email: String },

    /// Show a user by id or email
    Show { user: String },
}

#[derive(Subcommand)]
enum MedCommand {
    /// Add a medication
    Add(MedAddArgs),

    /// Change fields of a medication
    Update(MedUpdateArgs),

    /// List medications by name
    List {
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show a medication
    Show { id: Uuid },
}

#[derive(Args)]
struct MedAddArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    manufacturer: Option<String>,

    /// tablet, capsule, syrup, drop or injection
    #[arg(long, default_value = "tablet")]
    form: MedicationForm,

    #[arg(long)]
    strength_mg: f64,

    #[arg(long)]
    pills_per_box: u32,

    /// before_meal, after_meal, with_meal or irrelevant
    #[arg(long, default_value = "irrelevant")]
    meal: MealRelation,
}

#[derive(Args)]
struct MedUpdateArgs {
    id: Uuid,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    manufacturer: Option<String>,

    #[arg(long)]
    form: Option<MedicationForm>,

    #[arg(long)]
    strength_mg: Option<f64>,

    #[arg(long)]
    meal: Option<MealRelation>,
}

#[derive(Subcommand)]
enum EnrollmentCommand {
    /// Change boxes, schedules or the active flag
    Update {
        id: Uuid,

        #[arg(long)]
        boxes: Option<u32>,

        /// Replacement intake list as slot:amount (repeatable)
        #[arg(long = "schedule")]
        schedules: Vec<IntakeSchedule>,

        #[arg(long, conflicts_with = "deactivate")]
        activate: bool,

        #[arg(long)]
        deactivate: bool,
    },

    /// List enrollments of a user (newest first)
    List {
        #[arg(long)]
        user: Uuid,

        /// Only active enrollments
        #[arg(long)]
        active: bool,
    },

    /// Show an enrollment
    Show { id: Uuid },
}

/// Exit status when the data files cannot be read or written
const EXIT_STORAGE: u8 = 3;

fn main() -> ExitCode {
    dose_core::logging::init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_persistence() => {
            eprintln!("error: storage failure: {}", e);
            ExitCode::from(EXIT_STORAGE)
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());

    let tracker = Tracker::with_thresholds(JsonlStore::open(&data_dir), config.stock);
    let out = Output { json: cli.json };

    match cli.command {
        Commands::User(cmd) => cmd_user(&tracker, &out, cmd),
        Commands::Med(cmd) => cmd_med(&tracker, &out, cmd, &config),
        Commands::Enroll {
            user,
            medication,
            boxes,
            schedules,
            days,
        } => {
            let input = NewEnrollment {
                medication_id: medication,
                boxes_owned: boxes,
                schedules,
                duration_days: days,
            };
            let enrollment = tracker.create_enrollment(user, &input)?;
            out.emit(&enrollment, print_enrollment)
        }
        Commands::Enrollment(cmd) => cmd_enrollment(&tracker, &out, cmd),
        Commands::Logs {
            enrollment,
            from,
            to,
        } => {
            let logs = match (from, to) {
                (Some(from), Some(to)) => tracker.list_dose_logs_in_range(
                    enrollment,
                    start_of_day(from)?,
                    start_of_day(to)?,
                )?,
                _ => tracker.list_dose_logs(enrollment)?,
            };
            out.emit(&logs, |logs| print_logs(logs))
        }
        Commands::Today { enrollment, date } => {
            let day = date.unwrap_or_else(|| Utc::now().date_naive());
            let logs = tracker.dose_logs_for_day(enrollment, day)?;
            out.emit(&logs, |logs| {
                if logs.is_empty() {
                    println!("No doses planned for {}", day);
                } else {
                    println!("Doses for {}:", day);
                    print_logs(logs);
                }
            })
        }
        Commands::Take { dose_log } => {
            let log = tracker.mark_dose_taken(dose_log)?;
            out.emit(&log, |log| {
                println!(
                    "✓ Dose taken: {} {} ({})",
                    log.time_slot,
                    log.planned_dose,
                    log.timestamp.format("%Y-%m-%d")
                )
            })
        }
        Commands::Stats { enrollment } => {
            let stats = tracker.get_stats(enrollment)?;
            out.emit(&stats, print_stats)
        }
        Commands::Export { enrollment, output } => {
            let path = output.unwrap_or_else(|| {
                data_dir
                    .join("exports")
                    .join(format!("{}.csv", enrollment))
            });
            let count = tracker.export_dose_logs(enrollment, &path)?;
            out.emit(
                &serde_json::json!({ "rows": count, "path": path }),
                |_| {
                    println!("✓ Exported {} dose logs", count);
                    println!("  CSV: {}", path.display());
                },
            )
        }
        Commands::Compact => {
            let dropped = tracker.store().compact()?;
            out.emit(&serde_json::json!({ "dropped_lines": dropped }), |_| {
                println!("✓ Compacted data files ({} stale lines dropped)", dropped)
            })
        }
    }
}

fn cmd_user(tracker: &Tracker<JsonlStore>, out: &Output, cmd: UserCommand) -> Result<()> {
    let user = match cmd {
        UserCommand::Add { email } => tracker.register_user(&email)?,
        UserCommand::Show { user } => match user.parse::<Uuid>() {
            Ok(id) => tracker.get_user(id)?,
            Err(_) => tracker.find_user_by_email(&user)?,
        },
    };
    out.emit(&user, |user| {
        println!("{}", user.email);
        println!("  id: {}", user.id);
        println!("  registered: {}", user.created_at.format("%Y-%m-%d %H:%M"));
    })
}

fn cmd_med(
    tracker: &Tracker<JsonlStore>,
    out: &Output,
    cmd: MedCommand,
    config: &Config,
) -> Result<()> {
    match cmd {
        MedCommand::Add(args) => {
            let input = NewMedication {
                name: args.name,
                description: args.description,
                manufacturer: args.manufacturer,
                form: args.form,
                strength_mg: args.strength_mg,
                pills_per_box: args.pills_per_box,
                meal_relation: args.meal,
            };
            let med = tracker.create_medication(&input)?;
            out.emit(&med, print_medication)
        }
        MedCommand::Update(args) => {
            let patch = MedicationPatch {
                name: args.name,
                description: args.description,
                manufacturer: args.manufacturer,
                form: args.form,
                strength_mg: args.strength_mg,
                meal_relation: args.meal,
            };
            if patch.is_empty() {
                return Err(Error::Validation("nothing to update".into()));
            }
            let med = tracker.update_medication(args.id, &patch)?;
            out.emit(&med, print_medication)
        }
        MedCommand::List { limit, offset } => {
            let limit = limit.unwrap_or(config.listing.page_size);
            let meds = tracker.list_medications(limit, offset)?;
            out.emit(&meds, |meds| {
                if meds.is_empty() {
                    println!("No medications.");
                }
                for med in meds {
                    println!(
                        "{}  {} {}mg {} ({} per box)",
                        med.id, med.name, med.strength_mg, med.form, med.pills_per_box
                    );
                }
            })
        }
        MedCommand::Show { id } => {
            let med = tracker.get_medication(id)?;
            out.emit(&med, print_medication)
        }
    }
}

fn cmd_enrollment(
    tracker: &Tracker<JsonlStore>,
    out: &Output,
    cmd: EnrollmentCommand,
) -> Result<()> {
    match cmd {
        EnrollmentCommand::Update {
            id,
            boxes,
            schedules,
            activate,
            deactivate,
        } => {
            let patch = EnrollmentPatch {
                boxes_owned: boxes,
                schedules: (!schedules.is_empty()).then_some(schedules),
                active: match (activate, deactivate) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            if patch.is_empty() {
                return Err(Error::Validation("nothing to update".into()));
            }
            let enrollment = tracker.update_enrollment(id, &patch)?;
            out.emit(&enrollment, print_enrollment)
        }
        EnrollmentCommand::List { user, active } => {
            let enrollments = if active {
                tracker.list_active_enrollments(user)?
            } else {
                tracker.list_enrollments(user)?
            };
            out.emit(&enrollments, |enrollments| {
                if enrollments.is_empty() {
                    println!("No enrollments.");
                }
                for e in enrollments {
                    println!(
                        "{}  medication {}  {} days from {}{}",
                        e.id,
                        e.medication_id,
                        e.duration_days,
                        e.start_at.format("%Y-%m-%d"),
                        if e.active { "" } else { "  (inactive)" }
                    );
                }
            })
        }
        EnrollmentCommand::Show { id } => {
            let enrollment = tracker.get_enrollment(id)?;
            out.emit(&enrollment, print_enrollment)
        }
    }
}

/// Chooses between JSON and human-readable output
struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

fn start_of_day(day: NaiveDate) -> Result<chrono::DateTime<Utc>> {
    day.and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .ok_or_else(|| Error::Validation(format!("invalid day {}", day)))
}

fn print_medication(med: &Medication) {
    println!("{}", med.name);
    println!("  id: {}", med.id);
    println!("  form: {} {}mg", med.form, med.strength_mg);
    println!("  pills per box: {}", med.pills_per_box);
    println!("  take: {}", med.meal_relation);
    if let Some(ref description) = med.description {
        println!("  description: {}", description);
    }
    if let Some(ref manufacturer) = med.manufacturer {
        println!("  manufacturer: {}", manufacturer);
    }
}

fn print_enrollment(e: &Enrollment) {
    println!("Enrollment {}", e.id);
    println!("  user: {}", e.user_id);
    println!("  medication: {}", e.medication_id);
    println!("  boxes owned: {}", e.boxes_owned);
    for s in &e.schedules {
        println!("  → {} {}", s.time_slot, s.dose_amount);
    }
    println!(
        "  {} days from {} ({})",
        e.duration_days,
        e.start_at.format("%Y-%m-%d"),
        if e.active { "active" } else { "inactive" }
    );
}

fn print_logs(logs: &[DoseLog]) {
    for log in logs {
        println!(
            "{}  {} {:<8} {}  {}",
            log.id,
            log.timestamp.format("%Y-%m-%d"),
            log.time_slot,
            log.planned_dose,
            if log.taken { "taken" } else { "pending" }
        );
    }
}

fn print_stats(stats: &StatsReport) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  STOCK: {}", stats.warning_level.to_string().to_uppercase());
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Pills: {} used of {}", stats.used_pills, stats.total_pills);
    println!("  Remaining: {}", stats.remaining_pills);
    println!("  Daily consumption: {}", stats.daily_consumption);
    match stats.estimated_end_date {
        Some(end) => println!(
            "  Runs out in ~{} days ({})",
            stats.estimated_days_remaining,
            end.format("%Y-%m-%d")
        ),
        None => println!("  Runs out: n/a"),
    }
    println!(
        "  Plan: day {} of {} ({} left)",
        stats.days_elapsed, stats.planned_duration_days, stats.planned_days_remaining
    );
    println!();
}
