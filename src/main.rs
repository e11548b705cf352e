// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

// Use library instead of local modules
use gpa_planner::{
    reader_for, CourseRegistry, EditDelta, GradeSheet, PendingConvention, PlannerConfig,
    SectionListing, StatusKind, Timetable, UnmatchedPolicy, MAX_ATTEMPTS,
};

#[derive(Parser)]
#[command(name = "gpa-planner")]
#[command(about = "GPA and registration eligibility from a transcript export", long_about = None)]
struct Cli {
    /// JSON config file (ingestion conventions, transcript layout)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON course catalog (defaults to the built-in program)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// How blank / "00" transcript cells are read
    #[arg(long, global = true, value_enum)]
    pending: Option<PendingArg>,

    /// Ignore transcript courses outside the catalog instead of folding them
    #[arg(long, global = true)]
    drop_unmatched: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum PendingArg {
    NoGrade,
    Registered,
}

impl From<PendingArg> for PendingConvention {
    fn from(arg: PendingArg) -> Self {
        match arg {
            PendingArg::NoGrade => PendingConvention::NoGrade,
            PendingArg::Registered => PendingConvention::Registered,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the grade sheet and GPA for a transcript
    Report {
        #[arg(value_name = "TRANSCRIPT")]
        transcript: PathBuf,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Apply a JSON edit delta ({"row": {"Attempt N": "B+"}}) and print the result
    Edit {
        #[arg(value_name = "TRANSCRIPT")]
        transcript: PathBuf,

        #[arg(short, long)]
        edits: PathBuf,

        #[arg(long)]
        json: bool,
    },
    /// Interactive grade sheet and weekly timetable
    Ui {
        #[arg(value_name = "TRANSCRIPT")]
        transcript: Option<PathBuf>,

        /// Section listing CSV for the timetable page
        #[arg(short, long)]
        sections: Option<PathBuf>,
    },
    /// Print the weekly meeting times of selected sections
    Schedule {
        #[arg(value_name = "SECTIONS")]
        sections: PathBuf,

        /// Section codes or "CODE — Name" labels (all when omitted)
        #[arg(value_name = "CODE")]
        select: Vec<String>,

        #[arg(long)]
        status: Vec<String>,

        #[arg(long)]
        teacher: Vec<String>,
    },
    /// List the course catalog
    Catalog,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so only warnings reach stderr there.
    let default_level = if matches!(cli.command, Commands::Ui { .. }) { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = load_config(&cli)?;
    let catalog = load_catalog(cli.catalog.as_deref())?;

    match &cli.command {
        Commands::Report { transcript, json } => {
            let sheet = load_sheet(&catalog, config, transcript)?;
            print_sheet(&sheet, *json)?;
        }
        Commands::Edit { transcript, edits, json } => {
            let mut sheet = load_sheet(&catalog, config, transcript)?;
            let content = std::fs::read_to_string(edits)
                .with_context(|| format!("Failed to read edits file: {}", edits.display()))?;
            let delta: EditDelta =
                serde_json::from_str(&content).context("Failed to parse edits JSON")?;

            let report = sheet.apply_edits(&delta);
            info!(applied = report.applied, skipped = report.skipped.len(), "Edits applied");
            print_sheet(&sheet, *json)?;
        }
        Commands::Ui { transcript, sections } => {
            let sheet = match transcript {
                Some(path) => load_sheet(&catalog, config, path)?,
                None => GradeSheet::new(&catalog, config),
            };
            let listing = match sections {
                Some(path) => SectionListing::from_file(path)
                    .with_context(|| format!("Failed to load sections: {}", path.display()))?,
                None => SectionListing::default(),
            };
            run_ui_mode(sheet, listing)?;
        }
        Commands::Schedule { sections, select, status, teacher } => {
            let listing = SectionListing::from_file(sections)
                .with_context(|| format!("Failed to load sections: {}", sections.display()))?
                .filtered(status, teacher);
            print_schedule(&listing, select);
        }
        Commands::Catalog => print_catalog(&catalog),
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<PlannerConfig> {
    let mut config = match &cli.config {
        Some(path) => PlannerConfig::from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => PlannerConfig::default(),
    };

    if let Some(pending) = cli.pending {
        config = config.with_pending(pending.into());
    }
    if cli.drop_unmatched {
        config = config.with_unmatched(UnmatchedPolicy::Drop);
    }
    Ok(config)
}

fn load_catalog(path: Option<&Path>) -> Result<CourseRegistry> {
    match path {
        Some(path) => CourseRegistry::from_file(path)
            .with_context(|| format!("Failed to load catalog: {}", path.display())),
        None => Ok(CourseRegistry::new()),
    }
}

fn load_sheet(catalog: &CourseRegistry, config: PlannerConfig, path: &Path) -> Result<GradeSheet> {
    let reader = reader_for(path, &config.layout);
    let transcript = reader
        .read(path)
        .with_context(|| format!("Failed to read transcript: {}", path.display()))?;
    info!(
        file = %path.display(),
        format = reader.format(),
        courses = transcript.course_count(),
        "Transcript loaded"
    );

    let mut sheet = GradeSheet::new(catalog, config);
    sheet.ingest(&transcript);
    Ok(sheet)
}

fn print_sheet(sheet: &GradeSheet, json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({
            "student_name": sheet.student_name(),
            "student_id": sheet.student_id(),
            "records": sheet.records(),
            "aggregate": sheet.aggregate(),
            "status_counts": sheet
                .status_counts()
                .into_iter()
                .map(|(kind, count)| (format!("{:?}", kind), count))
                .collect::<std::collections::BTreeMap<_, _>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("🎓 {} ({})", sheet.student_name(), sheet.student_id());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print!("{:<10} {:<30} {:>3} ", "Code", "Name", "Cr");
    for i in 0..MAX_ATTEMPTS {
        print!("{:<4}", format!("A{}", i + 1));
    }
    println!(" {:>6} {:>7}  Status", "Load", "Effort");

    for record in sheet.records() {
        print!(
            "{:<10} {:<30} {:>3} ",
            record.course.code,
            truncate(&record.course.name, 30),
            record.course.credit_hours
        );
        for slot in record.attempts.slots() {
            print!("{:<4}", slot.as_str());
        }
        println!(
            " {:>6.2} {:>7.2}  {}",
            record.adjusted_load, record.subject_effort, record.status
        );
    }

    let aggregate = sheet.aggregate();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📊 {}", aggregate.summary());
    if aggregate.provisional {
        println!("⚠️  Registered courses count as 0 points until graded.");
    }

    let counts = sheet.status_counts();
    for kind in StatusKind::ALL {
        println!("   {:<24} {}", kind.label(), counts.get(&kind).copied().unwrap_or(0));
    }
    Ok(())
}

fn print_schedule(listing: &SectionListing, select: &[String]) {
    let chosen = if select.is_empty() {
        listing.sections.iter().collect::<Vec<_>>()
    } else {
        listing.select(select)
    };
    let timetable = Timetable::build(&chosen);

    println!(
        "🗓️  Weekly timetable {}–{}",
        timetable.start.format("%H:%M"),
        timetable.end.format("%H:%M")
    );
    for (row, day) in gpa_planner::schedule::DAY_ORDER.iter().enumerate() {
        let blocks = timetable.day(row);
        if blocks.is_empty() {
            continue;
        }
        let entries: Vec<String> = blocks.iter().map(|b| b.label.replace('\n', " ")).collect();
        println!("   {:<4} {}", day.to_string(), entries.join(" | "));
    }
    if !timetable.unscheduled.is_empty() {
        println!("⚠️  No recognizable meeting time: {}", timetable.unscheduled.join(", "));
    }
}

fn print_catalog(catalog: &CourseRegistry) {
    println!("📚 {} courses, {} credit hours", catalog.count(), catalog.total_credit_hours());
    for course in catalog.all_courses() {
        let prereqs: Vec<&str> = course.prerequisite_codes().collect();
        println!(
            "   {:<10} {:<32} {:>2}  prereq: {:<26} coreq: {}",
            course.code,
            course.name,
            course.credit_hours,
            if prereqs.is_empty() { "-".to_string() } else { prereqs.join(", ") },
            course.corequisite.as_deref().unwrap_or("-")
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len - 3).collect();
        format!("{}...", cut)
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(sheet: GradeSheet, listing: SectionListing) -> Result<()> {
    let mut app = ui::App::new(sheet, listing);
    ui::run_ui(&mut app)?;
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_sheet: GradeSheet, _listing: SectionListing) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin gpa-server --features server");
    std::process::exit(1);
}
