use std::io::IsTerminal;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};

use vigil_core::{CheckConfig, CheckStatus, OutputFormat, VigilConfig};
use vigil_history::{Baseline, HistoryStore, TrendPoint};
use vigil_report::{diff_records, evaluate_gate, total_value, CheckReport, RunReport};
use vigil_trigger::Decision;

#[derive(Parser)]
#[command(
    name = "vigil",
    version,
    about = "CI check orchestration and reporting",
    long_about = "Vigil runs configured checks against a repository change, parses their\n\
                   output into records, diffs the records against the previous run, and\n\
                   converts threshold violations into exit codes that gate merges.\n\n\
                   Examples:\n  \
                     vigil run --all                 Run every configured check\n  \
                     git diff main | vigil run       Run the checks the change triggers\n  \
                     git diff main | vigil changes   Show changed files and decisions\n  \
                     vigil history --check warnings  Show a check's stored trend\n  \
                     vigil label --pr acme/burst#42  Compute labels for a pull request\n  \
                     vigil doctor                    Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .vigil.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown\n  \
                         sarif     SARIF v2.1.0 (run subcommand only)"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Run the checks a change triggers and gate on the results
    #[command(long_about = "Run the checks a change triggers and gate on the results.\n\n\
        Reads a unified diff from stdin, a file, or 'git diff <base>' to decide which\n\
        checks run, executes their commands, parses output into records, diffs the\n\
        records against the stored baseline, and exits non-zero when a gate fails.\n\n\
        Examples:\n  git diff main | vigil run\n  vigil run --all --update-baseline\n  vigil run --check warnings --base origin/main\n  vigil run --all --pr acme/burst#42 --format markdown")]
    Run {
        /// Run only the named checks (may repeat)
        #[arg(long = "check")]
        checks: Vec<String>,
        /// Run every configured check, ignoring triggers
        #[arg(long)]
        all: bool,
        /// Read the diff from a file instead of stdin
        #[arg(long)]
        diff_file: Option<PathBuf>,
        /// Diff against this git ref instead of reading a diff
        #[arg(long)]
        base: Option<String>,
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        repo: PathBuf,
        /// Save baselines and trends even when a gate fails
        #[arg(
            long,
            long_help = "Save baselines and trends even when a gate fails.\n\nBy default a failing run does not update history, so a red run\ncannot silently become the next comparison base."
        )]
        update_baseline: bool,
        /// Pull request to comment on (format: owner/repo#123)
        #[arg(long)]
        pr: Option<String>,
        /// Append the markdown report to this step-summary file
        #[arg(
            long,
            long_help = "Append the markdown report to this step-summary file.\n\nFalls back to VIGIL_STEP_SUMMARY or GITHUB_STEP_SUMMARY, so runs\ninside GitHub Actions land in the job summary automatically."
        )]
        summary: Option<PathBuf>,
        /// Commit collected artifacts to configured publish branches and push
        #[arg(long)]
        publish: bool,
        /// GitHub API token (default: GITHUB_TOKEN / GH_TOKEN env var)
        #[arg(long)]
        github_token: Option<String>,
    },
    /// Show changed files and which checks a change triggers
    #[command(long_about = "Show changed files and which checks a change triggers.\n\n\
        Parses a unified diff and evaluates every configured check's trigger rules\n\
        without running anything. Reads from stdin, a file, or 'git diff <base>'.\n\n\
        Examples:\n  git diff | vigil changes\n  vigil changes --base origin/main --format json")]
    Changes {
        /// Read the diff from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        /// Diff against this git ref instead of reading a diff
        #[arg(long)]
        base: Option<String>,
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        repo: PathBuf,
    },
    /// Show a check's stored baseline and trend
    #[command(long_about = "Show a check's stored baseline and trend.\n\n\
        With no --check, lists every check that has stored history. With one,\n\
        shows the saved baseline summary and the most recent trend rows.\n\n\
        Examples:\n  vigil history\n  vigil history --check warnings --limit 30")]
    History {
        /// Check to show history for
        #[arg(long)]
        check: Option<String>,
        /// Maximum trend rows to show (default: 10)
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Compute pull-request labels from changed paths
    #[command(long_about = "Compute pull-request labels from changed paths.\n\n\
        Matches the changed files of a diff (or a fetched PR diff) against the\n\
        [[label]] rules in the configuration. Prints the labels; --apply posts\n\
        them to the PR.\n\n\
        Examples:\n  git diff main | vigil label\n  vigil label --pr acme/burst#42 --apply")]
    Label {
        /// Pull request to label (format: owner/repo#123, or a number
        /// when [github].repository is configured)
        #[arg(long)]
        pr: Option<String>,
        /// Read the diff from a file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
        /// Apply the labels to the PR instead of only printing them
        #[arg(long)]
        apply: bool,
        /// GitHub API token (default: GITHUB_TOKEN / GH_TOKEN env var)
        #[arg(long)]
        github_token: Option<String>,
    },
    /// Create a default .vigil.toml configuration file
    #[command(long_about = "Create a default .vigil.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .vigil.toml already exists.")]
    Init,
    /// Check your Vigil setup and environment
    #[command(long_about = "Check your Vigil setup and environment.\n\n\
        Runs diagnostics for git repo, config file, configured checks, stored\n\
        history, GitHub token, and notification targets. Use --format json for\n\
        machine-readable output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1m\x1b[33m⚑\x1b[0m \x1b[1mvigil\x1b[0m v{version} — CI checks that remember last run\n");

        println!("Quick start:");
        println!("  \x1b[36mvigil init\x1b[0m                      Create a .vigil.toml config file");
        println!("  \x1b[36mgit diff main | vigil run\x1b[0m       Run the checks a change triggers");
        println!("  \x1b[36mvigil run --all\x1b[0m                 Run every configured check\n");

        println!("All commands:");
        println!("  \x1b[32mrun\x1b[0m       Run triggered checks, diff against history, gate");
        println!("  \x1b[32mchanges\x1b[0m   Show changed files and trigger decisions");
        println!("  \x1b[32mhistory\x1b[0m   Show a check's stored baseline and trend");
        println!("  \x1b[32mlabel\x1b[0m     Compute PR labels from changed paths");
        println!("  \x1b[32mdoctor\x1b[0m    Check your setup and environment");
        println!("  \x1b[32minit\x1b[0m      Create default configuration\n");
    } else {
        println!("vigil v{version} — CI checks that remember last run\n");

        println!("Quick start:");
        println!("  vigil init                      Create a .vigil.toml config file");
        println!("  git diff main | vigil run       Run the checks a change triggers");
        println!("  vigil run --all                 Run every configured check\n");

        println!("All commands:");
        println!("  run       Run triggered checks, diff against history, gate");
        println!("  changes   Show changed files and trigger decisions");
        println!("  history   Show a check's stored baseline and trend");
        println!("  label     Compute PR labels from changed paths");
        println!("  doctor    Check your setup and environment");
        println!("  init      Create default configuration\n");
    }

    println!("Run 'vigil <command> --help' for details.");
}

fn read_diff_input(file: &Option<PathBuf>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err(format!("reading {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .into_diagnostic()
                .wrap_err("reading stdin")?;
            Ok(input)
        }
    }
}

fn git_diff(repo: &Path, base: &str) -> Result<String> {
    let output = std::process::Command::new("git")
        .args(["-C", &repo.to_string_lossy(), "diff", base])
        .output()
        .into_diagnostic()
        .wrap_err(format!("Failed to run git diff {base}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        miette::bail!("git diff failed: {}", stderr.trim());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn head_commit(repo: &Path) -> Option<String> {
    let output = std::process::Command::new("git")
        .args(["-C", &repo.to_string_lossy(), "rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Diff text for trigger evaluation: an explicit file or base wins,
/// then piped stdin, then `git diff HEAD` for uncommitted changes.
fn resolve_diff(repo: &Path, file: &Option<PathBuf>, base: &Option<String>) -> Result<String> {
    if file.is_some() {
        return read_diff_input(file);
    }
    if let Some(base) = base {
        return git_diff(repo, base);
    }
    if !std::io::stdin().is_terminal() {
        return read_diff_input(&None);
    }
    git_diff(repo, "HEAD")
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

fn run_doctor(config: &VigilConfig, format: OutputFormat, use_color: bool) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Git repository
    let mut git_root = None;
    let cwd = std::env::current_dir().into_diagnostic()?;
    let mut dir = cwd.as_path();
    loop {
        if dir.join(".git").exists() {
            git_root = Some(dir.to_path_buf());
            break;
        }
        let Some(parent) = dir.parent() else {
            break;
        };
        dir = parent;
    }
    match &git_root {
        Some(root) => checks.push(CheckResult::pass(
            "git_repository",
            format!("detected at {}", root.display()),
        )),
        None => checks.push(CheckResult::fail(
            "git_repository",
            "not a git repository",
            "run vigil from inside a git repository",
        )),
    }

    // 2. Config file
    let config_path = Path::new(".vigil.toml");
    if config_path.exists() {
        let detail = if config.checks.is_empty() {
            ".vigil.toml found (no checks configured)".to_string()
        } else {
            format!(".vigil.toml found ({} checks)", config.checks.len())
        };
        checks.push(CheckResult::pass("config_file", detail));
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            ".vigil.toml not found",
            "run 'vigil init' to create a default config",
        ));
    }

    // 3. Configured checks by kind
    if config.checks.is_empty() {
        checks.push(CheckResult::info(
            "checks",
            "none configured (add [[check]] tables to .vigil.toml)",
        ));
    } else {
        let names: Vec<&str> = config.checks.iter().map(|c| c.name.as_str()).collect();
        checks.push(CheckResult::pass("checks", names.join(", ")));
    }

    // 4. History store
    let store = HistoryStore::for_repo(&cwd, &config.history.dir);
    match store.known_checks() {
        Ok(known) if known.is_empty() => checks.push(CheckResult::info(
            "history",
            format!("{} is empty (first run seeds it)", config.history.dir.display()),
        )),
        Ok(known) => checks.push(CheckResult::pass(
            "history",
            format!("{} check(s) with stored baselines", known.len()),
        )),
        Err(e) => checks.push(CheckResult::fail(
            "history",
            format!("cannot read {}: {e}", config.history.dir.display()),
            "check directory permissions",
        )),
    }

    // 5. GitHub token
    if std::env::var("GITHUB_TOKEN").is_ok() || std::env::var("GH_TOKEN").is_ok() {
        checks.push(CheckResult::pass("github_token", "GITHUB_TOKEN set"));
    } else {
        checks.push(CheckResult::fail(
            "github_token",
            "GITHUB_TOKEN not set",
            "export GITHUB_TOKEN=... (needed for --pr and label --apply)",
        ));
    }

    // 6. Notification targets
    match &config.notify.webhook_url {
        Some(_) => checks.push(CheckResult::pass("webhook", "configured")),
        None => checks.push(CheckResult::info("webhook", "not configured")),
    }
    match vigil_notify::resolve_summary_path(None, config.notify.step_summary.as_deref()) {
        Some(path) => checks.push(CheckResult::pass(
            "step_summary",
            format!("writes to {}", path.display()),
        )),
        None => checks.push(CheckResult::info(
            "step_summary",
            "no target (set [notify].step_summary or VIGIL_STEP_SUMMARY)",
        )),
    }

    // 7. Git history
    if git_root.is_some() {
        // A freshly initialized repository has no HEAD to walk yet.
        let commit_count = git2::Repository::discover(&cwd).ok().and_then(|repo| {
            let mut revwalk = repo.revwalk().ok()?;
            revwalk.push_head().ok()?;
            Some(revwalk.take(1000).filter(|o| o.is_ok()).count())
        });
        let detail = match commit_count {
            Some(1000) => "1000+ commits reachable".to_string(),
            Some(count) => format!("{count} commits reachable"),
            None => "no commits yet".to_string(),
        };
        checks.push(CheckResult::info("git_history", detail));
    }

    // Output
    match format {
        OutputFormat::Json => {
            let version = env!("CARGO_PKG_VERSION");
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            let version = env!("CARGO_PKG_VERSION");
            println!("Vigil v{version} — Environment Check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<20} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Vigil Configuration
# See: https://github.com/vigil-ci/vigil

# [github]
# Default repository, lets --pr take a bare number
# repository = "acme/burst"

# [notify]
# webhook_url = "https://hooks.example.com/services/T0/B0/x"
# step_summary = "summary.md"

# [history]
# dir = ".vigil/history"

# Track compiler warnings across runs
# [[check]]
# name = "warnings"
# kind = "swift-warnings"
# command = "xcodebuild -scheme Burst build 2>&1"
# paths = ["**/*.swift", "*.xcodeproj/**"]
# tolerate_failure = true
# timeout_secs = 1800
# [check.gate]
# max_new = 0

# Gate the app binary's size
# [[check]]
# name = "app-size"
# kind = "binary-size"
# command = "xcodebuild -scheme Burst -configuration Release build"
# products = ["build/Release/Burst.app"]
# tolerance_percent = 1.0
# [check.gate]
# max_value = 52428800
# max_growth_percent = 5.0

# Audit dependency pins against a local advisory list
# [[check]]
# name = "audit"
# kind = "lockfile-audit"
# lockfile = "Package.resolved"
# advisories = "ci/advisories.json"
# [check.gate]
# max_records = 0

# Measure compiled Metal shaders
# [[check]]
# name = "shaders"
# kind = "shader-stats"
# command = "make shaders"
# paths = ["**/*.metal"]
# products = ["build/air/*.air"]
# [check.gate]
# max_growth_percent = 10.0

# Regenerate reference images and publish them
# [[check]]
# name = "ref-images"
# kind = "reference-images"
# command = "make reference-images"
# paths = ["burstphoto/**", "reference/**"]
# products = ["reference/**/*.dng"]
# publish_branch = "ci/reference-images"

# PR labels by changed path
# [[label]]
# name = "shaders"
# paths = ["**/*.metal"]
# [[label]]
# name = "docs"
# paths = ["**/*.md", "docs/**"]
"#;

/// Execute one triggered check end to end: command, records, diff,
/// gate, and history updates.
async fn execute_check(
    check: &CheckConfig,
    reason: &str,
    repo_root: &Path,
    store: &HistoryStore,
    update_baseline: bool,
    verbose: bool,
) -> Result<CheckReport> {
    let is_tty = std::io::stderr().is_terminal();
    let spinner = if is_tty && check.command.is_some() {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .into_diagnostic()?,
        );
        pb.set_message(format!("running {}...", check.name));
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let outcome = match &check.command {
        Some(cmd) => {
            let mut request = vigil_runner::RunRequest::new(cmd).cwd(repo_root);
            if let Some(secs) = check.timeout_secs {
                request = request.timeout(std::time::Duration::from_secs(secs));
            }
            Some(vigil_runner::run(&request).await.into_diagnostic()?)
        }
        None => None,
    };

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if verbose {
        if let Some(outcome) = &outcome {
            let code = outcome
                .exit_code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "killed".into());
            eprintln!(
                "{}: command exited {code} in {}ms",
                check.name, outcome.duration_ms
            );
        }
    }

    let records =
        vigil_scan::collect_records(check, outcome.as_ref(), repo_root).into_diagnostic()?;

    let baseline = store.load_baseline(&check.name).into_diagnostic()?;
    let diff = diff_records(
        &records,
        baseline.as_ref().map(|b| b.records.as_slice()),
        check.tolerance_percent,
    );
    let baseline_total = baseline.as_ref().map(|b| total_value(&b.records));

    // A command failure fails the check unless the config tolerates it.
    let mut gate_config = check.gate.clone();
    if outcome.is_some() && !check.tolerate_failure {
        gate_config.require_success = true;
    }
    let gate = evaluate_gate(&gate_config, &records, &diff, baseline_total, outcome.as_ref());

    let status = if gate.passed {
        CheckStatus::Passed
    } else {
        CheckStatus::Failed
    };

    if gate.passed || update_baseline {
        let mut new_baseline = Baseline::new(&check.name, records.clone());
        if let Some(sha) = head_commit(repo_root) {
            new_baseline = new_baseline.with_commit(sha);
        }
        store.save_baseline(&new_baseline).into_diagnostic()?;

        let findings = records.iter().filter(|r| !r.is_placeholder()).count();
        store
            .append_trend(
                &check.name,
                &TrendPoint::new(Utc::now().date_naive(), findings, total_value(&records)),
            )
            .into_diagnostic()?;
    }

    Ok(CheckReport {
        name: check.name.clone(),
        kind: check.kind,
        status,
        reason: reason.to_string(),
        command: outcome.as_ref().map(Into::into),
        records,
        diff: Some(diff),
        gate: Some(gate),
    })
}

/// Publish a passed check's staged products to its auxiliary branch.
/// Failures here go to stderr; the gate result stays authoritative.
fn publish_artifacts(check: &CheckConfig, repo_root: &Path, push: bool) {
    let Some(branch) = &check.publish_branch else {
        return;
    };
    let staging = repo_root.join(".vigil/artifacts").join(&check.name);
    match vigil_notify::stage_artifacts(repo_root, &check.products, &staging) {
        Ok(manifest) => {
            let message = format!(
                "{}: update {} artifact(s)",
                check.name,
                manifest.files.len()
            );
            match vigil_notify::publish_branch(repo_root, branch, &staging, &message, push) {
                Ok(commit) => eprintln!(
                    "{}: committed {} file(s) to {branch} ({commit})",
                    check.name,
                    manifest.files.len()
                ),
                Err(e) => eprintln!("warning: {}: publish to {branch} failed: {e}", check.name),
            }
        }
        Err(e) => eprintln!("warning: {}: artifact staging failed: {e}", check.name),
    }
}

fn webhook_payload(report: &RunReport) -> serde_json::Value {
    let failed: Vec<&str> = report
        .checks
        .iter()
        .filter(|c| c.status == CheckStatus::Failed)
        .map(|c| c.name.as_str())
        .collect();
    serde_json::json!({
        "source": "vigil",
        "status": if report.passed() { "pass" } else { "fail" },
        "checks": report.checks.len(),
        "failed": failed,
        "generatedAt": report.generated_at,
    })
}

async fn deliver_notifications(
    report: &RunReport,
    config: &VigilConfig,
    pr: &Option<String>,
    summary: &Option<PathBuf>,
    github_token: Option<&str>,
) {
    if let Some(path) =
        vigil_notify::resolve_summary_path(summary.as_deref(), config.notify.step_summary.as_deref())
    {
        if let Err(e) = vigil_notify::append_summary(&path, &report.to_markdown()) {
            eprintln!("warning: failed to write step summary: {e}");
        }
    }

    if let Some(url) = &config.notify.webhook_url {
        match vigil_notify::WebhookClient::new(url) {
            Ok(client) => {
                if let Err(e) = client.post(&webhook_payload(report)).await {
                    eprintln!("warning: {e}");
                }
            }
            Err(e) => eprintln!("warning: {e}"),
        }
    }

    if let Some(pr_ref) = pr {
        let posted = async {
            let (owner, repo, number) = vigil_notify::resolve_pr_reference(pr_ref, &config.github)?;
            let client = vigil_notify::GitHubClient::new(github_token)?;
            client
                .upsert_comment(&owner, &repo, number, &report.to_markdown())
                .await
        }
        .await;
        match posted {
            Ok(updated) => {
                let verb = if updated { "updated" } else { "posted" };
                eprintln!("{verb} report comment on {pr_ref}");
            }
            Err(e) => eprintln!("warning: failed to comment on {pr_ref}: {e}"),
        }
    }
}

fn matched_labels(config: &VigilConfig, files: &[vigil_trigger::ChangedFile]) -> Result<Vec<String>> {
    let mut labels = Vec::new();
    for rule in &config.labels {
        let mut patterns = Vec::with_capacity(rule.paths.len());
        for raw in &rule.paths {
            let pattern = glob::Pattern::new(raw).map_err(|e| {
                miette::miette!("label '{}': invalid path pattern '{raw}': {e}", rule.name)
            })?;
            patterns.push(pattern);
        }
        let hit = files.iter().any(|f| {
            patterns.iter().any(|p| {
                p.matches_path(&f.path)
                    || f.old_path
                        .as_deref()
                        .is_some_and(|old| p.matches_path(old))
            })
        });
        if hit && !labels.contains(&rule.name) {
            labels.push(rule.name.clone());
        }
    }
    Ok(labels)
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => VigilConfig::from_file(path).into_diagnostic()?,
        None => {
            let default_path = Path::new(".vigil.toml");
            if default_path.exists() {
                VigilConfig::from_file(default_path).into_diagnostic()?
            } else {
                VigilConfig::default()
            }
        }
    };

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    if cli.verbose {
        eprintln!("format: {}", cli.format);
        eprintln!(
            "config: {} check(s), {} label rule(s)",
            config.checks.len(),
            config.labels.len()
        );
    }

    match cli.command {
        None => {
            print_welcome(use_color);
            return Ok(());
        }
        Some(Command::Run {
            ref checks,
            all,
            ref diff_file,
            ref base,
            ref repo,
            update_baseline,
            ref pr,
            ref summary,
            publish,
            ref github_token,
        }) => {
            // Hint: suggest `vigil init` when no config file exists
            if cli.config.is_none() && !Path::new(".vigil.toml").exists() {
                miette::bail!(
                    help = "Run 'vigil init' to create a default .vigil.toml",
                    "No configuration file found"
                );
            }
            if config.checks.is_empty() {
                miette::bail!(
                    help = "Add [[check]] tables to .vigil.toml",
                    "No checks configured"
                );
            }

            let selected: Vec<&CheckConfig> = if checks.is_empty() {
                config.checks.iter().collect()
            } else {
                let mut picked = Vec::with_capacity(checks.len());
                for name in checks {
                    let Some(check) = config.find_check(name) else {
                        let known: Vec<&str> =
                            config.checks.iter().map(|c| c.name.as_str()).collect();
                        miette::bail!(
                            help = format!("configured checks: {}", known.join(", ")),
                            "Unknown check '{name}'"
                        );
                    };
                    picked.push(check);
                }
                picked
            };

            let decisions: Vec<Decision> = if all {
                selected
                    .iter()
                    .map(|c| Decision {
                        check: c.name.clone(),
                        run: true,
                        reason: "forced by --all".to_string(),
                        matched_paths: Vec::new(),
                    })
                    .collect()
            } else {
                let diff_text = resolve_diff(repo, diff_file, base)?;
                let files = vigil_trigger::parse_changed_files(&diff_text).into_diagnostic()?;
                if cli.verbose {
                    eprintln!("diff: {} changed file(s)", files.len());
                }
                let configs: Vec<CheckConfig> = selected.iter().map(|c| (*c).clone()).collect();
                vigil_trigger::evaluate(&configs, &files).into_diagnostic()?
            };

            let store = HistoryStore::for_repo(repo, &config.history.dir);
            let mut reports = Vec::with_capacity(selected.len());

            for (check, decision) in selected.iter().zip(&decisions) {
                if !decision.run {
                    reports.push(CheckReport::skipped(
                        &check.name,
                        check.kind,
                        &decision.reason,
                    ));
                    continue;
                }
                let report = execute_check(
                    check,
                    &decision.reason,
                    repo,
                    &store,
                    update_baseline,
                    cli.verbose,
                )
                .await?;

                if report.status == CheckStatus::Passed && publish {
                    publish_artifacts(check, repo, true);
                }
                reports.push(report);
            }

            let report = RunReport::new(reports);

            match cli.format {
                OutputFormat::Json => println!("{}", report.to_json().into_diagnostic()?),
                OutputFormat::Markdown => print!("{}", report.to_markdown()),
                OutputFormat::Sarif => println!(
                    "{}",
                    serde_json::to_string_pretty(&vigil_report::to_sarif(&report))
                        .into_diagnostic()?
                ),
                OutputFormat::Text => print!("{report}"),
            }

            deliver_notifications(&report, &config, pr, summary, github_token.as_deref()).await;

            if !report.passed() {
                std::process::exit(1);
            }
        }
        Some(Command::Changes {
            ref file,
            ref base,
            ref repo,
        }) => {
            if cli.format == OutputFormat::Sarif {
                miette::bail!("SARIF output is only supported for the run subcommand.");
            }
            let diff_text = resolve_diff(repo, file, base)?;
            let files = vigil_trigger::parse_changed_files(&diff_text).into_diagnostic()?;
            let decisions = vigil_trigger::evaluate(&config.checks, &files).into_diagnostic()?;

            match cli.format {
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "files": files,
                        "decisions": decisions,
                    });
                    println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
                }
                OutputFormat::Markdown => {
                    println!("# Changed Files\n");
                    println!("| File | Status | +/- |");
                    println!("|------|--------|-----|");
                    for f in &files {
                        println!(
                            "| `{}` | {} | +{}/-{} |",
                            f.path.display(),
                            f.status,
                            f.added,
                            f.deleted
                        );
                    }
                    if !decisions.is_empty() {
                        println!("\n## Triggered Checks\n");
                        for d in &decisions {
                            let mark = if d.run { "runs" } else { "skipped" };
                            println!("- **{}**: {mark} ({})", d.check, d.reason);
                        }
                    }
                }
                OutputFormat::Text => {
                    println!("Changed files ({}):", files.len());
                    for f in &files {
                        println!("  {f}");
                    }
                    if !decisions.is_empty() {
                        println!("\nTrigger decisions:");
                        for d in &decisions {
                            let mark = if d.run { "run " } else { "skip" };
                            println!("  {mark} {:<24} {}", d.check, d.reason);
                        }
                    }
                }
                OutputFormat::Sarif => unreachable!(),
            }
        }
        Some(Command::History { ref check, limit }) => {
            if cli.format == OutputFormat::Sarif {
                miette::bail!("SARIF output is only supported for the run subcommand.");
            }
            let cwd = std::env::current_dir().into_diagnostic()?;
            let store = HistoryStore::for_repo(&cwd, &config.history.dir);

            let Some(check) = check else {
                let known = store.known_checks().into_diagnostic()?;
                match cli.format {
                    OutputFormat::Json => {
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&known).into_diagnostic()?
                        );
                    }
                    _ => {
                        if known.is_empty() {
                            println!(
                                "No stored history under {}.",
                                config.history.dir.display()
                            );
                        } else {
                            println!("Checks with stored history:");
                            for name in &known {
                                println!("  {name}");
                            }
                        }
                    }
                }
                return Ok(());
            };

            let baseline = store.load_baseline(check).into_diagnostic()?;
            let trend = store.load_trend(check).into_diagnostic()?;
            let recent: Vec<&TrendPoint> =
                trend.iter().rev().take(limit).rev().collect();

            match cli.format {
                OutputFormat::Json => {
                    let json = serde_json::json!({
                        "check": check,
                        "baseline": baseline,
                        "trend": recent,
                    });
                    println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
                }
                OutputFormat::Markdown => {
                    println!("# History: {check}\n");
                    match &baseline {
                        Some(b) => println!(
                            "**Baseline:** {} record(s), saved {}{}\n",
                            b.records.len(),
                            b.saved_at.format("%Y-%m-%d"),
                            b.commit
                                .as_deref()
                                .map(|c| format!(" at {c}"))
                                .unwrap_or_default()
                        ),
                        None => println!("**Baseline:** none\n"),
                    }
                    if !recent.is_empty() {
                        println!("| Date | Records | Total |");
                        println!("|------|---------|-------|");
                        for p in &recent {
                            println!("| {} | {} | {} |", p.date, p.records, p.total_value);
                        }
                    }
                }
                OutputFormat::Text => {
                    match &baseline {
                        Some(b) => println!(
                            "Baseline: {} record(s), saved {}{}",
                            b.records.len(),
                            b.saved_at.format("%Y-%m-%d %H:%M UTC"),
                            b.commit
                                .as_deref()
                                .map(|c| format!(" at {c}"))
                                .unwrap_or_default()
                        ),
                        None => println!("Baseline: none (first run will seed it)"),
                    }
                    if recent.is_empty() {
                        println!("Trend: empty");
                    } else {
                        println!("\n{:<12} {:>8} {:>12}", "Date", "Records", "Total");
                        println!("{}", "-".repeat(34));
                        for p in &recent {
                            println!("{:<12} {:>8} {:>12}", p.date.to_string(), p.records, p.total_value);
                        }
                    }
                }
                OutputFormat::Sarif => unreachable!(),
            }
        }
        Some(Command::Label {
            ref pr,
            ref file,
            apply,
            ref github_token,
        }) => {
            if cli.format == OutputFormat::Sarif {
                miette::bail!("SARIF output is only supported for the run subcommand.");
            }
            if config.labels.is_empty() {
                miette::bail!(
                    help = "Add [[label]] tables to .vigil.toml",
                    "No label rules configured"
                );
            }
            if apply && pr.is_none() {
                miette::bail!("--apply requires --pr");
            }

            let diff_text = if let Some(pr_ref) = pr {
                let (owner, repo, number) =
                    vigil_notify::resolve_pr_reference(pr_ref, &config.github).into_diagnostic()?;
                let client =
                    vigil_notify::GitHubClient::new(github_token.as_deref()).into_diagnostic()?;
                client
                    .get_pr_diff(&owner, &repo, number)
                    .await
                    .into_diagnostic()?
            } else {
                read_diff_input(file)?
            };

            if diff_text.trim().is_empty() {
                miette::bail!(
                    help = "Pipe a diff to vigil, e.g.: git diff main | vigil label\n       Or use --file <path> or --pr owner/repo#123",
                    "Empty diff input"
                );
            }

            let files = vigil_trigger::parse_changed_files(&diff_text).into_diagnostic()?;
            let labels = matched_labels(&config, &files)?;

            match cli.format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&labels).into_diagnostic()?
                    );
                }
                OutputFormat::Markdown => {
                    if labels.is_empty() {
                        println!("No labels matched.");
                    } else {
                        let cells: Vec<String> =
                            labels.iter().map(|l| format!("`{l}`")).collect();
                        println!("**Labels:** {}", cells.join(", "));
                    }
                }
                OutputFormat::Text => {
                    if labels.is_empty() {
                        println!("No labels matched.");
                    } else {
                        for label in &labels {
                            println!("{label}");
                        }
                    }
                }
                OutputFormat::Sarif => unreachable!(),
            }

            if apply && !labels.is_empty() {
                let pr_ref = pr.as_deref().unwrap_or_default();
                let (owner, repo, number) =
                    vigil_notify::resolve_pr_reference(pr_ref, &config.github).into_diagnostic()?;
                let client =
                    vigil_notify::GitHubClient::new(github_token.as_deref()).into_diagnostic()?;
                client
                    .apply_labels(&owner, &repo, number, &labels)
                    .await
                    .into_diagnostic()?;
                eprintln!("Applied {} label(s) to {pr_ref}", labels.len());
            }
        }
        Some(Command::Init) => {
            let path = Path::new(".vigil.toml");
            if path.exists() {
                miette::bail!(".vigil.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .vigil.toml with default configuration");
        }
        Some(Command::Doctor) => {
            run_doctor(&config, cli.format, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "vigil", &mut std::io::stdout());
        }
    }

    Ok(())
}
