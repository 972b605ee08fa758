// leasex - score lease field extractions against ground truth

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use leasex_cli::evaluate::{parse_documents, EvaluateError, Evaluator};
use leasex_cli::judge::CommandJudge;
use leasex_cli::report;
use leasex_scoring::{FieldsConfig, Judge, MatcherRegistry, Params};
use serde_json::Value;

use exit_codes::{
    EXIT_BELOW_THRESHOLD, EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS,
    EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "leasex")]
#[command(about = "Score lease field extractions against ground truth")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate predicted documents against gold documents
    #[command(after_help = "\
Examples:
  leasex evaluate --config fields.toml --gold gold.json --pred pred.json
  leasex evaluate --config fields.toml --gold gold.json --pred pred.json -o report.csv --summary summary.txt
  leasex evaluate --config fields.toml --gold gold.json --pred pred.json --min-accuracy 0.9
  leasex evaluate --config fields.toml --gold gold.json --pred pred.json --judge-cmd ./judge.sh")]
    Evaluate {
        /// Field configuration (.toml or .json)
        #[arg(long, short = 'c')]
        config: PathBuf,

        /// JSON object mapping document name to gold annotation document
        #[arg(long)]
        gold: PathBuf,

        /// JSON object mapping document name to predicted annotation document
        #[arg(long)]
        pred: PathBuf,

        /// Write the per-field CSV report here
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the text summary here
        #[arg(long)]
        summary: Option<PathBuf>,

        /// Print the full evaluation as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Command used as the LLM judge for json fields
        #[arg(long, value_name = "CMD", env = "LEASEX_JUDGE_CMD")]
        judge_cmd: Option<String>,

        /// Fail with exit code 6 when overall accuracy is below this value
        #[arg(long, value_name = "X")]
        min_accuracy: Option<f64>,
    },

    /// Parse and validate a field configuration
    #[command(after_help = "\
Examples:
  leasex validate fields.toml
  leasex validate fields.json")]
    Validate {
        /// Field configuration (.toml or .json)
        config: PathBuf,
    },

    /// Score one gold/predicted pair with a single matcher
    #[command(after_help = "\
Examples:
  leasex score --type date 2024-01-15 01/15/2024
  leasex score --type number '$1M' 1000000
  leasex score --type enum --params '{\"preset\": \"yes_no_na\"}' yes Y
  leasex score --type json '[{\"name\": \"A\"}]' '[]' --json")]
    Score {
        /// Matcher type (string, number, float, boolean, date, enum, phone, address, json)
        #[arg(long = "type", short = 't')]
        field_type: String,

        /// Matcher params as a JSON object
        #[arg(long, value_name = "JSON")]
        params: Option<String>,

        /// Field name used in feedback
        #[arg(long, default_value = "field")]
        field: String,

        /// Print {"score", "feedback"} as JSON
        #[arg(long)]
        json: bool,

        /// Command used as the LLM judge (json type only)
        #[arg(long, value_name = "CMD", env = "LEASEX_JUDGE_CMD")]
        judge_cmd: Option<String>,

        /// Gold value; parsed as JSON when possible, otherwise taken as text
        gold: String,

        /// Predicted value; parsed as JSON when possible, otherwise taken as text
        pred: String,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("LEASEX_COMMIT"), ")",
        "\nscoring: leasex-scoring ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("LEASEX_TARGET"),
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Evaluate {
            config,
            gold,
            pred,
            output,
            summary,
            json,
            judge_cmd,
            min_accuracy,
        } => cmd_evaluate(config, gold, pred, output, summary, json, judge_cmd, min_accuracy),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Score {
            field_type,
            params,
            field,
            json,
            judge_cmd,
            gold,
            pred,
        } => cmd_score(field_type, params, field, json, judge_cmd, gold, pred),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn eval(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<EvaluateError> for CliError {
    fn from(err: EvaluateError) -> Self {
        match err {
            EvaluateError::Documents(_) => CliError::parse(err.to_string()),
            EvaluateError::JsonRef { .. } => CliError::config(err.to_string())
                .with_hint("json_ref must be STATIC::<section>::<key>, TABLE::<section>::<table>, or TABLE_FILTER::..."),
            EvaluateError::Scoring(_) => CliError::config(err.to_string()),
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))
}

fn load_config(path: &Path, registry: &MatcherRegistry) -> Result<FieldsConfig, CliError> {
    let text = read_file(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        FieldsConfig::from_json(&text, registry)
    } else {
        FieldsConfig::from_toml(&text, registry)
    };
    parsed.map_err(|e| CliError::config(format!("{}: {e}", path.display())))
}

fn judge_from(cmd: Option<String>) -> Result<Option<Arc<dyn Judge>>, CliError> {
    match cmd {
        None => Ok(None),
        Some(line) => {
            let judge = CommandJudge::from_command_line(&line)
                .ok_or_else(|| CliError::args("--judge-cmd is empty"))?;
            Ok(Some(Arc::new(judge)))
        }
    }
}

fn write_output(path: &Path, contents: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, contents)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

// ============================================================================
// evaluate
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_evaluate(
    config_path: PathBuf,
    gold_path: PathBuf,
    pred_path: PathBuf,
    output: Option<PathBuf>,
    summary: Option<PathBuf>,
    json: bool,
    judge_cmd: Option<String>,
    min_accuracy: Option<f64>,
) -> Result<(), CliError> {
    if let Some(min) = min_accuracy {
        if !(0.0..=1.0).contains(&min) {
            return Err(CliError::args(format!("--min-accuracy must be in [0, 1], got {min}")));
        }
    }

    let registry = MatcherRegistry::builtin();
    let config = load_config(&config_path, &registry)?;
    let evaluator = Evaluator::new(&config, &registry, judge_from(judge_cmd)?)?;

    let gold = parse_documents(&read_file(&gold_path)?)
        .map_err(|e| CliError::parse(format!("{}: {e}", gold_path.display())))?;
    let pred = parse_documents(&read_file(&pred_path)?)
        .map_err(|e| CliError::parse(format!("{}: {e}", pred_path.display())))?;

    let eval = evaluator.evaluate_all(&gold, &pred)?;

    if let Some(ref path) = output {
        let mut buf = Vec::new();
        report::write_csv(&eval, &mut buf).map_err(|e| CliError::io(format!("CSV write error: {e}")))?;
        write_output(path, &buf)?;
    }

    if let Some(ref path) = summary {
        let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        write_output(path, report::summary_text(&eval, &generated).as_bytes())?;
    }

    if json {
        let json_str = serde_json::to_string_pretty(&eval)
            .map_err(|e| CliError::eval(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    let accuracy = eval.overall_accuracy();
    eprintln!(
        "evaluated {} document(s), {} skipped: {}/{} field evaluations correct ({:.2}%)",
        eval.processed,
        eval.skipped,
        eval.total_correct(),
        eval.total_evaluations(),
        accuracy * 100.0,
    );

    if let Some(min) = min_accuracy {
        if accuracy < min {
            return Err(CliError {
                code: EXIT_BELOW_THRESHOLD,
                message: format!("overall accuracy {accuracy:.4} is below {min:.4}"),
                hint: None,
            });
        }
    }
    Ok(())
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let registry = MatcherRegistry::builtin();
    let config = load_config(&config_path, &registry)?;
    let matchers = config
        .matchers(&registry)
        .map_err(|e| CliError::config(e.to_string()))?;

    let missing_refs = config.fields.values().filter(|f| f.json_ref.is_none()).count();
    eprintln!(
        "valid: {} field(s), {} without json_ref",
        matchers.len(),
        missing_refs,
    );
    for (name, matcher) in &matchers {
        eprintln!("  {name}: {}", matcher.type_name());
    }
    Ok(())
}

// ============================================================================
// score
// ============================================================================

/// JSON when it parses, otherwise the raw text.
fn cli_value(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn cmd_score(
    field_type: String,
    params: Option<String>,
    field: String,
    json: bool,
    judge_cmd: Option<String>,
    gold: String,
    pred: String,
) -> Result<(), CliError> {
    let params: Params = match params {
        None => Params::new(),
        Some(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(CliError::args("--params must be a JSON object")),
            Err(e) => return Err(CliError::args(format!("--params is not valid JSON: {e}"))),
        },
    };

    let registry = MatcherRegistry::builtin();
    if !registry.is_registered(&field_type) {
        log::warn!("unknown type '{field_type}', scoring as string");
    }
    let mut matcher = registry
        .create(&field, &field_type, &params)
        .map_err(|e| CliError::config(e.to_string()))?;
    if let Some(judge) = judge_from(judge_cmd)? {
        matcher = matcher.with_judge(judge);
    }

    let result = matcher
        .score(&cli_value(gold), &cli_value(pred))
        .map_err(|e| CliError::config(e.to_string()))?;

    if json {
        println!(
            "{}",
            serde_json::json!({"score": result.score, "feedback": result.feedback})
        );
    } else {
        println!("score: {:.3}", result.score);
        println!("{}", result.feedback);
    }
    Ok(())
}
