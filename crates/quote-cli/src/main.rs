mod wizard;

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use quote_spec::{
    EmbedBridge, FieldKind, FieldSpec, FormSchema, FormSession, SubmitOutcome, SubmitStatus,
    build_render_payload, render_json_ui, render_text, validate_visible,
};
use serde_json::{Number, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wizard::{AnswerParseError, PromptContext, Verbosity, WizardPresenter};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const SPEC_ENV: &str = "QUOTE_FORM_SPEC";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Quote request form shell",
    long_about = "Renders, validates, and walks through configuration-driven quote request forms"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Render one group of the form with optional prefilled answers.
    Render {
        /// Path to the form schema JSON (defaults to QUOTE_FORM_SPEC or the built-in form).
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
        /// Optional JSON object of field values.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Zero-based group index to render.
        #[arg(long, default_value_t = 0)]
        group: usize,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Validate answers the way a final submit would.
    Validate {
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Check a form schema for structural problems.
    Check {
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
    },
    /// Print the JSON Schema of the form configuration format.
    Schema,
    /// Fill in the form interactively, then wait for the external form.
    Wizard {
        #[arg(long, value_name = "SPEC")]
        spec: Option<PathBuf>,
        /// Show help text, choices, and the rendered screen for every step.
        #[arg(long, alias = "debug")]
        verbose: bool,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let verbose = matches!(cli.command, Command::Wizard { verbose: true, .. });
    init_tracing(verbose);

    match cli.command {
        Command::Render {
            spec,
            answers,
            group,
            format,
        } => run_render(spec, answers, group, format),
        Command::Validate { spec, answers } => run_validate(spec, answers),
        Command::Check { spec } => run_check(spec),
        Command::Schema => run_schema(),
        Command::Wizard { spec, verbose } => {
            let schema = load_schema(spec)?;
            let stdin = io::stdin();
            run_wizard(schema, &mut stdin.lock(), Verbosity::from_verbose(verbose))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "quote_spec=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_schema(spec: Option<PathBuf>) -> CliResult<Arc<FormSchema>> {
    let path = spec.or_else(|| env::var_os(SPEC_ENV).map(PathBuf::from));
    let schema = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading form schema");
            let contents = fs::read_to_string(&path)
                .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
            FormSchema::from_json_str(&contents)?
        }
        None => FormSchema::quote_request()?,
    };
    Ok(Arc::new(schema))
}

fn session_with_answers(
    schema: Arc<FormSchema>,
    answers: Option<PathBuf>,
) -> CliResult<FormSession> {
    let mut session = FormSession::new(schema);
    if let Some(path) = answers {
        let contents = fs::read_to_string(&path)?;
        let answers: Value = serde_json::from_str(&contents)?;
        let map = answers
            .as_object()
            .ok_or("answers file must contain a JSON object")?;
        for (field_id, value) in map {
            session.set_value(field_id, value.clone())?;
        }
    }
    Ok(session)
}

fn run_render(
    spec: Option<PathBuf>,
    answers: Option<PathBuf>,
    group: usize,
    format: RenderMode,
) -> CliResult<()> {
    let schema = load_schema(spec)?;
    if group >= schema.groups.len() {
        return Err(format!(
            "group {} does not exist; the form has {} groups",
            group,
            schema.groups.len()
        )
        .into());
    }
    let mut session = session_with_answers(schema, answers)?;
    for _ in 0..group {
        session.next_group();
    }
    let payload = build_render_payload(&session);
    match format {
        RenderMode::Text => println!("{}", render_text(&payload)),
        RenderMode::Json => println!("{}", serde_json::to_string_pretty(&render_json_ui(&payload))?),
    }
    Ok(())
}

fn run_validate(spec: Option<PathBuf>, answers: PathBuf) -> CliResult<()> {
    let schema = load_schema(spec)?;
    let session = session_with_answers(Arc::clone(&schema), Some(answers))?;
    let errors = validate_visible(&schema, session.store().state());

    println!(
        "Validation result: {}",
        if errors.is_empty() { "valid" } else { "invalid" }
    );
    if errors.is_empty() {
        return Ok(());
    }
    println!("Errors:");
    for (field_id, message) in &errors {
        println!("  {} - {}", field_id, message);
    }
    Err("validation failed".into())
}

fn run_check(spec: Option<PathBuf>) -> CliResult<()> {
    let schema = load_schema(spec)?;
    println!(
        "Schema '{}' is valid: {} groups, {} fields",
        schema.id,
        schema.groups.len(),
        schema.fields.len()
    );
    Ok(())
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(FormSchema);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_wizard(
    schema: Arc<FormSchema>,
    input: &mut impl BufRead,
    verbosity: Verbosity,
) -> CliResult<()> {
    let bridge = EmbedBridge::new();
    let mounted = FormSession::new(Arc::clone(&schema)).mount(&bridge);
    let mut presenter = WizardPresenter::new(verbosity);
    presenter.show_header(&schema);

    loop {
        let (index, total, group) = {
            let session = mounted.borrow();
            let Some(group) = session.current_group().cloned() else {
                return Err("form has no groups".into());
            };
            (session.navigator().current(), session.navigator().len(), group)
        };
        presenter.show_group(index, total, &group);
        fill_group(&mut mounted.borrow_mut(), &presenter, input)?;
        presenter.show_screen(&render_text(&build_render_payload(&mounted.borrow())));

        let last = mounted.borrow().navigator().is_last();
        presenter.show_actions(last, &schema.submit_button_text);
        let action = read_answer(input)?.unwrap_or_default().to_lowercase();
        match action.as_str() {
            "b" | "back" => {
                mounted.borrow_mut().previous_group();
                continue;
            }
            _ if !last => {
                mounted.borrow_mut().next_group();
                continue;
            }
            _ => {}
        }

        let outcome = mounted.borrow_mut().submit()?;
        match outcome {
            SubmitOutcome::Rejected(errors) => {
                presenter.show_rejection(&schema, &errors);
                mounted.borrow_mut().first_group();
            }
            SubmitOutcome::Revealed => break,
        }
    }

    presenter.show_embed(&build_render_payload(&mounted.borrow()));
    loop {
        let Some(line) = read_answer(input)? else {
            println!("No completion received; the external form remains open.");
            return Ok(());
        };
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(payload) => bridge.post(&payload),
            Err(err) => {
                eprintln!("Ignoring message that is not JSON: {}", err);
                continue;
            }
        }

        let status = mounted.borrow().status();
        match status {
            SubmitStatus::Success => {
                info!(form_id = %schema.id, "quote request completed");
                presenter.show_completion(&schema.success_message);
                return Ok(());
            }
            SubmitStatus::Error => {
                presenter.show_external_failure(&schema.error_message);
                return Err("external form reported a failure".into());
            }
            _ => {}
        }
    }
}

/// Prompts for every visible field of the current group, re-evaluating
/// visibility after each answer.
fn fill_group(
    session: &mut FormSession,
    presenter: &WizardPresenter,
    input: &mut impl BufRead,
) -> CliResult<()> {
    let mut asked = BTreeSet::new();
    loop {
        let Some(field) = session
            .current_fields()
            .into_iter()
            .find(|field| !asked.contains(&field.id))
            .cloned()
        else {
            return Ok(());
        };
        asked.insert(field.id.clone());

        loop {
            presenter.show_prompt(&PromptContext::new(&field, session.store().value(&field.id)));
            let raw = read_answer(input)?.ok_or("input closed before the form was submitted")?;
            match parse_answer(&field, &raw) {
                Ok(Some(value)) => {
                    session.set_value(&field.id, value)?;
                    presenter.show_field_error(session.store().error(&field.id));
                    break;
                }
                Ok(None) => break,
                Err(err) => presenter.show_parse_error(&err),
            }
        }
    }
}

fn read_answer(input: &mut impl BufRead) -> CliResult<Option<String>> {
    print!("> ");
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Converts typed input into a field value. `Ok(None)` keeps the current value.
fn parse_answer(field: &FieldSpec, raw: &str) -> Result<Option<Value>, AnswerParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match field.kind {
        FieldKind::Checkbox => parse_checkbox(raw).map(Some),
        FieldKind::Number => parse_number(raw).map(Some),
        FieldKind::Select | FieldKind::Radio => parse_choice(field, raw).map(Some),
        _ => Ok(Some(Value::String(raw.to_string()))),
    }
}

fn parse_checkbox(raw: &str) -> Result<Value, AnswerParseError> {
    match raw.to_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Ok(Value::Bool(true)),
        "n" | "no" | "false" | "0" => Ok(Value::Bool(false)),
        _ => Err(AnswerParseError::new(
            "answer yes or no",
            Some("one of yes/no/y/n/true/false/1/0".into()),
        )),
    }
}

fn parse_number(raw: &str) -> Result<Value, AnswerParseError> {
    if let Ok(value) = raw.parse::<i64>() {
        return Ok(Value::Number(Number::from(value)));
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| AnswerParseError::new("enter a number", Some(format!("got '{}'", raw))))
}

fn parse_choice(field: &FieldSpec, raw: &str) -> Result<Value, AnswerParseError> {
    let by_index = raw
        .parse::<usize>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| field.options.get(index));
    let chosen = by_index.or_else(|| {
        field.options.iter().find(|option| {
            option.value.eq_ignore_ascii_case(raw) || option.label.eq_ignore_ascii_case(raw)
        })
    });
    chosen
        .map(|option| Value::String(option.value.clone()))
        .ok_or_else(|| {
            let values = field
                .options
                .iter()
                .map(|option| option.value.as_str())
                .collect::<Vec<_>>();
            AnswerParseError::new(
                format!("'{}' is not one of the choices", raw),
                Some(values.join(", ")),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote_spec::FieldOption;
    use serde_json::json;
    use std::io::Cursor;

    fn choice_field() -> FieldSpec {
        FieldSpec::new("productType", "Product Type", FieldKind::Select, "g", 1).with_options(vec![
            FieldOption::new("Type A - Standard", "Type A"),
            FieldOption::new("Type B - Premium", "Type B"),
        ])
    }

    #[test]
    fn parse_answer_blank_keeps_value() {
        let field = FieldSpec::new("name", "Name", FieldKind::Text, "g", 1);
        assert!(parse_answer(&field, "   ").unwrap().is_none());
        assert_eq!(parse_answer(&field, "Ada").unwrap(), Some(json!("Ada")));
    }

    #[test]
    fn parse_answer_choice_accepts_index_value_or_label() {
        let field = choice_field();
        assert_eq!(parse_answer(&field, "2").unwrap(), Some(json!("Type B")));
        assert_eq!(parse_answer(&field, "type a").unwrap(), Some(json!("Type A")));
        assert_eq!(
            parse_answer(&field, "Type B - Premium").unwrap(),
            Some(json!("Type B"))
        );
        assert!(parse_answer(&field, "3").is_err());
        assert!(parse_answer(&field, "Type Z").is_err());
    }

    #[test]
    fn parse_answer_number_and_checkbox() {
        let number = FieldSpec::new("quantity", "Quantity", FieldKind::Number, "g", 1);
        assert_eq!(parse_answer(&number, "50").unwrap(), Some(json!(50)));
        assert_eq!(parse_answer(&number, "2.5").unwrap(), Some(json!(2.5)));
        assert!(parse_answer(&number, "lots").is_err());

        let checkbox = FieldSpec::new("agree", "Agree", FieldKind::Checkbox, "g", 1);
        assert_eq!(parse_answer(&checkbox, "Y").unwrap(), Some(json!(true)));
        assert!(parse_answer(&checkbox, "maybe").is_err());
    }

    fn wizard_script(lines: &[&str]) -> Cursor<Vec<u8>> {
        Cursor::new(format!("{}\n", lines.join("\n")).into_bytes())
    }

    #[test]
    fn wizard_completes_after_external_confirmation() {
        let schema = Arc::new(FormSchema::quote_request().expect("schema"));
        let mut input = wizard_script(&[
            "1",
            "50",
            "",
            "Ada Lovelace",
            "ada@example.com",
            "+15551234567",
            "",
            "",
            "email",
            "",
            "",
            "",
            r#"{"event":"heightChanged"}"#,
            r#"{"event":"formSubmitted"}"#,
        ]);
        run_wizard(schema, &mut input, Verbosity::Clean).expect("wizard");
    }

    #[test]
    fn wizard_reports_external_failure() {
        let schema = Arc::new(FormSchema::quote_request().expect("schema"));
        let mut input = wizard_script(&[
            "2",
            "7",
            "",
            "Grace",
            "grace@example.com",
            "+15550100",
            "",
            "",
            "2",
            "",
            "",
            "",
            r#"{"event":"formError"}"#,
        ]);
        assert!(run_wizard(schema, &mut input, Verbosity::Clean).is_err());
    }

    #[test]
    fn wizard_keeps_the_reveal_pending_when_input_ends() {
        let schema = Arc::new(FormSchema::quote_request().expect("schema"));
        let mut input = wizard_script(&[
            "1",
            "50",
            "",
            "Ada Lovelace",
            "ada@example.com",
            "+15551234567",
            "",
            "",
            "email",
            "",
            "",
            "",
        ]);
        run_wizard(schema, &mut input, Verbosity::Clean).expect("wizard");
    }

    #[test]
    fn wizard_fails_when_input_ends_early() {
        let schema = Arc::new(FormSchema::quote_request().expect("schema"));
        let mut input = wizard_script(&["1"]);
        assert!(run_wizard(schema, &mut input, Verbosity::Clean).is_err());
    }
}
