use quote_spec::{ErrorMap, FieldKind, FieldSpec, FormSchema, GroupSpec, RenderPayload};
use serde_json::Value;

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: prompts and results only.
    Clean,
    /// Verbose output: help text, choices, and the rendered screen per step.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts and results for the interactive session.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            header_printed: false,
        }
    }

    pub fn show_header(&mut self, schema: &FormSchema) {
        if self.header_printed {
            return;
        }
        println!("Form: {}", schema.title);
        if let Some(description) = &schema.description {
            println!("{}", description);
        }
        self.header_printed = true;
    }

    pub fn show_group(&self, index: usize, total: usize, group: &GroupSpec) {
        println!();
        println!("Step {}/{}: {}", index + 1, total, group.title);
        if let Some(description) = &group.description {
            println!("{}", description);
        }
    }

    pub fn show_screen(&self, text: &str) {
        if self.verbosity.is_verbose() {
            println!("{}", text);
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = prompt.label.clone();
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        if let Some(current) = &prompt.current {
            line.push_str(&format!(" [current: {}]", current));
        }
        println!("{}", line);
        if let Some(help) = &prompt.help {
            println!("  {}", help);
        }
        if !prompt.choices.is_empty() {
            for (index, choice) in prompt.choices.iter().enumerate() {
                println!("  {}) {}", index + 1, choice);
            }
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_field_error(&self, message: &str) {
        if !message.is_empty() {
            println!("  ! {}", message);
        }
    }

    pub fn show_actions(&self, last_group: bool, submit_label: &str) {
        if last_group {
            println!("Action: [s]ubmit ({}), [b]ack (default: submit)", submit_label);
        } else {
            println!("Action: [n]ext, [b]ack (default: next)");
        }
    }

    pub fn show_rejection(&self, schema: &FormSchema, errors: &ErrorMap) {
        println!("Please correct the following before submitting:");
        for (field_id, message) in errors {
            let label = schema
                .field(field_id)
                .map(|field| field.label.as_str())
                .unwrap_or(field_id.as_str());
            println!("  - {}: {}", label, message);
        }
    }

    pub fn show_embed(&self, payload: &RenderPayload) {
        println!();
        match &payload.embed {
            Some(embed) => println!("Continue in the external form: {} ({})", embed.title, embed.url),
            None => println!("Continue in the external form."),
        }
        println!("Paste messages from the external form as JSON, one per line.");
    }

    pub fn show_completion(&self, message: &str) {
        println!("{}", message);
    }

    pub fn show_external_failure(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Context used to format a single field prompt.
pub struct PromptContext {
    pub label: String,
    pub required: bool,
    pub hint: Option<String>,
    pub help: Option<String>,
    pub current: Option<String>,
    pub choices: Vec<String>,
}

impl PromptContext {
    pub fn new(field: &FieldSpec, current: Option<&Value>) -> Self {
        Self {
            label: field.label.clone(),
            required: field.required,
            hint: kind_hint(field),
            help: field.help_text.clone(),
            current: current.map(display_value),
            choices: field
                .options
                .iter()
                .map(|option| option.label.clone())
                .collect(),
        }
    }
}

fn kind_hint(field: &FieldSpec) -> Option<String> {
    match field.kind {
        FieldKind::Checkbox => Some("(yes/no)".to_string()),
        FieldKind::Number => {
            let range = field.validation.as_ref().and_then(|rule| match (rule.min, rule.max) {
                (Some(min), Some(max)) => Some(format!("{}-{}", min, max)),
                (Some(min), None) => Some(format!(">= {}", min)),
                (None, Some(max)) => Some(format!("<= {}", max)),
                (None, None) => None,
            });
            Some(match range {
                Some(range) => format!("(number, {})", range),
                None => "(number)".to_string(),
            })
        }
        FieldKind::Date => Some("(YYYY-MM-DD)".to_string()),
        FieldKind::Select | FieldKind::Radio => Some("(choose a number or value)".to_string()),
        FieldKind::Textarea => Some("(single line)".to_string()),
        FieldKind::Text | FieldKind::Email | FieldKind::Tel => field
            .placeholder
            .as_ref()
            .map(|placeholder| format!("({})", placeholder)),
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}
