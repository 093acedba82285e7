use serde_json::{Map, Value, json};

use crate::session::FormSession;
use crate::spec::field::{FieldKind, FieldOption, FieldSpec};
use crate::submission::SubmitStatus;
use crate::value::to_text;

/// UI control used for a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    /// Single choice from a list, with an empty leading entry.
    Dropdown { placeholder: String },
    /// Mutually exclusive options shown side by side.
    ChoiceGroup,
    MultiLineText,
    /// Single-line input; `input_type` is the HTML input type.
    Input { input_type: &'static str },
}

impl Widget {
    pub fn for_field(field: &FieldSpec) -> Self {
        match field.kind {
            FieldKind::Select => Widget::Dropdown {
                placeholder: field
                    .placeholder
                    .clone()
                    .unwrap_or_else(|| format!("Select {}", field.label)),
            },
            FieldKind::Radio => Widget::ChoiceGroup,
            FieldKind::Textarea => Widget::MultiLineText,
            other => Widget::Input {
                input_type: other.as_str(),
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Widget::Dropdown { .. } => "dropdown",
            Widget::ChoiceGroup => "choice_group",
            Widget::MultiLineText => "multi_line_text",
            Widget::Input { .. } => "input",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderGroup {
    pub index: usize,
    pub total: usize,
    pub id: String,
    pub title: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RenderField {
    pub id: String,
    pub label: String,
    pub help_text: Option<String>,
    pub placeholder: Option<String>,
    pub kind: FieldKind,
    pub widget: Widget,
    pub required: bool,
    pub value: Option<Value>,
    pub error: Option<String>,
    pub options: Vec<FieldOption>,
}

/// Buttons shown below the current group.
#[derive(Debug, Clone)]
pub struct RenderNavigation {
    pub show_previous: bool,
    pub show_next: bool,
    pub show_submit: bool,
    pub submit_label: String,
    pub submit_disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct RenderBanner {
    pub kind: BannerKind,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct RenderEmbed {
    pub url: String,
    pub title: String,
    pub height: String,
}

/// Everything a front end needs to draw the session's current screen.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub form_id: String,
    pub form_title: String,
    pub form_description: Option<String>,
    pub status: SubmitStatus,
    pub group: Option<RenderGroup>,
    pub fields: Vec<RenderField>,
    pub navigation: RenderNavigation,
    pub banner: Option<RenderBanner>,
    /// Present while the external form replaces the local one.
    pub embed: Option<RenderEmbed>,
}

pub fn build_render_payload(session: &FormSession) -> RenderPayload {
    let schema = session.schema();
    let navigator = session.navigator();
    let status = session.status();
    let embed_visible = session.embed_visible();

    let group = session.current_group().map(|group| RenderGroup {
        index: navigator.current(),
        total: navigator.len(),
        id: group.id.clone(),
        title: group.title.clone(),
        description: group.description.clone(),
    });

    let fields = if embed_visible {
        Vec::new()
    } else {
        session
            .current_fields()
            .into_iter()
            .map(|field| {
                let error = session.store().error(&field.id);
                RenderField {
                    id: field.id.clone(),
                    label: field.label.clone(),
                    help_text: field.help_text.clone(),
                    placeholder: field.placeholder.clone(),
                    kind: field.kind,
                    widget: Widget::for_field(field),
                    required: field.required,
                    value: session.store().value(&field.id).cloned(),
                    error: (!error.is_empty()).then(|| error.to_string()),
                    options: field.options.clone(),
                }
            })
            .collect()
    };

    let submitting = status == SubmitStatus::Submitting;
    let navigation = RenderNavigation {
        show_previous: !embed_visible && !navigator.is_first(),
        show_next: !embed_visible && !navigator.is_last(),
        show_submit: !embed_visible && navigator.is_last(),
        submit_label: if submitting {
            "Submitting...".into()
        } else {
            schema.submit_button_text.clone()
        },
        submit_disabled: submitting,
    };

    let banner = match status {
        SubmitStatus::Success => Some(RenderBanner {
            kind: BannerKind::Success,
            message: schema.success_message.clone(),
        }),
        SubmitStatus::Error => Some(RenderBanner {
            kind: BannerKind::Error,
            message: schema.error_message.clone(),
        }),
        _ => None,
    };

    let embed = schema
        .embed
        .as_ref()
        .filter(|_| embed_visible)
        .map(|embed| RenderEmbed {
            url: embed.url.clone(),
            title: embed.title.clone(),
            height: embed.height.clone(),
        });

    RenderPayload {
        form_id: schema.id.clone(),
        form_title: schema.title.clone(),
        form_description: schema.description.clone(),
        status,
        group,
        fields,
        navigation,
        banner,
        embed,
    }
}

/// Render the payload as a structured JSON value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload
        .fields
        .iter()
        .map(|field| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(field.id.clone()));
            map.insert("label".into(), Value::String(field.label.clone()));
            map.insert("type".into(), Value::String(field.kind.as_str().into()));
            map.insert("widget".into(), Value::String(field.widget.as_str().into()));
            map.insert("required".into(), Value::Bool(field.required));
            match &field.widget {
                Widget::Input { input_type } => {
                    map.insert("input_type".into(), Value::String((*input_type).into()));
                }
                Widget::Dropdown { placeholder } => {
                    map.insert("placeholder".into(), Value::String(placeholder.clone()));
                }
                _ => {}
            }
            if !matches!(field.widget, Widget::Dropdown { .. })
                && let Some(placeholder) = &field.placeholder
            {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            if let Some(help) = &field.help_text {
                map.insert("help_text".into(), Value::String(help.clone()));
            }
            if !field.options.is_empty() {
                map.insert(
                    "options".into(),
                    Value::Array(
                        field
                            .options
                            .iter()
                            .map(|option| json!({ "label": option.label, "value": option.value }))
                            .collect(),
                    ),
                );
            }
            map.insert("value".into(), field.value.clone().unwrap_or(Value::Null));
            map.insert(
                "error".into(),
                field.error.clone().map(Value::String).unwrap_or(Value::Null),
            );
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    json!({
        "form_id": payload.form_id,
        "form_title": payload.form_title,
        "description": payload.form_description,
        "status": payload.status.as_str(),
        "group": payload.group.as_ref().map(|group| json!({
            "index": group.index,
            "total": group.total,
            "id": group.id,
            "title": group.title,
            "description": group.description,
        })),
        "fields": fields,
        "navigation": {
            "previous": payload.navigation.show_previous,
            "next": payload.navigation.show_next,
            "submit": payload.navigation.show_submit,
            "submit_label": payload.navigation.submit_label,
            "submit_disabled": payload.navigation.submit_disabled,
        },
        "banner": payload.banner.as_ref().map(|banner| json!({
            "kind": match banner.kind {
                BannerKind::Success => "success",
                BannerKind::Error => "error",
            },
            "message": banner.message,
        })),
        "embed": payload.embed.as_ref().map(|embed| json!({
            "url": embed.url,
            "title": embed.title,
            "height": embed.height,
        })),
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {} ({})", payload.form_title, payload.form_id));
    if let Some(description) = &payload.form_description {
        lines.push(description.clone());
    }

    if let Some(banner) = &payload.banner {
        let prefix = match banner.kind {
            BannerKind::Success => "Success",
            BannerKind::Error => "Error",
        };
        lines.push(format!("{}: {}", prefix, banner.message));
    }

    if payload.status == SubmitStatus::RevealedExternal {
        match &payload.embed {
            Some(embed) => {
                lines.push(format!("External form: {} ({})", embed.title, embed.url));
            }
            None => lines.push("External form is active.".to_string()),
        }
        lines.push("Waiting for the external form to report completion.".to_string());
        return lines.join("\n");
    }

    if let Some(group) = &payload.group {
        lines.push(format!(
            "Step {}/{}: {}",
            group.index + 1,
            group.total,
            group.title
        ));
        if let Some(description) = &group.description {
            lines.push(format!("  {}", description));
        }
    }

    for field in &payload.fields {
        let mut entry = format!(" - {} ({})", field.label, field.id);
        if field.required {
            entry.push_str(" *");
        }
        entry.push_str(&format!(" [{}]", describe_widget(&field.widget)));
        if let Some(value) = &field.value {
            entry.push_str(&format!(" = {}", to_text(Some(value))));
        }
        lines.push(entry);
        if let Some(help) = &field.help_text {
            lines.push(format!("     {}", help));
        }
        if !field.options.is_empty() {
            let options = field
                .options
                .iter()
                .map(|option| format!("{} [{}]", option.label, option.value))
                .collect::<Vec<_>>();
            lines.push(format!("     Options: {}", options.join(", ")));
        }
        if let Some(error) = &field.error {
            lines.push(format!("     ! {}", error));
        }
    }

    let mut buttons = Vec::new();
    if payload.navigation.show_previous {
        buttons.push("Previous".to_string());
    }
    if payload.navigation.show_next {
        buttons.push("Next".to_string());
    }
    if payload.navigation.show_submit {
        buttons.push(payload.navigation.submit_label.clone());
    }
    if !buttons.is_empty() {
        lines.push(format!("Actions: {}", buttons.join(" | ")));
    }

    lines.join("\n")
}

fn describe_widget(widget: &Widget) -> String {
    match widget {
        Widget::Dropdown { .. } => "dropdown".to_string(),
        Widget::ChoiceGroup => "choice".to_string(),
        Widget::MultiLineText => "multi-line".to_string(),
        Widget::Input { input_type } => format!("{} input", input_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::form::FormSchema;
    use std::sync::Arc;

    fn field(kind: FieldKind) -> FieldSpec {
        FieldSpec::new("f", "Thing", kind, "g", 1)
    }

    #[test]
    fn widget_mapping_follows_kind() {
        assert_eq!(
            Widget::for_field(&field(FieldKind::Select)),
            Widget::Dropdown {
                placeholder: "Select Thing".into()
            }
        );
        assert_eq!(Widget::for_field(&field(FieldKind::Radio)), Widget::ChoiceGroup);
        assert_eq!(
            Widget::for_field(&field(FieldKind::Textarea)),
            Widget::MultiLineText
        );
        for kind in [
            FieldKind::Text,
            FieldKind::Number,
            FieldKind::Checkbox,
            FieldKind::Date,
            FieldKind::Email,
            FieldKind::Tel,
        ] {
            assert_eq!(
                Widget::for_field(&field(kind)),
                Widget::Input {
                    input_type: kind.as_str()
                }
            );
        }
    }

    #[test]
    fn first_group_offers_next_only() {
        let session = FormSession::new(Arc::new(FormSchema::quote_request().expect("schema")));
        let payload = build_render_payload(&session);
        assert!(payload.navigation.show_next);
        assert!(!payload.navigation.show_previous);
        assert!(!payload.navigation.show_submit);
        assert_eq!(payload.group.as_ref().map(|g| g.id.as_str()), Some("product-details"));
        assert!(payload.embed.is_none());
        assert!(payload.banner.is_none());
    }
}
