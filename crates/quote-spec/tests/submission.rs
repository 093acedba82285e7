use std::sync::Arc;

use serde_json::{Value, json};

use quote_spec::{
    EmbedBridge, FormSchema, FormSession, SessionError, SubmitError, SubmitOutcome, SubmitStatus,
    validate_visible,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "quote_request" => include_str!("../tests/fixtures/quote_request.json"),
        "minimal_quote" => include_str!("../tests/fixtures/minimal_quote.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn session(name: &str) -> FormSession {
    let schema = FormSchema::from_json_str(fixture(name)).expect("schema");
    FormSession::new(Arc::new(schema))
}

#[test]
fn quantity_gate_blocks_then_reveals() {
    let mut session = session("minimal_quote");
    session.set_value("productType", json!("Type A")).unwrap();
    session.next_group();

    let outcome = session.submit().expect("submit");
    let SubmitOutcome::Rejected(errors) = outcome else {
        panic!("expected validation errors");
    };
    assert_eq!(errors["quantity"], "Quantity is required");
    assert_eq!(session.store().error("quantity"), "Quantity is required");
    assert_eq!(session.status(), SubmitStatus::Idle);
    assert!(!session.embed_visible());

    session.set_value("quantity", json!(50)).unwrap();
    assert_eq!(session.submit(), Ok(SubmitOutcome::Revealed));
    assert_eq!(session.status(), SubmitStatus::RevealedExternal);
    assert!(session.embed_visible());
}

#[test]
fn submit_validates_groups_other_than_the_current_one() {
    let mut session = session("quote_request");
    session.next_group();
    session.next_group();
    session.set_value("preferredContact", json!("email")).unwrap();

    let Ok(SubmitOutcome::Rejected(errors)) = session.submit() else {
        panic!("expected validation errors");
    };
    let ids = errors.keys().map(String::as_str).collect::<Vec<_>>();
    assert_eq!(ids, vec!["email", "name", "phone", "productType", "quantity"]);
}

#[test]
fn untouched_optional_phone_blocks_submission() {
    let mut session = session("quote_request");
    for (id, value) in [
        ("productType", json!("Type A")),
        ("quantity", json!(3)),
        ("name", json!("Ada")),
        ("email", json!("ada@example.com")),
        ("preferredContact", json!("email")),
    ] {
        session.set_value(id, value).unwrap();
    }
    session.next_group();
    session.next_group();

    let Ok(SubmitOutcome::Rejected(errors)) = session.submit() else {
        panic!("expected validation errors");
    };
    assert_eq!(errors.len(), 1);
    assert_eq!(errors["phone"], "Phone Number is invalid");
    assert!(!session.embed_visible());

    session.set_value("phone", json!("+15551234567")).unwrap();
    assert_eq!(session.submit(), Ok(SubmitOutcome::Revealed));
}

#[test]
fn hidden_fields_are_exempt() {
    let mut session = session("minimal_quote");
    session.set_value("productType", Value::Null).unwrap();
    session.set_value("quantity", json!(5000)).unwrap();
    assert_eq!(
        session.store().error("quantity"),
        "Quantity must be at most 1000"
    );

    let errors = validate_visible(session.schema(), session.store().state());
    assert!(!errors.contains_key("quantity"));
    assert_eq!(errors["productType"], "Product Type is required");
}

#[test]
fn submit_from_an_earlier_group_is_refused() {
    let mut session = session("minimal_quote");
    assert_eq!(
        session.submit(),
        Err(SessionError::Submit(SubmitError::NotOnFinalGroup {
            current: 0,
            last: 1
        }))
    );
}

#[test]
fn completion_resets_every_field() {
    let bridge = EmbedBridge::new();
    let mounted = session("quote_request").mount(&bridge);
    {
        let mut session = mounted.borrow_mut();
        for (id, value) in [
            ("productType", json!("Type C")),
            ("quantity", json!("10")),
            ("customRequirements", json!("Blue, please")),
            ("name", json!("Ada Lovelace")),
            ("email", json!("ada@example.com")),
            ("phone", json!("+441234567890")),
            ("company", json!("Analytical Engines")),
            ("preferredContact", json!("email")),
            ("urgency", json!("high")),
            ("notes", json!("none")),
        ] {
            session.set_value(id, value).unwrap();
        }
        session.next_group();
        session.next_group();
        assert_eq!(session.submit(), Ok(SubmitOutcome::Revealed));
    }

    bridge.post(&json!({ "event": "formSubmitted" }));

    let session = mounted.borrow();
    assert_eq!(session.status(), SubmitStatus::Success);
    assert!(!session.embed_visible());
    for field in &session.schema().fields {
        assert_eq!(session.store().value(&field.id), None);
        assert_eq!(session.store().error(&field.id), "");
    }
}

#[test]
fn completion_before_reveal_does_nothing() {
    let bridge = EmbedBridge::new();
    let mounted = session("minimal_quote").mount(&bridge);
    mounted
        .borrow_mut()
        .set_value("productType", json!("Type B"))
        .unwrap();
    bridge.post(&json!({ "event": "formSubmitted" }));
    assert_eq!(mounted.borrow().status(), SubmitStatus::Idle);
    assert_eq!(
        mounted.borrow().store().value("productType"),
        Some(&json!("Type B"))
    );
}

#[test]
fn failure_report_leaves_values_for_retry() {
    let mut session = session("minimal_quote");
    session.set_value("productType", json!("Type A")).unwrap();
    session.set_value("quantity", json!(3)).unwrap();
    session.next_group();
    assert_eq!(session.submit(), Ok(SubmitOutcome::Revealed));

    assert!(session.handle_embed_message(&json!({ "event": "formError" })));
    assert_eq!(session.status(), SubmitStatus::Error);
    assert_eq!(session.store().value("quantity"), Some(&json!(3)));
    assert!(!session.report_external_failure(None));
}
