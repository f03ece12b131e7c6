use std::sync::Arc;

use resilient_locator::browser::locator::{Locator, PageAction};
use resilient_locator::context::EngineSettings;
use resilient_locator::error::{HealingOutcome, ResolveError};
use resilient_locator::matcher::describe_record;
use resilient_locator::resolver::{ActionKind, LocatorResolver, StrategyKind, strategy_chain};
use resilient_locator::trace::logger::TraceLogger;

mod common;

use common::{
    FailingEmbedder, FakePage, VectorTableEmbedder, add_to_cart_button, context_with, editable, hidden,
    login_button, ngram_context, record, username_field, visible,
};

fn role(role: &str, name: &str) -> Locator {
    Locator::Role {
        role: role.into(),
        name: Some(name.into()),
    }
}

fn label(text: &str) -> Locator {
    Locator::Label { text: text.into() }
}

fn text(text: &str) -> Locator {
    Locator::Text { text: text.into() }
}

// =========================================================================
// Strategy chain
// =========================================================================

#[test]
fn chain_follows_fixed_precedence() {
    let mut r = username_field();
    r.data_attrs.insert("data-test".into(), "username".into());
    r.data_attrs.insert("data-index".into(), "4".into());
    r.value = "standard_user".into();
    r.dom_id = "user-name".into();
    r.dom_class = "input_error form_input".into();
    r.custom_selector = Some("form #user-name".into());

    let kinds: Vec<StrategyKind> = strategy_chain(&r).iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![
            StrategyKind::TestId,
            StrategyKind::Role,
            StrategyKind::Label,
            StrategyKind::Placeholder,
            StrategyKind::Text,
            StrategyKind::DisplayValue,
            StrategyKind::IdExact,
            StrategyKind::IdPartial,
            StrategyKind::ClassExact,
            StrategyKind::ClassPartial,
            StrategyKind::ClassList,
            StrategyKind::Custom,
        ]
    );

    let chain = strategy_chain(&r);
    assert_eq!(
        chain[0].locator,
        Locator::TestId {
            attribute: "data-test".into(),
            value: "username".into()
        }
    );
    assert_eq!(chain[1].locator, role("textbox", "Username"));
    assert_eq!(
        chain[6].locator,
        Locator::Css {
            selector: "[id=\"user-name\"]".into()
        }
    );
    assert_eq!(
        chain[7].locator,
        Locator::Css {
            selector: "[id*=\"user-name\"]".into()
        }
    );
    assert_eq!(
        chain[10].locator,
        Locator::Css {
            selector: ".input_error.form_input".into()
        }
    );
}

#[test]
fn chain_skips_strategies_without_data() {
    let kinds: Vec<StrategyKind> = strategy_chain(&login_button()).iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![StrategyKind::Role, StrategyKind::Label, StrategyKind::Text]);
}

#[test]
fn display_value_falls_back_to_sample_value() {
    let mut r = username_field();
    r.sample_value = Some("standard_user".into());
    assert!(strategy_chain(&r).iter().any(|a| a.locator
        == Locator::DisplayValue {
            value: "standard_user".into()
        }));
}

// =========================================================================
// Direct resolution
// =========================================================================

#[test]
fn test_id_beats_label_across_runs() {
    let mut r = login_button();
    r.data_attrs.insert("data-test".into(), "login-button".into());
    let ctx = ngram_context(vec![r]);
    let resolver = LocatorResolver::new(&ctx);

    let test_id = Locator::TestId {
        attribute: "data-test".into(),
        value: "login-button".into(),
    };
    let mut page = FakePage::new("https://www.saucedemo.com/")
        .with(test_id.clone(), visible(1))
        .with(label("Login"), visible(1))
        .with(role("button", "Login"), visible(1));

    for _ in 0..5 {
        let handle = resolver
            .resolve("saucedemo_login_login_login_button", &mut page, ActionKind::Click)
            .unwrap();
        assert_eq!(handle.strategy, StrategyKind::TestId);
        assert_eq!(handle.locator, test_id);
        assert!(!handle.was_healed());
    }
}

#[test]
fn falls_through_strategies_in_order() {
    let ctx = ngram_context(vec![login_button()]);
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("about:blank").with(text("Login"), visible(1));

    let strategy = resolver
        .resolve("saucedemo_login_login_login_button", &mut page, ActionKind::Click)
        .unwrap()
        .strategy;
    assert_eq!(strategy, StrategyKind::Text);
    assert_eq!(page.locate_calls, vec![role("button", "Login"), label("Login"), text("Login")]);
}

#[test]
fn fill_requires_an_editable_match() {
    let ctx = ngram_context(vec![username_field()]);
    let resolver = LocatorResolver::new(&ctx);
    let placeholder = Locator::Placeholder {
        text: "Username".into(),
    };
    let mut page = FakePage::new("about:blank")
        .with(role("textbox", "Username"), visible(1))
        .with(placeholder.clone(), editable());

    let name = "saucedemo_login_username_username_textbox";
    let strategy = resolver.resolve(name, &mut page, ActionKind::Fill).unwrap().strategy;
    assert_eq!(strategy, StrategyKind::Placeholder);

    let strategy = resolver.resolve(name, &mut page, ActionKind::Assert).unwrap().strategy;
    assert_eq!(strategy, StrategyKind::Role);
}

#[test]
fn click_requires_a_visible_match() {
    let ctx = ngram_context(vec![login_button()]);
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("about:blank")
        .with(role("button", "Login"), hidden())
        .with(label("Login"), visible(1));

    let handle = resolver
        .resolve("saucedemo_login_login_login_button", &mut page, ActionKind::Click)
        .unwrap();
    assert_eq!(handle.strategy, StrategyKind::Label);
}

#[test]
fn rejected_locator_counts_as_a_miss() {
    let ctx = ngram_context(vec![login_button()]);
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("about:blank")
        .rejecting(role("button", "Login"))
        .with(label("Login"), visible(1));

    let handle = resolver
        .resolve("saucedemo_login_login_login_button", &mut page, ActionKind::Click)
        .unwrap();
    assert_eq!(handle.strategy, StrategyKind::Label);
}

#[test]
fn broken_session_is_an_error_not_a_miss() {
    let ctx = ngram_context(vec![login_button()]);
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("about:blank");
    page.broken = true;

    let err = resolver
        .resolve("saucedemo_login_login_login_button", &mut page, ActionKind::Click)
        .err()
        .unwrap();
    assert!(matches!(err, ResolveError::Session(_)));
    assert_eq!(page.locate_calls.len(), 1);
}

#[test]
fn multiple_matches_keep_the_first() {
    let ctx = ngram_context(vec![add_to_cart_button()]);
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("about:blank").with(role("button", "Add to cart"), visible(6));

    let handle = resolver
        .resolve("saucedemo_inventory_add_to_cart_add_to_cart_button", &mut page, ActionKind::Click)
        .unwrap();
    assert_eq!(handle.strategy, StrategyKind::Role);
    assert_eq!(handle.facts.count, 6);
}

#[test]
fn handle_acts_through_the_winning_locator() {
    let ctx = ngram_context(vec![username_field(), login_button()]);
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("about:blank")
        .with(role("textbox", "Username"), editable())
        .with(role("button", "Login"), visible(1));

    resolver
        .resolve("saucedemo_login_username_username_textbox", &mut page, ActionKind::Fill)
        .unwrap()
        .fill("standard_user")
        .unwrap();
    resolver
        .resolve("saucedemo_login_login_login_button", &mut page, ActionKind::Click)
        .unwrap()
        .click()
        .unwrap();

    assert_eq!(
        page.actions,
        vec![
            (
                role("textbox", "Username"),
                PageAction::Fill {
                    value: "standard_user".into()
                }
            ),
            (role("button", "Login"), PageAction::Click),
        ]
    );
}

// =========================================================================
// Self-healing
// =========================================================================

#[test]
fn renamed_element_heals_to_login_button() {
    let ctx = ngram_context(vec![username_field(), login_button(), add_to_cart_button()]);
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("https://www.saucedemo.com/").with(role("button", "Login"), visible(1));

    let handle = resolver
        .resolve("saucedemo_login_submit_login_button", &mut page, ActionKind::Click)
        .unwrap();
    assert_eq!(handle.healed_to.as_deref(), Some("saucedemo_login_login_login_button"));
    assert_eq!(handle.strategy, StrategyKind::Role);
    assert_eq!(handle.unique_name, "saucedemo_login_submit_login_button");
}

#[test]
fn healing_below_threshold_reports_not_found() {
    let ctx = ngram_context(vec![login_button(), add_to_cart_button()]).with_settings(EngineSettings {
        healing_threshold: 0.95,
        ..EngineSettings::default()
    });
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("https://www.saucedemo.com/").with(role("button", "Login"), visible(1));

    let err = resolver
        .resolve("saucedemo_login_submit_login_button", &mut page, ActionKind::Click)
        .err()
        .unwrap();
    match err {
        ResolveError::NotFound(e) => {
            assert_eq!(e.unique_name, "saucedemo_login_submit_login_button");
            assert_eq!(e.healing, HealingOutcome::NoCandidate { threshold: 0.95 });
            let msg = e.to_string();
            assert!(msg.contains("saucedemo_login_submit_login_button"));
            assert!(msg.contains("self-healing attempted"));
        }
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(page.locate_calls.is_empty(), "no record and no candidate means no page lookups");
}

#[test]
fn healing_threshold_boundary_is_strict() {
    let target = record("p", "go", "Go", "button");
    let description = describe_record(&target);

    let at_threshold = VectorTableEmbedder::new(&[
        ("missing_name", vec![1.0, 0.0, 0.0, 0.0]),
        (description.as_str(), vec![3.0, 9.0, 3.0, 1.0]),
    ]);
    let ctx = context_with(vec![target.clone()], Arc::new(at_threshold));
    let mut page = FakePage::new("about:blank").with(label("Go"), visible(1));
    let err = LocatorResolver::new(&ctx)
        .resolve("missing_name", &mut page, ActionKind::Click)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ResolveError::NotFound(ref e) if e.healing == HealingOutcome::NoCandidate { threshold: 0.3 }
    ));

    let above = VectorTableEmbedder::new(&[
        ("missing_name", vec![1.0, 0.0, 0.0, 0.0]),
        (description.as_str(), vec![3.0, 8.0, 3.0, 1.0]),
    ]);
    let ctx = context_with(vec![target], Arc::new(above));
    let handle = LocatorResolver::new(&ctx)
        .resolve("missing_name", &mut page, ActionKind::Click)
        .unwrap();
    assert_eq!(handle.healed_to.as_deref(), Some("p_go_go_button"));
}

#[test]
fn healing_is_attempted_at_most_once() {
    let mut stale = record("saucedemo_login", "submit", "Login", "button");
    stale.tag_name = "button".into();
    let ctx = ngram_context(vec![stale, login_button(), add_to_cart_button()]);
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("about:blank");

    let err = resolver
        .resolve("saucedemo_login_submit_login_button", &mut page, ActionKind::Click)
        .err()
        .unwrap();
    match err {
        ResolveError::NotFound(e) => match e.healing {
            HealingOutcome::CandidateFailed { healed_to, score } => {
                assert_eq!(healed_to, "saucedemo_login_submit_login_button");
                assert!(score > 0.3);
            }
            other => panic!("expected CandidateFailed, got {:?}", other),
        },
        other => panic!("expected NotFound, got {:?}", other),
    }
    // three direct attempts, three more on the same record after healing
    assert_eq!(page.locate_calls.len(), 6);

    let _ = resolver.resolve("saucedemo_login_submit_login_button", &mut page, ActionKind::Click);
    assert_eq!(page.locate_calls.len(), 12);
}

#[test]
fn missing_element_is_not_redirected_to_a_sibling() {
    let mut username = username_field();
    username.dom_id = "user-name".into();
    let mut password = record("saucedemo_login", "password", "Password", "textbox");
    password.tag_name = "input".into();
    password.placeholder = "Password".into();
    password.dom_id = "password".into();
    let ctx = ngram_context(vec![username, password]);
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("https://www.saucedemo.com/").with(
        Locator::Css {
            selector: "[id=\"password\"]".into(),
        },
        editable(),
    );

    let err = resolver
        .resolve("saucedemo_login_username_username_textbox", &mut page, ActionKind::Fill)
        .err()
        .unwrap();
    match err {
        ResolveError::NotFound(e) => match e.healing {
            HealingOutcome::CandidateFailed { healed_to, .. } => {
                assert_eq!(healed_to, "saucedemo_login_username_username_textbox");
            }
            other => panic!("expected CandidateFailed, got {:?}", other),
        },
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(page.actions.is_empty());
}

#[test]
fn class_list_escapes_leading_digits() {
    let mut r = login_button();
    r.dom_class = "-1col 2up btn-primary".into();
    let chain = strategy_chain(&r);
    let class_list = chain.iter().find(|a| a.kind == StrategyKind::ClassList).unwrap();
    assert_eq!(
        class_list.locator,
        Locator::Css {
            selector: ".-\\31 col.\\32 up.btn-primary".into()
        }
    );
}

#[test]
fn embedding_failure_surfaces_as_not_found() {
    let ctx = context_with(vec![login_button()], Arc::new(FailingEmbedder));
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("about:blank");

    let err = resolver
        .resolve("saucedemo_login_submit_login_button", &mut page, ActionKind::Click)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        ResolveError::NotFound(ref e) if matches!(e.healing, HealingOutcome::Unavailable(_))
    ));
}

// =========================================================================
// Trace output
// =========================================================================

#[test]
fn resolution_trace_is_appended_as_jsonl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trace.jsonl");
    let ctx = ngram_context(vec![login_button()]).with_tracer(TraceLogger::new(path.to_str().unwrap()));
    let resolver = LocatorResolver::new(&ctx);
    let mut page = FakePage::new("about:blank").with(label("Login"), visible(1));

    resolver
        .resolve("saucedemo_login_login_login_button", &mut page, ActionKind::Click)
        .unwrap();
    let _ = resolver.resolve("zzzz_qqqq", &mut page, ActionKind::Click);

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = content.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["resolved_by"], "label");
    assert_eq!(lines[0]["attempts"].as_array().unwrap().len(), 2);
    assert_eq!(lines[0]["attempts"][0]["outcome"], "missed");
    assert!(lines[1]["failure"].as_str().unwrap().contains("zzzz_qqqq"));
}
