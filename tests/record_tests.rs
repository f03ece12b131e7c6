use resilient_locator::record::ingest::{
    BboxInput, ExternalElement, KeywordIntentClassifier, VisionElement, ingest_vision, register_external,
};
use resilient_locator::record::naming::{normalize_page_name, unique_name};
use resilient_locator::record::{ElementRecord, RecordSource, UnitScore};
use serde_json::json;

mod common;

// =========================================================================
// unique_name
// =========================================================================

#[test]
fn unique_name_matches_known_examples() {
    assert_eq!(
        unique_name("saucedemo_login", "login", "Login", "button"),
        "saucedemo_login_login_login_button"
    );
    assert_eq!(
        unique_name("saucedemo_checkout_info", "zip_code", "Zip/Postal Code", "textbox"),
        "saucedemo_checkout_info_zip_code_zip/postal_code_textbox"
    );
}

#[test]
fn unique_name_is_deterministic_and_whitespace_insensitive() {
    let a = unique_name("Page", "add_to_cart", "  Add   to cart ", "Button");
    let b = unique_name("page", "add_to_cart", "Add to cart", "button");
    assert_eq!(a, b);
    assert_eq!(a, "page_add_to_cart_add_to_cart_button");
    for _ in 0..10 {
        assert_eq!(unique_name("page", "add_to_cart", "Add to cart", "button"), a);
    }
}

#[test]
fn unique_name_drops_empty_parts() {
    assert_eq!(unique_name("inventory", "", "Menu", "button"), "inventory_menu_button");
}

#[test]
fn record_constructor_derives_unique_name() {
    let mut r = ElementRecord::new("id-1", "saucedemo_login", "login", "Login", "button");
    assert_eq!(r.unique_name, "saucedemo_login_login_login_button");
    r.label_text = "Sign In".into();
    r.refresh_unique_name();
    assert_eq!(r.unique_name, "saucedemo_login_login_sign_in_button");
}

// =========================================================================
// Page names
// =========================================================================

#[test]
fn page_name_from_urls() {
    assert_eq!(normalize_page_name("https://www.saucedemo.com/"), "saucedemo_login");
    assert_eq!(normalize_page_name("https://www.saucedemo.com/inventory.html"), "saucedemo_inventory");
    assert_eq!(
        normalize_page_name("https://www.saucedemo.com/checkout-step-one.html"),
        "saucedemo_checkout-step-one"
    );
    assert_eq!(normalize_page_name("http://shop.example.com/a/b"), "shop_a_b");
}

#[test]
fn page_name_from_images_and_plain_names() {
    assert_eq!(normalize_page_name("Checkout_Info.PNG"), "checkout_info");
    assert_eq!(normalize_page_name("login_page.jpeg"), "login_page");
    assert_eq!(normalize_page_name("  Saucedemo_Login  "), "saucedemo_login");
    assert_eq!(normalize_page_name("report.v2"), "report.v2");
}

// =========================================================================
// Geometry and scores
// =========================================================================

#[test]
fn geometry_setter_clamps_and_syncs_bbox() {
    let mut r = ElementRecord::default();
    r.set_geometry(-10.0, 20.0, 150.5, -3.0);
    assert_eq!(r.geometry.x(), 0.0);
    assert_eq!(r.geometry.height(), 0.0);
    assert_eq!(r.geometry.bbox(), "0,20,150.5,0");
}

#[test]
fn scores_are_clamped() {
    let mut r = ElementRecord::default();
    r.confidence_score = UnitScore::new(3.0);
    r.healing_success_rate = UnitScore::new(-1.0);
    assert_eq!(r.confidence_score.get(), 1.0);
    assert_eq!(r.healing_success_rate.get(), 0.0);
}

// =========================================================================
// Persisted layout
// =========================================================================

#[test]
fn persisted_layout_is_flat_with_string_bbox_and_data_attrs() {
    let mut r = common::login_button();
    r.set_geometry(10.0, 20.0, 100.0, 40.0);
    r.data_attrs.insert("data-test".into(), "login-button".into());

    let value = serde_json::to_value(&r).unwrap();
    assert_eq!(value["bbox"], "10,20,100,40");
    assert_eq!(value["x"], 10.0);
    assert_eq!(value["height"], 40.0);
    assert_eq!(value["data_attrs"], "{\"data-test\":\"login-button\"}");
    assert_eq!(value["dom_matched"], false);
    assert_eq!(value["source"], "ocr");

    let back: ElementRecord = serde_json::from_value(value).unwrap();
    assert_eq!(back, r);
}

#[test]
fn reads_inline_data_attrs_and_bbox_only_geometry() {
    let value = json!({
        "id": "x1",
        "page_name": "saucedemo_login",
        "unique_name": "saucedemo_login_login_login_button",
        "label_text": "Login",
        "bbox": "5,6,70,30",
        "data_attrs": {"data-test": "login-button", "data-index": 3},
        "confidence_score": 1.4
    });
    let r: ElementRecord = serde_json::from_value(value).unwrap();
    assert_eq!(r.geometry.bbox(), "5,6,70,30");
    assert_eq!(r.data_attrs.get("data-test").map(String::as_str), Some("login-button"));
    assert_eq!(r.data_attrs.get("data-index").map(String::as_str), Some("3"));
    assert_eq!(r.confidence_score.get(), 1.0);
    assert!(!r.dom_matched);
    assert!(r.match_timestamp.is_none());
}

#[test]
fn empty_data_attrs_string_reads_as_empty_map() {
    let r: ElementRecord = serde_json::from_value(json!({"id": "a", "data_attrs": ""})).unwrap();
    assert!(r.data_attrs.is_empty());
    let r: ElementRecord = serde_json::from_value(json!({"id": "a", "data_attrs": null})).unwrap();
    assert!(r.data_attrs.is_empty());
}

// =========================================================================
// Ingest
// =========================================================================

fn vision(label: &str, ocr_type: &str, intent: Option<&str>) -> VisionElement {
    VisionElement {
        label_text: label.into(),
        ocr_type: ocr_type.into(),
        intent: intent.map(str::to_string),
        bbox: None,
        confidence_score: 0.9,
    }
}

#[test]
fn ingest_builds_records_with_stable_ids() {
    let elements = vec![
        vision("Username", "textbox", Some("username")),
        vision("Login", "Button", None),
        vision("   ", "label", None),
    ];
    let first = ingest_vision("saucedemo_login", &elements, &KeywordIntentClassifier);
    let second = ingest_vision("saucedemo_login", &elements, &KeywordIntentClassifier);

    assert_eq!(first.len(), 2, "blank labels are dropped");
    assert_eq!(first[0].id, second[0].id);
    assert_eq!(first[0].unique_name, "saucedemo_login_username_username_textbox");
    assert_eq!(first[1].unique_name, "saucedemo_login_login_login_button");
    assert_eq!(first[1].source, RecordSource::Ocr);
    assert!(!first[1].dom_matched);
    assert!((first[1].confidence_score.get() - 0.9).abs() < 1e-6);
}

#[test]
fn ingest_accepts_every_bbox_shape() {
    let shapes = [
        BboxInput::Text("1,2,3,4".into()),
        BboxInput::Array([1.0, 2.0, 3.0, 4.0]),
        BboxInput::Object {
            x: 1.0,
            y: 2.0,
            width: 3.0,
            height: 4.0,
        },
    ];
    for shape in shapes {
        let mut el = vision("Login", "button", Some("login"));
        el.bbox = Some(shape);
        let records = ingest_vision("p", &[el], &KeywordIntentClassifier);
        assert_eq!(records[0].geometry.bbox(), "1,2,3,4");
    }
}

#[test]
fn vision_json_accepts_mixed_bbox_encodings() {
    let raw = r#"[
        {"label_text": "Login", "ocr_type": "button", "bbox": [10, 10, 100, 40]},
        {"label_text": "Username", "ocr_type": "textbox", "intent": "username", "bbox": "0,0,200,30"}
    ]"#;
    let elements: Vec<VisionElement> = serde_json::from_str(raw).unwrap();
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].confidence_score, 1.0);
    assert!(matches!(elements[1].bbox, Some(BboxInput::Text(_))));
}

// =========================================================================
// Manual registration
// =========================================================================

#[test]
fn external_registration_falls_back_through_label_sources() {
    let input = ExternalElement {
        page_name: "saucedemo_login".into(),
        ocr_type: "textbox".into(),
        tag_name: "INPUT".into(),
        intent: "password".into(),
        placeholder: "Password".into(),
        test_id: Some("password".into()),
        ..ExternalElement::default()
    };
    let r = register_external(&input, &KeywordIntentClassifier);

    assert_eq!(r.label_text, "Password");
    assert_eq!(r.unique_name, "saucedemo_login_password_password_textbox");
    assert_eq!(r.tag_name, "input");
    assert!(r.external);
    assert!(!r.dom_matched);
    assert_eq!(r.source, RecordSource::External);
    assert_eq!(r.geometry.bbox(), "0,0,100,40");
    assert_eq!(r.data_attrs.get("data-test").map(String::as_str), Some("password"));
    assert_eq!(r.id, register_external(&input, &KeywordIntentClassifier).id);
}

#[test]
fn external_registration_uses_value_when_nothing_else() {
    let input = ExternalElement {
        page_name: "p".into(),
        ocr_type: "button".into(),
        value: "Submit".into(),
        ..ExternalElement::default()
    };
    let r = register_external(&input, &KeywordIntentClassifier);
    assert_eq!(r.label_text, "Submit");
    assert_eq!(r.intent, "submit");
}
