use anvil_domain::{DefaultValue, PropertyKey};

#[test]
fn sentinels_decode_to_dedicated_variants() {
    assert_eq!(DefaultValue::parse("$NULL$"), DefaultValue::Null);
    assert_eq!(DefaultValue::parse("$LOAD$"), DefaultValue::Load);
    assert_eq!(DefaultValue::parse("20"), DefaultValue::Value("20".into()));
    assert_eq!(DefaultValue::from(None), DefaultValue::Null);
}

#[test]
fn default_value_round_trips_through_raw_form() {
    for raw in ["$NULL$", "$LOAD$", "23.02"] {
        assert_eq!(DefaultValue::parse(raw.to_owned()).as_raw(), raw);
    }
    assert_eq!(DefaultValue::Load.as_value(), None);
    assert_eq!(DefaultValue::parse("x").as_value(), Some("x"));
}

#[test]
fn key_defaults_to_default_domain_and_validates_name() {
    let key = PropertyKey::in_default("intProp");
    assert_eq!(key.domain, "default");
    assert_eq!(key.to_string(), "default:intProp");
    assert!(key.is_valid());
    assert!(!PropertyKey::new("net", "  ").is_valid());
}

#[test]
fn key_serializes_as_plain_struct() {
    let key = PropertyKey::new("net", "port");
    let json = serde_json::to_value(&key).expect("serialize key");
    assert_eq!(json, serde_json::json!({ "domain": "net", "name": "port" }));
}
