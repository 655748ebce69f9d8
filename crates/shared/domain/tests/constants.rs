use anvil_domain::constants::{
    CONFIG_DOMAIN_KEY, CONFIG_FILE_NAME_KEY, CONFIG_FOLDER_KEY, DEFAULT_CONFIG_DOMAIN,
    DEFAULT_CONFIG_FILE_NAME, DEFAULT_CONFIG_FOLDER, LOAD_SENTINEL, NULL_SENTINEL,
};

#[test]
fn well_known_keys_match_persisted_names() {
    assert_eq!(CONFIG_DOMAIN_KEY, "configDomain");
    assert_eq!(CONFIG_FOLDER_KEY, "configFolder");
    assert_eq!(CONFIG_FILE_NAME_KEY, "configFileName");
}

#[test]
fn bootstrap_defaults_are_sane() {
    assert_eq!(DEFAULT_CONFIG_DOMAIN, "default");
    assert_eq!(DEFAULT_CONFIG_FOLDER, "config");
    assert_eq!(DEFAULT_CONFIG_FILE_NAME, "default.config");
    assert_eq!(NULL_SENTINEL, "$NULL$");
    assert_eq!(LOAD_SENTINEL, "$LOAD$");
}
