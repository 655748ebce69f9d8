//! Well-known configuration keys and their bootstrap defaults.
//!
//! The keys live in the default domain and describe where the property store keeps
//! its files. The defaults are used until the default domain says otherwise.

/// Key holding the name of the default domain.
pub const CONFIG_DOMAIN_KEY: &str = "configDomain";
/// Key holding the directory where domain files are stored.
pub const CONFIG_FOLDER_KEY: &str = "configFolder";
/// Key holding the file name used by the default domain.
pub const CONFIG_FILE_NAME_KEY: &str = "configFileName";

pub const DEFAULT_CONFIG_DOMAIN: &str = "default";
pub const DEFAULT_CONFIG_FOLDER: &str = "config";
pub const DEFAULT_CONFIG_FILE_NAME: &str = "default.config";

/// Extension of the backing file of every non-default domain (`<folder>/<domain>.config`).
pub const DOMAIN_FILE_EXTENSION: &str = "config";

/// Reserved default meaning "no default: the value must come from the store".
pub const NULL_SENTINEL: &str = "$NULL$";
/// Reserved default meaning "construct the value through the module loader".
pub const LOAD_SENTINEL: &str = "$LOAD$";
