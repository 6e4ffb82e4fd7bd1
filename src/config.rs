use crate::error::{Result, TreeplateError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Name of the mandatory base properties file
pub const BASE_CONFIG_FILE: &str = "config.properties";

/// Merged key/value mapping used to resolve placeholders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Configuration {
    values: BTreeMap<String, String>,
}

impl Configuration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merges `overlay` on top of the current entries; overlay keys win
    pub fn merge(&mut self, overlay: BTreeMap<String, String>) {
        self.values.extend(overlay);
    }
}

impl<K, V> FromIterator<(K, V)> for Configuration
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Path of the overlay file for `profile` inside `config_dir`
#[must_use]
pub fn profile_file(config_dir: &Path, profile: &str) -> PathBuf {
    config_dir.join(format!("config-{profile}.properties"))
}

/// Lists the properties files to merge, base file first, then one file per
/// existing profile overlay in the given order
///
/// # Errors
///
/// Returns `TreeplateError::BaseConfigNotFound` if `config.properties` is missing.
pub fn config_files<S: AsRef<str>>(config_dir: &Path, profiles: &[S]) -> Result<Vec<PathBuf>> {
    let base = config_dir.join(BASE_CONFIG_FILE);
    if !base.is_file() {
        return Err(TreeplateError::BaseConfigNotFound { path: base });
    }

    let mut files = vec![base];
    for profile in profiles.iter().map(AsRef::as_ref) {
        if profile.is_empty() {
            continue;
        }
        let overlay = profile_file(config_dir, profile);
        if overlay.is_file() {
            files.push(overlay);
        } else {
            tracing::debug!(profile, path = %overlay.display(), "No overlay file for profile");
        }
    }

    Ok(files)
}

/// Parses `key=value` lines; lines without `=` or with an empty key are ignored
///
/// # Errors
///
/// Returns the underlying read error.
pub fn parse_properties<R: BufRead>(reader: R) -> io::Result<BTreeMap<String, String>> {
    let mut properties = BTreeMap::new();

    for line in reader.lines() {
        let line = line?;
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        properties.insert(key.to_string(), value.trim().to_string());
    }

    Ok(properties)
}

/// Reads and parses a single properties file
///
/// # Errors
///
/// Returns `TreeplateError::FileIo` if the file cannot be opened or read.
pub fn read_properties_file(path: &Path) -> Result<BTreeMap<String, String>> {
    let file = File::open(path).map_err(|e| TreeplateError::file_io(path, e))?;
    parse_properties(BufReader::new(file)).map_err(|e| TreeplateError::file_io(path, e))
}

/// Loads the base configuration and merges every existing profile overlay
/// over it, later profiles winning
///
/// # Errors
///
/// - `TreeplateError::BaseConfigNotFound` if `config.properties` is missing.
/// - `TreeplateError::FileIo` if a located file cannot be read.
pub fn load_configuration<S: AsRef<str>>(
    config_dir: &Path,
    profiles: &[S],
) -> Result<Configuration> {
    let mut configuration = Configuration::new();

    for file in config_files(config_dir, profiles)? {
        let properties = read_properties_file(&file)?;
        tracing::debug!(path = %file.display(), entries = properties.len(), "Loaded properties");
        configuration.merge(properties);
    }

    Ok(configuration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn test_parse_properties_basic() {
        let input = "name=World\n  greeting =  Hello  \n";
        let props = parse_properties(input.as_bytes()).unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props["name"], "World");
        assert_eq!(props["greeting"], "Hello");
    }

    #[test]
    fn test_parse_properties_first_equals_splits() {
        let props = parse_properties("url=http://host/?a=b\n".as_bytes()).unwrap();
        assert_eq!(props["url"], "http://host/?a=b");
    }

    #[test]
    fn test_parse_properties_ignored_lines() {
        let input = "# a comment\n\n   \n=orphan\n  = also orphan\nempty=\nvalid=1\r\n";
        let props = parse_properties(input.as_bytes()).unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props["empty"], "");
        assert_eq!(props["valid"], "1");
    }

    #[test]
    fn test_parse_properties_duplicate_key_last_wins() {
        let props = parse_properties("k=1\nk=2\n".as_bytes()).unwrap();
        assert_eq!(props["k"], "2");
    }

    #[test]
    fn test_config_files_requires_base() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "config-dev.properties", "a=1");

        let result = config_files(temp_dir.path(), &["dev"]);
        assert!(matches!(
            result,
            Err(TreeplateError::BaseConfigNotFound { .. })
        ));
    }

    #[test]
    fn test_config_files_skips_missing_and_empty_profiles() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), BASE_CONFIG_FILE, "a=1");
        write(temp_dir.path(), "config-prod.properties", "a=2");

        let files = config_files(temp_dir.path(), &["", "dev", "prod"]).unwrap();
        assert_eq!(
            files,
            vec![
                temp_dir.path().join(BASE_CONFIG_FILE),
                temp_dir.path().join("config-prod.properties"),
            ]
        );
    }

    #[test]
    fn test_load_configuration_overlay_precedence() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), BASE_CONFIG_FILE, "host=localhost\nport=80\nname=base");
        write(temp_dir.path(), "config-a.properties", "port=8080\nname=a");
        write(temp_dir.path(), "config-b.properties", "name=b\nextra=yes");

        let config = load_configuration(temp_dir.path(), &["a", "b"]).unwrap();
        assert_eq!(config.get("host"), Some("localhost"));
        assert_eq!(config.get("port"), Some("8080"));
        assert_eq!(config.get("name"), Some("b"));
        assert_eq!(config.get("extra"), Some("yes"));
        assert_eq!(config.len(), 4);

        // Reversed profile order flips the winner
        let config = load_configuration(temp_dir.path(), &["b", "a"]).unwrap();
        assert_eq!(config.get("name"), Some("a"));
    }

    #[test]
    fn test_load_configuration_base_only() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), BASE_CONFIG_FILE, "only=base");

        let config = load_configuration::<&str>(temp_dir.path(), &[]).unwrap();
        assert_eq!(config.get("only"), Some("base"));
        assert_eq!(config.get("missing"), None);
    }

    #[test]
    fn test_read_properties_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_properties_file(&temp_dir.path().join("nope.properties"));
        assert!(matches!(result, Err(TreeplateError::FileIo { .. })));
    }

    #[test]
    fn test_configuration_iter_sorted_and_serialized() {
        let config: Configuration = [("b", "2"), ("a", "1")].into_iter().collect();
        let keys: Vec<_> = config.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(
            serde_json::to_string(&config).unwrap(),
            r#"{"a":"1","b":"2"}"#
        );
    }
}
