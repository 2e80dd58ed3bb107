use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Loads, parses and validates a configuration file
///
/// A relative `lexicon-path` is resolved against the directory holding the
/// configuration file, so a config and its lexicon can move together.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use shelf_sentiment::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Review pages: {}", config.scraper.review_pages);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;

    if let Some(lexicon) = config.sentiment.lexicon_path.take() {
        config.sentiment.lexicon_path = Some(resolve_relative(path, &lexicon));
    }

    validate(&config)?;
    Ok(config)
}

/// Parses configuration text without validating it
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    Ok(toml::from_str(content)?)
}

fn resolve_relative(config_path: &Path, target: &str) -> String {
    let target_path = PathBuf::from(target);
    if target_path.is_absolute() {
        return target.to_string();
    }
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.join(target_path).display().to_string(),
        _ => target.to_string(),
    }
}

/// Hex-encoded SHA-256 of the configuration file content
///
/// The hash is recorded on each run so a resumed run can be traced back to
/// the configuration it was started with.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read(path)?;
    Ok(hex::encode(Sha256::digest(&content)))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionKind;
    use crate::url::Site;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[scraper]
site = "iherb"
listing-pages = 3
review-pages = 2
max-concurrent-pages = 4

[retry]
max-attempts = 4
retryable-statuses = [503, 502]

[user-agents]
pool = ["TestAgent/1.0"]

[output]
checkpoint-path = "./checkpoint.db"
export-path = "./export.csv"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.scraper.site, Some(Site::Iherb));
        assert_eq!(config.scraper.listing_pages, 3);
        assert_eq!(config.scraper.max_concurrent_pages, 4);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.retryable_statuses, vec![503, 502]);
        assert_eq!(config.user_agents.pool, vec!["TestAgent/1.0".to_string()]);
        assert_eq!(config.output.partial_path, "./partial_product_data.csv");
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let config_content = r#"
[scraper]

[output]
checkpoint-path = "./checkpoint.csv"
export-path = "./export.csv"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.scraper.site, None);
        assert_eq!(config.scraper.listing_pages, 1);
        assert_eq!(config.scraper.review_pages, 2);
        assert_eq!(config.scraper.review_wait_ms, 2000);
        assert_eq!(config.scraper.session, SessionKind::Http);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.backoff_base, 2);
        assert_eq!(config.user_agents.pool.len(), 3);
        assert!(config.sentiment.lexicon_path.is_none());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[scraper]
max-concurrent-pages = 0

[output]
checkpoint-path = "./checkpoint.db"
export-path = "./export.csv"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_relative_lexicon_path_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "[scraper]\n\n[output]\ncheckpoint-path = \"a.db\"\nexport-path = \"b.csv\"\n\n[sentiment]\nlexicon-path = \"lexicon.txt\"\n").unwrap();
        std::fs::write(dir.path().join("lexicon.txt"), "good\t1.9\n").unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(
            config.sentiment.lexicon_path,
            Some(dir.path().join("lexicon.txt").display().to_string())
        );
    }

    #[test]
    fn test_compute_config_hash() {
        let config_content = "test content";
        let file = create_temp_config(config_content);

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        // Same content should produce same hash
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex characters
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
