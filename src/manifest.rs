use crate::errors::*;
use base64::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Inputs starting with this marker carry the lock file inline
pub const INLINE_PREFIX: &str = "data://text/plain;base64,";
pub const LOCK_FILE: &str = "composer.lock";
pub const MANIFEST_FILE: &str = "composer.json";
/// Versions containing this are matched against their install time
pub const DEV_MARKER: &str = "dev";

const SECTIONS: &[&str] = &["packages", "packages-dev"];

#[derive(Debug, PartialEq, Eq)]
pub enum ManifestSource {
    File(PathBuf),
    Inline(Vec<u8>),
}

impl ManifestSource {
    pub fn is_inline(&self) -> bool {
        matches!(self, ManifestSource::Inline(_))
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        match self {
            ManifestSource::File(path) => fs::read(path).map_err(|err| {
                Error::runtime(format!("Failed to read lock file {:?}: {}", path, err))
            }),
            ManifestSource::Inline(bytes) => Ok(bytes.clone()),
        }
    }
}

pub fn resolve(input: &str) -> Result<ManifestSource> {
    if let Some(encoded) = input.strip_prefix(INLINE_PREFIX) {
        let bytes = BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|err| Error::runtime(format!("Invalid inline lock file: {}", err)))?;
        debug!("Using inline lock file ({} bytes)", bytes.len());
        return Ok(ManifestSource::Inline(bytes));
    }

    let mut path = PathBuf::from(input);
    if path.is_dir() && path.join(LOCK_FILE).exists() {
        path.push(LOCK_FILE);
    } else if let Some(prefix) = input.strip_suffix(MANIFEST_FILE) {
        path = PathBuf::from(format!("{}{}", prefix, LOCK_FILE));
    }

    if !path.is_file() {
        return Err(Error::runtime("Lock file does not exist."));
    }

    debug!("Resolved lock file to {:?}", path);
    Ok(ManifestSource::File(path))
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct Manifest {
    #[serde(rename = "content-hash")]
    pub content_hash: String,
    pub packages: Vec<Package>,
    #[serde(rename = "packages-dev")]
    pub packages_dev: Vec<Package>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    /// Install time, only kept for dev versions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<Value>,
}

impl Package {
    fn from_entry(entry: &Value) -> Result<Package> {
        let field = |key: &str| {
            entry
                .get(key)
                .and_then(Value::as_str)
                .map(String::from)
                .ok_or_else(|| {
                    Error::runtime(format!("Lock file has a package without a {:?}", key))
                })
        };
        let name = field("name")?;
        let version = field("version")?;

        let time = match entry.get("time") {
            Some(time) if !time.is_null() && version.contains(DEV_MARKER) => Some(time.clone()),
            _ => None,
        };

        Ok(Package {
            name,
            version,
            time,
        })
    }
}

impl Manifest {
    pub fn parse(bytes: &[u8]) -> Result<Manifest> {
        let contents: Value = serde_json::from_slice(bytes)
            .map_err(|err| Error::runtime(format!("Failed to parse lock file: {}", err)))?;
        if !contents.is_object() {
            return Err(Error::runtime("Lock file is not a json object"));
        }

        let content_hash = contents
            .get("content-hash")
            .or_else(|| contents.get("hash"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut manifest = Manifest {
            content_hash,
            ..Default::default()
        };

        for key in SECTIONS {
            let Some(entries) = contents.get(*key).and_then(Value::as_array) else {
                debug!("Lock file has no {:?} list, skipping", key);
                continue;
            };
            let packages = entries
                .iter()
                .map(Package::from_entry)
                .collect::<Result<Vec<_>>>()?;

            if *key == "packages" {
                manifest.packages = packages;
            } else {
                manifest.packages_dev = packages;
            }
        }

        Ok(manifest)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|err| Error::runtime(format!("Failed to serialize manifest: {}", err)))
    }
}

/// Reduce a lock file to the payload submitted to the service
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>> {
    let manifest = Manifest::parse(bytes)?;
    debug!(
        "Normalized lock file: content-hash={:?}, packages={}, packages-dev={}",
        manifest.content_hash,
        manifest.packages.len(),
        manifest.packages_dev.len()
    );
    manifest.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize_value(value: Value) -> Result<Value> {
        let bytes = normalize(&serde_json::to_vec(&value).unwrap())?;
        Ok(serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_normalize_keeps_name_and_version() -> Result<()> {
        let out = normalize_value(json!({
            "content-hash": "abc123",
            "packages": [
                {"name": "acme/foo", "version": "1.0.0", "type": "library", "dist": {}},
            ],
            "packages-dev": [
                {"name": "acme/test", "version": "2.1.0"},
            ],
        }))?;
        assert_eq!(
            out,
            json!({
                "content-hash": "abc123",
                "packages": [{"name": "acme/foo", "version": "1.0.0"}],
                "packages-dev": [{"name": "acme/test", "version": "2.1.0"}],
            })
        );
        Ok(())
    }

    #[test]
    fn test_install_time_only_for_dev_versions() -> Result<()> {
        let out = normalize_value(json!({
            "packages": [
                {"name": "a/dev-no-time", "version": "dev-master"},
                {"name": "a/stable-time", "version": "1.2.3", "time": "2020-01-01 00:00:00"},
                {"name": "a/dev-time", "version": "1.x-dev", "time": "2020-02-02 00:00:00"},
            ],
        }))?;
        let packages = out["packages"].as_array().unwrap();
        assert!(packages[0].get("time").is_none());
        assert!(packages[1].get("time").is_none());
        assert_eq!(packages[2]["time"], json!("2020-02-02 00:00:00"));
        Ok(())
    }

    #[test]
    fn test_legacy_hash_fallback() -> Result<()> {
        let out = normalize_value(json!({"hash": "legacy", "packages": []}))?;
        assert_eq!(out["content-hash"], json!("legacy"));

        let out = normalize_value(json!({"packages": []}))?;
        assert_eq!(out["content-hash"], json!(""));
        Ok(())
    }

    #[test]
    fn test_non_array_sections_are_skipped() -> Result<()> {
        let out = normalize_value(json!({
            "content-hash": "x",
            "packages": {"name": "not-a-list"},
            "packages-dev": null,
        }))?;
        assert_eq!(out["packages"], json!([]));
        assert_eq!(out["packages-dev"], json!([]));
        Ok(())
    }

    #[test]
    fn test_normalize_is_idempotent() -> Result<()> {
        let lock = serde_json::to_vec(&json!({
            "content-hash": "feed",
            "packages": [
                {"name": "acme/foo", "version": "dev-main", "time": "2021-03-04T05:06:07+00:00"},
                {"name": "acme/bar", "version": "3.0.0", "time": "2021-03-04T05:06:07+00:00"},
            ],
            "packages-dev": [],
        }))
        .unwrap();
        let once = normalize(&lock)?;
        let twice = normalize(&once)?;
        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn test_invalid_lock_files() {
        assert!(matches!(normalize(b"not json"), Err(Error::Runtime(_))));
        assert!(matches!(normalize(b"[1, 2]"), Err(Error::Runtime(_))));
        assert!(matches!(
            normalize(br#"{"packages": [{"version": "1.0.0"}]}"#),
            Err(Error::Runtime(_))
        ));
    }

    #[test]
    fn test_resolve_inline_payload() -> Result<()> {
        let lock = br#"{"packages": []}"#;
        let input = format!("{}{}", INLINE_PREFIX, BASE64_STANDARD.encode(lock));
        let source = resolve(&input)?;
        assert!(source.is_inline());
        assert_eq!(source.read()?, lock.to_vec());
        Ok(())
    }

    #[test]
    fn test_resolve_invalid_inline_payload() {
        let input = format!("{}%%%", INLINE_PREFIX);
        assert!(matches!(resolve(&input), Err(Error::Runtime(_))));
    }

    #[test]
    fn test_resolve_missing_file() {
        let err = resolve("/nonexistent/path/composer.lock").unwrap_err();
        assert_eq!(err.to_string(), "Lock file does not exist.");
    }

    #[test]
    fn test_resolve_directory_and_manifest_name() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join(LOCK_FILE);
        fs::write(&lock, "{}").unwrap();

        let source = resolve(dir.path().to_str().unwrap())?;
        assert_eq!(source, ManifestSource::File(lock.clone()));

        let json = dir.path().join(MANIFEST_FILE);
        let source = resolve(json.to_str().unwrap())?;
        assert_eq!(source, ManifestSource::File(lock));
        Ok(())
    }

    #[test]
    fn test_resolve_directory_without_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(dir.path().to_str().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Lock file does not exist.");
    }
}
