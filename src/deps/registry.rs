//! HTTP clients for the package registries of each ecosystem
//!
//! One GET per lookup, bounded by the agent's global timeout, never retried.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::{Ecosystem, Registry, Release};

const USER_AGENT: &str = concat!("drift/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while asking a registry for the latest release
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("no release listed for {0}")]
    NoRelease(String),

    #[error("registry lookups are disabled")]
    Offline,
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Live registry client backed by a shared ureq agent.
pub struct HttpRegistry {
    agent: ureq::Agent,
}

impl HttpRegistry {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::config::Config::builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> RegistryResult<T> {
        debug!("GET {}", url);
        let response = self
            .agent
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json")
            .call()
            .map_err(|e| RegistryError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(RegistryError::Status {
                url: url.to_string(),
                status,
            });
        }

        response
            .into_body()
            .read_json()
            .map_err(|e| RegistryError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    fn go_proxy(&self, module: &str) -> RegistryResult<Release> {
        let url = format!(
            "https://proxy.golang.org/{}/@latest",
            escape_go_module(module)
        );
        let info: GoProxyInfo = self.fetch_json(&url)?;
        Ok(Release {
            version: info.version,
            published: info.time.as_deref().and_then(parse_timestamp),
        })
    }

    fn npm(&self, package: &str) -> RegistryResult<Release> {
        let name = escape_npm_name(package);
        let latest: NpmVersion =
            self.fetch_json(&format!("https://registry.npmjs.org/{}/latest", name))?;

        // Publish time lives in the full package document; losing it only
        // costs precision, so a failure here is not an error.
        let published = self
            .fetch_json::<NpmPackage>(&format!("https://registry.npmjs.org/{}", name))
            .ok()
            .and_then(|doc| doc.time.get(&latest.version).cloned())
            .and_then(|t| parse_timestamp(&t));

        Ok(Release {
            version: latest.version,
            published,
        })
    }

    fn pypi(&self, package: &str) -> RegistryResult<Release> {
        let doc: PyPiPackage = self.fetch_json(&format!("https://pypi.org/pypi/{}/json", package))?;
        Ok(Release::undated(doc.info.version))
    }

    fn crates_io(&self, package: &str) -> RegistryResult<Release> {
        let doc: CratesIoCrate =
            self.fetch_json(&format!("https://crates.io/api/v1/crates/{}", package))?;
        let version = doc
            .krate
            .max_stable_version
            .or(doc.krate.max_version)
            .ok_or_else(|| RegistryError::NoRelease(package.to_string()))?;
        Ok(Release::undated(version))
    }

    fn maven(&self, package: &str) -> RegistryResult<Release> {
        let (group, artifact) = package
            .split_once(':')
            .ok_or_else(|| RegistryError::NoRelease(package.to_string()))?;
        let url = format!(
            "https://search.maven.org/solrsearch/select?q=g:%22{}%22+AND+a:%22{}%22&rows=1&wt=json",
            group, artifact
        );
        let doc: MavenSearch = self.fetch_json(&url)?;
        doc.response
            .docs
            .into_iter()
            .next()
            .map(|d| Release::undated(d.latest_version))
            .ok_or_else(|| RegistryError::NoRelease(package.to_string()))
    }

    fn rubygems(&self, package: &str) -> RegistryResult<Release> {
        let doc: RubyGem =
            self.fetch_json(&format!("https://rubygems.org/api/v1/gems/{}.json", package))?;
        Ok(Release::undated(doc.version))
    }

    fn packagist(&self, package: &str) -> RegistryResult<Release> {
        let doc: PackagistDoc =
            self.fetch_json(&format!("https://repo.packagist.org/p2/{}.json", package))?;
        let version = doc
            .packages
            .get(package)
            .and_then(|versions| {
                versions
                    .iter()
                    .map(|v| v.version.as_str())
                    .find(|v| !is_dev_version(v))
            })
            .map(|v| v.trim_start_matches('v').to_string())
            .ok_or_else(|| RegistryError::NoRelease(package.to_string()))?;
        Ok(Release::undated(version))
    }

    fn nuget(&self, package: &str) -> RegistryResult<Release> {
        let url = format!(
            "https://api.nuget.org/v3-flatcontainer/{}/index.json",
            package.to_lowercase()
        );
        let doc: NuGetIndex = self.fetch_json(&url)?;
        doc.versions
            .last()
            .map(|v| Release::undated(v.clone()))
            .ok_or_else(|| RegistryError::NoRelease(package.to_string()))
    }
}

impl Registry for HttpRegistry {
    fn latest(&self, ecosystem: Ecosystem, package: &str) -> RegistryResult<Release> {
        match ecosystem {
            Ecosystem::GoProxy => self.go_proxy(package),
            Ecosystem::Npm => self.npm(package),
            Ecosystem::PyPI => self.pypi(package),
            Ecosystem::CratesIo => self.crates_io(package),
            Ecosystem::Maven => self.maven(package),
            Ecosystem::RubyGems => self.rubygems(package),
            Ecosystem::Packagist => self.packagist(package),
            Ecosystem::NuGet => self.nuget(package),
        }
    }
}

/// Registry used when lookups are disabled: every answer is an error.
pub struct OfflineRegistry;

impl Registry for OfflineRegistry {
    fn latest(&self, _ecosystem: Ecosystem, _package: &str) -> RegistryResult<Release> {
        Err(RegistryError::Offline)
    }
}

// Registry response shapes, reduced to the fields we read

#[derive(Deserialize)]
struct GoProxyInfo {
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "Time")]
    time: Option<String>,
}

#[derive(Deserialize)]
struct NpmVersion {
    version: String,
}

#[derive(Deserialize)]
struct NpmPackage {
    #[serde(default)]
    time: HashMap<String, String>,
}

#[derive(Deserialize)]
struct PyPiPackage {
    info: PyPiInfo,
}

#[derive(Deserialize)]
struct PyPiInfo {
    version: String,
}

#[derive(Deserialize)]
struct CratesIoCrate {
    #[serde(rename = "crate")]
    krate: CratesIoInfo,
}

#[derive(Deserialize)]
struct CratesIoInfo {
    max_stable_version: Option<String>,
    max_version: Option<String>,
}

#[derive(Deserialize)]
struct MavenSearch {
    response: MavenResponse,
}

#[derive(Deserialize)]
struct MavenResponse {
    #[serde(default)]
    docs: Vec<MavenDoc>,
}

#[derive(Deserialize)]
struct MavenDoc {
    #[serde(rename = "latestVersion")]
    latest_version: String,
}

#[derive(Deserialize)]
struct RubyGem {
    version: String,
}

#[derive(Deserialize)]
struct PackagistDoc {
    #[serde(default)]
    packages: HashMap<String, Vec<PackagistVersion>>,
}

#[derive(Deserialize)]
struct PackagistVersion {
    version: String,
}

#[derive(Deserialize)]
struct NuGetIndex {
    #[serde(default)]
    versions: Vec<String>,
}

/// Go module proxy paths encode upper-case letters as `!` + lower-case.
fn escape_go_module(module: &str) -> String {
    let mut out = String::with_capacity(module.len());
    for c in module.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Scoped npm packages (`@scope/name`) need the slash escaped.
fn escape_npm_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replacen('/', "%2F", 1)
    } else {
        name.to_string()
    }
}

fn is_dev_version(version: &str) -> bool {
    version.starts_with("dev-") || version.ends_with("-dev")
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_go_module() {
        assert_eq!(
            escape_go_module("github.com/BurntSushi/toml"),
            "github.com/!burnt!sushi/toml"
        );
        assert_eq!(escape_go_module("golang.org/x/mod"), "golang.org/x/mod");
    }

    #[test]
    fn test_escape_npm_name() {
        assert_eq!(escape_npm_name("@types/node"), "@types%2Fnode");
        assert_eq!(escape_npm_name("react"), "react");
    }

    #[test]
    fn test_dev_versions_are_skipped() {
        assert!(is_dev_version("dev-main"));
        assert!(is_dev_version("2.0.x-dev"));
        assert!(!is_dev_version("v7.1.0"));
    }

    #[test]
    fn test_parse_timestamp() {
        let t = parse_timestamp("2024-03-01T12:00:00Z").expect("should parse");
        assert_eq!(t.to_rfc3339(), "2024-03-01T12:00:00+00:00");
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_offline_registry_always_fails() {
        let result = OfflineRegistry.latest(Ecosystem::Npm, "react");
        assert!(matches!(result, Err(RegistryError::Offline)));
    }

    #[test]
    fn test_registry_payloads_decode() {
        let go: GoProxyInfo =
            serde_json::from_str(r#"{"Version":"v1.9.0","Time":"2023-01-02T03:04:05Z"}"#).unwrap();
        assert_eq!(go.version, "v1.9.0");

        let crates: CratesIoCrate =
            serde_json::from_str(r#"{"crate":{"max_stable_version":"1.0.3","max_version":"1.1.0-rc1"}}"#)
                .unwrap();
        assert_eq!(crates.krate.max_stable_version.as_deref(), Some("1.0.3"));

        let maven: MavenSearch = serde_json::from_str(
            r#"{"response":{"numFound":1,"docs":[{"id":"x","latestVersion":"33.0.0-jre"}]}}"#,
        )
        .unwrap();
        assert_eq!(maven.response.docs[0].latest_version, "33.0.0-jre");

        let packagist: PackagistDoc = serde_json::from_str(
            r#"{"packages":{"monolog/monolog":[{"version":"dev-main"},{"version":"v3.5.0"}]}}"#,
        )
        .unwrap();
        assert_eq!(packagist.packages["monolog/monolog"].len(), 2);
    }
}
