use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};
use tracing::{debug, warn};

use crate::{
    asset::AssetKind,
    error::{Error, Result},
    resolve::Resolver,
};

/// Remote URL rule for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdnProvider {
    /// Registry key (the Asset name or alias it services).
    pub repository: String,
    /// Package name substituted for `%PKG%` when it differs from the key.
    pub package: Option<String>,
    pub url: Option<String>,
    /// Id of a shared template, used when `url` is unset.
    pub provider: Option<String>,
    pub version: Option<String>,
    pub paths: BTreeMap<AssetKind, String>,
    pub files: BTreeMap<AssetKind, BTreeMap<String, String>>,
}

impl CdnProvider {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            ..Self::default()
        }
    }

    pub fn package(&self) -> &str {
        self.package
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.repository)
    }

    /// Synthesizes the CDN URL for one file.
    ///
    /// `path` is the caller's per-kind path, used when the provider has no
    /// override of its own. `Ok(None)` means no URL can be built and the
    /// caller should fall back to a local path.
    pub fn get(
        &self,
        kind: AssetKind,
        asset: &str,
        path: Option<&str>,
        cdn: &CdnRegistry,
    ) -> Result<Option<String>> {
        let Some(template) = self.template(cdn)? else {
            return Ok(None);
        };
        let Some(file) = self.file(kind, asset) else {
            return Ok(None);
        };

        let path = self.paths.get(&kind).map(String::as_str).or(path);
        let url = Resolver::new(self.package(), file)
            .with_path(path)
            .with_version(self.version.as_deref())
            .resolve(template)?;

        Ok(Some(url))
    }

    fn template<'a>(&'a self, cdn: &'a CdnRegistry) -> Result<Option<&'a str>> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return Ok(Some(url));
        }
        match self.provider.as_deref() {
            Some(id) => cdn.template(id).map(Some).ok_or_else(|| {
                Error::Configuration(format!(
                    "CDN entry '{}' references unknown provider '{id}'",
                    self.repository
                ))
            }),
            None => Ok(None),
        }
    }

    /// Remapped file name; an empty remap disables the file.
    fn file<'a>(&'a self, kind: AssetKind, asset: &'a str) -> Option<&'a str> {
        let file = match self.files.get(&kind) {
            Some(remaps) => remaps
                .get(asset)
                .or_else(|| remaps.get(kind.strip_extension(asset)))
                .map(String::as_str)
                .unwrap_or(asset),
            None => asset,
        };
        (!file.is_empty()).then_some(file)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CdnRegistry {
    providers: BTreeMap<String, CdnProvider>,
    templates: BTreeMap<String, String>,
}

impl CdnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the provider for `repository`, creating an empty one first.
    pub fn add(&mut self, repository: &str) -> &mut CdnProvider {
        self.providers
            .entry(repository.to_string())
            .or_insert_with(|| CdnProvider::new(repository))
    }

    pub fn get(&self, repository: &str) -> Option<&CdnProvider> {
        self.providers.get(repository)
    }

    pub fn remove(&mut self, repository: &str) -> Option<CdnProvider> {
        self.providers.remove(repository)
    }

    pub fn add_template(&mut self, id: impl Into<String>, url: impl Into<String>) {
        self.templates.insert(id.into(), url.into());
    }

    pub fn template(&self, id: &str) -> Option<&str> {
        self.templates.get(id).map(String::as_str)
    }

    pub fn providers(&self) -> impl Iterator<Item = &CdnProvider> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Applies a declaration: shared templates first, then package entries.
    /// Disabled entries remove any provider already registered under the key.
    pub fn parse(&mut self, decl: CdnDeclaration) {
        for (id, url) in decl.shared {
            debug!("cdn template {id}: {url}");
            self.add_template(id, url);
        }

        for (key, entry) in decl.entries {
            if entry.disabled {
                if self.remove(&key).is_some() {
                    warn!("cdn entry {key} disabled, dropping existing provider");
                }
                continue;
            }
            entry.apply(self.add(&key));
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CdnPaths {
    #[serde(default)]
    pub js: Option<String>,
    #[serde(default)]
    pub css: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub other: Option<String>,
}

impl CdnPaths {
    pub fn entries(self) -> impl Iterator<Item = (AssetKind, String)> {
        [
            (AssetKind::Js, self.js),
            (AssetKind::Css, self.css),
            (AssetKind::Img, self.img),
            (AssetKind::Other, self.other),
        ]
        .into_iter()
        .filter_map(|(kind, p)| p.map(|p| (kind, p)))
    }
}

/// One package entry of a CDN declaration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CdnEntry {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: CdnPaths,
    #[serde(default)]
    pub js: BTreeMap<String, String>,
    #[serde(default)]
    pub css: BTreeMap<String, String>,
    #[serde(default)]
    pub img: BTreeMap<String, String>,
    #[serde(default)]
    pub other: BTreeMap<String, String>,
    #[serde(default)]
    pub disabled: bool,
}

impl CdnEntry {
    fn apply(self, p: &mut CdnProvider) {
        if self.url.is_some() {
            p.url = self.url;
        }
        if self.provider.is_some() {
            p.provider = self.provider;
        }
        if self.package.is_some() {
            p.package = self.package;
        }
        if self.version.is_some() {
            p.version = self.version;
        }
        p.paths.extend(self.paths.entries());

        for (kind, remaps) in [
            (AssetKind::Js, self.js),
            (AssetKind::Css, self.css),
            (AssetKind::Img, self.img),
            (AssetKind::Other, self.other),
        ] {
            if !remaps.is_empty() {
                p.files.entry(kind).or_default().extend(remaps);
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SharedTemplate {
    Url(String),
    Entry { url: String },
}

impl SharedTemplate {
    fn into_url(self) -> String {
        match self {
            SharedTemplate::Url(url) | SharedTemplate::Entry { url } => url,
        }
    }
}

/// A parsed CDN declaration document.
///
/// The reserved `""` key maps provider ids to shared URL templates; every
/// other key is a package entry.
#[derive(Debug, Clone, Default)]
pub struct CdnDeclaration {
    pub shared: BTreeMap<String, String>,
    pub entries: BTreeMap<String, CdnEntry>,
}

impl CdnDeclaration {
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let sections: BTreeMap<String, serde_json::Value> = serde_json::from_value(value)?;

        let mut decl = Self::default();
        for (key, section) in sections {
            if key.is_empty() {
                let shared: BTreeMap<String, SharedTemplate> = serde_json::from_value(section)?;
                decl.shared = shared.into_iter().map(|(id, t)| (id, t.into_url())).collect();
            } else {
                decl.entries.insert(key, serde_json::from_value(section)?);
            }
        }
        Ok(decl)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::from_value(toml::from_str(text)?)
    }

    /// Loads a `.toml` document, or JSON for any other extension.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }
}
