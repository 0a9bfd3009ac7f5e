use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::LazyLock,
};
use tracing::debug;

use crate::{cdn::CdnRegistry, error::Result};

static ABSOLUTE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:https?:)?//").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Js,
    Css,
    Img,
    Other,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [AssetKind::Js, AssetKind::Css, AssetKind::Img, AssetKind::Other];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetKind::Js => "js",
            AssetKind::Css => "css",
            AssetKind::Img => "img",
            AssetKind::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "js" | "javascript" => Some(AssetKind::Js),
            "css" | "stylesheet" => Some(AssetKind::Css),
            "img" | "image" => Some(AssetKind::Img),
            "other" => Some(AssetKind::Other),
            _ => None,
        }
    }

    /// Canonical extension, if the kind has one.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            AssetKind::Js => Some(".js"),
            AssetKind::Css => Some(".css"),
            AssetKind::Img | AssetKind::Other => None,
        }
    }

    /// Appends the canonical extension unless the name carries a query string
    /// or already ends with it.
    pub fn fix_extension(self, asset: &str) -> String {
        match self.extension() {
            Some(ext) if !asset.contains('?') && !asset.ends_with(ext) => format!("{asset}{ext}"),
            _ => asset.to_string(),
        }
    }

    /// The name with the canonical extension removed, if present.
    pub fn strip_extension(self, asset: &str) -> &str {
        match self.extension() {
            Some(ext) => asset.strip_suffix(ext).unwrap_or(asset),
            None => asset,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    /// Prepended to the URL list, e.g. a core library that must load first.
    First,
}

pub fn is_absolute_url(asset: &str) -> bool {
    ABSOLUTE_URL.is_match(asset)
}

/// Where local URLs are rooted and which CDN providers apply.
#[derive(Debug, Clone, Copy)]
pub struct UrlEnv<'a> {
    pub root: &'a str,
    pub cdn: &'a CdnRegistry,
}

/// A named group of static files.
///
/// `name` is the logical package (`None` for the global bucket); `alias`
/// overrides the key used for CDN lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: Option<String>,
    pub alias: Option<String>,
    pub paths: BTreeMap<AssetKind, String>,
    pub use_root: bool,
}

impl Asset {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name: name.filter(|n| !n.is_empty()),
            alias: None,
            paths: BTreeMap::new(),
            use_root: true,
        }
    }

    /// Files served straight from `/js/...` and `/css/...`.
    pub fn global() -> Self {
        let mut asset = Self::new(None);
        asset.set_path(AssetKind::Js, "js");
        asset.set_path(AssetKind::Css, "css");
        asset.use_root = false;
        asset
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn set_path(&mut self, kind: AssetKind, path: impl Into<String>) -> &mut Self {
        self.paths.insert(kind, path.into());
        self
    }

    pub fn path(&self, kind: AssetKind) -> Option<&str> {
        self.paths.get(&kind).map(String::as_str).filter(|p| !p.is_empty())
    }

    pub fn owner_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    fn cdn_key(&self) -> Option<&str> {
        self.alias.as_deref().or(self.name.as_deref()).filter(|k| !k.is_empty())
    }

    /// Package name and per-kind path joined with `/`.
    pub fn dir(&self, kind: AssetKind) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(name) = self.name.as_deref() {
            parts.push(name);
        }
        if let Some(path) = self.path(kind) {
            parts.push(path);
        }
        parts.join("/")
    }

    /// Resolves one asset file to its final URL.
    pub fn generate(&self, asset: &str, kind: AssetKind, env: &UrlEnv<'_>) -> Result<String> {
        if is_absolute_url(asset) {
            return Ok(kind.fix_extension(asset));
        }

        if let Some(key) = self.cdn_key() {
            if let Some(provider) = env.cdn.get(key) {
                if let Some(url) = provider.get(kind, asset, self.path(kind), env.cdn)? {
                    debug!("asset {asset} ({kind}) served from CDN {key}: {url}");
                    return Ok(kind.fix_extension(&url));
                }
            }
        }

        let url = self.local_url(asset, kind, env.root);
        debug!("asset {asset} ({kind}) served locally: {url}");
        Ok(kind.fix_extension(&url))
    }

    fn local_url(&self, asset: &str, kind: AssetKind, root: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let dir = self.dir(kind);
        if self.use_root {
            parts.push(root);
        }
        parts.push(&dir);
        parts.push(asset);

        let joined = parts
            .iter()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("/");

        format!("/{joined}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(usize);

/// Arena owning every Asset of a build. Units refer to entries by `AssetId`,
/// so several units may share one Asset.
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    assets: Vec<Asset>,
    shared: HashMap<String, AssetId>,
    unit_defaults: HashMap<String, AssetId>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self {
            assets: vec![Asset::global()],
            shared: HashMap::new(),
            unit_defaults: HashMap::new(),
        }
    }

    pub fn global(&self) -> AssetId {
        AssetId(0)
    }

    /// Adds an Asset that is not shared by package name.
    pub fn insert(&mut self, asset: Asset) -> AssetId {
        self.assets.push(asset);
        AssetId(self.assets.len() - 1)
    }

    /// Returns the shared Asset for `package`, creating it on first use.
    pub fn shared(&mut self, package: &str) -> AssetId {
        if let Some(id) = self.shared.get(package) {
            return *id;
        }
        let id = self.insert(Asset::new(Some(package.to_string())));
        self.shared.insert(package.to_string(), id);
        id
    }

    /// The default Asset of the unit registered under `unit`, reset to a
    /// fresh Asset named `package`. A rebuilt unit reuses its previous slot.
    pub fn unit_default(&mut self, unit: &str, package: &str) -> AssetId {
        let fresh = Asset::new(Some(package.to_string()));
        if let Some(&id) = self.unit_defaults.get(unit) {
            self.assets[id.0] = fresh;
            return id;
        }
        let id = self.insert(fresh);
        self.unit_defaults.insert(unit.to_string(), id);
        id
    }

    /// `None` for an id minted by another registry.
    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(id.0)
    }

    pub fn get_mut(&mut self, id: AssetId) -> Option<&mut Asset> {
        self.assets.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered, duplicate-free URL list for one asset kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetList {
    urls: Vec<String>,
}

impl AssetList {
    /// Returns false when the URL was already listed.
    pub fn add(&mut self, url: String, priority: Priority) -> bool {
        if self.urls.contains(&url) {
            return false;
        }
        match priority {
            Priority::First => self.urls.insert(0, url),
            Priority::Normal => self.urls.push(url),
        }
        true
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
