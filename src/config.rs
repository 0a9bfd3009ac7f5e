use anyhow::{bail, Context as _, Result};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    asset::AssetKind,
    cdn::CdnDeclaration,
    context::{BuildContext, DEFAULT_ROOT},
    locate::Locator,
};

pub const CONFIG_ENV: &str = "SCRIPTREPO_CONFIG";

/// `$XDG_CONFIG_HOME/scriptrepo/config.toml`, else the platform config dir.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|s| !s.is_empty()) {
        return Some(PathBuf::from(xdg).join("scriptrepo").join("config.toml"));
    }
    dirs::config_dir().map(|d| d.join("scriptrepo").join("config.toml"))
}

/// Config path precedence:
/// 1) CLI --config (must exist)
/// 2) SCRIPTREPO_CONFIG (must exist)
/// 3) default config path (optional)
pub fn locate(cli_config: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = cli_config {
        if !p.is_file() {
            bail!("--config was provided but file does not exist: {}", p.display());
        }
        return Ok(Some(p.to_path_buf()));
    }

    if let Some(p) = std::env::var(CONFIG_ENV)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
    {
        if !p.is_file() {
            bail!("{CONFIG_ENV} is set but file does not exist: {}", p.display());
        }
        return Ok(Some(p));
    }

    Ok(default_config_path().filter(|p| p.is_file()))
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub scriptrepo: ScriptrepoMeta,

    /// Inline CDN declaration, same shape as a `cdn_file` document.
    #[serde(default)]
    pub cdn: Option<toml::Table>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct ScriptrepoMeta {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default = "default_cdn_root")]
    pub cdn_root: String,

    #[serde(default)]
    pub eol: Eol,

    #[serde(default)]
    pub dirs: Vec<PathBuf>,

    #[serde(default)]
    pub defaults: Vec<String>,

    #[serde(default)]
    pub cdn_file: Option<PathBuf>,

    #[serde(default)]
    pub assets: Vec<DefaultAssetConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Eol {
    #[default]
    Lf,
    Crlf,
}

impl Eol {
    pub fn as_str(self) -> &'static str {
        match self {
            Eol::Lf => "\n",
            Eol::Crlf => "\r\n",
        }
    }
}

/// A default asset reference on the global Asset.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultAssetConfig {
    pub kind: AssetKind,
    pub name: String,
}

fn default_schema_version() -> u32 {
    1
}

fn default_cdn_root() -> String {
    DEFAULT_ROOT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scriptrepo: ScriptrepoMeta {
                schema_version: default_schema_version(),
                cdn_root: default_cdn_root(),
                eol: Eol::default(),
                dirs: Vec::new(),
                defaults: Vec::new(),
                cdn_file: None,
                assets: Vec::new(),
            },
            cdn: None,
            base_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut cfg: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        if cfg.scriptrepo.schema_version != 1 {
            bail!(
                "unsupported schema_version {} in {}",
                cfg.scriptrepo.schema_version,
                path.display()
            );
        }

        cfg.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(cfg)
    }

    /// Loads the located config, or the defaults when there is none.
    pub fn load(cli_config: Option<&Path>) -> Result<Self> {
        match locate(cli_config)? {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Self::default()),
        }
    }

    fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    /// Unit lookup dirs, resolved against the config directory.
    pub fn unit_dirs(&self) -> Vec<PathBuf> {
        self.scriptrepo.dirs.iter().map(|d| self.resolve(d)).collect()
    }

    pub fn cdn_file(&self) -> Option<PathBuf> {
        self.scriptrepo.cdn_file.as_deref().map(|p| self.resolve(p))
    }

    /// A context carrying this config's settings, dirs, defaults and CDN rules.
    pub fn build_context(&self, locator: Arc<Locator>) -> Result<BuildContext> {
        for dir in self.unit_dirs() {
            locator.add_dir(dir);
        }

        let mut ctx = BuildContext::with_locator(locator);
        ctx.set_root(self.scriptrepo.cdn_root.clone())
            .set_eol(self.scriptrepo.eol.as_str());

        if let Some(path) = self.cdn_file() {
            let decl = CdnDeclaration::load(&path)
                .with_context(|| format!("failed to load CDN file {}", path.display()))?;
            ctx.parse_cdn(decl);
        }

        if let Some(table) = &self.cdn {
            let value = serde_json::to_value(table).context("invalid [cdn] table")?;
            ctx.parse_cdn(CdnDeclaration::from_value(value).context("invalid [cdn] table")?);
        }

        for name in &self.scriptrepo.defaults {
            ctx.add_default(name);
        }
        for a in &self.scriptrepo.assets {
            ctx.add_default_asset(a.kind, &a.name, None);
        }

        Ok(ctx)
    }
}
