use minijinja::Environment;
use serde::Deserialize;
use serde_json::json;
use std::{collections::BTreeMap, fs, path::Path};

use crate::{
    asset::{AssetKind, Priority},
    cdn::CdnPaths,
    deps::canonical_name,
    error::{Error, Result},
    locate::Locator,
    repository::{Position, Repository},
    unit::{Script, Unit, UnitSetup},
};

/// A unit definition file (`<dir>/<name>.toml` or `<dir>/<name>/index.toml`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitDefinition {
    #[serde(default)]
    pub name: Option<String>,

    /// Logical name of a base definition to layer on.
    #[serde(default)]
    pub extends: Option<String>,

    #[serde(default)]
    pub repository: Option<String>,

    #[serde(default)]
    pub position: Option<Position>,

    #[serde(default)]
    pub dependencies: Vec<String>,

    #[serde(default)]
    pub asset: Option<AssetDefinition>,

    #[serde(default)]
    pub assets: Vec<AssetUseDefinition>,

    #[serde(default)]
    pub script: Option<String>,

    /// Script body read from a file next to the definition.
    #[serde(default)]
    pub script_file: Option<String>,

    #[serde(default)]
    pub init_script: Option<String>,

    #[serde(default)]
    pub wrapper: Option<String>,

    #[serde(default)]
    pub wrap_size: Option<usize>,

    /// Render `script` and `init_script` with minijinja.
    #[serde(default = "default_true")]
    pub template: bool,

    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetDefinition {
    /// Shared Asset package; the unit's default Asset when unset.
    #[serde(default)]
    pub package: Option<String>,

    #[serde(default)]
    pub alias: Option<String>,

    #[serde(default)]
    pub cdn_root: Option<bool>,

    #[serde(default)]
    pub paths: CdnPaths,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetUseDefinition {
    pub kind: AssetKind,
    pub name: String,
    #[serde(default)]
    pub priority: Priority,
}

impl UnitDefinition {
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Reads and parses one file; `script_file` is inlined.
    pub fn load(path: &Path) -> Result<Self> {
        let invalid = |message: String| Error::Definition {
            path: path.to_path_buf(),
            message,
        };

        let text = fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let mut def = Self::from_toml_str(&text).map_err(|e| invalid(e.to_string()))?;

        if let Some(file) = def.script_file.take() {
            if def.script.is_some() {
                return Err(invalid("set either script or script_file, not both".to_string()));
            }
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            let script_path = base.join(&file);
            let body = fs::read_to_string(&script_path)
                .map_err(|e| invalid(format!("failed to read script file {}: {e}", script_path.display())))?;
            def.script = Some(body);
        }

        Ok(def)
    }

    /// Fills unset fields from `base`; `data` is merged with local keys winning.
    pub fn inherit(&mut self, base: UnitDefinition) {
        if self.repository.is_none() {
            self.repository = base.repository;
        }
        if self.asset.is_none() {
            self.asset = base.asset;
        }
        if self.wrapper.is_none() {
            self.wrapper = base.wrapper;
        }
        if self.wrap_size.is_none() {
            self.wrap_size = base.wrap_size;
        }
        for (k, v) in base.data {
            self.data.entry(k).or_insert(v);
        }
    }
}

/// Loads the definition for `name`, following its `extends` chain.
pub fn load_definition(locator: &Locator, name: &str) -> Result<UnitDefinition> {
    load_chain(locator, name, &mut Vec::new())
}

fn load_chain(locator: &Locator, name: &str, seen: &mut Vec<String>) -> Result<UnitDefinition> {
    let path = locator.find(name)?;
    let name = canonical_name(name)?;

    if seen.contains(&name) {
        seen.push(name);
        return Err(Error::Definition {
            path,
            message: format!("extends cycle: {}", seen.join(" -> ")),
        });
    }
    seen.push(name);

    let mut def = UnitDefinition::load(&path)?;
    if let Some(base_name) = def.extends.clone() {
        let base = match load_chain(locator, &base_name, seen) {
            Err(Error::Resolution { name: missing }) => {
                return Err(Error::Definition {
                    path,
                    message: format!("extends unknown unit '{missing}'"),
                });
            }
            other => other?,
        };
        def.inherit(base);
    }

    Ok(def)
}

/// A unit backed by a definition file.
#[derive(Debug, Clone)]
pub struct DeclaredScript {
    logical_name: String,
    def: UnitDefinition,
}

impl DeclaredScript {
    pub fn new(logical_name: impl Into<String>, def: UnitDefinition) -> Self {
        Self {
            logical_name: logical_name.into(),
            def,
        }
    }

    pub fn definition(&self) -> &UnitDefinition {
        &self.def
    }

    fn render(&self, unit: &Unit, source: &str) -> Result<String> {
        if !self.def.template {
            return Ok(source.to_string());
        }

        // Context passed to MiniJinja:
        // - unit identity (name/repository/position)
        // - data (definition-specific arbitrary user data)
        let ctx_json = json!({
            "unit": {
                "name": unit.name(),
                "repository": unit.repository(),
                "position": unit.position().as_str(),
            },
            "data": self.def.data,
        });

        render_minijinja(source, &ctx_json).map_err(|source| Error::Template {
            unit: unit.name().to_string(),
            source,
        })
    }
}

impl Script for DeclaredScript {
    fn initialize(&self, unit: &mut UnitSetup<'_>) -> Result<()> {
        let def = &self.def;

        unit.set_name(def.name.clone().unwrap_or_else(|| self.logical_name.clone()));
        if let Some(repo) = def.repository.as_deref() {
            unit.set_repository(repo);
        }
        if let Some(position) = def.position {
            unit.set_position(position);
        }
        unit.add_dependencies(&def.dependencies);

        if let Some(a) = def.asset.as_ref() {
            if let Some(package) = a.package.as_deref() {
                unit.use_shared_asset(package);
            }
            let asset = unit.asset_mut()?;
            if let Some(alias) = a.alias.as_deref() {
                asset.alias = Some(alias.to_string());
            }
            if let Some(use_root) = a.cdn_root {
                asset.use_root = use_root;
            }
            for (kind, path) in a.paths.clone().entries() {
                asset.set_path(kind, path);
            }
        }

        for a in def.assets.iter() {
            unit.add_asset(a.kind, &a.name, a.priority);
        }

        Ok(())
    }

    fn script(&self, unit: &Unit) -> Result<Option<String>> {
        self.def
            .script
            .as_deref()
            .map(|s| self.render(unit, s))
            .transpose()
    }

    fn init_script(&self, unit: &Unit) -> Result<Option<String>> {
        self.def
            .init_script
            .as_deref()
            .map(|s| self.render(unit, s))
            .transpose()
    }

    fn init_repository(&self, repository: &mut Repository) {
        if let Some(wrapper) = self.def.wrapper.as_deref() {
            repository.set_wrapper(wrapper);
        }
        if let Some(size) = self.def.wrap_size {
            repository.set_wrap_size(size);
        }
    }
}

fn render_minijinja(
    source: &str,
    ctx_json: &serde_json::Value,
) -> std::result::Result<String, minijinja::Error> {
    let mut env = Environment::new();

    // Jinja-style `tojson` filter (string-only).
    // Produces a JSON string literal like "Loading...", with proper escaping.
    env.add_filter("tojson", |s: String| -> std::result::Result<String, minijinja::Error> {
        serde_json::to_string(&s).map_err(|e| {
            minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string())
        })
    });

    env.add_template("script", source)?;
    let tpl = env.get_template("script")?;
    let v = minijinja::value::Value::from_serialize(ctx_json);
    tpl.render(v)
}
