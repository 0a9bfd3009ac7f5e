use indexmap::IndexMap;

use crate::{
    asset::{Asset, AssetId, AssetKind, AssetRegistry, Priority},
    deps::push_unique,
    error::{Error, Result},
    repository::{Position, Repository},
};

/// Hooks a unit implements. Every hook except `initialize` defaults to a no-op.
pub trait Script {
    /// Sets name, dependencies, repository, position and assets. Called once,
    /// right after construction; must not include anything.
    fn initialize(&self, unit: &mut UnitSetup<'_>) -> Result<()>;

    /// Code appended to the unit's repository at its position.
    fn script(&self, _unit: &Unit) -> Result<Option<String>> {
        Ok(None)
    }

    /// Code appended after the main body, always in the `last` bucket.
    fn init_script(&self, _unit: &Unit) -> Result<Option<String>> {
        Ok(None)
    }

    /// Called when this unit creates its repository.
    fn init_repository(&self, _repository: &mut Repository) {}
}

/// Builds a fresh Script; invoked once per logical name.
pub type ScriptFactory = Box<dyn Fn() -> Box<dyn Script>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IncludeState {
    #[default]
    Pending,
    InProgress,
    Included,
}

/// A declared asset reference, registered into the URL lists on include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUse {
    pub kind: AssetKind,
    pub asset: AssetId,
    pub name: String,
    pub priority: Priority,
}

pub struct Unit {
    name: String,
    dependencies: Vec<String>,
    repository: Option<String>,
    position: Position,
    asset: Option<AssetId>,
    default_asset: Option<AssetId>,
    assets: IndexMap<(AssetKind, String, String), AssetUse>,
    state: IncludeState,
    script: Box<dyn Script>,
}

impl Unit {
    /// Constructs the unit and runs its `initialize` hook.
    pub fn new(name: &str, script: Box<dyn Script>, assets: &mut AssetRegistry) -> Result<Self> {
        let mut unit = Self {
            name: name.to_string(),
            dependencies: Vec::new(),
            repository: None,
            position: Position::Last,
            asset: None,
            default_asset: None,
            assets: IndexMap::new(),
            state: IncludeState::Pending,
            script,
        };

        // Temporarily take the hook out so setup can borrow the unit mutably.
        let script = std::mem::replace(&mut unit.script, Box::new(NoScript));
        let res = script.initialize(&mut UnitSetup {
            key: name,
            unit: &mut unit,
            assets,
        });
        unit.script = script;
        res?;

        Ok(unit)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn add_dependencies<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        push_unique(&mut self.dependencies, names);
        self
    }

    /// Target repository; defaults to the unit's own name.
    pub fn repository(&self) -> &str {
        self.repository.as_deref().unwrap_or(&self.name)
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// The explicit Asset if one was set, else this unit's default Asset.
    pub fn asset(&self) -> Option<AssetId> {
        self.asset.or(self.default_asset)
    }

    pub fn asset_uses(&self) -> impl Iterator<Item = &AssetUse> {
        self.assets.values()
    }

    pub fn state(&self) -> IncludeState {
        self.state
    }

    pub fn is_included(&self) -> bool {
        self.state == IncludeState::Included
    }

    pub(crate) fn set_state(&mut self, state: IncludeState) {
        self.state = state;
    }

    pub(crate) fn hooks(&self) -> &dyn Script {
        self.script.as_ref()
    }
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("repository", &self.repository())
            .field("position", &self.position)
            .field("asset", &self.asset())
            .field("assets", &self.assets.values().collect::<Vec<_>>())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

struct NoScript;

impl Script for NoScript {
    fn initialize(&self, _unit: &mut UnitSetup<'_>) -> Result<()> {
        Ok(())
    }
}

/// Mutable view handed to `Script::initialize`.
pub struct UnitSetup<'a> {
    key: &'a str,
    unit: &'a mut Unit,
    assets: &'a mut AssetRegistry,
}

impl UnitSetup<'_> {
    pub fn name(&self) -> &str {
        &self.unit.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.unit.name = name.into();
        self
    }

    pub fn set_repository(&mut self, repository: impl Into<String>) -> &mut Self {
        self.unit.repository = Some(repository.into());
        self
    }

    pub fn set_position(&mut self, position: Position) -> &mut Self {
        self.unit.position = position;
        self
    }

    pub fn add_dependencies<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.unit.add_dependencies(names);
        self
    }

    /// Points the unit at the Asset shared under `package`.
    pub fn use_shared_asset(&mut self, package: &str) -> AssetId {
        let id = self.assets.shared(package);
        self.unit.asset = Some(id);
        id
    }

    pub fn set_asset(&mut self, id: AssetId) -> &mut Self {
        self.unit.asset = Some(id);
        self
    }

    /// The unit's current Asset, creating its default Asset (package named
    /// after the repository) on first use.
    pub fn asset_id(&mut self) -> AssetId {
        if let Some(id) = self.unit.asset() {
            return id;
        }
        let id = self.assets.unit_default(self.key, self.unit.repository());
        self.unit.default_asset = Some(id);
        id
    }

    /// Fails when `set_asset` was given an id from another registry.
    pub fn asset_mut(&mut self) -> Result<&mut Asset> {
        let id = self.asset_id();
        let key = self.key;
        self.assets.get_mut(id).ok_or_else(|| {
            Error::Configuration(format!("unknown asset id {id:?} for unit '{key}'"))
        })
    }

    /// Declares an asset of the current Asset. Keyed by (kind, owner, name):
    /// the first registration wins.
    pub fn add_asset(&mut self, kind: AssetKind, name: &str, priority: Priority) -> &mut Self {
        let id = self.asset_id();
        let owner = self
            .assets
            .get(id)
            .map(|a| a.owner_name().to_string())
            .unwrap_or_default();
        self.unit
            .assets
            .entry((kind, owner, name.to_string()))
            .or_insert_with(|| AssetUse {
                kind,
                asset: id,
                name: name.to_string(),
                priority,
            });
        self
    }
}
