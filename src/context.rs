use indexmap::IndexMap;
use std::{
    collections::{BTreeMap, HashMap},
    path::PathBuf,
    sync::Arc,
};
use tracing::debug;

use crate::{
    asset::{AssetId, AssetKind, AssetList, AssetRegistry, Priority, UrlEnv},
    cdn::{CdnDeclaration, CdnProvider, CdnRegistry},
    declared::{load_definition, DeclaredScript},
    deps::{canonical_name, cycle_chain, push_unique},
    error::{Error, Result},
    locate::Locator,
    repository::{Position, Repository},
    unit::{IncludeState, Script, ScriptFactory, Unit},
};

pub const DEFAULT_ROOT: &str = "/js";
pub const DEFAULT_EOL: &str = "\n";

#[derive(Debug, Clone, PartialEq, Eq)]
struct DefaultAsset {
    kind: AssetKind,
    name: String,
    asset: AssetId,
}

/// State of one bundling pass: units, repositories, assets and CDN rules.
///
/// Each logical name maps to one Unit and each repository name to one
/// Repository for the lifetime of the context (or until `clear`). Units are
/// keyed by canonical name, so `JQuery.Define` and `JQuery/Define` are one unit.
pub struct BuildContext {
    root: String,
    eol: String,
    locator: Arc<Locator>,
    factories: HashMap<String, ScriptFactory>,
    units: HashMap<String, Unit>,
    repositories: IndexMap<String, Repository>,
    assets: AssetRegistry,
    asset_lists: BTreeMap<AssetKind, AssetList>,
    cdn: CdnRegistry,
    defaults: Vec<String>,
    default_assets: Vec<DefaultAsset>,
    stack: Vec<String>,
    included: Vec<String>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::with_locator(Arc::new(Locator::new()))
    }

    /// Uses a locator (and its lookup cache) shared with other contexts.
    pub fn with_locator(locator: Arc<Locator>) -> Self {
        Self {
            root: DEFAULT_ROOT.to_string(),
            eol: DEFAULT_EOL.to_string(),
            locator,
            factories: HashMap::new(),
            units: HashMap::new(),
            repositories: IndexMap::new(),
            assets: AssetRegistry::new(),
            asset_lists: BTreeMap::new(),
            cdn: CdnRegistry::new(),
            defaults: Vec::new(),
            default_assets: Vec::new(),
            stack: Vec::new(),
            included: Vec::new(),
        }
    }

    // ---------- settings ----------

    /// Prefix of local asset URLs.
    pub fn set_root(&mut self, root: impl Into<String>) -> &mut Self {
        self.root = root.into();
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Line separator used when rendering repositories.
    pub fn set_eol(&mut self, eol: impl Into<String>) -> &mut Self {
        self.eol = eol.into();
        self
    }

    pub fn eol(&self) -> &str {
        &self.eol
    }

    pub fn locator(&self) -> &Arc<Locator> {
        &self.locator
    }

    pub fn add_dir(&self, dir: impl Into<PathBuf>) {
        self.locator.add_dir(dir);
    }

    // ---------- units ----------

    /// Registers a compiled-in unit; takes precedence over definition files.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Script> + 'static,
    {
        let key = canonical_name(name).unwrap_or_else(|_| name.to_string());
        self.factories.insert(key, Box::new(factory));
    }

    /// Returns the unit for `name`, constructing it on first use.
    pub fn create(&mut self, name: &str) -> Result<&Unit> {
        let key = canonical_name(name)?;
        self.ensure_unit(&key)?;
        self.unit_ref(&key)
    }

    pub fn unit(&self, name: &str) -> Option<&Unit> {
        let key = canonical_name(name).ok()?;
        self.units.get(&key)
    }

    fn unit_ref(&self, name: &str) -> Result<&Unit> {
        self.units.get(name).ok_or_else(|| Error::Resolution {
            name: name.to_string(),
        })
    }

    /// `name` must already be canonical.
    fn ensure_unit(&mut self, name: &str) -> Result<()> {
        if self.units.contains_key(name) {
            return Ok(());
        }

        let script: Box<dyn Script> = match self.factories.get(name) {
            Some(factory) => factory(),
            None => {
                let def = load_definition(&self.locator, name)?;
                Box::new(DeclaredScript::new(name, def))
            }
        };

        let unit = Unit::new(name, script, &mut self.assets)?;
        debug!(
            "created unit {name} (repository={}, position={}, deps={:?})",
            unit.repository(),
            unit.position(),
            unit.dependencies()
        );
        self.units.insert(name.to_string(), unit);
        Ok(())
    }

    /// Includes `name` once: dependencies depth-first, then its assets, then
    /// its code. Re-entering a unit still in progress is a cycle.
    pub fn include(&mut self, name: &str) -> Result<()> {
        let key = canonical_name(name)?;
        self.include_canonical(&key)
    }

    fn include_canonical(&mut self, name: &str) -> Result<()> {
        self.ensure_unit(name)?;

        let unit = self.unit_ref(name)?;
        match unit.state() {
            IncludeState::Included => return Ok(()),
            IncludeState::InProgress => {
                return Err(Error::Cycle {
                    chain: cycle_chain(&self.stack, name),
                })
            }
            IncludeState::Pending => {}
        }
        let deps = unit.dependencies().to_vec();

        self.set_state(name, IncludeState::InProgress);
        self.stack.push(name.to_string());
        let res = self.include_parts(name, &deps);
        self.stack.pop();

        match res {
            Ok(()) => {
                self.set_state(name, IncludeState::Included);
                self.included.push(name.to_string());
                debug!("included unit {name}");
                Ok(())
            }
            Err(e) => {
                self.set_state(name, IncludeState::Pending);
                Err(e)
            }
        }
    }

    fn include_parts(&mut self, name: &str, deps: &[String]) -> Result<()> {
        for dep in deps {
            self.include(dep)?;
        }

        let uses: Vec<_> = self.unit_ref(name)?.asset_uses().cloned().collect();
        for u in uses {
            self.use_asset(u.asset, u.kind, &u.name, u.priority)?;
        }

        let Self {
            units,
            repositories,
            ..
        } = self;
        let unit = units.get(name).ok_or_else(|| Error::Resolution {
            name: name.to_string(),
        })?;

        let script = unit.hooks().script(unit)?;
        let init = unit.hooks().init_script(unit)?;
        if script.is_none() && init.is_none() {
            return Ok(());
        }

        let repo = repository_for(repositories, unit);
        if let Some(code) = script {
            repo.add(&code, unit.position());
        }
        if let Some(code) = init {
            repo.add(&code, Position::Last);
        }
        Ok(())
    }

    fn set_state(&mut self, name: &str, state: IncludeState) {
        if let Some(unit) = self.units.get_mut(name) {
            unit.set_state(state);
        }
    }

    /// Logical names in the order their inclusion completed.
    pub fn included(&self) -> &[String] {
        &self.included
    }

    /// Includes `name`, then appends `content` to its repository at
    /// `position` (the unit's own position when `None`).
    pub fn add(&mut self, name: &str, content: &str, position: Option<Position>) -> Result<()> {
        let key = canonical_name(name)?;
        let name = key.as_str();
        self.include_canonical(name)?;

        let Self {
            units,
            repositories,
            ..
        } = self;
        let unit = units.get(name).ok_or_else(|| Error::Resolution {
            name: name.to_string(),
        })?;
        let position = position.unwrap_or(unit.position());
        repository_for(repositories, unit).add(content, position);
        Ok(())
    }

    pub fn add_first(&mut self, name: &str, content: &str) -> Result<()> {
        self.add(name, content, Some(Position::First))
    }

    pub fn add_middle(&mut self, name: &str, content: &str) -> Result<()> {
        self.add(name, content, Some(Position::Middle))
    }

    pub fn add_last(&mut self, name: &str, content: &str) -> Result<()> {
        self.add(name, content, Some(Position::Last))
    }

    pub fn add_default(&mut self, name: &str) {
        let key = canonical_name(name).unwrap_or_else(|_| name.to_string());
        push_unique(&mut self.defaults, [key]);
    }

    pub fn defaults(&self) -> &[String] {
        &self.defaults
    }

    /// Includes every default unit, in registration order.
    pub fn include_defaults(&mut self) -> Result<()> {
        for name in self.defaults.clone() {
            self.include(&name)?;
        }
        Ok(())
    }

    // ---------- assets ----------

    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetRegistry {
        &mut self.assets
    }

    /// Registers a default asset reference; the global Asset when `asset` is `None`.
    pub fn add_default_asset(&mut self, kind: AssetKind, name: &str, asset: Option<AssetId>) {
        let entry = DefaultAsset {
            kind,
            name: name.to_string(),
            asset: asset.unwrap_or_else(|| self.assets.global()),
        };
        if !self.default_assets.contains(&entry) {
            self.default_assets.push(entry);
        }
    }

    /// Applies every default asset reference, in registration order.
    pub fn include_assets(&mut self) -> Result<()> {
        for d in self.default_assets.clone() {
            self.use_asset(d.asset, d.kind, &d.name, Priority::Normal)?;
        }
        Ok(())
    }

    /// Resolves one file of `asset` and adds its URL to the list for `kind`.
    pub fn use_asset(
        &mut self,
        asset: AssetId,
        kind: AssetKind,
        name: &str,
        priority: Priority,
    ) -> Result<()> {
        let env = UrlEnv {
            root: &self.root,
            cdn: &self.cdn,
        };
        let url = self
            .assets
            .get(asset)
            .ok_or_else(|| Error::Configuration(format!("unknown asset id {asset:?}")))?
            .generate(name, kind, &env)?;
        self.asset_lists.entry(kind).or_default().add(url, priority);
        Ok(())
    }

    /// Accumulated URLs for `kind`; empty when none were registered.
    pub fn get_assets(&self, kind: AssetKind) -> &[String] {
        self.asset_lists
            .get(&kind)
            .map(AssetList::urls)
            .unwrap_or_default()
    }

    // ---------- cdn ----------

    pub fn add_cdn(&mut self, repository: &str) -> &mut CdnProvider {
        self.cdn.add(repository)
    }

    pub fn parse_cdn(&mut self, decl: CdnDeclaration) {
        self.cdn.parse(decl);
    }

    pub fn cdn(&self) -> &CdnRegistry {
        &self.cdn
    }

    // ---------- output ----------

    pub fn repository(&self, name: &str) -> Option<&Repository> {
        self.repositories.get(name)
    }

    pub fn repositories(&self) -> impl Iterator<Item = &Repository> {
        self.repositories.values()
    }

    /// Concatenates every repository's one-shot content, in creation order.
    pub fn get_content(&mut self) -> String {
        let eol = &self.eol;
        self.repositories
            .values_mut()
            .filter_map(|r| r.take_content(eol))
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(eol)
    }

    /// Drops units, repositories and asset URL lists. Settings, factories,
    /// defaults, Assets and CDN rules are kept; rebuilt units get their
    /// previous default Asset slot back, reset.
    pub fn clear(&mut self) {
        self.units.clear();
        self.repositories.clear();
        self.asset_lists.clear();
        self.stack.clear();
        self.included.clear();
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new()
    }
}

fn repository_for<'a>(
    repositories: &'a mut IndexMap<String, Repository>,
    unit: &Unit,
) -> &'a mut Repository {
    repositories
        .entry(unit.repository().to_string())
        .or_insert_with(|| {
            let mut repo = Repository::new(unit.repository());
            unit.hooks().init_repository(&mut repo);
            repo
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitSetup;

    #[derive(Clone, Default)]
    struct Fixed {
        deps: Vec<&'static str>,
        repository: Option<&'static str>,
        position: Position,
        script: Option<&'static str>,
        init: Option<&'static str>,
        wrapper: Option<&'static str>,
        assets: Vec<(AssetKind, &'static str, Priority)>,
    }

    impl Script for Fixed {
        fn initialize(&self, unit: &mut UnitSetup<'_>) -> Result<()> {
            unit.add_dependencies(&self.deps).set_position(self.position);
            if let Some(repo) = self.repository {
                unit.set_repository(repo);
            }
            for (kind, name, priority) in &self.assets {
                unit.add_asset(*kind, name, *priority);
            }
            Ok(())
        }

        fn script(&self, _unit: &Unit) -> Result<Option<String>> {
            Ok(self.script.map(str::to_string))
        }

        fn init_script(&self, _unit: &Unit) -> Result<Option<String>> {
            Ok(self.init.map(str::to_string))
        }

        fn init_repository(&self, repository: &mut Repository) {
            if let Some(w) = self.wrapper {
                repository.set_wrapper(w);
            }
        }
    }

    fn register(ctx: &mut BuildContext, name: &str, fixed: Fixed) {
        ctx.register(name, move || Box::new(fixed.clone()));
    }

    fn scenario() -> BuildContext {
        let mut ctx = BuildContext::new();
        register(
            &mut ctx,
            "A",
            Fixed {
                repository: Some("R"),
                script: Some("x();"),
                ..Fixed::default()
            },
        );
        register(
            &mut ctx,
            "B",
            Fixed {
                deps: vec!["A"],
                repository: Some("R"),
                position: Position::First,
                script: Some("y();"),
                ..Fixed::default()
            },
        );
        ctx
    }

    #[test]
    fn test_dependent_first_position_renders_before_dependency() {
        for order in [["B", "A"], ["A", "B"]] {
            let mut ctx = scenario();
            for name in order {
                ctx.include(name).unwrap();
            }
            assert_eq!(ctx.get_content(), "y();\nx();");
        }
    }

    #[test]
    fn test_include_is_idempotent() {
        let mut once = scenario();
        once.include("B").unwrap();

        let mut twice = scenario();
        twice.include("B").unwrap();
        twice.include("B").unwrap();
        twice.include("A").unwrap();

        assert_eq!(once.get_content(), twice.get_content());
        assert_eq!(twice.included(), ["A", "B"]);
    }

    #[test]
    fn test_get_content_is_one_shot() {
        let mut ctx = scenario();
        ctx.include("B").unwrap();
        assert_eq!(ctx.get_content(), "y();\nx();");
        assert_eq!(ctx.get_content(), "");
    }

    #[test]
    fn test_shared_dependency_emitted_once() {
        let mut ctx = BuildContext::new();
        register(&mut ctx, "Define", Fixed { repository: Some("jquery"), position: Position::First, script: Some("define();"), ..Fixed::default() });
        register(&mut ctx, "Dialog", Fixed { deps: vec!["Define"], repository: Some("jquery"), script: Some("dialog();"), ..Fixed::default() });
        register(&mut ctx, "Notif", Fixed { deps: vec!["Define"], repository: Some("jquery"), script: Some("notif();"), ..Fixed::default() });

        ctx.include("Dialog").unwrap();
        ctx.include("Notif").unwrap();
        assert_eq!(ctx.get_content(), "define();\ndialog();\nnotif();");
    }

    #[test]
    fn test_dependency_content_precedes_dependent_in_same_bucket() {
        let mut ctx = BuildContext::new();
        register(&mut ctx, "C", Fixed { repository: Some("R"), script: Some("c();"), ..Fixed::default() });
        register(&mut ctx, "B", Fixed { deps: vec!["C"], repository: Some("R"), script: Some("b();"), ..Fixed::default() });
        register(&mut ctx, "A", Fixed { deps: vec!["B"], repository: Some("R"), script: Some("a();"), ..Fixed::default() });

        ctx.include("A").unwrap();
        assert_eq!(ctx.get_content(), "c();\nb();\na();");
    }

    #[test]
    fn test_init_script_goes_last_in_own_repository() {
        let mut ctx = BuildContext::new();
        register(&mut ctx, "Dialog", Fixed {
            repository: Some("jquery"),
            position: Position::First,
            script: Some("$.define('ntdlg', {});"),
            init: Some("$.ntdlg.init();"),
            ..Fixed::default()
        });
        register(&mut ctx, "Form", Fixed {
            deps: vec!["Dialog"],
            repository: Some("jquery"),
            position: Position::Middle,
            script: Some("form();"),
            ..Fixed::default()
        });

        ctx.include("Form").unwrap();
        assert_eq!(ctx.get_content(), "$.define('ntdlg', {});\nform();\n$.ntdlg.init();");
    }

    #[test]
    fn test_repositories_render_in_creation_order_with_wrapper() {
        let mut ctx = BuildContext::new();
        register(&mut ctx, "Core", Fixed { repository: Some("core"), script: Some("core();"), ..Fixed::default() });
        register(&mut ctx, "JQ", Fixed {
            deps: vec!["Core"],
            repository: Some("jquery"),
            script: Some("jq();"),
            wrapper: Some("(function($) {%s})(jQuery);"),
            ..Fixed::default()
        });

        ctx.include("JQ").unwrap();
        assert_eq!(ctx.get_content(), "core();\n(function($) {\n    jq();\n})(jQuery);");
    }

    #[test]
    fn test_unit_without_code_creates_no_repository() {
        let mut ctx = BuildContext::new();
        register(&mut ctx, "jQuery", Fixed { assets: vec![(AssetKind::Js, "jquery.min", Priority::First)], ..Fixed::default() });
        ctx.include("jQuery").unwrap();
        assert!(ctx.repository("jQuery").is_none());
        assert_eq!(ctx.get_assets(AssetKind::Js), ["/js/jQuery/jquery.min.js"]);
    }

    #[test]
    fn test_add_forces_inclusion() {
        let mut ctx = scenario();
        ctx.add_middle("B", "z();").unwrap();
        ctx.add("A", "w();", None).unwrap();
        assert!(ctx.unit("A").unwrap().is_included());
        assert_eq!(ctx.get_content(), "y();\nz();\nx();\nw();");
    }

    #[test]
    fn test_missing_dependency_aborts_include() {
        let mut ctx = BuildContext::new();
        register(&mut ctx, "App", Fixed { deps: vec!["Missing"], script: Some("app();"), ..Fixed::default() });

        let err = ctx.include("App").unwrap_err();
        assert!(matches!(err, Error::Resolution { ref name } if name == "Missing"));
        assert!(!ctx.unit("App").unwrap().is_included());
        assert_eq!(ctx.get_content(), "");
    }

    #[test]
    fn test_cycle_fails_fast() {
        let mut ctx = BuildContext::new();
        register(&mut ctx, "A", Fixed { deps: vec!["B"], ..Fixed::default() });
        register(&mut ctx, "B", Fixed { deps: vec!["C"], ..Fixed::default() });
        register(&mut ctx, "C", Fixed { deps: vec!["A"], ..Fixed::default() });

        let err = ctx.include("A").unwrap_err();
        match err {
            Error::Cycle { chain } => assert_eq!(chain, ["A", "B", "C", "A"]),
            other => panic!("expected cycle, got {other:?}"),
        }
        assert_eq!(ctx.unit("A").unwrap().state(), IncludeState::Pending);
    }

    #[test]
    fn test_asset_priority_and_dedup() {
        let mut ctx = BuildContext::new();
        register(&mut ctx, "Plugin", Fixed {
            deps: vec!["Lib"],
            repository: Some("plugin"),
            assets: vec![(AssetKind::Js, "plugin", Priority::Normal), (AssetKind::Css, "plugin", Priority::Normal)],
            ..Fixed::default()
        });
        register(&mut ctx, "Lib", Fixed {
            repository: Some("lib"),
            assets: vec![(AssetKind::Js, "lib.min", Priority::Normal)],
            ..Fixed::default()
        });
        register(&mut ctx, "Core", Fixed {
            repository: Some("core"),
            assets: vec![(AssetKind::Js, "core", Priority::First)],
            ..Fixed::default()
        });

        ctx.include("Plugin").unwrap();
        ctx.include("Core").unwrap();
        let lib = ctx.unit("Lib").unwrap().asset().unwrap();
        ctx.use_asset(lib, AssetKind::Js, "lib.min.js", Priority::Normal).unwrap();

        assert_eq!(
            ctx.get_assets(AssetKind::Js),
            ["/js/core/core.js", "/js/lib/lib.min.js", "/js/plugin/plugin.js"]
        );
        assert_eq!(ctx.get_assets(AssetKind::Css), ["/js/plugin/plugin.css"]);
        assert!(ctx.get_assets(AssetKind::Img).is_empty());
    }

    #[test]
    fn test_defaults_and_default_assets() {
        let mut ctx = scenario();
        ctx.add_default("B");
        ctx.add_default("B");
        ctx.add_default_asset(AssetKind::Css, "app", None);
        ctx.add_default_asset(AssetKind::Js, "app", None);
        ctx.add_default_asset(AssetKind::Css, "app", None);

        ctx.include_defaults().unwrap();
        ctx.include_assets().unwrap();

        assert_eq!(ctx.defaults(), ["B"]);
        assert_eq!(ctx.included(), ["A", "B"]);
        assert_eq!(ctx.get_assets(AssetKind::Css), ["/css/app.css"]);
        assert_eq!(ctx.get_assets(AssetKind::Js), ["/js/app.js"]);
    }

    #[test]
    fn test_cdn_configuration_applies_to_units() {
        let mut ctx = BuildContext::new();
        register(&mut ctx, "jQuery", Fixed {
            repository: Some("jquery"),
            assets: vec![(AssetKind::Js, "jquery.min", Priority::First)],
            ..Fixed::default()
        });
        ctx.parse_cdn(
            CdnDeclaration::from_json_str(
                r#"{
                    "": { "cdnjs": "https://cdnjs.cloudflare.com/ajax/libs/%PKG%/%VER%/%NAME%" },
                    "jquery": { "provider": "cdnjs", "version": "3.7.1" }
                }"#,
            )
            .unwrap(),
        );

        ctx.include("jQuery").unwrap();
        assert_eq!(
            ctx.get_assets(AssetKind::Js),
            ["https://cdnjs.cloudflare.com/ajax/libs/jquery/3.7.1/jquery.min.js"]
        );
    }

    #[test]
    fn test_clear_resets_build_state() {
        let mut ctx = scenario();
        ctx.add_cdn("R");
        ctx.include("B").unwrap();
        ctx.clear();

        assert!(ctx.unit("B").is_none());
        assert!(ctx.repository("R").is_none());
        assert!(ctx.included().is_empty());
        assert_eq!(ctx.cdn().len(), 1);

        ctx.include("B").unwrap();
        assert_eq!(ctx.get_content(), "y();\nx();");
    }

    #[test]
    fn test_eol_setting() {
        let mut ctx = scenario();
        ctx.set_eol("\r\n");
        ctx.include("B").unwrap();
        assert_eq!(ctx.get_content(), "y();\r\nx();");
    }

    #[test]
    fn test_spellings_of_one_name_share_a_unit() {
        let mut ctx = BuildContext::new();
        register(&mut ctx, "JQuery.Define", Fixed { repository: Some("jq"), script: Some("define();"), ..Fixed::default() });
        register(&mut ctx, "A", Fixed { deps: vec!["JQuery/Define"], repository: Some("jq"), script: Some("a();"), ..Fixed::default() });
        register(&mut ctx, "B", Fixed { deps: vec!["JQuery.Define"], repository: Some("jq"), script: Some("b();"), ..Fixed::default() });

        ctx.include("A").unwrap();
        ctx.include("B").unwrap();
        ctx.add_default("JQuery\\Define");

        assert_eq!(ctx.get_content(), "define();\na();\nb();");
        assert_eq!(ctx.included(), ["JQuery/Define", "A", "B"]);
        assert_eq!(ctx.defaults(), ["JQuery/Define"]);
        assert!(ctx.unit("JQuery.Define").unwrap().is_included());
    }

    #[test]
    fn test_clear_reuses_default_asset_slots() {
        let mut ctx = BuildContext::new();
        register(&mut ctx, "Popper", Fixed {
            assets: vec![(AssetKind::Js, "popper.min", Priority::Normal)],
            ..Fixed::default()
        });

        ctx.include("Popper").unwrap();
        let arena = ctx.assets().len();
        let id = ctx.unit("Popper").unwrap().asset();

        for _ in 0..3 {
            ctx.clear();
            ctx.include("Popper").unwrap();
        }
        assert_eq!(ctx.assets().len(), arena);
        assert_eq!(ctx.unit("Popper").unwrap().asset(), id);
        assert_eq!(ctx.get_assets(AssetKind::Js), ["/js/Popper/popper.min.js"]);
    }

    #[test]
    fn test_asset_id_from_other_context_is_error() {
        let mut other = BuildContext::new();
        for i in 0..3 {
            other.assets_mut().shared(&format!("pkg{i}"));
        }
        let foreign = other.assets_mut().shared("far");

        let mut ctx = BuildContext::new();
        let err = ctx.use_asset(foreign, AssetKind::Js, "far", Priority::Normal).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(ctx.get_assets(AssetKind::Js).is_empty());
    }

    #[test]
    fn test_percent_encoded_cdn_url_is_kept() {
        let mut ctx = BuildContext::new();
        let shared = ctx.assets_mut().shared("foo");
        ctx.add_cdn("foo").url = Some("https://cdn.example/caf%C3%A9/%EF%BB/%PKG%/%NAME%".to_string());

        ctx.use_asset(shared, AssetKind::Js, "bar", Priority::Normal).unwrap();
        assert_eq!(
            ctx.get_assets(AssetKind::Js),
            ["https://cdn.example/caf%C3%A9/%EF%BB/foo/bar.js"]
        );
    }
}
