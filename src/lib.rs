pub mod asset;
pub mod cdn;
pub mod cli;
pub mod config;
pub mod context;
pub mod declared;
pub mod deps;
pub mod emit;
pub mod error;
pub mod locate;
pub mod logging;
pub mod report;
pub mod repository;
pub mod resolve;
pub mod unit;

pub use asset::{Asset, AssetId, AssetKind, AssetRegistry, Priority};
pub use cdn::{CdnDeclaration, CdnProvider, CdnRegistry};
pub use config::Config;
pub use context::BuildContext;
pub use declared::{DeclaredScript, UnitDefinition};
pub use emit::{Bundle, Emitter};
pub use error::{Error, Result};
pub use locate::Locator;
pub use repository::{Position, Repository};
pub use unit::{Script, Unit, UnitSetup};
