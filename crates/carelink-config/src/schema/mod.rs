//! Configuration schema types for CareLink.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with defaults that target a backend and relay
//! running on `localhost:5000`.

mod backend;
mod ice;
mod logging;
mod signaling;
mod voice;

pub use backend::*;
pub use ice::*;
pub use logging::*;
pub use signaling::*;
pub use voice::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for CareLink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CareConfig {
    pub backend: BackendConfig,
    pub signaling: SignalingConfig,
    pub ice: IceConfig,
    pub voice: VoiceConfig,
    pub logging: LoggingConfig,
}
