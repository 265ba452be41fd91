mod entry;
mod prefs;
mod registry;
mod surface;

pub use entry::BaseMapEntry;
pub use prefs::{keys, JsonFilePreferences, MemoryPreferences, PreferenceStore};
pub use registry::{BaseMapRegistry, RegistryConfig, RegistryState};
pub use surface::TileSurface;
