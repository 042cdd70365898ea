// Configuration loading

pub mod settings;

pub use settings::{EvalSettings, Settings, SettingsError, TraceSettings};
