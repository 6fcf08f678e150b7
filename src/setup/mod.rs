pub mod wizard;

pub use wizard::{apply_preset, run_setup_wizard, Preset};
