use crate::config;

/// Load settings, falling back to defaults. Runs before the logger exists,
/// so problems go straight to stderr.
pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                eprintln!("msupack: invalid config, using defaults: {msg}");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            // Config is optional; failures should not prevent a run.
            eprintln!("msupack: failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}
