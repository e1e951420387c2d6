use serde::{Deserialize, Serialize};

/// User configuration from `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Current-format list file (relative paths resolve against the working directory)
    pub file: String,
    /// Legacy list file, read only when the current file is unusable
    pub legacy_file: String,
    /// Priority for new tasks when `-p` is not given
    pub priority: String,
    /// Default display order, e.g. `priority` or `-created`
    pub order: String,
    pub show_all: bool,
    pub summarise: bool,
    /// Colour output when writing to a terminal
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file: ".twig".to_string(),
            legacy_file: ".todo".to_string(),
            priority: "medium".to_string(),
            order: "priority".to_string(),
            show_all: false,
            summarise: false,
            color: true,
        }
    }
}
