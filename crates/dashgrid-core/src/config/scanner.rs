use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::loader::{read_to_string, ConfigLoader};
use super::Config;
use crate::log::LogMessages;

const REQUIRED_KEYS: [&str; 3] = ["name", "title", "dimensions"];
const DIMENSION_KEYS: [&str; 4] = ["x", "y", "width", "height"];
const MIN_EDGE: u16 = 2;

/// Validates every widget file before a session starts.
///
/// The scan never stops at the first problem: it reports everything it finds
/// so the user can fix the whole directory in one go.
pub struct ConfigScanner<'a> {
    loader: &'a ConfigLoader,
}

impl<'a> ConfigScanner<'a> {
    /// Scanner over the files `loader` points at.
    pub fn new(loader: &'a ConfigLoader) -> Self {
        Self { loader }
    }

    /// Scan `widgets/*.toml` against the plugin names in `known`.
    ///
    /// Returns the parsed configs in file-name order when nothing is wrong,
    /// otherwise every problem found. Warnings from a passing scan are added
    /// to `log`.
    pub fn scan<S: AsRef<str>>(
        &self,
        known: &[S],
        log: &mut LogMessages,
    ) -> Result<Vec<Config>, LogMessages> {
        let mut problems = LogMessages::new();
        let files = match self.loader.widget_files() {
            Ok(files) => files,
            Err(e) => {
                problems.error(e.to_string());
                return Err(problems);
            }
        };

        let mut configs = Vec::new();
        let mut by_name: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for path in &files {
            if let Some(config) = scan_file(path, known, &mut problems) {
                by_name
                    .entry(config.name.clone())
                    .or_default()
                    .push(path.clone());
                configs.push(config);
            }
        }

        for (name, paths) in &by_name {
            if paths.len() > 1 {
                let listed: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                problems.error(format!(
                    "widget name \"{name}\" is declared more than once: {}",
                    listed.join(", ")
                ));
            }
        }

        if configs.is_empty() && problems.is_empty() {
            problems.warning(format!(
                "no widget configs found in {}",
                self.loader.widgets_dir().display()
            ));
            tracing::warn!("config scan found no widgets");
        }

        if problems.has_errors() {
            tracing::warn!(problems = problems.len(), "config scan failed");
            Err(problems)
        } else {
            tracing::debug!(widgets = configs.len(), "config scan passed");
            log.extend(problems);
            Ok(configs)
        }
    }
}

fn scan_file<S: AsRef<str>>(path: &Path, known: &[S], problems: &mut LogMessages) -> Option<Config> {
    let shown = path.display();
    let text = match read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            problems.error(e.to_string());
            return None;
        }
    };
    let table: toml::Table = match toml::from_str(&text) {
        Ok(table) => table,
        Err(e) => {
            problems.error(format!("{shown}: invalid TOML: {}", e.message()));
            return None;
        }
    };

    let before = problems.len();
    for key in REQUIRED_KEYS {
        if !table.contains_key(key) {
            problems.error(format!("{shown}: missing mandatory field \"{key}\""));
        }
    }
    if let Some(dimensions) = table.get("dimensions") {
        match dimensions.as_table() {
            Some(dims) => {
                for key in DIMENSION_KEYS {
                    if !dims.contains_key(key) {
                        problems.error(format!(
                            "{shown}: missing mandatory field \"dimensions.{key}\""
                        ));
                    }
                }
            }
            None => {
                problems.error(format!("{shown}: \"dimensions\" must be a table"));
            }
        }
    }
    if problems.len() > before {
        return None;
    }

    let mut config: Config = match table.try_into() {
        Ok(config) => config,
        Err(e) => {
            problems.error(format!("{shown}: {}", e.message()));
            return None;
        }
    };
    config.source = Some(path.to_path_buf());

    if let Some(seconds) = config.interval {
        if !seconds.is_finite() || seconds <= 0.0 {
            problems.error(format!(
                "{shown}: interval must be a positive number of seconds, got {seconds}"
            ));
        }
    }
    let dims = config.dimensions;
    if dims.width < MIN_EDGE || dims.height < MIN_EDGE {
        problems.error(format!(
            "{shown}: widget \"{}\" must be at least {MIN_EDGE}x{MIN_EDGE} to fit its border",
            config.name
        ));
    }
    if !known.iter().any(|k| k.as_ref() == config.name) {
        problems.error(format!(
            "{shown}: unknown widget \"{}\" (no plugin with that name)",
            config.name
        ));
    }
    Some(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const KNOWN: [&str; 3] = ["clock", "calendar", "greetings"];

    fn widget(name: &str) -> String {
        format!(
            "name = \"{name}\"\ntitle = \"{name}\"\n[dimensions]\nx = 0\ny = 0\nwidth = 10\nheight = 4\n"
        )
    }

    fn scan(files: &[(&str, String)]) -> Result<Vec<Config>, LogMessages> {
        scan_logged(files, &mut LogMessages::new())
    }

    fn scan_logged(
        files: &[(&str, String)],
        log: &mut LogMessages,
    ) -> Result<Vec<Config>, LogMessages> {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("widgets")).unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join("widgets").join(name), contents).unwrap();
        }
        let loader = ConfigLoader::new(dir.path());
        ConfigScanner::new(&loader).scan(&KNOWN, log)
    }

    #[test]
    fn valid_directory_passes_in_file_order() {
        let configs = scan(&[
            ("b.toml", widget("clock")),
            ("a.toml", widget("calendar")),
        ])
        .unwrap();
        let names: Vec<&str> = configs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["calendar", "clock"]);
        assert!(configs[0].source.is_some());
    }

    #[test]
    fn duplicate_names_fail_and_list_both_files() {
        let problems = scan(&[
            ("one.toml", widget("clock")),
            ("two.toml", widget("clock")),
        ])
        .unwrap_err();
        let text = problems.to_string();
        assert!(text.contains("\"clock\" is declared more than once"));
        assert!(text.contains("one.toml"));
        assert!(text.contains("two.toml"));
    }

    #[test]
    fn reports_every_missing_field() {
        let problems = scan(&[
            ("a.toml", "name = \"clock\"\n[dimensions]\nx = 0\n".to_string()),
            ("b.toml", "title = \"x\"\n".to_string()),
        ])
        .unwrap_err();
        let text = problems.to_string();
        assert!(text.contains("a.toml: missing mandatory field \"title\""));
        assert!(text.contains("\"dimensions.width\""));
        assert!(text.contains("b.toml: missing mandatory field \"name\""));
        assert!(text.contains("b.toml: missing mandatory field \"dimensions\""));
    }

    #[test]
    fn unknown_widget_and_bad_interval_are_errors() {
        let mut bad = widget("weather");
        bad.insert_str(0, "interval = -1\n");
        let problems = scan(&[("w.toml", bad)]).unwrap_err();
        let text = problems.to_string();
        assert!(text.contains("unknown widget \"weather\""));
        assert!(text.contains("interval must be a positive number"));
    }

    #[test]
    fn dimensions_must_be_a_table() {
        let problems = scan(&[(
            "a.toml",
            "name = \"clock\"\ntitle = \"Clock\"\ndimensions = 5\n".to_string(),
        )])
        .unwrap_err();
        assert!(problems
            .to_string()
            .contains("a.toml: \"dimensions\" must be a table"));
    }

    #[test]
    fn syntax_errors_are_reported() {
        let problems = scan(&[("a.toml", "name = ".to_string())]).unwrap_err();
        assert!(problems.to_string().contains("invalid TOML"));
    }

    #[test]
    fn empty_directory_only_warns() {
        let mut log = LogMessages::new();
        assert_eq!(scan_logged(&[], &mut log).unwrap(), vec![]);
        assert_eq!(log.len(), 1);
        assert!(!log.has_errors());
    }
}
