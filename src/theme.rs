//! Light/dark theme preference.
//!
//! [`ThemeController`] owns the in-memory flag, writes every change to a
//! [`ThemeStore`] under the key `theme`, and broadcasts a [`ThemeChange`] to
//! subscribers so other parts of the application can react.
//!
//! Store failures never reach callers of the controller: they are logged and
//! the in-memory state still changes.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::broadcast;

/// Key the preference is stored under.
pub const THEME_KEY: &str = "theme";

/// Pending notifications kept for slow subscribers before they start lagging.
const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Error, Diagnostic)]
pub enum ThemeError {
    #[error("failed to read theme store: {path}")]
    #[diagnostic(
        code(docview::theme::read),
        help("Check that the state directory is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write theme store: {path}")]
    #[diagnostic(
        code(docview::theme::write),
        help("Check that the state directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt theme store {path}: {message}")]
    #[diagnostic(
        code(docview::theme::corrupt),
        help("Delete the file to reset the stored preferences.")
    )]
    Corrupt { path: String, message: String },

    #[error("unknown theme \"{value}\"")]
    #[diagnostic(code(docview::theme::unknown), help("Use \"light\" or \"dark\"."))]
    Unknown { value: String },
}

pub type ThemeResult<T> = std::result::Result<T, ThemeError>;

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err(ThemeError::Unknown {
                value: s.to_string(),
            }),
        }
    }
}

/// Published to subscribers on every [`ThemeController::set_theme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeChange {
    pub previous: Theme,
    pub current: Theme,
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Durable record of the `theme` key.
pub trait ThemeStore: Send + Sync {
    /// The stored value, or `None` if nothing was ever saved.
    fn load(&self) -> ThemeResult<Option<String>>;
    fn save(&self, value: &str) -> ThemeResult<()>;
}

/// In-process store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryThemeStore {
    value: Mutex<Option<String>>,
}

impl MemoryThemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: &str) -> Self {
        Self {
            value: Mutex::new(Some(value.to_string())),
        }
    }
}

impl ThemeStore for MemoryThemeStore {
    fn load(&self) -> ThemeResult<Option<String>> {
        Ok(self.value.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, value: &str) -> ThemeResult<()> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(value.to_string());
        Ok(())
    }
}

/// A small TOML key-value file, e.g. `theme = "dark"`.
///
/// Other keys in the file are preserved on save.
#[derive(Debug, Clone)]
pub struct FileThemeStore {
    path: PathBuf,
}

impl FileThemeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn read_table(&self) -> ThemeResult<toml::Table> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(toml::Table::new()),
            Err(e) => {
                return Err(ThemeError::Read {
                    path: self.path.display().to_string(),
                    source: e,
                });
            }
        };
        content.parse().map_err(|e: toml::de::Error| ThemeError::Corrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl ThemeStore for FileThemeStore {
    fn load(&self) -> ThemeResult<Option<String>> {
        let table = self.read_table()?;
        Ok(table
            .get(THEME_KEY)
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    fn save(&self, value: &str) -> ThemeResult<()> {
        let mut table = match self.read_table() {
            Ok(table) => table,
            Err(ThemeError::Corrupt { path, message }) => {
                tracing::warn!(%path, error = %message, "preferences file is corrupt; rewriting it");
                toml::Table::new()
            }
            Err(e) => return Err(e),
        };
        table.insert(THEME_KEY.into(), toml::Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ThemeError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(&self.path, table.to_string()).map_err(|e| ThemeError::Write {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Current theme plus its persistence and change notifications.
pub struct ThemeController<S: ThemeStore> {
    store: S,
    current: Theme,
    changes: broadcast::Sender<ThemeChange>,
}

impl<S: ThemeStore> ThemeController<S> {
    /// Initialize from whatever the store holds, defaulting to light.
    pub fn new(store: S) -> Self {
        let current = match store.load() {
            Ok(Some(value)) => value.parse::<Theme>().unwrap_or_else(|_| {
                tracing::debug!(%value, "ignoring unrecognized stored theme");
                Theme::default()
            }),
            Ok(None) => Theme::default(),
            Err(e) => {
                tracing::warn!(error = %e, "could not read stored theme, using default");
                Theme::default()
            }
        };
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            store,
            current,
            changes,
        }
    }

    pub fn theme(&self) -> Theme {
        self.current
    }

    pub fn is_dark(&self) -> bool {
        self.current.is_dark()
    }

    /// Apply `theme`: update the flag, persist it, then notify subscribers.
    ///
    /// Always persists and notifies, even when the theme is unchanged.
    pub fn set_theme(&mut self, theme: Theme) {
        let previous = self.current;
        self.current = theme;

        if let Err(e) = self.store.save(theme.as_str()) {
            tracing::warn!(error = %e, %theme, "failed to persist theme");
        }

        // No subscribers is fine.
        let _ = self.changes.send(ThemeChange {
            previous,
            current: theme,
        });
        tracing::debug!(%previous, current = %theme, "theme changed");
    }

    /// Flip between light and dark, returning the new theme.
    pub fn toggle(&mut self) -> Theme {
        let next = self.current.toggled();
        self.set_theme(next);
        next
    }

    /// Receive every subsequent [`ThemeChange`].
    pub fn subscribe(&self) -> broadcast::Receiver<ThemeChange> {
        self.changes.subscribe()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
