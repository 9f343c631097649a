//! Compile-time options.

use std::str::FromStr;

/// Environment variable read by [`CompileOptions::from_env`].
pub const DIAGNOSTICS_ENV: &str = "REQPLAN_DIAGNOSTICS";

/// How validator warnings are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiagnosticLevel {
    /// Warnings are discarded.
    Off,
    /// Warnings are logged and kept on the template.
    #[default]
    Warn,
    /// Warnings fail compilation.
    Deny,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown diagnostic level `{0}` (expected off, warn or deny)")]
pub struct UnknownDiagnosticLevel(pub String);

impl FromStr for DiagnosticLevel {
    type Err = UnknownDiagnosticLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(DiagnosticLevel::Off),
            "warn" => Ok(DiagnosticLevel::Warn),
            "deny" => Ok(DiagnosticLevel::Deny),
            _ => Err(UnknownDiagnosticLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileOptions {
    pub diagnostics: DiagnosticLevel,
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticLevel) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Options from `REQPLAN_DIAGNOSTICS`. An unset variable means the
    /// default; an unrecognised value is logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();
        if let Some(raw) = lookup(DIAGNOSTICS_ENV) {
            match raw.parse() {
                Ok(level) => options.diagnostics = level,
                Err(err) => tracing::warn!(%err, "ignoring {DIAGNOSTICS_ENV}"),
            }
        }
        options
    }
}
