//! CLI configuration

use crate::commands::{Cli, ColorArg};
use crate::error::{CliError, CliResult};
use authprobe::{HarnessConfig, LogLevel};
use serde::{Deserialize, Serialize};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - errors only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - bootstrap diagnostics
    Verbose,
    /// Debug - everything
    Debug,
}

impl Verbosity {
    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default `tracing` filter directive for this verbosity
    #[must_use]
    pub const fn tracing_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "authprobe_cli=info",
            Self::Debug => "authprobe_cli=debug,authprobe=debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stdout()),
        }
    }
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
}

impl CliConfig {
    /// Create a new CLI config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive from parsed arguments
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        let verbosity = if cli.quiet {
            Verbosity::Quiet
        } else {
            match cli.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Debug,
            }
        };
        Self {
            verbosity,
            color: cli.color.into(),
        }
    }

    /// Apply the color choice to the `console` crate
    pub fn apply_colors(&self) {
        let enabled = self.color.should_color();
        console::set_colors_enabled(enabled);
        console::set_colors_enabled_stderr(enabled);
    }
}

/// Resolve the harness configuration: defaults, then the YAML file, then
/// `BASE_URL`/`LOG_LEVEL`, then command-line overrides.
pub fn resolve_harness_config(cli: &Cli) -> CliResult<HarnessConfig> {
    let config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading harness config");
            HarnessConfig::from_yaml_file(path)?
        }
        None => HarnessConfig::default(),
    };
    apply_overrides(config.apply_env()?, cli.base_url.as_deref(), cli.log_level.as_deref())
}

/// Apply command-line overrides and validate
pub fn apply_overrides(
    mut config: HarnessConfig,
    base_url: Option<&str>,
    log_level: Option<&str>,
) -> CliResult<HarnessConfig> {
    if let Some(url) = base_url {
        config.base_url = url.to_string();
    }
    if let Some(level) = log_level {
        config.log_level = level
            .parse::<LogLevel>()
            .map_err(|_| CliError::invalid_argument(format!("--log-level {level}")))?;
    }
    config.validate()?;
    tracing::debug!(base_url = %config.base_url, level = %config.log_level, "resolved config");
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win() {
        let config = apply_overrides(
            HarnessConfig::default(),
            Some("http://localhost:3000"),
            Some("debug"),
        )
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_bad_overrides_rejected() {
        assert!(matches!(
            apply_overrides(HarnessConfig::default(), None, Some("loud")),
            Err(CliError::InvalidArgument { .. })
        ));
        assert!(matches!(
            apply_overrides(HarnessConfig::default(), Some("  "), None),
            Err(CliError::Probe(_))
        ));
    }

    #[test]
    fn test_verbosity_filters() {
        assert_eq!(Verbosity::Quiet.tracing_filter(), "error");
        assert!(Verbosity::Debug.is_verbose());
        assert!(!Verbosity::Normal.is_quiet());
    }
}
