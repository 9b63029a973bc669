//! Error message formatting with actionable suggestions.

use std::error::Error;

use spm_core::error::SpmError;
use super::colors::ColorSupport;

/// Error formatter with suggestions
pub struct ErrorFormatter {
    colors: ColorSupport,
}

impl ErrorFormatter {
    pub fn new() -> Self {
        Self {
            colors: ColorSupport::detect(),
        }
    }

    #[cfg(test)]
    fn plain() -> Self {
        Self {
            colors: ColorSupport::disabled(),
        }
    }

    /// Format an error with its suggestion and source chain
    pub fn format_error(&self, error: &SpmError) -> String {
        let mut output = String::new();

        output.push_str(&self.colors.red("error"));
        output.push_str(": ");
        output.push_str(&error.to_string());
        output.push('\n');

        if let SpmError::TomlParse { file, line, column, .. } = error {
            if *line > 0 {
                output.push_str(&self.format_location(file, *line, *column));
                output.push('\n');
            }
        }

        if let Some(suggestion) = error.suggestion() {
            output.push('\n');
            output.push_str(&self.colors.dim("help"));
            output.push_str(": ");
            output.push_str(suggestion);
            output.push('\n');
        }

        let mut source = error.source();
        while let Some(err) = source {
            output.push_str(&self.colors.dim("caused by"));
            output.push_str(": ");
            output.push_str(&err.to_string());
            output.push('\n');
            source = err.source();
        }

        output
    }

    /// Format a simple error message
    pub fn format_simple(&self, message: &str) -> String {
        format!("{}: {}", self.colors.red("error"), message)
    }

    /// Format file location context
    pub fn format_location(&self, file: &str, line: usize, column: usize) -> String {
        format!("{} {}:{}:{}", self.colors.dim("-->"), file, line, column)
    }
}

impl Default for ErrorFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_includes_suggestion() {
        let error = SpmError::PublishAborted {
            message: "version exists".to_string(),
        };
        let formatted = ErrorFormatter::plain().format_error(&error);

        assert!(formatted.starts_with("error: Publish aborted: version exists\n"));
        assert!(formatted.contains("help: Nothing was uploaded"));
    }

    #[test]
    fn test_format_toml_location() {
        let error = SpmError::TomlParse {
            file: "config.toml".to_string(),
            message: "expected value".to_string(),
            line: 3,
            column: 7,
        };
        let formatted = ErrorFormatter::plain().format_error(&error);

        assert!(formatted.contains("--> config.toml:3:7"));
    }

    #[test]
    fn test_format_source_chain() {
        let error = SpmError::io_at(
            "/tmp/pkg.tar.gz",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        let formatted = ErrorFormatter::plain().format_error(&error);

        assert!(formatted.contains("caused by: no such file"));
    }
}
