//! External tool detection.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Name of the tool.
    pub name: String,
    /// Whether the tool ran successfully.
    pub available: bool,
    /// First line of the version banner, if available.
    pub version: Option<String>,
    /// Path that was (or would be) executed.
    pub path: PathBuf,
}

/// Resolve the executable for `name`.
///
/// A configured path is returned as-is, even if it does not exist, so that a
/// misconfiguration surfaces as a spawn failure with a diagnostic at request
/// time. Without one, `PATH` is searched; if that fails the bare name is used.
pub fn resolve_tool(name: &str, configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(path) => path.to_path_buf(),
        None => which::which(name).unwrap_or_else(|_| PathBuf::from(name)),
    }
}

/// Check whether a tool runs and report its version banner.
///
/// ffmpeg and ffprobe take a single-dash `-version` flag.
///
/// # Example
///
/// ```no_run
/// use marquee_av::check_tool;
///
/// let info = check_tool("ffprobe", None);
/// if info.available {
///     println!("ffprobe version: {:?}", info.version);
/// }
/// ```
pub fn check_tool(name: &str, configured: Option<&Path>) -> ToolInfo {
    let path = resolve_tool(name, configured);

    match Command::new(&path).arg("-version").output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string());

            ToolInfo {
                name: name.to_string(),
                available: true,
                version,
                path,
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path,
        },
    }
}

/// Check ffmpeg and ffprobe.
pub fn check_tools(ffmpeg: Option<&Path>, ffprobe: Option<&Path>) -> Vec<ToolInfo> {
    vec![check_tool("ffmpeg", ffmpeg), check_tool("ffprobe", ffprobe)]
}
