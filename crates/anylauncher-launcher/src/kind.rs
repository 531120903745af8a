//! Game file kinds

use std::path::Path;

/// How a game file is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameKind {
    /// HTML page opened with the default browser
    WebPage,
    /// Anything else, run directly
    Executable,
}

impl GameKind {
    /// Get kind from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "html" | "htm" | "xhtml" => GameKind::WebPage,
            _ => GameKind::Executable,
        }
    }

    /// Get kind of a game path
    pub fn of(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(GameKind::Executable)
    }

    pub fn display_name(&self) -> &str {
        match self {
            GameKind::WebPage => "web page",
            GameKind::Executable => "executable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(GameKind::from_extension("html"), GameKind::WebPage);
        assert_eq!(GameKind::from_extension("HTM"), GameKind::WebPage);
        assert_eq!(GameKind::from_extension("exe"), GameKind::Executable);
    }

    #[test]
    fn test_kind_of_path() {
        assert_eq!(GameKind::of(Path::new("/games/Index.HTML")), GameKind::WebPage);
        assert_eq!(GameKind::of(Path::new("/games/run.sh")), GameKind::Executable);
        assert_eq!(GameKind::of(Path::new("/games/game")), GameKind::Executable);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(GameKind::WebPage.display_name(), "web page");
        assert_eq!(GameKind::Executable.display_name(), "executable");
    }
}
