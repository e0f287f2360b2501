//! Code generation settings.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Target language of a generated parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum Language {
    #[default]
    Python,
    Java,
    #[value(name = "c++", alias = "cpp")]
    Cpp,
}

impl Language {
    /// File extension of generated source files (headers aside).
    pub fn extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::Java => "java",
            Language::Cpp => "cpp",
        }
    }

    /// Language implied by an output name's extension, if any.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "py" => Some(Language::Python),
            "java" => Some(Language::Java),
            "c" | "cc" | "cpp" => Some(Language::Cpp),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "c++",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language '{0}' (expected python, java or c++)")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "java" => Ok(Language::Java),
            "c++" | "cpp" => Ok(Language::Cpp),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

/// Where and in which language to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateConfig {
    /// Name of the entry module; its directory receives the supporting modules too.
    pub output: PathBuf,
    pub language: Language,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        GenerateConfig {
            output: PathBuf::from("out"),
            language: Language::default(),
        }
    }
}

impl GenerateConfig {
    /// Config for `output`; the language comes from `language` or else from the output extension.
    pub fn new(output: impl Into<PathBuf>, language: Option<Language>) -> Self {
        let output = output.into();
        let language = language
            .or_else(|| Language::from_extension(&output))
            .unwrap_or_default();
        GenerateConfig { output, language }
    }

    /// Directory the generated files go to.
    pub fn out_dir(&self) -> &Path {
        match self.output.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// File stem of the entry module (`out` for `build/out.py`).
    pub fn stem(&self) -> String {
        self.output
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("out")
            .to_string()
    }

    /// Entry module path: the output name, with the language's extension appended unless it
    /// already carries one for the configured language.
    pub fn entry_path(&self) -> PathBuf {
        match Language::from_extension(&self.output) {
            Some(language) if language == self.language => self.output.clone(),
            _ => {
                let mut name = self.output.clone().into_os_string();
                name.push(".");
                name.push(self.language.extension());
                PathBuf::from(name)
            }
        }
    }
}
