use thiserror::Error;

/// Fatal analyzer failures.
///
/// Per-file problems (unparseable source, unrecognized captures, files that
/// change mid-extraction) are deliberately *not* represented here; those stay
/// local to a single pass and surface as partial results. The only conditions
/// that abort a language outright are a grammar that cannot be loaded and a
/// query resource that does not compile.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("grammar for {language} is unavailable: {message}")]
    GrammarUnavailable {
        language: &'static str,
        message: String,
    },

    #[error("query resource for {language} failed to compile: {message}")]
    QueryCompile {
        language: &'static str,
        message: String,
    },
}

/// Why a single file produced no units in a pass. Never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractFailure {
    /// Lexer/grammar error; the file is excluded from the index until the
    /// next attempt.
    ParseFailed,
    /// Content changed underneath the extraction; result discarded, file
    /// marked stale for re-extraction.
    SourceChanged,
    /// No profile claims this file's extension.
    UnsupportedLanguage,
}

impl std::fmt::Display for ExtractFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractFailure::ParseFailed => write!(f, "parse failed"),
            ExtractFailure::SourceChanged => write!(f, "source changed during extraction"),
            ExtractFailure::UnsupportedLanguage => write!(f, "unsupported language"),
        }
    }
}
