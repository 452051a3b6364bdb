//! Errors generated by the compiler.
//!
//! A single [`Error`]/[`ExprcResult`] type funnels every user-visible
//! failure (lexical, syntactic, semantic) to one `"Error: <message>"` exit
//! path, mirroring `calyx_utils::{Error, CalyxResult}`.

/// Convenience wrapper to represent success or a meaningful compiler error.
pub type ExprcResult<T> = std::result::Result<T, Error>;

/// An error produced anywhere in the compile pipeline.
#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub fn lex<S: ToString>(msg: S) -> Self {
        Self {
            kind: ErrorKind::Lex(msg.to_string()),
        }
    }

    pub fn parse<S: ToString>(msg: S) -> Self {
        Self {
            kind: ErrorKind::Parse(msg.to_string()),
        }
    }

    pub fn redefined<S: ToString>(name: S) -> Self {
        Self {
            kind: ErrorKind::Redefined(name.to_string()),
        }
    }

    pub fn unused<S: ToString>(name: S) -> Self {
        Self {
            kind: ErrorKind::Unused(name.to_string()),
        }
    }

    pub fn use_before_def<S: ToString>(name: S) -> Self {
        Self {
            kind: ErrorKind::UseBeforeDef(name.to_string()),
        }
    }

    pub fn double_def<S: ToString>(name: S) -> Self {
        Self {
            kind: ErrorKind::DoubleDef(name.to_string()),
        }
    }

    pub fn invalid_file<S: ToString>(msg: S) -> Self {
        Self {
            kind: ErrorKind::InvalidFile(msg.to_string()),
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error: {}", self.kind)
    }
}

impl std::error::Error for Error {}

/// The kinds of user-visible failure, one row per entry in the error
/// table: lexical, syntactic, semantic redefinition, semantic dead-code,
/// DFG use-before-def, DFG double-def, and file-system errors from the
/// driver's boundary.
#[derive(Clone, Debug)]
enum ErrorKind {
    /// Lexical error: an unrecognized character.
    Lex(String),
    /// Syntactic error: a malformed program (missing `;`, `)`, `=`, ident).
    Parse(String),
    /// A variable name bound by more than one assignment.
    Redefined(String),
    /// A variable assigned but never used and never declared `out`.
    Unused(String),
    /// DFG builder: a `src` operand with no matching `dst` (unreachable
    /// from a well-formed AST, but checked anyway).
    UseBeforeDef(String),
    /// DFG builder: an operand defined twice (unreachable from a
    /// well-formed AST, but checked anyway).
    DoubleDef(String),
    /// The input file could not be read.
    InvalidFile(String),
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorKind::*;
        match self {
            Lex(msg) => write!(f, "{msg}"),
            Parse(msg) => write!(f, "{msg}"),
            Redefined(name) => {
                write!(f, "variable {name} defined more than once")
            }
            Unused(name) => write!(f, "variable {name} is not used"),
            UseBeforeDef(name) => {
                write!(f, "operand {name} used before it is defined")
            }
            DoubleDef(name) => {
                write!(f, "operand {name} defined more than once")
            }
            InvalidFile(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::invalid_file(format!("IO error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redefined_renders_expected_message() {
        let err = Error::redefined("A");
        assert_eq!(err.to_string(), "Error: variable A defined more than once");
    }

    #[test]
    fn unused_renders_expected_message() {
        let err = Error::unused("X");
        assert_eq!(err.to_string(), "Error: variable X is not used");
    }

    #[test]
    fn message_omits_error_prefix() {
        let err = Error::unused("X");
        assert_eq!(err.message(), "variable X is not used");
    }
}
