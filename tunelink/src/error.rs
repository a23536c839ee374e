use std::{borrow::Cow, sync::Arc};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Invalid,
    Unauthorized,
    RateLimited,
    Internal,
}

pub struct Error {
    backtrace: std::backtrace::Backtrace,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    kind: ErrorKind,
    message: Cow<'static, str>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            backtrace: std::backtrace::Backtrace::capture(),
            source: None,
            kind,
            message: message.into(),
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            backtrace: std::backtrace::Backtrace::capture(),
            source: Some(Box::new(source)),
            kind,
            message: message.into(),
        }
    }

    pub fn wrap(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            backtrace: std::backtrace::Backtrace::capture(),
            source: Some(Box::new(err)),
            kind: ErrorKind::Internal,
            message: "internal error".into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => write!(f, "{}", self.message),
        }?;
        if self.backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            write!(f, "\n\n{}", self.backtrace)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message, source),
            None => write!(f, "{}", self.message),
        }?;
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.source {
            Some(ref source) => Some(source.as_ref()),
            None => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, "I/O error", error)
    }
}

impl From<bincode::Error> for Error {
    fn from(error: bincode::Error) -> Self {
        Self::with_source(ErrorKind::Internal, "encoding error", error)
    }
}

/// Terminal outcome of a search that did not produce results.
#[derive(Debug)]
pub enum SearchError {
    /// A newer search superseded this one. Callers should drop the result.
    Cancelled,
    AllProvidersFailed(AllProvidersFailedError),
}

impl std::fmt::Display for SearchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => f.write_str("search cancelled"),
            Self::AllProvidersFailed(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for SearchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cancelled => None,
            Self::AllProvidersFailed(err) => Some(err),
        }
    }
}

impl From<AllProvidersFailedError> for SearchError {
    fn from(err: AllProvidersFailedError) -> Self {
        Self::AllProvidersFailed(err)
    }
}

/// Every configured provider failed, in attempt order.
#[derive(Debug)]
pub struct AllProvidersFailedError {
    failures: Vec<(String, Error)>,
}

impl AllProvidersFailedError {
    pub(crate) fn new(failures: Vec<(String, Error)>) -> Self {
        Self { failures }
    }

    pub fn failures(&self) -> &[(String, Error)] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<(String, Error)> {
        self.failures
    }
}

impl std::fmt::Display for AllProvidersFailedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("all providers failed")?;
        for (identifier, err) in self.failures.iter() {
            write!(f, "; {identifier}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AllProvidersFailedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .last()
            .map(|(_, err)| err as &(dyn std::error::Error + 'static))
    }
}

/// The charts could not be fetched and nothing was ever cached.
#[derive(Debug, Clone)]
pub struct ChartsUnavailableError {
    source: Arc<Error>,
}

impl ChartsUnavailableError {
    pub(crate) fn new(source: Arc<Error>) -> Self {
        Self { source }
    }

    pub fn upstream(&self) -> &Error {
        &self.source
    }
}

impl std::fmt::Display for ChartsUnavailableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "charts unavailable: {}", self.source)
    }
}

impl std::error::Error for ChartsUnavailableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}
