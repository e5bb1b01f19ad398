use chart_schema::Tick;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadErrorKind {
    Parse,
    IO,
    Unsupported,
    SyncTrack,
}

impl LoadErrorKind {
    pub(crate) fn from_code(code: &'static str) -> Self {
        match code {
            // Parse
            "E1001" | "E1002" | "E1003" | "E1101" | "E1102" | "E1103" => Self::Parse,

            // IO
            "E2001" | "E2002" => Self::IO,

            "E2003" => Self::Unsupported,

            // SyncTrack
            "E3001" | "E3002" | "E3003" => Self::SyncTrack,

            _ => Self::Parse,
        }
    }
}

/// How the caller should react to a failed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    /// The file went away or could not be read. A library rescan may fix it.
    NeedsRescan,
    /// The file is broken or unsupported.
    Hard,
}

#[derive(Debug, Error, Clone)]
#[error("{code}: {message} (line {line})")]
pub struct LoadError {
    pub code: &'static str,
    pub kind: LoadErrorKind,
    pub message: String,
    pub line: usize,

    pub file: Option<String>,
    pub track: Option<String>,
    pub tick: Option<Tick>,
    pub context: Option<String>,
}

impl LoadError {
    pub(crate) fn new(code: &'static str, message: impl Into<String>, line: usize) -> Self {
        Self {
            code,
            kind: LoadErrorKind::from_code(code),
            message: message.into(),
            line,

            file: None,
            track: None,
            tick: None,
            context: None,
        }
    }

    pub fn failure(&self) -> LoadFailure {
        match self.kind {
            LoadErrorKind::IO => LoadFailure::NeedsRescan,
            _ => LoadFailure::Hard,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_track(mut self, track: impl Into<String>) -> Self {
        self.track = Some(track.into());
        self
    }

    pub fn with_tick(mut self, tick: Tick) -> Self {
        self.tick = Some(tick);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
