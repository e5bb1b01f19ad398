use std::{fs, io, path::Path};

use chart_schema::{SongChart, SongEntry};

mod chart_reader;
pub mod downsample;
mod error;
mod flags;
mod lyrics;
mod midi_reader;
mod normalize;
pub mod raw;
mod settings;
mod sync;
mod text_events;

pub use downsample::{
    downsample_expert_to_hard, downsample_hard_to_medium, downsample_medium_to_easy, fill_missing_difficulties,
};
pub use error::{LoadError, LoadErrorKind, LoadFailure};
pub use flags::RawNoteFlags;
pub use normalize::normalize;
pub use raw::{RawChart, RawNote, RawPhrase, RawSong, RawText};
pub use settings::{ParseSettings, DEFAULT_STAR_POWER_NOTE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartFormat {
    Chart,
    Midi,
}

impl ChartFormat {
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "chart" => Some(Self::Chart),
            "mid" | "midi" => Some(Self::Midi),
            _ => None,
        }
    }
}

/// Chart bytes in one of the supported formats.
#[derive(Debug, Clone, Copy)]
pub enum ChartSource<'a> {
    Chart(&'a str),
    Midi(&'a [u8]),
}

impl ChartSource<'_> {
    /// Reads the source into the format independent raw model. No chord or HOPO resolution.
    pub fn read(&self, settings: &ParseSettings) -> Result<RawSong, LoadError> {
        match self {
            ChartSource::Chart(src) => chart_reader::read_chart(src, settings),
            ChartSource::Midi(bytes) => midi_reader::read_midi(bytes, settings),
        }
    }
}

pub fn load_song(source: ChartSource, settings: &ParseSettings) -> Result<SongChart, LoadError> {
    let raw = source.read(settings)?;
    Ok(normalize(&raw, settings))
}

pub fn load_file(path: impl AsRef<Path>, settings: &ParseSettings) -> Result<SongChart, LoadError> {
    let path = path.as_ref();
    let file = path.display().to_string();

    let format = ChartFormat::from_path(path).ok_or_else(|| {
        LoadError::new("E2003", "unsupported notes file extension (expected .chart or .mid)", 0)
            .with_file(file.clone())
    })?;
    let bytes = fs::read(path).map_err(|e| {
        let code = match e.kind() {
            io::ErrorKind::NotFound => "E2001",
            _ => "E2002",
        };
        LoadError::new(code, format!("failed to read notes file: {e}"), 0).with_file(file.clone())
    })?;

    let loaded = match format {
        ChartFormat::Chart => {
            let src = std::str::from_utf8(&bytes).map_err(|e| {
                LoadError::new("E1003", format!("chart is not valid UTF-8: {e}"), 0).with_file(file.clone())
            })?;
            load_song(ChartSource::Chart(src), settings)
        }
        ChartFormat::Midi => load_song(ChartSource::Midi(&bytes), settings),
    };
    loaded.map_err(|e| match e.file {
        Some(_) => e,
        None => e.with_file(file),
    })
}

/// Loads the notes file a library entry points at.
pub fn load_entry(entry: &SongEntry, settings: &ParseSettings) -> Result<SongChart, LoadError> {
    load_file(entry.notes_path(), settings)
}

#[cfg(test)]
mod tests;
