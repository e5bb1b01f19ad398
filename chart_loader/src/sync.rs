use chart_schema::{SyncTrack, Tempo, TimeSignature, DEFAULT_BPM};

use crate::raw::{RawTempo, RawTimeSignature};
use crate::LoadError;

/// Validates tempo map markers and builds the sync track.
///
/// Markers may arrive unsorted. A later marker on an already used tick replaces the earlier one.
pub(crate) fn build_sync_track(
    resolution: u32,
    mut tempos: Vec<RawTempo>,
    mut time_signatures: Vec<RawTimeSignature>,
) -> Result<SyncTrack, LoadError> {
    if resolution == 0 {
        return Err(LoadError::new("E3002", "resolution must be > 0", 0));
    }

    for tempo in &tempos {
        if !tempo.bpm.is_finite() || !(tempo.bpm > 0.0) {
            return Err(LoadError::new("E3001", format!("tempo must be > 0 (bpm={})", tempo.bpm), tempo.line)
                .with_tick(tempo.tick));
        }
    }
    for ts in &time_signatures {
        if ts.numerator == 0 || ts.denominator == 0 {
            return Err(LoadError::new(
                "E3003",
                format!("invalid time signature {}/{}", ts.numerator, ts.denominator),
                ts.line,
            )
            .with_tick(ts.tick));
        }
    }

    tempos.sort_by_key(|t| t.tick);
    time_signatures.sort_by_key(|t| t.tick);

    let mut sync = SyncTrack::new(resolution);
    sync.tempos.clear();
    sync.time_signatures.clear();

    for tempo in tempos {
        let marker = Tempo {
            tick: tempo.tick,
            time: 0.0,
            bpm: tempo.bpm,
        };
        match sync.tempos.last_mut() {
            Some(last) if last.tick == marker.tick => {
                log::warn!("duplicate tempo at tick {} (line {}), keeping the later one", tempo.tick, tempo.line);
                *last = marker;
            }
            _ => sync.tempos.push(marker),
        }
    }
    for ts in time_signatures {
        let marker = TimeSignature {
            tick: ts.tick,
            time: 0.0,
            numerator: ts.numerator,
            denominator: ts.denominator,
        };
        match sync.time_signatures.last_mut() {
            Some(last) if last.tick == marker.tick => {
                log::warn!("duplicate time signature at tick {} (line {})", ts.tick, ts.line);
                *last = marker;
            }
            _ => sync.time_signatures.push(marker),
        }
    }

    if sync.tempos.first().map_or(true, |t| t.tick != 0) {
        sync.tempos.insert(
            0,
            Tempo {
                tick: 0,
                time: 0.0,
                bpm: DEFAULT_BPM,
            },
        );
    }
    if sync.time_signatures.first().map_or(true, |t| t.tick != 0) {
        sync.time_signatures.insert(0, TimeSignature::DEFAULT);
    }

    sync.recompute_times();
    Ok(sync)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LoadErrorKind;

    fn tempo(tick: u32, bpm: f64) -> RawTempo {
        RawTempo { tick, bpm, line: 1 }
    }

    #[test]
    fn inserts_defaults_and_sorts() {
        let sync = build_sync_track(192, vec![tempo(384, 60.0)], vec![]).unwrap();
        assert_eq!(sync.tempos.len(), 2);
        assert_eq!(sync.tempos[0].bpm, 120.0);
        assert!((sync.tempos[1].time - 1.0).abs() < 1e-9);
        assert_eq!(sync.time_signatures[0].numerator, 4);
    }

    #[test]
    fn duplicate_tick_keeps_later_marker() {
        let sync = build_sync_track(192, vec![tempo(0, 100.0), tempo(0, 150.0)], vec![]).unwrap();
        assert_eq!(sync.tempos.len(), 1);
        assert_eq!(sync.tempos[0].bpm, 150.0);
    }

    #[test]
    fn rejects_non_positive_tempo() {
        let err = build_sync_track(192, vec![tempo(0, 0.0)], vec![]).unwrap_err();
        assert_eq!(err.code, "E3001");
        assert_eq!(err.kind, LoadErrorKind::SyncTrack);

        let err = build_sync_track(192, vec![tempo(0, -10.0)], vec![]).unwrap_err();
        assert_eq!(err.code, "E3001");

        let err = build_sync_track(192, vec![tempo(0, f64::NAN)], vec![]).unwrap_err();
        assert_eq!(err.code, "E3001");
    }

    #[test]
    fn rejects_zero_resolution_and_bad_signature() {
        assert_eq!(build_sync_track(0, vec![], vec![]).unwrap_err().code, "E3002");

        let ts = RawTimeSignature {
            tick: 0,
            numerator: 0,
            denominator: 4,
            line: 3,
        };
        let err = build_sync_track(192, vec![], vec![ts]).unwrap_err();
        assert_eq!(err.code, "E3003");
        assert_eq!(err.line, 3);
    }
}
