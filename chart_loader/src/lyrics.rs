use chart_schema::{LyricEvent, LyricSymbolFlags, LyricsPhrase, LyricsTrack, SyncTrack, Tick};

use crate::raw::RawText;
use crate::text_events::{is_lyric_event, LYRIC_PREFIX, PHRASE_END, PHRASE_START};

const HARMONY_HIDE: char = '$';
const JOIN_HYPHEN: char = '=';
const STRIPPED: [char; 8] = ['-', '+', '#', '^', '*', '%', '/', '$'];
const SPACE_STAND_INS: [char; 2] = ['§', '_'];

fn symbol_flag(symbol: char) -> LyricSymbolFlags {
    match symbol {
        '-' | '=' => LyricSymbolFlags::JOIN_WITH_NEXT,
        '+' => LyricSymbolFlags::PITCH_SLIDE,
        '#' | '*' => LyricSymbolFlags::NON_PITCHED,
        '^' => LyricSymbolFlags::NON_PITCHED | LyricSymbolFlags::LENIENT_SCORING,
        '%' => LyricSymbolFlags::RANGE_SHIFT,
        '/' => LyricSymbolFlags::STATIC_SHIFT,
        '$' => LyricSymbolFlags::HARMONY_HIDDEN,
        _ => LyricSymbolFlags::NONE,
    }
}

/// Flags carried by the symbols of a raw lyric.
///
/// Only the harmony hide symbol counts at the front; every other symbol is read from the back.
pub(crate) fn lyric_flags(lyric: &str) -> LyricSymbolFlags {
    let mut flags = LyricSymbolFlags::NONE;
    if lyric.starts_with(HARMONY_HIDE) {
        flags.insert(LyricSymbolFlags::HARMONY_HIDDEN);
    }
    for symbol in lyric.chars().rev() {
        let flag = symbol_flag(symbol);
        if flag == LyricSymbolFlags::NONE {
            break;
        }
        flags.insert(flag);
    }
    flags
}

/// Display form of a raw lyric for the lyrics track.
pub(crate) fn strip_lyric(lyric: &str) -> String {
    let text: String = lyric
        .chars()
        .filter(|c| !STRIPPED.contains(c))
        .map(|c| match c {
            JOIN_HYPHEN => '-',
            c if SPACE_STAND_INS.contains(&c) => ' ',
            c => c,
        })
        .collect();
    text.trim().to_string()
}

struct PhraseBuilder<'a> {
    sync: &'a SyncTrack,
    pending: Vec<LyricEvent>,
    phrases: Vec<LyricsPhrase>,
}

impl PhraseBuilder<'_> {
    fn add_event(&mut self, text: &str, tick: Tick) {
        let Some(lyric) = text.strip_prefix(LYRIC_PREFIX) else {
            return;
        };
        let mut lyric = lyric.trim();

        // Some charts put the join hyphen on the pitch slide instead of the syllable.
        if (lyric == "+-" || lyric == "-+")
            && self.pending.last().is_some_and(|last| !last.joins_with_next())
        {
            if let Some(last) = self.pending.last_mut() {
                last.flags.insert(LyricSymbolFlags::JOIN_WITH_NEXT);
            }
            lyric = "+";
        }

        self.pending.push(LyricEvent {
            flags: lyric_flags(lyric),
            text: strip_lyric(lyric),
            tick,
            time: self.sync.tick_to_time(tick),
        });
    }

    fn add_phrase(&mut self, start: Tick, end: Tick) {
        if self.pending.is_empty() {
            return;
        }
        let time = self.sync.tick_to_time(start);
        self.phrases.push(LyricsPhrase {
            tick: start,
            tick_length: end.saturating_sub(start),
            time,
            time_length: self.sync.tick_to_time(end) - time,
            lyrics: std::mem::take(&mut self.pending),
        });
    }
}

#[derive(Default)]
struct TickState<'e> {
    tick: Tick,
    open: Option<Tick>,
    start: bool,
    end: bool,
    events: Vec<&'e str>,
}

impl TickState<'_> {
    fn commit(&mut self, builder: &mut PhraseBuilder) {
        if self.start != self.end {
            match self.open {
                None => self.open = Some(self.tick),
                Some(open) => {
                    builder.add_phrase(open, self.tick);
                    self.open = self.start.then_some(self.tick);
                }
            }
        } else if self.start && self.end {
            match self.open {
                None => {
                    self.flush(builder);
                    builder.add_phrase(self.tick, self.tick);
                }
                Some(open) => {
                    builder.add_phrase(open, self.tick);
                    self.open = Some(self.tick);
                }
            }
        }

        // Events outside a phrase are dropped.
        if self.open.is_some() {
            self.flush(builder);
        }
    }

    fn flush(&self, builder: &mut PhraseBuilder) {
        for text in &self.events {
            builder.add_event(text, self.tick);
        }
    }
}

/// Groups lyric events into phrases delimited by `phrase_start` and `phrase_end`.
///
/// `events` must be sorted by tick. Markers are committed one tick at a time; a start without an
/// end runs to `max_tick + 1`.
pub(crate) fn build_lyrics(events: &[RawText], sync: &SyncTrack, max_tick: Tick) -> LyricsTrack {
    let mut builder = PhraseBuilder {
        sync,
        pending: Vec::new(),
        phrases: Vec::new(),
    };
    let mut state = TickState::default();

    for event in events.iter().filter(|e| is_lyric_event(&e.text)) {
        if event.tick != state.tick {
            state.commit(&mut builder);
            state.tick = event.tick;
            state.start = false;
            state.end = false;
            state.events.clear();
        }

        match event.text.as_str() {
            PHRASE_START => state.start = true,
            PHRASE_END => state.end = true,
            text => state.events.push(text),
        }
    }

    if state.start && !state.end {
        state.end = true;
        state.tick = max_tick.saturating_add(1);
    }
    if state.end {
        state.commit(&mut builder);
    }

    LyricsTrack {
        phrases: builder.phrases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(tick: Tick, text: &str) -> RawText {
        RawText {
            tick,
            text: text.to_string(),
        }
    }

    fn sync() -> SyncTrack {
        SyncTrack::new(192)
    }

    #[test]
    fn symbols_become_flags() {
        assert_eq!(lyric_flags("state="), LyricSymbolFlags::JOIN_WITH_NEXT);
        assert_eq!(lyric_flags("oh-+"), LyricSymbolFlags::JOIN_WITH_NEXT | LyricSymbolFlags::PITCH_SLIDE);
        assert_eq!(
            lyric_flags("$la^"),
            LyricSymbolFlags::HARMONY_HIDDEN | LyricSymbolFlags::NON_PITCHED | LyricSymbolFlags::LENIENT_SCORING
        );
        assert_eq!(lyric_flags("word"), LyricSymbolFlags::NONE);
        // symbols in the middle do not count
        assert_eq!(lyric_flags("a-b"), LyricSymbolFlags::NONE);
    }

    #[test]
    fn stripping_replaces_stand_ins() {
        assert_eq!(strip_lyric("state="), "state-");
        assert_eq!(strip_lyric("Hel-"), "Hel");
        assert_eq!(strip_lyric("rock_and§roll#"), "rock and roll");
        assert_eq!(strip_lyric("+"), "");
        assert_eq!(strip_lyric("$ "), "");
    }

    #[test]
    fn hyphenated_word_across_events() {
        let events = vec![
            ev(0, "phrase_start"),
            ev(0, "lyric state="),
            ev(10, "lyric of="),
            ev(20, "lyric the="),
            ev(30, "lyric art"),
            ev(40, "phrase_end"),
        ];
        let track = build_lyrics(&events, &sync(), 40);
        assert_eq!(track.phrases.len(), 1);
        let phrase = &track.phrases[0];
        assert_eq!(phrase.lyrics.len(), 4);
        assert_eq!(phrase.display_text(), "state-of-the-art");
        assert_eq!(phrase.tick, 0);
        assert_eq!(phrase.tick_length, 40);
        assert_eq!(phrase.lyrics[2].tick, 20);
    }

    #[test]
    fn lyric_before_start_on_another_tick_is_dropped() {
        let events = vec![
            ev(0, "lyric lost"),
            ev(5, "phrase_start"),
            ev(5, "lyric kept"),
            ev(10, "phrase_end"),
        ];
        let track = build_lyrics(&events, &sync(), 10);
        assert_eq!(track.phrases.len(), 1);
        assert_eq!(track.phrases[0].display_text(), "kept");
    }

    #[test]
    fn start_without_end_runs_past_the_last_tick() {
        let events = vec![ev(0, "phrase_start"), ev(0, "lyric one"), ev(96, "lyric two")];
        let track = build_lyrics(&events, &sync(), 500);
        assert_eq!(track.phrases.len(), 1);
        assert_eq!(track.phrases[0].tick_end(), 501);
        assert_eq!(track.phrases[0].display_text(), "one two");
    }

    #[test]
    fn start_closes_the_open_phrase() {
        let events = vec![
            ev(0, "phrase_start"),
            ev(0, "lyric first"),
            ev(100, "phrase_start"),
            ev(100, "lyric second"),
            ev(200, "phrase_end"),
        ];
        let track = build_lyrics(&events, &sync(), 200);
        assert_eq!(track.phrases.len(), 2);
        assert_eq!(track.phrases[0].tick_length, 100);
        assert_eq!(track.phrases[1].display_text(), "second");
    }

    #[test]
    fn start_and_end_on_one_tick() {
        let events = vec![ev(50, "phrase_end"), ev(50, "lyric blip"), ev(50, "phrase_start")];
        let track = build_lyrics(&events, &sync(), 50);
        assert_eq!(track.phrases.len(), 1);
        assert_eq!(track.phrases[0].tick, 50);
        assert_eq!(track.phrases[0].tick_length, 0);
    }

    #[test]
    fn end_then_start_on_one_tick_hands_lyrics_to_the_next_phrase() {
        let events = vec![
            ev(0, "phrase_start"),
            ev(0, "lyric a"),
            ev(100, "phrase_end"),
            ev(100, "phrase_start"),
            ev(100, "lyric b"),
            ev(200, "phrase_end"),
        ];
        let track = build_lyrics(&events, &sync(), 200);
        let texts: Vec<String> = track.phrases.iter().map(LyricsPhrase::display_text).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn empty_phrases_are_not_kept() {
        let events = vec![ev(0, "phrase_start"), ev(10, "phrase_end")];
        assert!(build_lyrics(&events, &sync(), 10).is_empty());
    }

    #[test]
    fn deferred_join_marks_previous_lyric() {
        let events = vec![
            ev(0, "phrase_start"),
            ev(0, "lyric Hel"),
            ev(10, "lyric +-"),
            ev(20, "lyric lo"),
            ev(30, "phrase_end"),
        ];
        let track = build_lyrics(&events, &sync(), 30);
        let lyrics = &track.phrases[0].lyrics;
        assert!(lyrics[0].joins_with_next());
        assert_eq!(lyrics[1].flags, LyricSymbolFlags::PITCH_SLIDE);
        assert_eq!(lyrics[1].text, "");
        assert_eq!(track.phrases[0].display_text(), "Hel lo");
    }
}
