use crate::actuator::Actuator;
use crate::clock::Clock;
use crate::codec::{self, SignalStream, Symbol, UNKNOWN_GLYPH};
use crate::difficulty::DifficultyProfile;
use crate::timer::TimerChain;
use log::{debug, info};

/// Length of each tone pulse sent while the key is held.
pub const TONE_PULSE_MS: u64 = 100;
/// Interval between tone pulses while the key is held.
pub const TONE_REPEAT_MS: u64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyerState {
    Idle,
    Pressing,
    DebouncingLetter,
    DebouncingWord,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Debounce {
    FinalizeLetter,
    PromoteWord,
}

/// What a keyer call changed, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyerEvent {
    SymbolKeyed { symbol: Symbol, held_ms: u64 },
    LetterFinalized { code: String, letter: char },
    WordSpaced,
    Completed,
}

/// Classifies a key hold by duration.
pub fn classify(held_ms: u64, profile: &DifficultyProfile) -> Symbol {
    if held_ms < profile.dit_threshold_ms {
        Symbol::Dot
    } else {
        Symbol::Dash
    }
}

/// Single-button keyer for one practice phrase.
///
/// The session is driven by three calls: [`press`](Self::press),
/// [`release`](Self::release) and [`poll`](Self::poll). Debounce timers only
/// fire from inside these calls, so a caller's event loop should poll at
/// least by [`next_deadline`](Self::next_deadline). Timers that are already
/// overdue when a press arrives fire before the press cancels the chain.
#[derive(Debug)]
pub struct KeyerSession<C: Clock, A: Actuator> {
    clock: C,
    actuator: A,
    profile: DifficultyProfile,
    target_phrase: String,
    target: SignalStream,
    stream: SignalStream,
    letter: Vec<Symbol>,
    timers: TimerChain<Debounce>,
    press_started_ms: Option<u64>,
    next_tone_ms: u64,
    completed: bool,
}

impl<C: Clock, A: Actuator> KeyerSession<C, A> {
    pub fn new(profile: DifficultyProfile, target_phrase: &str, clock: C, actuator: A) -> Self {
        Self {
            clock,
            actuator,
            profile,
            target_phrase: target_phrase.to_uppercase(),
            target: codec::encode(target_phrase),
            stream: SignalStream::new(),
            letter: Vec::new(),
            timers: TimerChain::new(),
            press_started_ms: None,
            next_tone_ms: 0,
            completed: false,
        }
    }

    pub fn press(&mut self) -> Vec<KeyerEvent> {
        let events = self.poll();
        if self.completed || self.press_started_ms.is_some() {
            return events;
        }

        let now = self.clock.now_ms();
        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            debug!("press at {now}ms cancelled {cancelled} pending debounce timer(s)");
        }
        self.press_started_ms = Some(now);
        self.actuator.emit_pulse(TONE_PULSE_MS);
        self.next_tone_ms = now + TONE_REPEAT_MS;
        events
    }

    pub fn release(&mut self) -> Vec<KeyerEvent> {
        let Some(started) = self.press_started_ms.take() else {
            return Vec::new();
        };
        if self.completed {
            return Vec::new();
        }

        let now = self.clock.now_ms();
        let held_ms = now.saturating_sub(started);
        let symbol = classify(held_ms, &self.profile);
        self.letter.push(symbol);
        debug!("release after {held_ms}ms keyed {symbol:?}");

        self.timers
            .schedule(now, self.profile.letter_gap_ms, Debounce::FinalizeLetter);
        self.timers
            .schedule(now, self.profile.word_gap_ms, Debounce::PromoteWord);

        vec![KeyerEvent::SymbolKeyed { symbol, held_ms }]
    }

    /// Fires due debounce timers and keeps the tone going while pressed.
    pub fn poll(&mut self) -> Vec<KeyerEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();

        if self.press_started_ms.is_some() && now >= self.next_tone_ms {
            self.actuator.emit_pulse(TONE_PULSE_MS);
            self.next_tone_ms = now + TONE_REPEAT_MS;
        }

        for (_, action) in self.timers.due(now) {
            if self.completed {
                break;
            }
            match action {
                Debounce::FinalizeLetter => self.finalize_letter(&mut events),
                Debounce::PromoteWord => self.promote_word(&mut events),
            }
        }
        events
    }

    fn finalize_letter(&mut self, events: &mut Vec<KeyerEvent>) {
        if self.letter.is_empty() {
            return;
        }
        let code: String = self.letter.iter().map(|s| s.as_char()).collect();
        let letter = codec::CODE_TABLE
            .char_for(&code)
            .unwrap_or(UNKNOWN_GLYPH);
        self.stream.push_letter(&self.letter);
        self.letter.clear();
        debug!("letter finalized: {code} ({letter})");
        events.push(KeyerEvent::LetterFinalized { code, letter });
        self.check_completion(events);
    }

    fn promote_word(&mut self, events: &mut Vec<KeyerEvent>) {
        self.finalize_letter(events);
        if self.completed {
            return;
        }
        if self.stream.promote_word_space() {
            debug!("word boundary promoted");
            events.push(KeyerEvent::WordSpaced);
        }
        self.check_completion(events);
    }

    fn check_completion(&mut self, events: &mut Vec<KeyerEvent>) {
        if self.completed || self.target.is_empty() {
            return;
        }
        if self.stream.trimmed() == self.target {
            self.completed = true;
            self.timers.cancel_all();
            info!("keyer phrase {:?} completed", self.target_phrase);
            events.push(KeyerEvent::Completed);
        }
    }

    /// Switches timing profile. The current stream is discarded so one stream
    /// never mixes thresholds.
    pub fn set_difficulty(&mut self, profile: DifficultyProfile) {
        self.profile = profile;
        self.reset();
    }

    pub fn set_target(&mut self, phrase: &str) {
        self.target_phrase = phrase.to_uppercase();
        self.target = codec::encode(phrase);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.timers.cancel_all();
        self.letter.clear();
        self.stream = SignalStream::new();
        self.press_started_ms = None;
        self.completed = false;
    }

    /// Finalized stream followed by the letter being keyed.
    pub fn displayed_code(&self) -> SignalStream {
        self.stream.with_pending(&self.letter)
    }

    pub fn decoded_text(&self) -> String {
        codec::decode(&self.displayed_code())
    }

    /// True when what has been keyed so far cannot lead to the target.
    pub fn is_error(&self) -> bool {
        let shown = self.displayed_code().trimmed();
        !shown.is_empty() && !shown.is_prefix_of(&self.target)
    }

    pub fn state(&self) -> KeyerState {
        if self.completed {
            KeyerState::Complete
        } else if self.press_started_ms.is_some() {
            KeyerState::Pressing
        } else if self.timers.is_idle() {
            KeyerState::Idle
        } else if !self.letter.is_empty() {
            KeyerState::DebouncingLetter
        } else {
            KeyerState::DebouncingWord
        }
    }

    pub fn next_deadline(&self) -> Option<u64> {
        let tone = self.press_started_ms.map(|_| self.next_tone_ms);
        match (self.timers.next_deadline(), tone) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn is_pressed(&self) -> bool {
        self.press_started_ms.is_some()
    }

    pub fn stream(&self) -> &SignalStream {
        &self.stream
    }

    pub fn pending_letter(&self) -> &[Symbol] {
        &self.letter
    }

    pub fn target(&self) -> &SignalStream {
        &self.target
    }

    pub fn target_phrase(&self) -> &str {
        &self.target_phrase
    }

    pub fn profile(&self) -> DifficultyProfile {
        self.profile
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{NoopActuator, RecordingActuator};
    use crate::clock::ManualClock;
    use crate::difficulty::Difficulty;
    use assert_matches::assert_matches;

    type TestKeyer = KeyerSession<ManualClock, RecordingActuator>;

    fn keyer(difficulty: Difficulty, target: &str) -> (TestKeyer, ManualClock) {
        let clock = ManualClock::new(10_000);
        let session = KeyerSession::new(
            difficulty.profile(),
            target,
            clock.clone(),
            RecordingActuator::new(),
        );
        (session, clock)
    }

    fn tap(session: &mut TestKeyer, clock: &ManualClock, held_ms: u64) -> Vec<KeyerEvent> {
        let mut events = session.press();
        clock.advance(held_ms);
        events.extend(session.release());
        events
    }

    fn wait(session: &mut TestKeyer, clock: &ManualClock, ms: u64) -> Vec<KeyerEvent> {
        clock.advance(ms);
        session.poll()
    }

    #[test]
    fn test_classification_boundary_for_every_profile() {
        for difficulty in Difficulty::ALL {
            let profile = difficulty.profile();
            let (mut session, clock) = keyer(difficulty, "E");

            let events = tap(&mut session, &clock, profile.dit_threshold_ms - 1);
            assert_matches!(
                events.as_slice(),
                [KeyerEvent::SymbolKeyed { symbol: Symbol::Dot, .. }]
            );

            session.reset();
            let events = tap(&mut session, &clock, profile.dit_threshold_ms);
            assert_matches!(
                events.as_slice(),
                [KeyerEvent::SymbolKeyed { symbol: Symbol::Dash, .. }]
            );
        }
    }

    #[test]
    fn test_classify_function() {
        let profile = Difficulty::Fast.profile();
        assert_eq!(classify(0, &profile), Symbol::Dot);
        assert_eq!(classify(119, &profile), Symbol::Dot);
        assert_eq!(classify(120, &profile), Symbol::Dash);
        assert_eq!(classify(5_000, &profile), Symbol::Dash);
    }

    #[test]
    fn test_letter_finalized_at_letter_gap_not_before() {
        let (mut session, clock) = keyer(Difficulty::Normal, "SOS");
        tap(&mut session, &clock, 50);

        assert!(wait(&mut session, &clock, 399).is_empty());
        assert_eq!(session.state(), KeyerState::DebouncingLetter);
        assert!(session.stream().is_empty());

        let events = wait(&mut session, &clock, 1);
        assert_eq!(
            events,
            vec![KeyerEvent::LetterFinalized {
                code: ".".to_string(),
                letter: 'E'
            }]
        );
        assert_eq!(session.stream().to_string(), ".");
        assert_eq!(session.state(), KeyerState::DebouncingWord);
    }

    #[test]
    fn test_word_space_at_word_gap_not_before() {
        let (mut session, clock) = keyer(Difficulty::Normal, "SOS");
        tap(&mut session, &clock, 50);
        wait(&mut session, &clock, 400);

        assert!(wait(&mut session, &clock, 599).is_empty());
        assert_eq!(session.stream().to_string(), ".");

        let events = wait(&mut session, &clock, 1);
        assert_eq!(events, vec![KeyerEvent::WordSpaced]);
        assert_eq!(session.stream().to_string(), ". / ");
        assert_eq!(session.state(), KeyerState::Idle);
    }

    #[test]
    fn test_press_between_gaps_cancels_word_but_keeps_letter() {
        // release at 10_050: letter due 10_450, word due 11_050
        let (mut session, clock) = keyer(Difficulty::Normal, "SOS");
        tap(&mut session, &clock, 50);
        wait(&mut session, &clock, 500);
        assert_eq!(session.stream().to_string(), ".");

        // press at 10_550, release at 10_850
        tap(&mut session, &clock, 300);

        // the first word deadline passes with the dash still pending
        let events = wait(&mut session, &clock, 200);
        assert!(events.is_empty(), "{events:?}");
        assert_eq!(session.stream().to_string(), ".");
        assert_eq!(session.pending_letter(), &[Symbol::Dash]);
        assert_eq!(session.state(), KeyerState::DebouncingLetter);

        let events = wait(&mut session, &clock, 200);
        assert_matches!(
            events.as_slice(),
            [KeyerEvent::LetterFinalized { letter: 'T', .. }]
        );
        assert_eq!(session.stream().to_string(), ". -");

        assert!(wait(&mut session, &clock, 599).is_empty());
        assert_eq!(wait(&mut session, &clock, 1), vec![KeyerEvent::WordSpaced]);
        assert_eq!(session.stream().to_string(), ". - / ");
        assert_eq!(session.decoded_text(), "ET");
    }

    #[test]
    fn test_press_before_letter_gap_extends_letter() {
        let (mut session, clock) = keyer(Difficulty::Normal, "SOS");
        tap(&mut session, &clock, 50);
        clock.advance(100);
        tap(&mut session, &clock, 300);

        assert!(session.stream().is_empty());
        assert_eq!(session.pending_letter(), &[Symbol::Dot, Symbol::Dash]);
        assert_eq!(session.displayed_code().to_string(), ".-");

        wait(&mut session, &clock, 400);
        assert_eq!(session.stream().to_string(), ".-");
    }

    #[test]
    fn test_cancelled_timers_never_fire() {
        let (mut session, clock) = keyer(Difficulty::Normal, "SOS");
        tap(&mut session, &clock, 50);
        clock.advance(100);
        session.press();

        // held far past both gaps: the cancelled chain must stay dead
        assert!(wait(&mut session, &clock, 5_000).is_empty());
        assert!(session.stream().is_empty());
        session.release();
        assert_eq!(session.pending_letter(), &[Symbol::Dot, Symbol::Dash]);
    }

    #[test]
    fn test_word_promotion_never_duplicates() {
        let (mut session, clock) = keyer(Difficulty::Fast, "SOS");
        tap(&mut session, &clock, 50);
        wait(&mut session, &clock, 10_000);
        wait(&mut session, &clock, 10_000);
        assert_eq!(session.stream().to_string(), ". / ");

        tap(&mut session, &clock, 50);
        wait(&mut session, &clock, 10_000);
        assert_eq!(session.stream().to_string(), ". / . / ");
    }

    #[test]
    fn test_first_symbol_has_no_leading_separator() {
        let (mut session, clock) = keyer(Difficulty::Normal, "T");
        tap(&mut session, &clock, 250);
        wait(&mut session, &clock, 400);
        assert_eq!(session.stream().to_string(), "-");
    }

    #[test]
    fn test_letter_after_word_space_has_no_extra_space() {
        let (mut session, clock) = keyer(Difficulty::Normal, "E T X");
        tap(&mut session, &clock, 50);
        wait(&mut session, &clock, 1_000);
        tap(&mut session, &clock, 250);
        wait(&mut session, &clock, 400);
        assert_eq!(session.stream().to_string(), ". / -");
    }

    #[test]
    fn test_overdue_timers_fire_before_press() {
        let (mut session, clock) = keyer(Difficulty::Normal, "SOS");
        tap(&mut session, &clock, 50);
        clock.advance(450);

        let events = session.press();
        assert_matches!(events.as_slice(), [KeyerEvent::LetterFinalized { .. }]);
        clock.advance(50);
        session.release();
        wait(&mut session, &clock, 400);
        assert_eq!(session.stream().to_string(), ". .");
    }

    #[test]
    fn test_completion_single_word() {
        let (mut session, clock) = keyer(Difficulty::Normal, "et");
        tap(&mut session, &clock, 50);
        wait(&mut session, &clock, 400);
        assert!(!session.is_complete());

        tap(&mut session, &clock, 250);
        let events = wait(&mut session, &clock, 400);
        assert_eq!(
            events,
            vec![
                KeyerEvent::LetterFinalized {
                    code: "-".to_string(),
                    letter: 'T'
                },
                KeyerEvent::Completed,
            ]
        );
        assert!(session.is_complete());
        assert_eq!(session.state(), KeyerState::Complete);
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_completion_across_words() {
        let (mut session, clock) = keyer(Difficulty::Relaxed, "E T");
        tap(&mut session, &clock, 100);
        wait(&mut session, &clock, 1_500);
        assert_eq!(session.stream().to_string(), ". / ");
        assert!(!session.is_complete());

        tap(&mut session, &clock, 400);
        let events = wait(&mut session, &clock, 600);
        assert_eq!(events.last(), Some(&KeyerEvent::Completed));
    }

    #[test]
    fn test_completion_ignores_trailing_word_separator() {
        let (mut session, clock) = keyer(Difficulty::Normal, "E");
        tap(&mut session, &clock, 50);
        clock.advance(1_000);
        let events = session.poll();
        assert_eq!(events.last(), Some(&KeyerEvent::Completed));
        assert_eq!(session.stream().to_string(), ".");
    }

    #[test]
    fn test_input_after_completion_is_ignored() {
        let (mut session, clock) = keyer(Difficulty::Normal, "E");
        tap(&mut session, &clock, 50);
        wait(&mut session, &clock, 400);
        assert!(session.is_complete());

        let pulses_before = session.actuator().pulses().len();
        assert!(tap(&mut session, &clock, 50).is_empty());
        assert!(wait(&mut session, &clock, 5_000).is_empty());
        assert_eq!(session.stream().to_string(), ".");
        assert_eq!(session.actuator().pulses().len(), pulses_before);
    }

    #[test]
    fn test_difficulty_switch_starts_fresh_stream() {
        let (mut session, clock) = keyer(Difficulty::Normal, "SOS");
        tap(&mut session, &clock, 50);
        wait(&mut session, &clock, 400);
        tap(&mut session, &clock, 50);

        session.set_difficulty(Difficulty::Fast.profile());
        assert!(session.stream().is_empty());
        assert!(session.pending_letter().is_empty());
        assert_eq!(session.state(), KeyerState::Idle);
        assert!(wait(&mut session, &clock, 5_000).is_empty());

        // 150ms is a dot on Normal but a dash on Fast
        tap(&mut session, &clock, 150);
        assert_eq!(session.pending_letter(), &[Symbol::Dash]);
    }

    #[test]
    fn test_live_preview_and_error_flag() {
        let (mut session, clock) = keyer(Difficulty::Normal, "SOS");
        tap(&mut session, &clock, 50);
        clock.advance(50);
        tap(&mut session, &clock, 50);
        assert_eq!(session.decoded_text(), "I");
        assert!(!session.is_error());

        clock.advance(50);
        tap(&mut session, &clock, 250);
        assert_eq!(session.displayed_code().to_string(), "..-");
        assert!(session.is_error());
    }

    #[test]
    fn test_tone_pulses_while_pressed() {
        let (mut session, clock) = keyer(Difficulty::Normal, "T");
        session.press();
        assert_eq!(session.actuator().pulses(), &[TONE_PULSE_MS]);
        assert_eq!(session.state(), KeyerState::Pressing);

        wait(&mut session, &clock, 90);
        wait(&mut session, &clock, 90);
        assert_eq!(session.actuator().pulses().len(), 3);

        session.release();
        wait(&mut session, &clock, 90);
        assert_eq!(session.actuator().pulses().len(), 3);
    }

    #[test]
    fn test_release_without_press_is_ignored() {
        let (mut session, _clock) = keyer(Difficulty::Normal, "T");
        assert!(session.release().is_empty());
        assert_eq!(session.state(), KeyerState::Idle);
    }

    #[test]
    fn test_set_target_resets_progress() {
        let (mut session, clock) = keyer(Difficulty::Normal, "E");
        tap(&mut session, &clock, 50);
        wait(&mut session, &clock, 400);
        assert!(session.is_complete());

        session.set_target("hi");
        assert!(!session.is_complete());
        assert_eq!(session.target_phrase(), "HI");
        assert_eq!(session.target().to_string(), ".... ..");
        assert!(session.stream().is_empty());
    }

    #[test]
    fn test_works_with_noop_actuator() {
        let clock = ManualClock::new(0);
        let mut session = KeyerSession::new(
            Difficulty::Normal.profile(),
            "E",
            &clock,
            NoopActuator,
        );
        session.press();
        clock.advance(40);
        session.release();
        clock.advance(400);
        session.poll();
        assert!(session.is_complete());
    }
}
