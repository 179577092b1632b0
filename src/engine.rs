use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use rand::Rng;

use crate::cadence::CadenceProfile;
use crate::control::{Command, EngineOptions, RunPhase};
use crate::mistakes;
use crate::observer::{Observer, RunOutcome};
use crate::settings::Settings;
use crate::sink::{KeystrokeSink, SpecialKey};

const NAV_STEP_SECS: f64 = 0.02;
const BACKSPACE_SECS: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Newline,
}

/// Split text into whitespace-delimited words, with every newline as its own token.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            tokens.push(Token::Newline);
        }
        tokens.extend(line.split_whitespace().map(|w| Token::Word(w.to_string())));
    }
    tokens
}

pub fn progress_percent(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (index * 100 / total).min(100) as u8
}

/// A typo left in the document, waiting to be fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingError {
    pub incorrect: String,
    pub correct: String,
    /// Editor offset where the incorrect token starts.
    pub offset: usize,
}

#[derive(Debug)]
pub struct RunState {
    pub phase: RunPhase,
    pub stopped: bool,
    pub paused: bool,
    /// Editor offset of the writing point, in characters.
    pub cursor: usize,
    pub pending: VecDeque<PendingError>,
    /// Every command sender is gone; a pause can no longer be lifted.
    detached: bool,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            phase: RunPhase::Idle,
            stopped: false,
            paused: false,
            cursor: 0,
            pending: VecDeque::new(),
            detached: false,
        }
    }
}

/// Types one text into a sink with human-like pacing, typos and late fixes.
///
/// The engine owns all run state. Control requests arrive on the command
/// channel and are applied whenever the engine sleeps, so stop and pause are
/// observed within one tick.
pub struct TypingEngine<'a, S, R> {
    text: &'a str,
    settings: Settings,
    cadence: CadenceProfile,
    options: EngineOptions,
    sink: S,
    observer: &'a dyn Observer,
    commands: Receiver<Command>,
    rng: R,
    state: RunState,
}

impl<'a, S: KeystrokeSink, R: Rng> TypingEngine<'a, S, R> {
    pub fn new(
        text: &'a str,
        settings: Settings,
        options: EngineOptions,
        sink: S,
        observer: &'a dyn Observer,
        commands: Receiver<Command>,
        rng: R,
    ) -> Self {
        let cadence = CadenceProfile::for_text(&settings, text);
        Self {
            text,
            settings,
            cadence,
            options,
            sink,
            observer,
            commands,
            rng,
            state: RunState::default(),
        }
    }

    pub fn cadence(&self) -> &CadenceProfile {
        &self.cadence
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn run(&mut self) -> Result<RunOutcome> {
        tracing::debug!(cadence = ?self.cadence, "typing run starting");
        self.set_phase(RunPhase::Starting);

        let lead_in = self.options.lead_in;
        if !lead_in.is_zero() {
            self.observer
                .status(&format!("Starting in {} seconds...", lead_in.as_secs_f64().round()));
            self.pause_for(lead_in);
        }

        let tokens = tokenize(self.text);
        let total = tokens.len();

        self.drain_commands();
        if !self.state.stopped {
            self.set_phase(if self.state.paused {
                RunPhase::Paused
            } else {
                RunPhase::Running
            });
            self.observer.status("Typing started!");
        }

        for (index, token) in tokens.iter().enumerate() {
            // Zero-length sleep: applies queued commands and holds here while paused.
            self.pause_for(Duration::ZERO);
            if self.state.stopped {
                break;
            }

            self.maybe_correct()?;
            self.maybe_think();
            self.type_token(token)?;

            self.observer.progress(progress_percent(index, total));
            self.inter_token_pause(token)?;
        }

        if self.state.stopped {
            self.set_phase(RunPhase::Stopped);
            self.observer.status("Typing stopped by user.");
            return Ok(RunOutcome::Stopped);
        }

        if !self.state.pending.is_empty() {
            tracing::debug!(
                left = self.state.pending.len(),
                "run finished with uncorrected mistakes"
            );
        }
        self.set_phase(RunPhase::Finished);
        self.observer.status("Typing finished successfully!");
        self.observer.progress(100);
        Ok(RunOutcome::Completed)
    }

    fn set_phase(&mut self, next: RunPhase) {
        let current = self.state.phase;
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            tracing::warn!("ignoring invalid run phase change {current} -> {next}");
            return;
        }
        tracing::debug!("run phase: {current} -> {next}");
        self.state.phase = next;
    }

    fn chance(&mut self, percent: f64) -> bool {
        self.rng.gen::<f64>() * 100.0 < percent
    }

    fn draw_seconds(&mut self, (min, max): (f64, f64)) -> f64 {
        if max > min {
            self.rng.gen_range(min..=max)
        } else {
            min
        }
    }

    fn maybe_correct(&mut self) -> Result<()> {
        if self.state.pending.is_empty() || !self.chance(self.settings.correction_delay) {
            return Ok(());
        }
        let Some(error) = self.state.pending.pop_front() else {
            return Ok(());
        };

        self.observer
            .status(&format!("Going back to fix '{}'...", error.incorrect));
        self.correct(&error)?;
        self.observer.status("Fixed.");
        Ok(())
    }

    /// Walk back to a typo, retype it, and return to the writing point.
    ///
    /// Moves left to the end of the incorrect token, backspaces over it,
    /// types the correct text, then moves right by the same distance.
    /// The distance is measured to the END of the typo, not its start, so the
    /// backspaces remove exactly the incorrect token and nothing before it. The
    /// cursor and the offsets of later pending errors shift by the length
    /// difference.
    pub fn correct(&mut self, error: &PendingError) -> Result<()> {
        let incorrect_len = error.incorrect.chars().count();
        let correct_len = error.correct.chars().count();
        let distance = self
            .state
            .cursor
            .saturating_sub(error.offset + incorrect_len);

        tracing::debug!(
            incorrect = %error.incorrect,
            correct = %error.correct,
            distance,
            "correcting earlier mistake"
        );

        for _ in 0..distance {
            self.sink.press_special(SpecialKey::Left)?;
            self.sleep(NAV_STEP_SECS);
        }
        for _ in 0..incorrect_len {
            self.sink.press_special(SpecialKey::Backspace)?;
            self.sleep(BACKSPACE_SECS);
        }
        for c in error.correct.chars() {
            self.press_char(c)?;
        }
        for _ in 0..distance {
            self.sink.press_special(SpecialKey::Right)?;
            self.sleep(NAV_STEP_SECS);
        }

        let shift = |offset: usize| offset + correct_len - incorrect_len;
        self.state.cursor = shift(self.state.cursor.max(error.offset + incorrect_len));
        for later in self.state.pending.iter_mut() {
            if later.offset > error.offset {
                later.offset = shift(later.offset);
            }
        }
        Ok(())
    }

    fn maybe_think(&mut self) {
        if !self.chance(self.settings.thinking_chance) {
            return;
        }
        let secs = self.draw_seconds(self.settings.thinking_duration);
        self.observer.status(&format!("Thinking for {secs:.1}s..."));
        self.sleep(secs);
    }

    fn type_token(&mut self, token: &Token) -> Result<()> {
        let word = match token {
            Token::Newline => return self.type_char('\n'),
            Token::Word(word) => word,
        };

        let mistake = if mistakes::is_eligible(word) && self.chance(self.settings.error_rate) {
            mistakes::generate(word, &mut self.rng)
        } else {
            None
        };

        match mistake {
            Some(mistake) => {
                let offset = self.state.cursor;
                self.type_text(&mistake.incorrect)?;
                tracing::trace!(incorrect = %mistake.incorrect, offset, "typed mistake");
                self.state.pending.push_back(PendingError {
                    incorrect: mistake.incorrect,
                    correct: mistake.correct,
                    offset,
                });
            }
            None => self.type_text(word)?,
        }
        Ok(())
    }

    /// Gap after a token. Returns the unscaled seconds slept.
    ///
    /// Newlines take an AFK break or the paragraph pause. Sentence-ending
    /// words take the sentence pause with no separator. Any other word gets a
    /// trailing space, then the word pause.
    fn inter_token_pause(&mut self, token: &Token) -> Result<f64> {
        let secs = match token {
            Token::Newline => {
                if self.chance(self.settings.afk_chance) {
                    let secs = self.draw_seconds(self.settings.afk_duration);
                    self.observer.status(&format!("AFK break for {secs:.1}s..."));
                    secs
                } else {
                    self.cadence.paragraph_pause
                }
            }
            Token::Word(word) if word.ends_with(['.', '!', '?']) => self.cadence.sentence_pause,
            Token::Word(_) => {
                self.type_char(' ')?;
                self.cadence.word_pause
            }
        };
        self.sleep(secs);
        Ok(secs)
    }

    fn type_text(&mut self, text: &str) -> Result<()> {
        for c in text.chars() {
            self.type_char(c)?;
        }
        Ok(())
    }

    fn type_char(&mut self, c: char) -> Result<()> {
        self.press_char(c)?;
        self.state.cursor += 1;
        Ok(())
    }

    fn press_char(&mut self, c: char) -> Result<()> {
        self.sink.emit(c)?;
        let delay = self.cadence.keystroke_delay(c, &mut self.rng);
        self.sleep(delay);
        Ok(())
    }

    /// Sleep for a cadence-scaled number of seconds.
    fn sleep(&mut self, secs: f64) {
        let duration =
            Duration::try_from_secs_f64(secs * self.options.time_scale).unwrap_or(Duration::ZERO);
        self.pause_for(duration);
    }

    /// Sleep in ticks, applying control commands between them.
    ///
    /// Returns early on stop. While paused the deadline keeps running, but
    /// the call does not return until the run is resumed or stopped.
    fn pause_for(&mut self, duration: Duration) {
        let start = Instant::now();
        loop {
            self.drain_commands();
            if self.state.stopped {
                return;
            }
            if self.state.paused {
                self.wait_for_command();
                continue;
            }

            let elapsed = start.elapsed();
            if elapsed >= duration {
                return;
            }
            thread::sleep((duration - elapsed).min(self.options.tick));
        }
    }

    fn drain_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(command),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.state.detached = true;
                    return;
                }
            }
        }
    }

    fn wait_for_command(&mut self) {
        if self.state.detached {
            tracing::warn!("paused run lost its controller; stopping");
            self.state.stopped = true;
            return;
        }
        match self.commands.recv_timeout(self.options.tick) {
            Ok(command) => self.apply(command),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => self.state.detached = true,
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Stop => {
                if !self.state.stopped {
                    tracing::debug!("stop requested");
                    self.state.stopped = true;
                }
            }
            Command::Pause => {
                if !self.state.paused {
                    self.state.paused = true;
                    if self.state.phase == RunPhase::Running {
                        self.set_phase(RunPhase::Paused);
                    }
                    self.observer.status("Paused.");
                }
            }
            Command::Resume => {
                if self.state.paused {
                    self.state.paused = false;
                    if self.state.phase == RunPhase::Paused {
                        self.set_phase(RunPhase::Running);
                    }
                    self.observer.status("Resuming...");
                }
            }
        }
    }
}
