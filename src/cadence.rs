use rand::Rng;
use serde::Serialize;

use crate::settings::Settings;

const AVG_CHARS_PER_WORD: f64 = 5.0;
const EMPTY_TEXT_CHAR_DELAY: f64 = 0.05;
const MIN_KEYSTROKE_DELAY: f64 = 0.02;

const FAST_KEYS: &str = "eatisrondlcum";
const SLOW_KEYS: &str = "zjqxkvb";

/// Counts that drive the pause budget split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TextStats {
    pub chars: usize,
    pub words: usize,
    pub sentences: usize,
    pub paragraph_breaks: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        Self {
            chars: text.chars().count(),
            words: text.split_whitespace().count(),
            sentences: text.chars().filter(|c| matches!(c, '.' | '!' | '?')).count(),
            paragraph_breaks: text.chars().filter(|&c| c == '\n').count(),
        }
    }
}

/// Delay budgets for one run, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CadenceProfile {
    pub pure_typing_seconds: f64,
    pub pause_budget_seconds: f64,
    pub char_delay: f64,
    pub jitter: f64,
    pub word_pause: f64,
    pub sentence_pause: f64,
    pub paragraph_pause: f64,
}

fn share(budget: f64, fraction: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    fraction * budget / count as f64
}

impl CadenceProfile {
    /// Split the target duration into typing time and pauses.
    ///
    /// Typing time is capped at 95% of the target so some budget is always
    /// left for pauses. The remaining budget goes 20% to word gaps, 40% to
    /// sentence ends and 40% to paragraph breaks.
    pub fn compute(settings: &Settings, stats: TextStats) -> Self {
        let total = settings.total_seconds();

        let mut pure = (stats.chars as f64 / AVG_CHARS_PER_WORD) / settings.wpm * 60.0;
        // Negated so a NaN (zero chars at zero wpm) also takes the clamp.
        if !(pure < total) {
            pure = total * 0.95;
        }
        let pause_budget = total - pure;

        let char_delay = if stats.chars > 0 {
            pure / stats.chars as f64
        } else {
            EMPTY_TEXT_CHAR_DELAY
        };

        Self {
            pure_typing_seconds: pure,
            pause_budget_seconds: pause_budget,
            char_delay,
            jitter: char_delay * 0.25,
            word_pause: share(pause_budget, 0.20, stats.words),
            sentence_pause: share(pause_budget, 0.40, stats.sentences),
            paragraph_pause: share(pause_budget, 0.40, stats.paragraph_breaks),
        }
    }

    pub fn for_text(settings: &Settings, text: &str) -> Self {
        Self::compute(settings, TextStats::of(text))
    }

    /// Seconds to wait after emitting `c`.
    pub fn keystroke_delay(&self, c: char, rng: &mut impl Rng) -> f64 {
        let mut delay = self.char_delay;
        if FAST_KEYS.contains(c) {
            delay *= 0.8;
        } else if SLOW_KEYS.contains(c) {
            delay *= 1.3;
        }

        let jitter = self.jitter.abs();
        let offset = if jitter > 0.0 {
            rng.gen_range(-jitter..=jitter)
        } else {
            0.0
        };

        (delay + offset).max(MIN_KEYSTROKE_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn settings(total_minutes: f64, wpm: f64) -> Settings {
        Settings {
            total_minutes,
            wpm,
            error_rate: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn counts_text_features() {
        let stats = TextStats::of("Hi there. Bye!\nOk?");
        assert_eq!(
            stats,
            TextStats {
                chars: 18,
                words: 4,
                sentences: 3,
                paragraph_breaks: 1,
            }
        );
    }

    #[test]
    fn fast_and_slow_keys_scale_the_base_delay() {
        let cadence = CadenceProfile {
            pure_typing_seconds: 0.0,
            pause_budget_seconds: 0.0,
            char_delay: 1.0,
            jitter: 0.0,
            word_pause: 0.0,
            sentence_pause: 0.0,
            paragraph_pause: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!((cadence.keystroke_delay('e', &mut rng) - 0.8).abs() < 1e-12);
        assert!((cadence.keystroke_delay('z', &mut rng) - 1.3).abs() < 1e-12);
        assert!((cadence.keystroke_delay('h', &mut rng) - 1.0).abs() < 1e-12);
        // Only the lowercase keys are in the sets.
        assert!((cadence.keystroke_delay('E', &mut rng) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn tiny_base_delay_is_floored() {
        let cadence = CadenceProfile {
            pure_typing_seconds: 0.0,
            pause_budget_seconds: 0.0,
            char_delay: 0.001,
            jitter: 0.00025,
            word_pause: 0.0,
            sentence_pause: 0.0,
            paragraph_pause: 0.0,
        };
        let mut rng = StdRng::seed_from_u64(3);
        for c in ['e', 'z', 'h', ' ', '.'] {
            for _ in 0..50 {
                let d = cadence.keystroke_delay(c, &mut rng);
                assert_eq!(d, MIN_KEYSTROKE_DELAY, "delay for {c:?}");
            }
        }
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let cadence = CadenceProfile::for_text(&settings(1.0, 60.0), "hello world");
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..500 {
            let d = cadence.keystroke_delay('h', &mut rng);
            assert!(d >= 0.75 - 1e-9 && d <= 1.25 + 1e-9, "delay {d} out of range");
        }
    }

    #[test]
    fn zero_wpm_never_produces_non_finite_delays() {
        let cadence = CadenceProfile::for_text(&settings(1.0, 0.0), "abc");
        assert!(cadence.char_delay.is_finite());
        assert!((cadence.pure_typing_seconds - 57.0).abs() < 1e-9);
    }
}
