use rand::seq::SliceRandom;
use rand::Rng;

const VOWELS: [char; 5] = ['a', 'e', 'i', 'o', 'u'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MistakeKind {
    /// Hit a neighboring key instead of the intended one.
    Adjacency,
    /// Swap two neighboring characters.
    Transposition,
    /// Drop a character.
    Omission,
    /// Insert a stray vowel.
    Insertion,
}

impl MistakeKind {
    pub const ALL: [MistakeKind; 4] = [
        MistakeKind::Adjacency,
        MistakeKind::Transposition,
        MistakeKind::Omission,
        MistakeKind::Insertion,
    ];
}

/// A typo as typed, paired with the text it should have been.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mistake {
    pub incorrect: String,
    pub correct: String,
}

/// Keys physically next to `c` on a US QWERTY board, as far as the typo model cares.
pub fn adjacent_keys(c: char) -> &'static [char] {
    match c {
        'q' => &['w'],
        'w' => &['e', 's'],
        'e' => &['w', 'r'],
        'r' => &['e', 't'],
        't' => &['r', 'y'],
        'y' => &['t', 'u'],
        'u' => &['y', 'i'],
        'i' => &['u', 'o'],
        'o' => &['i', 'p'],
        'p' => &['o', '['],
        'a' => &['s'],
        's' => &['a', 'd', 'w'],
        'd' => &['e', 'f', 's'],
        'f' => &['d', 'g', 'r'],
        'g' => &['f', 'h', 't'],
        'h' => &['g', 'j', 'y'],
        'j' => &['h', 'k', 'u'],
        'k' => &['j', 'l', 'i'],
        'l' => &['k', ';', 'o'],
        ';' => &['l'],
        'z' => &['x'],
        'x' => &['z', 'c'],
        'c' => &['x', 'v', 'd'],
        'v' => &['c', 'f', 'b'],
        'b' => &['v', 'g', 'n'],
        'n' => &['b', 'h', 'm'],
        'm' => &['n', 'j', 'k'],
        _ => &[],
    }
}

/// Only plain words of three or more letters get typos.
pub fn is_eligible(token: &str) -> bool {
    token.chars().count() >= 3 && token.chars().all(char::is_alphabetic)
}

/// Pick a random mistake kind and position for `token`.
///
/// Returns `None` when the token is not eligible or the chosen mutation
/// leaves it unchanged (an unmapped key for adjacency, or swapping two equal
/// letters).
pub fn generate(token: &str, rng: &mut impl Rng) -> Option<Mistake> {
    if !is_eligible(token) {
        return None;
    }

    let kind = MistakeKind::ALL[rng.gen_range(0..MistakeKind::ALL.len())];
    let len = token.chars().count();
    let index = match kind {
        MistakeKind::Transposition => rng.gen_range(0..len - 1),
        _ => rng.gen_range(0..len),
    };

    let incorrect = mutate(token, kind, index, rng)?;
    Some(Mistake {
        incorrect,
        correct: token.to_string(),
    })
}

/// Apply one mistake of `kind` at character `index`.
///
/// `rng` picks the neighbor key for adjacency and the vowel for insertion.
pub fn mutate(token: &str, kind: MistakeKind, index: usize, rng: &mut impl Rng) -> Option<String> {
    let mut chars: Vec<char> = token.chars().collect();
    if index >= chars.len() {
        return None;
    }

    match kind {
        MistakeKind::Adjacency => {
            let original = chars[index];
            let &neighbor = adjacent_keys(original.to_ascii_lowercase()).choose(rng)?;
            chars[index] = if original.is_ascii_uppercase() {
                neighbor.to_ascii_uppercase()
            } else {
                neighbor
            };
        }
        MistakeKind::Transposition => {
            if index + 1 >= chars.len() {
                return None;
            }
            chars.swap(index, index + 1);
        }
        MistakeKind::Omission => {
            chars.remove(index);
        }
        MistakeKind::Insertion => {
            let &vowel = VOWELS.choose(rng)?;
            chars.insert(index, vowel);
        }
    }

    let out: String = chars.into_iter().collect();
    (out != token).then_some(out)
}
