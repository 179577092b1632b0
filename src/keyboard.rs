use crate::sink::SpecialKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub keycode: u32,
    pub shift: bool,
}

// Linux evdev keycodes (see linux/input-event-codes.h)
pub const KEY_BACKSPACE: u32 = 14;
pub const KEY_ENTER: u32 = 28;
pub const KEY_LEFTCTRL: u32 = 29;
pub const KEY_LEFTSHIFT: u32 = 42;
pub const KEY_RIGHTSHIFT: u32 = 54;
pub const KEY_LEFTALT: u32 = 56;
pub const KEY_SPACE: u32 = 57;
pub const KEY_RIGHTCTRL: u32 = 97;
pub const KEY_RIGHTALT: u32 = 100;
pub const KEY_LEFT: u32 = 105;
pub const KEY_RIGHT: u32 = 106;

pub const MODIFIER_KEYCODES: [u32; 6] = [
    KEY_LEFTSHIFT,
    KEY_RIGHTSHIFT,
    KEY_LEFTCTRL,
    KEY_RIGHTCTRL,
    KEY_LEFTALT,
    KEY_RIGHTALT,
];

/// US QWERTY main block: (evdev keycode, unshifted, shifted).
pub const US_QWERTY: &[(u32, char, char)] = &[
    (2, '1', '!'),
    (3, '2', '@'),
    (4, '3', '#'),
    (5, '4', '$'),
    (6, '5', '%'),
    (7, '6', '^'),
    (8, '7', '&'),
    (9, '8', '*'),
    (10, '9', '('),
    (11, '0', ')'),
    (12, '-', '_'),
    (13, '=', '+'),
    (16, 'q', 'Q'),
    (17, 'w', 'W'),
    (18, 'e', 'E'),
    (19, 'r', 'R'),
    (20, 't', 'T'),
    (21, 'y', 'Y'),
    (22, 'u', 'U'),
    (23, 'i', 'I'),
    (24, 'o', 'O'),
    (25, 'p', 'P'),
    (26, '[', '{'),
    (27, ']', '}'),
    (30, 'a', 'A'),
    (31, 's', 'S'),
    (32, 'd', 'D'),
    (33, 'f', 'F'),
    (34, 'g', 'G'),
    (35, 'h', 'H'),
    (36, 'j', 'J'),
    (37, 'k', 'K'),
    (38, 'l', 'L'),
    (39, ';', ':'),
    (40, '\'', '"'),
    (41, '`', '~'),
    (43, '\\', '|'),
    (44, 'z', 'Z'),
    (45, 'x', 'X'),
    (46, 'c', 'C'),
    (47, 'v', 'V'),
    (48, 'b', 'B'),
    (49, 'n', 'N'),
    (50, 'm', 'M'),
    (51, ',', '<'),
    (52, '.', '>'),
    (53, '/', '?'),
];

/// The ASCII character actually typed to produce `c`.
///
/// Smart quotes are typed as their ASCII forms; editors with auto-substitution
/// turn them back.
pub fn typed_char_for(c: char) -> Option<char> {
    match c {
        '\n' | ' ' => Some(c),
        '\u{2018}' | '\u{2019}' => Some('\''),
        '\u{201C}' | '\u{201D}' => Some('"'),
        c if c.is_ascii_graphic() => Some(c),
        _ => None,
    }
}

pub fn keystroke_for_char(c: char) -> Option<KeyStroke> {
    let typed = typed_char_for(c)?;
    match typed {
        '\n' => Some(KeyStroke {
            keycode: KEY_ENTER,
            shift: false,
        }),
        ' ' => Some(KeyStroke {
            keycode: KEY_SPACE,
            shift: false,
        }),
        _ => US_QWERTY.iter().find_map(|&(keycode, plain, shifted)| {
            if typed == plain {
                Some(KeyStroke {
                    keycode,
                    shift: false,
                })
            } else if typed == shifted {
                Some(KeyStroke {
                    keycode,
                    shift: true,
                })
            } else {
                None
            }
        }),
    }
}

pub fn keycode_for_special(key: SpecialKey) -> u32 {
    match key {
        SpecialKey::Left => KEY_LEFT,
        SpecialKey::Right => KEY_RIGHT,
        SpecialKey::Backspace => KEY_BACKSPACE,
    }
}

pub fn find_first_unsupported_char(text: &str) -> Option<(usize, char)> {
    text.char_indices()
        .find(|&(_idx, c)| keystroke_for_char(c).is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_printable_ascii_char_has_a_keystroke() {
        for b in 0x20u8..=0x7e {
            let c = b as char;
            assert!(keystroke_for_char(c).is_some(), "no keystroke for {c:?}");
        }
        assert_eq!(keystroke_for_char('\n').unwrap().keycode, KEY_ENTER);
    }

    #[test]
    fn shifted_characters_share_the_base_keycode() {
        let a = keystroke_for_char('a').unwrap();
        let upper = keystroke_for_char('A').unwrap();
        assert_eq!(a.keycode, upper.keycode);
        assert!(!a.shift);
        assert!(upper.shift);

        let question = keystroke_for_char('?').unwrap();
        assert_eq!(question.keycode, keystroke_for_char('/').unwrap().keycode);
        assert!(question.shift);
    }

    #[test]
    fn smart_quotes_map_to_ascii_keys() {
        assert_eq!(keystroke_for_char('\u{2019}'), keystroke_for_char('\''));
        assert_eq!(keystroke_for_char('\u{201C}'), keystroke_for_char('"'));
    }

    #[test]
    fn reports_unsupported_characters() {
        assert_eq!(find_first_unsupported_char("ok\ttab"), Some((2, '\t')));
        assert_eq!(find_first_unsupported_char("naïve"), Some((2, 'ï')));
        assert_eq!(find_first_unsupported_char("plain text.\n"), None);
    }
}
