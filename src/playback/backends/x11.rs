use anyhow::{anyhow, Context, Result};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, ConnectionExt as _};
use x11rb::protocol::xtest::{self, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;

use crate::keyboard::{
    keycode_for_special, keystroke_for_char, KeyStroke, KEY_LEFTSHIFT, MODIFIER_KEYCODES,
    US_QWERTY,
};
use crate::sink::{KeystrokeSink, SpecialKey};

// X11 special focus value: the focused window follows the pointer.
const POINTER_ROOT: xproto::Window = 1;

fn evdev_to_x11_keycode(evdev_keycode: u32) -> Result<u8> {
    // On most Linux Xorg setups, X11 keycodes are evdev + 8.
    let x11 = evdev_keycode
        .checked_add(8)
        .ok_or_else(|| anyhow!("evdev keycode overflow"))?;
    u8::try_from(x11).map_err(|_| anyhow!("evdev keycode {evdev_keycode} out of range for X11"))
}

fn query_xtest(conn: &impl Connection) -> Result<()> {
    let ext = conn
        .extension_information(xtest::X11_EXTENSION_NAME)
        .context("failed to query X11 extension info")?;

    if ext.is_none() {
        return Err(anyhow!(
            "X11 backend requires the XTEST extension (not present on this X server)"
        ));
    }
    Ok(())
}

fn keysyms_for_keycode(conn: &impl Connection, keycode: u8) -> Result<(u32, u32)> {
    let reply = conn
        .get_keyboard_mapping(keycode, 1)
        .context("failed to request keyboard mapping")?
        .reply()
        .context("failed to read keyboard mapping")?;

    let sym = |i: usize| reply.keysyms.get(i).copied().unwrap_or(x11rb::NO_SYMBOL);
    Ok((sym(0), sym(1)))
}

/// Check a few representative keys against the US layout the keymap assumes.
fn validate_us_keymap(conn: &impl Connection) -> Result<()> {
    const PROBES: [char; 5] = ['a', 'q', '1', '\'', '['];

    for probe in PROBES {
        let Some(&(evdev, plain, shifted)) = US_QWERTY.iter().find(|(_, p, _)| *p == probe) else {
            continue;
        };
        let keycode = evdev_to_x11_keycode(evdev)?;
        let (got0, got1) = keysyms_for_keycode(conn, keycode)?;

        // For Latin-1, X11 keysyms match the character code.
        if got0 != plain as u32 || got1 != shifted as u32 {
            return Err(anyhow!(
                "X11 backend currently requires a US keyboard layout, but the X server keymap does not match (keycode {keycode}: got {got0:#x}/{got1:#x}). Try `setxkbmap us`."
            ));
        }
    }
    Ok(())
}

/// Injects keystrokes into the focused X11 window through XTEST.
pub struct X11Sink {
    conn: RustConnection,
    root: xproto::Window,
}

impl X11Sink {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None).context("failed to connect to X11")?;
        query_xtest(&conn)?;
        validate_us_keymap(&conn)?;

        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| anyhow!("invalid X11 screen index"))?
            .root;

        let focus = conn
            .get_input_focus()
            .context("failed to request input focus")?
            .reply()
            .context("failed to read input focus reply")?;
        if focus.focus == x11rb::NONE {
            return Err(anyhow!(
                "no X11 input focus detected; click into the target editor before starting"
            ));
        }
        if focus.focus == POINTER_ROOT {
            tracing::warn!("X11 focus follows the pointer; keep it over the target window");
        }

        let sink = Self { conn, root };
        sink.release_modifiers();
        Ok(sink)
    }

    fn fake_key(&self, evdev_keycode: u32, pressed: bool) -> Result<()> {
        let keycode = evdev_to_x11_keycode(evdev_keycode)?;
        let kind = if pressed {
            xproto::KEY_PRESS_EVENT
        } else {
            xproto::KEY_RELEASE_EVENT
        };
        self.conn
            .xtest_fake_input(kind, keycode, x11rb::CURRENT_TIME, self.root, 0, 0, 0)
            .context("failed to send XTEST fake input")?;
        Ok(())
    }

    fn tap(&self, stroke: KeyStroke) -> Result<()> {
        if stroke.shift {
            self.fake_key(KEY_LEFTSHIFT, true)?;
        }
        self.fake_key(stroke.keycode, true)?;
        self.fake_key(stroke.keycode, false)?;
        if stroke.shift {
            self.fake_key(KEY_LEFTSHIFT, false)?;
        }
        self.conn
            .flush()
            .context("failed to flush X11 connection")?;
        Ok(())
    }

    /// Best-effort release so an aborted run never leaves a modifier held.
    fn release_modifiers(&self) {
        for keycode in MODIFIER_KEYCODES {
            let _ = self.fake_key(keycode, false);
        }
        let _ = self.conn.flush();
    }
}

impl KeystrokeSink for X11Sink {
    fn emit(&mut self, c: char) -> Result<()> {
        let stroke = keystroke_for_char(c)
            .ok_or_else(|| anyhow!("character {c:?} cannot be typed on a US keyboard"))?;
        self.tap(stroke)
    }

    fn press_special(&mut self, key: SpecialKey) -> Result<()> {
        self.tap(KeyStroke {
            keycode: keycode_for_special(key),
            shift: false,
        })
    }
}

impl Drop for X11Sink {
    fn drop(&mut self) {
        self.release_modifiers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evdev_keycodes_are_offset_by_eight() {
        assert_eq!(evdev_to_x11_keycode(30).unwrap(), 38);
        assert!(evdev_to_x11_keycode(300).is_err());
    }
}
