use std::thread::sleep;
use std::time::Duration;

use anyhow::{Result, bail};
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};

/// Pause after every synthesized action so the game can react.
const SETTLE: Duration = Duration::from_millis(50);

pub struct EnigoInput {
	enigo: Enigo,
}

impl EnigoInput {
	pub fn new() -> Result<Self> {
		Ok(Self {
			enigo: Enigo::new(&Settings::default())?,
		})
	}
}

impl ie::Input for EnigoInput {
	fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
		self.enigo.move_mouse(x, y, Coordinate::Abs)?;
		sleep(SETTLE);
		Ok(())
	}

	fn click(&mut self, x: i32, y: i32) -> Result<()> {
		self.enigo.move_mouse(x, y, Coordinate::Abs)?;
		self.enigo.button(Button::Left, Direction::Click)?;
		tracing::debug!(x, y, "click");
		sleep(SETTLE);
		Ok(())
	}

	fn press(&mut self, key: &str) -> Result<()> {
		self.enigo.key(parse_key(key)?, Direction::Click)?;
		sleep(SETTLE);
		Ok(())
	}

	fn hotkey(&mut self, keys: &[String]) -> Result<()> {
		let keys = keys.iter().map(|k| parse_key(k)).collect::<Result<Vec<_>>>()?;
		for key in &keys {
			self.enigo.key(*key, Direction::Press)?;
		}
		for key in keys.iter().rev() {
			self.enigo.key(*key, Direction::Release)?;
		}
		sleep(SETTLE);
		Ok(())
	}

	fn cursor(&mut self) -> Result<(i32, i32)> {
		Ok(self.enigo.location()?)
	}
}

/// Map a key name (`"esc"`, `"f4"`, `"a"`) onto an enigo key.
pub fn parse_key(name: &str) -> Result<Key> {
	let lower = name.trim().to_ascii_lowercase();
	let key = match lower.as_str() {
		"esc" | "escape" => Key::Escape,
		"enter" | "return" => Key::Return,
		"tab" => Key::Tab,
		"space" => Key::Space,
		"backspace" => Key::Backspace,
		"del" | "delete" => Key::Delete,
		"alt" => Key::Alt,
		"ctrl" | "control" => Key::Control,
		"shift" => Key::Shift,
		"win" | "super" | "meta" | "cmd" => Key::Meta,
		"up" => Key::UpArrow,
		"down" => Key::DownArrow,
		"left" => Key::LeftArrow,
		"right" => Key::RightArrow,
		"home" => Key::Home,
		"end" => Key::End,
		"pageup" => Key::PageUp,
		"pagedown" => Key::PageDown,
		"f1" => Key::F1,
		"f2" => Key::F2,
		"f3" => Key::F3,
		"f4" => Key::F4,
		"f5" => Key::F5,
		"f6" => Key::F6,
		"f7" => Key::F7,
		"f8" => Key::F8,
		"f9" => Key::F9,
		"f10" => Key::F10,
		"f11" => Key::F11,
		"f12" => Key::F12,
		_ => {
			let mut chars = lower.chars();
			match (chars.next(), chars.next()) {
				(Some(c), None) => Key::Unicode(c),
				_ => bail!("unknown key {name:?}"),
			}
		}
	};
	Ok(key)
}
