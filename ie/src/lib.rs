mod frame;
pub use frame::*;
mod scale;
pub use scale::*;
mod store;
pub use store::{AssetStore, Pixels, Template, load_template};
mod state;
pub use state::*;
mod matcher;
pub use matcher::*;

pub mod page;
pub use page::{EnsureError, PAGES, PageDef, PageId, PageResolver, StepError};
pub mod transition;
pub use transition::{Step, TransitionError, TransitionTable};
pub mod screen;

#[cfg(test)]
mod testing;

/// Source of screen pixels.
pub trait ScreenCapture {
	/// Capture `region` (the full screen when `None`). The returned frame's
	/// origin is the region's top-left corner.
	fn capture(&mut self, region: Option<Region>) -> anyhow::Result<Frame>;

	fn screen_size(&mut self) -> anyhow::Result<(u32, u32)>;
}

/// Synthesized mouse and keyboard input.
///
/// Keys are lowercase names such as `"escape"`, `"f4"` or `"a"`; each backend
/// maps them onto its own key codes.
pub trait Input {
	fn move_to(&mut self, x: i32, y: i32) -> anyhow::Result<()>;

	/// Left click at absolute screen coordinates.
	fn click(&mut self, x: i32, y: i32) -> anyhow::Result<()>;

	fn press(&mut self, key: &str) -> anyhow::Result<()>;

	/// Press every key in order, then release them in reverse.
	fn hotkey(&mut self, keys: &[String]) -> anyhow::Result<()>;

	fn cursor(&mut self) -> anyhow::Result<(i32, i32)>;
}

impl<T: ScreenCapture + ?Sized> ScreenCapture for Box<T> {
	fn capture(&mut self, region: Option<Region>) -> anyhow::Result<Frame> {
		(**self).capture(region)
	}

	fn screen_size(&mut self) -> anyhow::Result<(u32, u32)> {
		(**self).screen_size()
	}
}

impl<T: Input + ?Sized> Input for Box<T> {
	fn move_to(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
		(**self).move_to(x, y)
	}

	fn click(&mut self, x: i32, y: i32) -> anyhow::Result<()> {
		(**self).click(x, y)
	}

	fn press(&mut self, key: &str) -> anyhow::Result<()> {
		(**self).press(key)
	}

	fn hotkey(&mut self, keys: &[String]) -> anyhow::Result<()> {
		(**self).hotkey(keys)
	}

	fn cursor(&mut self) -> anyhow::Result<(i32, i32)> {
		(**self).cursor()
	}
}
