use std::time::Duration;

use ie::{PageId, Probe, scaled};

use super::{Ctx, Module};

pub const ARENA_GROUP: &str = "auto_arena";

/// Tap point on the result screen, relative to the 4_1 banner center at scale 100.
const PAYOUT_OFFSET: (i32, i32) = (48, 164);

const OPEN_POLLS: u32 = 10;
const RESULT_POLLS: u32 = 40;
const PAYOUT_TAPS: u32 = 120;

/// Fights every available arena opponent, starting from HOME.
pub struct Arena {
	rounds: u32,
	/// Wait after a click that changes the screen; also the result poll gap.
	settle: Duration,
	open_poll: Duration,
	tap_every: Duration,
}

impl Default for Arena {
	fn default() -> Self {
		Self {
			rounds: 0,
			settle: Duration::from_secs(3),
			open_poll: Duration::from_secs(1),
			tap_every: Duration::from_millis(500),
		}
	}
}

impl Module for Arena {
	fn name(&self) -> &'static str {
		"arena"
	}

	fn run(&mut self, ctx: &mut Ctx) -> anyhow::Result<()> {
		if !ctx.resolver.is_page(&mut ctx.state, PageId::Home) {
			tracing::warn!("not on {}; arena not started", PageId::Home);
			return Ok(());
		}

		let probe = ctx.probe();
		if !ctx.click_asset(ARENA_GROUP, "1_1", &probe)? {
			tracing::warn!("arena entry (1_1) not found");
			return Ok(());
		}
		if ctx.wait_for(ARENA_GROUP, "1_2", &probe, OPEN_POLLS, self.open_poll).is_none() {
			tracing::warn!("arena did not open (1_2 not found)");
			return Ok(());
		}
		tracing::info!("arena opened");

		while !ctx.stopped() {
			self.rounds += 1;
			tracing::info!(round = self.rounds, "arena round");

			// 2_1 is grey when no challenge is left and orange otherwise; only color tells them apart.
			let Some((opponent, _)) = ctx.find(ARENA_GROUP, "2_1", &probe.color()) else {
				tracing::info!("no challengeable opponent left");
				break;
			};
			ctx.click(opponent.center.0, opponent.center.1)?;
			if !ctx.pause(self.settle) {
				break;
			}

			if !self.start_battle(ctx, &probe)? || !self.collect(ctx, &probe)? {
				break;
			}
		}

		tracing::info!(rounds = self.rounds, "arena finished");
		Ok(())
	}
}

impl Arena {
	/// Start the fight from the opponent screen. Defensive line-ups skip straight to 3_1.
	fn start_battle(&mut self, ctx: &mut Ctx, probe: &Probe) -> anyhow::Result<bool> {
		if let Some((start, _)) = ctx.find(ARENA_GROUP, "3_1", probe) {
			ctx.click(start.center.0, start.center.1)?;
			tracing::info!("battle started");
			return Ok(true);
		}

		for stem in ["3_2", "3_3"] {
			if !ctx.click_asset(ARENA_GROUP, stem, probe)? {
				tracing::warn!(stem, "line-up button not found");
			}
			if !ctx.pause(self.settle) {
				return Ok(false);
			}
		}
		if !ctx.click_asset(ARENA_GROUP, "3_1", probe)? {
			tracing::warn!("start button (3_1) not found");
		}
		Ok(true)
	}

	/// Wait for the result screen, tap until the close button shows, then close it.
	///
	/// Returns false when stopped or when the screen never turns up.
	fn collect(&mut self, ctx: &mut Ctx, probe: &Probe) -> anyhow::Result<bool> {
		// Park the cursor so it does not cover the result banner.
		ctx.resolver.input_mut().move_to(20, 20)?;

		let Some((banner, scale)) = ctx.wait_for(ARENA_GROUP, "4_1", probe, RESULT_POLLS, self.settle) else {
			if !ctx.stopped() {
				tracing::warn!("result screen (4_1) never appeared");
			}
			return Ok(false);
		};
		let x = banner.center.0 + scaled(PAYOUT_OFFSET.0, scale);
		let y = banner.center.1 + scaled(PAYOUT_OFFSET.1, scale);

		let mut closable = false;
		for _ in 0..PAYOUT_TAPS {
			if ctx.find(ARENA_GROUP, "4_2", probe).is_some() {
				closable = true;
				break;
			}
			ctx.click(x, y)?;
			if !ctx.pause(self.tap_every) {
				return Ok(false);
			}
		}
		if !closable {
			tracing::warn!("close button (4_2) never appeared");
			return Ok(false);
		}

		if !ctx.pause(self.settle) {
			return Ok(false);
		}
		if !ctx.click_asset(ARENA_GROUP, "4_2", probe)? {
			tracing::warn!("close button (4_2) disappeared");
		}
		Ok(ctx.pause(self.settle))
	}
}
