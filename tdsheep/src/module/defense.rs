use std::process::{Child, Command};
use std::time::{Duration, Instant};

use super::{Ctx, Module, secs};

const HINT_EVERY: Duration = Duration::from_secs(5);
const ERROR_PAUSE: Duration = Duration::from_secs(1);

/// The tower-defense loop: upgrade, start the next wave, restart on a breach.
pub struct Defense {
	last_wave: Option<Instant>,
	last_breach_check: Option<Instant>,
	/// Wait between closing the game and launching it again.
	restart_settle: Duration,
	/// Wait after a full restart before the loop resumes.
	after_restart: Duration,
	/// Game processes launched by restarts that have not been reaped yet.
	launched: Vec<Child>,
}

impl Default for Defense {
	fn default() -> Self {
		Self {
			last_wave: None,
			last_breach_check: None,
			restart_settle: Duration::from_secs(2),
			after_restart: Duration::from_secs(3),
			launched: Vec::new(),
		}
	}
}

impl Module for Defense {
	fn name(&self) -> &'static str {
		"defense"
	}

	fn run(&mut self, ctx: &mut Ctx) -> anyhow::Result<()> {
		tracing::info!("defense loop started; press Ctrl+C to stop");
		let mut last_hint = Instant::now();

		while !ctx.stopped() {
			if let Err(err) = self.tick(ctx) {
				tracing::warn!(error = %format!("{err:#}"), "defense iteration failed");
				ctx.pause(ERROR_PAUSE);
				continue;
			}
			if last_hint.elapsed() >= HINT_EVERY {
				tracing::info!("press Ctrl+C to stop");
				last_hint = Instant::now();
			}
			ctx.pause(secs(ctx.config.loop_interval_secs));
		}

		tracing::info!("stop requested; defense loop finished");
		Ok(())
	}
}

impl Defense {
	fn tick(&mut self, ctx: &mut Ctx) -> anyhow::Result<()> {
		if self.detect_breach(ctx) {
			tracing::info!("breach detected; restarting the game");
			self.restart_game(ctx)?;
			ctx.pause(self.after_restart);
			return Ok(());
		}

		let clicks = self.perform_upgrades(ctx)?;
		if clicks > 0 {
			tracing::debug!(clicks, "upgrades clicked");
		}
		if self.start_next_wave(ctx)? {
			tracing::info!("next wave started");
		}
		Ok(())
	}

	/// Look for the game-over template, at most once per `check_interval_secs`.
	fn detect_breach(&mut self, ctx: &mut Ctx) -> bool {
		let breach = ctx.config.breach.clone();
		if breach.template_path.is_none() {
			return false;
		}
		let now = Instant::now();
		if self
			.last_breach_check
			.is_some_and(|last| now.duration_since(last) < secs(breach.check_interval_secs))
		{
			return false;
		}
		self.last_breach_check = Some(now);
		ctx.find_file(&breach.template_path, breach.region, breach.threshold).is_some()
	}

	/// Close the game, launch it again and replay the menu hotkeys.
	fn restart_game(&mut self, ctx: &mut Ctx) -> anyhow::Result<()> {
		let restart = ctx.config.restart.clone();
		ctx.hotkey(&restart.close_hotkey)?;
		ctx.pause(self.restart_settle);

		self.reap_launched();
		let command = restart.start_command.trim();
		if !command.is_empty() {
			match spawn_shell(command) {
				Ok(child) => {
					tracing::info!(pid = child.id(), command, "game launched");
					self.launched.push(child);
				}
				Err(err) => tracing::warn!(%err, command, "failed to launch the game"),
			}
		}
		ctx.pause(secs(restart.post_wait_secs));

		for keys in &restart.menu_hotkeys {
			ctx.hotkey(keys)?;
			ctx.pause(Duration::from_millis(500));
		}
		Ok(())
	}

	/// Collect the exit status of launched processes that have finished.
	fn reap_launched(&mut self) {
		self.launched.retain_mut(|child| match child.try_wait() {
			Ok(Some(status)) => {
				tracing::debug!(pid = child.id(), %status, "launcher exited");
				false
			}
			Ok(None) => true,
			Err(err) => {
				tracing::warn!(pid = child.id(), %err, "cannot poll launcher");
				false
			}
		});
	}

	/// Click the upgrade template if visible, then the fixed positions,
	/// up to `max_clicks_per_loop` in total. Returns the number of clicks.
	fn perform_upgrades(&mut self, ctx: &mut Ctx) -> anyhow::Result<u32> {
		let upgrade = ctx.config.upgrade.clone();
		let mut clicks = 0;

		if let Some(m) = ctx.find_file(&upgrade.template_path, upgrade.region, upgrade.threshold) {
			ctx.click(m.center.0, m.center.1)?;
			clicks += 1;
		}
		for [x, y] in upgrade.positions {
			if clicks >= upgrade.max_clicks_per_loop {
				break;
			}
			ctx.click(x, y)?;
			clicks += 1;
		}
		Ok(clicks)
	}

	/// Start the next wave unless still cooling down. Template first, then the fixed position.
	fn start_next_wave(&mut self, ctx: &mut Ctx) -> anyhow::Result<bool> {
		let wave = ctx.config.next_wave.clone();
		let now = Instant::now();
		if self
			.last_wave
			.is_some_and(|last| now.duration_since(last) < secs(wave.cooldown_secs))
		{
			return Ok(false);
		}

		let target = match ctx.find_file(&wave.template_path, wave.region, wave.threshold) {
			Some(m) => Some(m.center),
			None => wave.position.map(|[x, y]| (x, y)),
		};
		let Some((x, y)) = target else {
			return Ok(false);
		};
		ctx.click(x, y)?;
		self.last_wave = Some(now);
		Ok(true)
	}
}

fn spawn_shell(command: &str) -> std::io::Result<Child> {
	if cfg!(windows) {
		Command::new("cmd").args(["/C", command]).spawn()
	} else {
		Command::new("sh").args(["-c", command]).spawn()
	}
}
