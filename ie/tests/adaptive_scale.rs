mod common;

use common::{Scripted, cut_asset, textured};
use ie::{AssetStore, Matcher, Probe, ScaleState, StateFile};

#[test]
fn converges_on_the_scale_that_matches() {
	let screen = textured(240, 160, 1);
	let dir = tempfile::tempdir().unwrap();
	let assets = dir.path().join("assets");
	// 100 and 50 exist but show something else; 67 is the real landmark.
	cut_asset(&assets, "a", "home_100.png", &textured(240, 160, 2), (10, 10), (18, 12));
	cut_asset(&assets, "a", "home_50.png", &textured(240, 160, 3), (10, 10), (18, 12));
	cut_asset(&assets, "a", "home_67.png", &screen, (130, 90), (18, 12));
	cut_asset(&assets, "a", "home_75.png", &screen, (130, 90), (18, 12));

	let state_path = dir.path().join("state.json");
	ScaleState {
		recommended_scale: 100,
		fail_count: 2,
		..Default::default()
	}
	.save(&state_path)
	.unwrap();

	let mut state = StateFile::open(&state_path);
	let mut matcher = Matcher::new(AssetStore::new(&assets), Scripted::still(screen));
	let located = matcher.locate_with_adaptive_scale(&mut state, "a", "home", &Probe::default());

	assert_eq!(located.tried, vec![100, 50, 67]);
	assert_eq!(located.scale, Some(67));
	let hit = located.hit().unwrap();
	assert_eq!((hit.left, hit.top), (130, 90));
	assert_eq!(matcher.capture_mut().captures, 1);

	let on_disk = ScaleState::load(&state_path);
	assert_eq!(on_disk.recommended_scale, 67);
	assert_eq!(on_disk.fail_count, 2);
	assert_eq!(on_disk.per_template.get("home"), Some(&67));

	// Next lookup starts at 67 and stops there.
	let again = matcher.locate_with_adaptive_scale(&mut state, "a", "home", &Probe::default());
	assert_eq!(again.tried, vec![67]);
}

#[test]
fn single_variant_on_disk_is_found_from_any_start() {
	let screen = textured(200, 120, 5);
	let dir = tempfile::tempdir().unwrap();
	cut_asset(dir.path(), "a", "home_67.png", &screen, (40, 50), (16, 16));

	for start in ie::SCALES {
		let mut state = StateFile::in_memory(ScaleState {
			recommended_scale: start,
			..Default::default()
		});
		let mut matcher = Matcher::new(AssetStore::new(dir.path()), Scripted::still(screen.clone()));
		let located = matcher.locate_with_adaptive_scale(&mut state, "a", "home", &Probe::default());
		assert_eq!(located.tried, vec![67], "start {start}");
		assert_eq!(state.recommended_scale(), 67);
	}
}

#[test]
fn exhausting_every_scale_reports_absence_without_touching_state() {
	let screen = textured(160, 100, 8);
	let dir = tempfile::tempdir().unwrap();
	for s in ie::SCALES {
		cut_asset(dir.path(), "a", &format!("gone_{s}.png"), &textured(160, 100, 100 + s), (0, 0), (12, 12));
	}

	let before = ScaleState {
		recommended_scale: 90,
		fail_count: 1,
		..Default::default()
	};
	let mut state = StateFile::in_memory(before.clone());
	let mut matcher = Matcher::new(AssetStore::new(dir.path()), Scripted::still(screen));
	let located = matcher.locate_with_adaptive_scale(&mut state, "a", "gone", &Probe::default());

	assert!(!located.is_hit());
	assert_eq!(located.tried, vec![90, 50, 67, 75, 80, 100, 110, 125]);
	assert_eq!(state.state(), &before);
}

#[test]
fn corrupt_state_file_falls_back_to_defaults() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("state.json");
	std::fs::write(&path, "not json at all").unwrap();

	let mut state = StateFile::open(&path);
	assert_eq!(state.state(), &ScaleState::default());

	state.record_hit("a_1", 80);
	assert_eq!(ScaleState::load(&path).recommended_scale, 80);
}
