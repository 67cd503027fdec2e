//! Tests for the drive simulation state machine

#[cfg(test)]
mod tests {
    use crate::models::Street;
    use crate::sim::*;

    fn street_with_segments(n: usize, duration: f64) -> Street {
        Street {
            id: "s1".to_string(),
            name: "Sheikh Zayed Rd".to_string(),
            segments: (0..n).map(|i| format!("http://cdn/seg{}.mp4", i)).collect(),
            segment_durations: vec![duration; n],
            ..Default::default()
        }
    }

    fn forward_state(street: &Street) -> DriveState {
        let mut state = DriveState::new();
        state.switch_street(0, street);
        state.transition = 0.0;
        state.set_intent(Direction::Forward);
        state.speed = CRUISE_TARGET;
        state
    }

    // --- direction intent ---

    #[test]
    fn test_keyboard_beats_joystick() {
        let input = InputState {
            key_forward: true,
            joystick_axis: -1.0, // joystick fully reverse
            ..Default::default()
        };
        assert_eq!(resolve_direction(&input), Direction::Forward);

        let input = InputState {
            key_reverse: true,
            joystick_axis: 1.0,
            autopilot: true,
            ..Default::default()
        };
        assert_eq!(resolve_direction(&input), Direction::Reverse);
    }

    #[test]
    fn test_joystick_beats_autopilot() {
        let input = InputState {
            joystick_axis: -0.8,
            autopilot: true,
            ..Default::default()
        };
        assert_eq!(resolve_direction(&input), Direction::Reverse);
    }

    #[test]
    fn test_joystick_dead_zone_is_neutral() {
        let input = InputState {
            joystick_axis: JOYSTICK_DEAD_ZONE * 0.5,
            ..Default::default()
        };
        assert_eq!(resolve_direction(&input), Direction::Neutral);
    }

    #[test]
    fn test_autopilot_forces_forward_when_idle() {
        let input = InputState { autopilot: true, ..Default::default() };
        assert_eq!(resolve_direction(&input), Direction::Forward);
        assert_eq!(resolve_direction(&InputState::default()), Direction::Neutral);
    }

    #[test]
    fn test_targets_per_direction() {
        assert_eq!(target_for(Direction::Forward), CRUISE_TARGET);
        assert_eq!(target_for(Direction::Reverse), REVERSE_TARGET);
        assert_eq!(target_for(Direction::Neutral), 0.0);
    }

    // --- gear derivation ---

    #[test]
    fn test_gear_bands() {
        assert_eq!(gear_label(0.0, Direction::Neutral), "N");
        assert_eq!(gear_label(1.9, Direction::Forward), "N");
        assert_eq!(gear_label(2.0, Direction::Forward), "1");
        assert_eq!(gear_label(29.9, Direction::Forward), "1");
        assert_eq!(gear_label(30.0, Direction::Forward), "2");
        assert_eq!(gear_label(54.9, Direction::Forward), "2");
        assert_eq!(gear_label(55.0, Direction::Forward), "3");
        assert_eq!(gear_label(79.9, Direction::Forward), "3");
        assert_eq!(gear_label(80.0, Direction::Forward), "4");
        assert_eq!(gear_label(100.0, Direction::Forward), "4");
    }

    #[test]
    fn test_reverse_gear_ignores_speed() {
        assert_eq!(gear_label(0.0, Direction::Reverse), "R");
        assert_eq!(gear_label(95.0, Direction::Reverse), "R");
    }

    // --- speed and fuel ---

    #[test]
    fn test_speed_approaches_target_per_tick() {
        let street = street_with_segments(1, 10.0);
        let mut state = DriveState::new();
        state.switch_street(0, &street);
        state.transition = 0.0;
        state.set_intent(Direction::Forward);

        state.tick(1.0 / 60.0, false, &street);
        // Fixed per-tick factor, independent of dt
        let expected = CRUISE_TARGET * SPEED_SMOOTHING;
        assert!((state.speed - expected).abs() < 1e-4);

        let before = state.speed;
        state.tick(1.0 / 30.0, false, &street);
        let expected = before + (CRUISE_TARGET - before) * SPEED_SMOOTHING;
        assert!((state.speed - expected).abs() < 1e-4);
    }

    #[test]
    fn test_speed_converges_and_decays() {
        let street = street_with_segments(1, 1000.0);
        let mut state = DriveState::new();
        state.switch_street(0, &street);
        state.transition = 0.0;
        state.set_intent(Direction::Forward);
        for _ in 0..400 {
            state.tick(1.0 / 60.0, false, &street);
        }
        assert!((state.speed - CRUISE_TARGET).abs() < 0.5);

        state.set_intent(Direction::Neutral);
        for _ in 0..400 {
            state.tick(1.0 / 60.0, false, &street);
        }
        assert_eq!(state.speed, 0.0);
    }

    #[test]
    fn test_fuel_monotonic_and_clamped() {
        let street = street_with_segments(1, 1e9);
        let mut state = forward_state(&street);

        let mut last = state.fuel;
        for _ in 0..200 {
            state.tick(1.0 / 60.0, false, &street);
            assert!(state.fuel <= last);
            last = state.fuel;
        }
        assert!(state.fuel < 100.0);

        // Long running drain clamps at zero, never negative
        for _ in 0..100 {
            state.tick(60.0, false, &street);
        }
        assert_eq!(state.fuel, 0.0);

        // Stationary: fuel never regenerates
        state.set_intent(Direction::Neutral);
        state.speed = 0.0;
        state.tick(1.0, false, &street);
        assert_eq!(state.fuel, 0.0);
    }

    #[test]
    fn test_paused_freezes_continuous_state() {
        let street = street_with_segments(1, 10.0);
        let mut state = forward_state(&street);
        state.paused = true;
        let (speed, fuel, pos) = (state.speed, state.fuel, state.playback.position);
        state.tick(1.0, true, &street);
        assert_eq!(state.speed, speed);
        assert_eq!(state.fuel, fuel);
        assert_eq!(state.playback.position, pos);
    }

    // --- head bob ---

    #[test]
    fn test_bob_oscillates_within_bounds_and_decays() {
        let street = street_with_segments(1, 1e9);
        let mut state = forward_state(&street);

        let mut saw_positive = false;
        let mut saw_negative = false;
        for _ in 0..600 {
            state.tick(1.0 / 60.0, true, &street);
            assert!(state.bob_offset.abs() <= 6.0 + 1e-3);
            if state.bob_offset > 1.0 { saw_positive = true; }
            if state.bob_offset < -1.0 { saw_negative = true; }
        }
        assert!(saw_positive && saw_negative);

        // Shake disabled: offset decays to zero even while moving
        for _ in 0..300 {
            state.tick(1.0 / 60.0, false, &street);
        }
        assert_eq!(state.bob_offset, 0.0);
    }

    // --- playback sequencing ---

    #[test]
    fn test_forward_advances_once_per_segment_and_stops() {
        let street = street_with_segments(3, 2.0);
        let mut state = forward_state(&street);
        state.playback.media_loaded(2.0);

        // Segment 0 -> 1
        for _ in 0..125 {
            state.tick(1.0 / 60.0, false, &street);
        }
        assert_eq!(state.playback.segment, 1);

        // Segment 1 -> 2
        for _ in 0..125 {
            state.tick(1.0 / 60.0, false, &street);
        }
        assert_eq!(state.playback.segment, 2);

        // Last segment completes: clean stop, zero target
        for _ in 0..150 {
            state.tick(1.0 / 60.0, false, &street);
        }
        assert_eq!(state.playback.segment, 2);
        assert!(!state.playback.playing);
        assert_eq!(state.target_speed, 0.0);
    }

    #[test]
    fn test_reverse_never_crosses_segment_boundary() {
        let street = street_with_segments(3, 5.0);
        let mut state = forward_state(&street);

        // Move into the middle segment first
        state.playback.segment = 1;
        state.playback.position = 1.0;

        state.set_intent(Direction::Reverse);
        state.speed = REVERSE_TARGET;
        for _ in 0..600 {
            state.tick(1.0 / 60.0, false, &street);
            assert_eq!(state.playback.segment, 1);
            assert!(state.playback.position >= 0.0);
            assert!(state.playback.position <= 5.0);
        }
    }

    #[test]
    fn test_reverse_wraps_to_duration_at_zero() {
        let street = street_with_segments(1, 5.0);
        let mut state = forward_state(&street);
        state.playback.position = 0.05;
        state.set_intent(Direction::Reverse);

        // One big rewind step past zero wraps to the duration
        state.tick(0.5, false, &street);
        assert!(state.playback.position > 4.0);
        assert_eq!(state.playback.segment, 0);
    }

    #[test]
    fn test_neutral_holds_position() {
        let street = street_with_segments(2, 5.0);
        let mut state = forward_state(&street);
        state.playback.position = 2.0;
        state.set_intent(Direction::Neutral);
        state.speed = 0.0;
        state.tick(1.0, false, &street);
        assert_eq!(state.playback.position, 2.0);
        assert_eq!(state.playback.segment, 0);
    }

    // --- street switching ---

    #[test]
    fn test_switch_street_resets_everything() {
        let first = street_with_segments(2, 5.0);
        let mut state = forward_state(&first);
        state.fuel = 40.0;
        state.playback.segment = 1;
        state.playback.position = 3.0;

        let next = street_with_segments(3, 8.0);
        state.switch_street(1, &next);

        assert_eq!(state.street_index, 1);
        assert_eq!(state.direction, Direction::Neutral);
        assert_eq!(state.speed, 0.0);
        assert_eq!(state.target_speed, 0.0);
        assert_eq!(state.fuel, 100.0);
        assert_eq!(state.playback.segment, 0);
        assert_eq!(state.playback.position, 0.0);
        assert_eq!(state.playback.duration, 8.0);
        assert!(state.playback.playing);
    }

    #[test]
    fn test_transition_blocks_hud_until_elapsed() {
        let street = street_with_segments(1, 5.0);
        let mut state = DriveState::new();
        state.switch_street(0, &street);
        assert!(state.in_transition());

        let ticks = (TRANSITION_SECS * 60.0) as usize + 2;
        for _ in 0..ticks {
            state.tick(1.0 / 60.0, false, &street);
        }
        assert!(!state.in_transition());
    }

    #[test]
    fn test_loading_clears_only_on_media_success() {
        let street = street_with_segments(1, 5.0);
        let mut state = DriveState::new();
        state.switch_street(0, &street);
        assert!(state.playback.loading);

        // Ticks alone never clear the indicator
        state.transition = 0.0;
        state.set_intent(Direction::Forward);
        for _ in 0..30 {
            state.tick(1.0 / 60.0, false, &street);
        }
        assert!(state.playback.loading);

        state.playback.media_loaded(7.5);
        assert!(!state.playback.loading);
        assert_eq!(state.playback.duration, 7.5);
    }

    #[test]
    fn test_unknown_duration_uses_default() {
        let street = Street {
            segments: vec!["http://cdn/only.mp4".to_string()],
            ..Default::default()
        };
        assert_eq!(segment_duration(&street, 0), DEFAULT_SEGMENT_SECS);
    }
}
