use crate::{CoreError, DifficultyConfig, DifficultyLevel, DifficultyProfile, MatchMode};

/// WHAT: Each level is bound to its documented profile
/// WHY: Profiles drive both scoring behavior and the explanatory UI text
#[test]
fn given_standard_registry_when_looking_up_levels_then_documented_profiles() {
    // Given: The standard registry
    let config = DifficultyConfig::standard();

    // When: Looking up each level
    let easy = config.profile(DifficultyLevel::Easy);
    let normal = config.profile(DifficultyLevel::Normal);
    let hard = config.profile(DifficultyLevel::Hard);

    // Then: Modes, windows and weights match
    assert_eq!(easy.match_mode, MatchMode::Fuzzy);
    assert_eq!(easy.window_percent(), (50, 150));
    assert_eq!(easy.bonus_weight, 0.20);
    assert_eq!(normal.match_mode, MatchMode::Exact);
    assert_eq!(normal.window_percent(), (70, 130));
    assert_eq!(normal.gaussian_width, 0.2);
    assert_eq!(hard.match_mode, MatchMode::Ordered);
    assert_eq!(hard.window_percent(), (85, 115));
    assert_eq!(hard.gaussian_width, 0.1);
}

/// WHAT: Gaussian width shrinks from Easy to Hard
/// WHY: Harder levels must demand tighter timing
#[test]
fn given_standard_registry_when_iterating_then_widths_strictly_shrink() {
    // Given/When: Profiles in level order
    let widths: Vec<f64> = DifficultyConfig::standard()
        .iter()
        .map(|(_, profile)| profile.gaussian_width)
        .collect();

    // Then: Strictly decreasing
    assert_eq!(widths.len(), 3);
    assert!(widths.windows(2).all(|w| w[0] > w[1]));
}

/// WHAT: Levels parse case-insensitively and print lower-case
/// WHY: Config files and CLI flags use the lower-case names
#[test]
#[allow(clippy::unwrap_used)]
fn given_level_names_when_parsing_then_round_trip_through_display() {
    for level in DifficultyLevel::ALL {
        assert_eq!(level.to_string().parse::<DifficultyLevel>().unwrap(), level);
    }
    assert_eq!(" HARD ".parse::<DifficultyLevel>().unwrap(), DifficultyLevel::Hard);
    assert_eq!(DifficultyLevel::default(), DifficultyLevel::Normal);
}

/// WHAT: Unknown level names are rejected with InvalidInput
/// WHY: A typo in config must not silently pick a level
#[test]
fn given_unknown_level_name_when_parsing_then_invalid_input() {
    let result = "extreme".parse::<DifficultyLevel>();
    assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
}

/// WHAT: Custom registries reject profiles the scorer cannot use
/// WHY: A zero Gaussian width would divide by zero in the bonus
#[test]
fn given_invalid_profile_when_building_registry_then_invalid_input() {
    // Given: Profiles with a zero width, an oversized weight and an inverted window
    let zero_width = DifficultyProfile {
        gaussian_width: 0.0,
        ..DifficultyProfile::EASY
    };
    let heavy = DifficultyProfile {
        bonus_weight: 1.5,
        ..DifficultyProfile::NORMAL
    };
    let inverted = DifficultyProfile {
        duration_window_min: 1.2,
        duration_window_max: 0.8,
        ..DifficultyProfile::HARD
    };

    // When/Then: Each is rejected
    for bad in [zero_width, heavy, inverted] {
        let result = DifficultyConfig::new(DifficultyProfile::EASY, bad, DifficultyProfile::HARD);
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
    }
}

/// WHAT: A valid custom registry serves its own profiles
/// WHY: Tuning must not require touching the built-in table
#[test]
#[allow(clippy::unwrap_used)]
fn given_valid_custom_profiles_when_building_registry_then_lookups_use_them() {
    // Given: A gentler Hard profile
    let gentle_hard = DifficultyProfile {
        gaussian_width: 0.3,
        ..DifficultyProfile::HARD
    };

    // When: Building the registry
    let config =
        DifficultyConfig::new(DifficultyProfile::EASY, DifficultyProfile::NORMAL, gentle_hard)
            .unwrap();

    // Then: Custom profile is served, standard registry untouched
    assert_eq!(config.profile(DifficultyLevel::Hard).gaussian_width, 0.3);
    assert_eq!(DifficultyLevel::Hard.profile().gaussian_width, 0.1);
    assert_eq!(DifficultyConfig::default(), *DifficultyConfig::standard());
}
