use super::*;
use crate::test_utils::arb_messy_string;
use proptest::prelude::*;

/// Generates an arbitrary Config
fn arb_config() -> impl Strategy<Value = Config> {
    (
        arb_messy_string(),
        any::<bool>(),
        arb_messy_string(),
        prop::option::of(arb_messy_string()),
        any::<u64>(),
        any::<u64>(),
        20..2_000i32,
        arb_messy_string(),
    )
        .prop_map(
            |(
                database_url,
                advisor_enabled,
                advisor_provider,
                advisor_credentials,
                advisor_timeout_seconds,
                advisor_cache_ttl_seconds,
                default_daily_capacity_minutes,
                default_focus_mode,
            )| Config {
                database_url,
                advisor_enabled,
                advisor_provider,
                advisor_credentials,
                advisor_model: String::new(),
                advisor_timeout_seconds,
                advisor_cache_ttl_seconds,
                advisor_max_output_tokens: 2_048,
                default_daily_capacity_minutes,
                default_focus_mode,
                prompt_dir: None,
                log_dir: None,
            },
        )
}

/// Generates an arbitrary ConfigUpdate touching a subset of fields
fn arb_config_update() -> impl Strategy<Value = ConfigUpdate> {
    (
        prop::option::of(arb_messy_string()),
        prop::option::of(any::<bool>()),
        prop::option::of(arb_messy_string()),
        prop::option::of(any::<u64>()),
        prop::option::of(20..2_000i32),
    )
        .prop_map(
            |(database_url, advisor_enabled, advisor_provider, advisor_timeout_seconds, capacity)| {
                ConfigUpdate {
                    database_url,
                    advisor_enabled,
                    advisor_provider,
                    advisor_timeout_seconds,
                    default_daily_capacity_minutes: capacity,
                    ..ConfigUpdate::default()
                }
            },
        )
}

// ============================================================================
// C1: apply_update Algebraic Properties
// ============================================================================

proptest! {
    /// C1.1: Identity: apply_update(default) == original config
    #[test]
    fn prop_c1_1_identity(config in arb_config()) {
        let original = config.clone();
        let updated = config.apply_update(ConfigUpdate::default());

        prop_assert_eq!(updated.database_url, original.database_url);
        prop_assert_eq!(updated.advisor_enabled, original.advisor_enabled);
        prop_assert_eq!(updated.advisor_provider, original.advisor_provider);
        prop_assert_eq!(updated.advisor_credentials, original.advisor_credentials);
        prop_assert_eq!(updated.advisor_timeout_seconds, original.advisor_timeout_seconds);
        prop_assert_eq!(updated.default_daily_capacity_minutes, original.default_daily_capacity_minutes);
    }

    /// C1.2: Some fields replace, None fields preserve
    #[test]
    fn prop_c1_2_partial_override(config in arb_config(), update in arb_config_update()) {
        let original = config.clone();
        let expected = update.clone();
        let updated = config.apply_update(update);

        prop_assert_eq!(updated.database_url, expected.database_url.unwrap_or(original.database_url));
        prop_assert_eq!(updated.advisor_enabled, expected.advisor_enabled.unwrap_or(original.advisor_enabled));
        prop_assert_eq!(updated.advisor_provider, expected.advisor_provider.unwrap_or(original.advisor_provider));
        prop_assert_eq!(
            updated.advisor_timeout_seconds,
            expected.advisor_timeout_seconds.unwrap_or(original.advisor_timeout_seconds)
        );
        prop_assert_eq!(
            updated.default_daily_capacity_minutes,
            expected.default_daily_capacity_minutes.unwrap_or(original.default_daily_capacity_minutes)
        );
        prop_assert_eq!(updated.default_focus_mode, original.default_focus_mode);
    }

    /// C1.3: Last writer wins when two updates are chained
    #[test]
    fn prop_c1_3_last_writer_wins(config in arb_config(), a in arb_messy_string(), b in arb_messy_string()) {
        let first = ConfigUpdate { database_url: Some(a), ..ConfigUpdate::default() };
        let second = ConfigUpdate { database_url: Some(b.clone()), ..ConfigUpdate::default() };

        let updated = config.apply_update(first).apply_update(second);

        prop_assert_eq!(updated.database_url, b);
    }

    /// C1.4: Durations are derived from their second counts
    #[test]
    fn prop_c1_4_durations(config in arb_config()) {
        prop_assert_eq!(config.advisor_timeout().as_secs(), config.advisor_timeout_seconds);
        prop_assert_eq!(config.advisor_cache_ttl().as_secs(), config.advisor_cache_ttl_seconds);
    }
}
