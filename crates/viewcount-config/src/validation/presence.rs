//! Heartbeat, staleness, reconnect, and sweep timing validation.

use crate::schema::ViewcountConfig;

use super::helpers::validate_range;

pub(crate) fn validate_presence(errors: &mut Vec<String>, config: &ViewcountConfig) {
    let presence = &config.presence;
    validate_range(
        errors,
        "presence.heartbeat_interval_ms",
        presence.heartbeat_interval_ms,
        1_000,
        600_000,
    );
    validate_range(
        errors,
        "presence.reconnect_delay_ms",
        presence.reconnect_delay_ms,
        100,
        300_000,
    );

    // A live session must renew at least once per staleness window.
    if presence.stale_threshold_ms <= presence.heartbeat_interval_ms {
        errors.push(format!(
            "presence.stale_threshold_ms = {} must exceed presence.heartbeat_interval_ms = {}",
            presence.stale_threshold_ms, presence.heartbeat_interval_ms
        ));
    }
}

pub(crate) fn validate_sweeper(errors: &mut Vec<String>, config: &ViewcountConfig) {
    validate_range(
        errors,
        "sweeper.interval_secs",
        config.sweeper.interval_secs,
        1,
        3_600,
    );
    validate_range(
        errors,
        "sweeper.max_batch",
        config.sweeper.max_batch,
        1,
        1_000,
    );
}
