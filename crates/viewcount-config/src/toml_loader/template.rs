//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Viewcount Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[store]
# url = "https://your-pocketbase.fly.dev"   # or set VIEWCOUNT_STORE_URL
# collection = "viewers"
# request_timeout_ms = 10000                # 100-120000

[presence]
# heartbeat_interval_ms = 30000             # 1000-600000
# stale_threshold_ms = 120000               # must exceed heartbeat_interval_ms
# reconnect_delay_ms = 5000                 # 100-300000
# live_filter = true                        # count only records renewed within the threshold
# session_file = "/tmp/viewcount-session.json"

[sweeper]
# enabled = true
# interval_secs = 60                        # 1-3600
# Each sweep deletes stale sessions in one /api/batch transaction.
# PocketBase disables batch requests by default: enable them under
# Settings > Application and keep max_batch at or below "Max allowed batch requests".
# max_batch = 50                            # 1-1000; a larger backlog drains over several sweeps

[logging]
# level = "info"                            # trace, debug, info, warn, error
"##
    .to_string()
}
