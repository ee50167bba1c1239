/// Layout path of the health-check script, for both the generated
/// custom-command form and the operator-supplied custom-script form.
pub const CHECK_SCRIPT_PATH: &str = "service/monitoring/bin/check.sh";

/// Layout path of the same-binary check configuration document.
pub const LAUNCHER_CHECK_PATH: &str = "service/bin/launcher-check.yml";

const CHECK_COMMAND_TEMPLATE: &str = r#"#!/bin/bash
#
# Health check script for @SERVICE_NAME@ (custom-command mode).

set -euo pipefail

SCRIPT_DIR="$(cd "$(dirname "${BASH_SOURCE[0]}")" && pwd)"
MONITORING_DIR="$(dirname "$SCRIPT_DIR")"
SERVICE_DIR="$(dirname "$MONITORING_DIR")"
DIST_ROOT="$(dirname "$SERVICE_DIR")"

cd "$DIST_ROOT"
exec @CHECK_COMMAND@
"#;

/// Generate `check.sh` for the custom-command health-check mode: a wrapper
/// that execs the declared command from the distribution root.
pub fn generate_check_command_script(service_name: &str, command: &str) -> String {
    CHECK_COMMAND_TEMPLATE
        .replace("@SERVICE_NAME@", service_name)
        .replace("@CHECK_COMMAND@", command)
}
