use crate::launcher::LAUNCHER_BINARY_NAME;
use slipway_schema::HookPhase;

/// Layout path of the hook-aware container entry point.
pub const ENTRYPOINT_SCRIPT_PATH: &str = "service/bin/entrypoint.sh";

/// Layout path of the hook execution library.
pub const HOOKS_LIBRARY_PATH: &str = "service/lib/hooks.sh";

/// Install path of one operator hook script:
/// `hooks/<phase>.d/<name>`.
pub fn hook_install_path(phase: HookPhase, name: &str) -> String {
    format!("hooks/{}.d/{name}", phase.key())
}

/// Directory holding one phase's hook scripts.
pub fn hook_phase_dir(phase: HookPhase) -> String {
    format!("hooks/{}.d", phase.key())
}

/// The embedded `entrypoint.sh`: runs each lifecycle phase's hook directory
/// in fixed order, starts the main process, and drives graceful shutdown.
pub const ENTRYPOINT_SCRIPT: &str = r#"#!/bin/sh
# entrypoint.sh - container lifecycle entry point (POSIX sh compatible)
#
# Lifecycle:
#   pre-configure.d -> configure.d -> pre-startup.d -> startup.d ->
#   post-startup.d  -> [READY]     -> (wait)        ->
#   pre-shutdown.d  -> shutdown.d  -> [EXIT]

set -eu

SCRIPT_DIR="$(cd "$(dirname "$0")" && pwd)"
SERVICE_ROOT="${SERVICE_ROOT:-$(cd "$SCRIPT_DIR/../.." && pwd)}"

. "${SERVICE_ROOT}/service/lib/hooks.sh"

HOOK_BASE="${SERVICE_ROOT}/hooks"
HOOK_LOG_DIR="${SERVICE_ROOT}/var/log"
HOOK_METRIC_DIR="${SERVICE_ROOT}/var/metrics"
HOOK_STATE_DIR="${SERVICE_ROOT}/var/state"

export SERVICE_ROOT HOOK_BASE HOOK_LOG_DIR HOOK_METRIC_DIR HOOK_STATE_DIR

SERVICE_MODE="${SERVICE_MODE:-default}"
export SERVICE_MODE

MAIN_PID=""
SHUTDOWN_IN_PROGRESS=""

_shutdown() {
    if [ -n "$SHUTDOWN_IN_PROGRESS" ]; then
        return
    fi
    SHUTDOWN_IN_PROGRESS=1

    _log "Shutdown signal received"

    run_hooks_warn "${HOOK_BASE}/pre-shutdown.d" "${HOOK_LOG_DIR}/pre-shutdown.log"

    if [ -n "$MAIN_PID" ] && kill -0 "$MAIN_PID" 2>/dev/null; then
        _log "Sending TERM to main process (PID $MAIN_PID)"
        kill -TERM "$MAIN_PID" 2>/dev/null || true

        _grace="${SHUTDOWN_GRACE_SECONDS:-10}"
        _waited=0
        while kill -0 "$MAIN_PID" 2>/dev/null && [ "$_waited" -lt "$_grace" ]; do
            sleep 1
            _waited=$(( _waited + 1 ))
        done

        if kill -0 "$MAIN_PID" 2>/dev/null; then
            _log_err "Main process did not exit after ${_grace}s, sending KILL"
            kill -KILL "$MAIN_PID" 2>/dev/null || true
        fi
    fi

    run_hooks_warn "${HOOK_BASE}/shutdown.d" "${HOOK_LOG_DIR}/shutdown.log"

    rm -f "${HOOK_STATE_DIR}/initialized"
    rm -f "${HOOK_STATE_DIR}/main.pid"

    _log "Shutdown complete"
    exit 0
}

trap _shutdown TERM INT

_ensure_dirs
mkdir -p "${HOOK_BASE}" 2>/dev/null || true

_log "=== Service starting (mode=${SERVICE_MODE}) ==="

for _phase in pre-configure configure pre-startup startup; do
    _log "--- Phase: ${_phase} ---"
    if [ "$_phase" = "configure" ]; then
        _env_file="${SERVICE_ROOT}/var/environment.sh"
        if [ -f "$_env_file" ]; then
            _log "Sourcing environment from sidecar: $_env_file"
            . "$_env_file"
        fi
    fi
    run_hooks "${HOOK_BASE}/${_phase}.d" "${HOOK_LOG_DIR}/${_phase}.log" || {
        _log_err "${_phase} failed, aborting"
        exit 1
    }
done

if [ -f "${HOOK_STATE_DIR}/main.pid" ]; then
    MAIN_PID="$(cat "${HOOK_STATE_DIR}/main.pid")"
    _log "Main process PID: $MAIN_PID"
fi

_log "--- Phase: post-startup ---"
run_hooks "${HOOK_BASE}/post-startup.d" "${HOOK_LOG_DIR}/post-startup.log" || {
    _log_err "post-startup failed (service may be degraded)"
}

touch "${HOOK_STATE_DIR}/initialized"
_log "=== Service ready ==="

if [ -n "$MAIN_PID" ] && kill -0 "$MAIN_PID" 2>/dev/null; then
    _log "Waiting on main process (PID $MAIN_PID)"
    wait "$MAIN_PID" 2>/dev/null || true
    _log "Main process exited"
    _shutdown
else
    _log "No main process, waiting for signal"
    while true; do
        sleep 60 &
        wait $! 2>/dev/null || true
    done
fi
"#;

/// The embedded `hooks.sh` execution library.
pub const HOOKS_LIBRARY: &str = r#"#!/bin/sh
# hooks.sh - core hook execution library (POSIX sh compatible)
#
# Provides:
#   run_hooks      <dir> [logfile]   - run all scripts in dir, halt on failure
#   run_hooks_warn <dir> [logfile]   - run all, log failures but continue

HOOK_BASE="${HOOK_BASE:-/opt/service}"
HOOK_LOG_DIR="${HOOK_LOG_DIR:-/var/run/service/logs}"
HOOK_METRIC_DIR="${HOOK_METRIC_DIR:-/var/run/service/metrics}"
HOOK_STATE_DIR="${HOOK_STATE_DIR:-/var/run/service/state}"

_log() {
    printf '[%s] [hooks] %s\n' "$(date -u '+%Y-%m-%dT%H:%M:%SZ')" "$*"
}

_log_err() {
    _log "ERROR: $*" >&2
}

_ensure_dirs() {
    mkdir -p "$HOOK_LOG_DIR" "$HOOK_METRIC_DIR" "$HOOK_STATE_DIR" 2>/dev/null || true
}

run_hooks() {
    _dir="$1"
    _logfile="${2:-/dev/null}"

    if [ ! -d "$_dir" ]; then
        _log "No hook directory: $_dir (skipping)"
        return 0
    fi

    _count=0
    for _script in "$_dir"/*.sh; do
        [ -f "$_script" ] || continue
        [ -x "$_script" ] || continue
        _count=$(( _count + 1 ))

        _name="$(basename "$_script")"
        _log "Running hook: $_name"

        _rc=0
        "$_script" >> "$_logfile" 2>&1 || _rc=$?
        if [ "$_rc" -ne 0 ]; then
            _log_err "Hook failed: $_name (exit $_rc)"
            return "$_rc"
        fi
    done

    if [ "$_count" -eq 0 ]; then
        _log "No hooks in $_dir"
    else
        _log "Completed $_count hook(s) from $_dir"
    fi

    return 0
}

run_hooks_warn() {
    _dir="$1"
    _logfile="${2:-/dev/null}"

    if [ ! -d "$_dir" ]; then
        _log "No hook directory: $_dir (skipping)"
        return 0
    fi

    _count=0
    _failures=0

    for _script in "$_dir"/*.sh; do
        [ -f "$_script" ] || continue
        [ -x "$_script" ] || continue
        _count=$(( _count + 1 ))

        _name="$(basename "$_script")"
        _log "Running hook: $_name"

        _rc=0
        "$_script" >> "$_logfile" 2>&1 || _rc=$?
        if [ "$_rc" -ne 0 ]; then
            _log_err "Hook failed (continuing): $_name (exit $_rc)"
            _failures=$(( _failures + 1 ))
        fi
    done

    if [ "$_failures" -gt 0 ]; then
        _log "Completed with $_failures failure(s) out of $_count hook(s)"
    fi

    return 0
}
"#;

const STARTUP_SCRIPT_TEMPLATE: &str = r#"#!/bin/sh
# Start the service launcher for @SERVICE_NAME@ and record its PID.
set -eu

os="$(uname -s | tr '[:upper:]' '[:lower:]')"
arch="$(uname -m)"
case "$arch" in x86_64|amd64) arch="amd64" ;; aarch64|arm64) arch="arm64" ;; esac

LAUNCHER="${SERVICE_ROOT}/service/bin/${os}-${arch}/@LAUNCHER_BINARY@"
"$LAUNCHER" --service-name "@SERVICE_NAME@" &
echo $! > "${HOOK_STATE_DIR}/main.pid"
"#;

/// Generate `hooks/startup.d/00-main.sh`: starts the launcher in the
/// background and writes its PID for the entry point to wait on.
pub fn generate_startup_script(service_name: &str) -> String {
    STARTUP_SCRIPT_TEMPLATE
        .replace("@SERVICE_NAME@", service_name)
        .replace("@LAUNCHER_BINARY@", LAUNCHER_BINARY_NAME)
}
