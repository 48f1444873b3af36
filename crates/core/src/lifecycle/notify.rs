//! sd-notify messages for the systemd readiness protocol. Failures are
//! ignored: notification is advisory.

use sd_notify::NotifyState;

fn send(state: NotifyState) {
    if let Err(e) = sd_notify::notify(false, &[state]) {
        tracing::debug!("sd-notify failed: {e}");
    }
}

pub fn sd_ready() {
    send(NotifyState::Ready);
}

pub fn sd_reloading() {
    send(NotifyState::Reloading);
}

pub fn sd_stopping() {
    send(NotifyState::Stopping);
}
