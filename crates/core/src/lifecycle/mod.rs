//! Process lifecycle: logging setup, readiness notification and OS signals.

pub mod logging;
pub mod notify;
pub mod signal;

use std::sync::Arc;

/// Points in the gateway's life that a supervisor may care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// All listeners are bound.
    Ready,
    Reloading,
    /// Emitted after every reload attempt, including failed ones.
    Reloaded,
    /// Listeners are closing; in-flight requests drain.
    Stopping,
}

impl LifecycleEvent {
    fn message(self) -> &'static str {
        match self {
            Self::Ready => "Gateway ready",
            Self::Reloading => "Reloading configuration",
            Self::Reloaded => "Configuration reload finished",
            Self::Stopping => "Gateway stopping",
        }
    }
}

pub trait Lifecycle: Send + Sync {
    fn notify(&self, event: LifecycleEvent);
}

/// Run from a terminal or a plain process supervisor: log only.
pub struct ForegroundLifecycle;

impl Lifecycle for ForegroundLifecycle {
    fn notify(&self, event: LifecycleEvent) {
        tracing::info!(event = ?event, "{}", event.message());
    }
}

/// Run as a `Type=notify` systemd unit.
pub struct SystemdLifecycle;

impl Lifecycle for SystemdLifecycle {
    fn notify(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Ready | LifecycleEvent::Reloaded => notify::sd_ready(),
            LifecycleEvent::Reloading => notify::sd_reloading(),
            LifecycleEvent::Stopping => notify::sd_stopping(),
        }
        tracing::info!(event = ?event, systemd = true, "{}", event.message());
    }
}

/// systemd sets `NOTIFY_SOCKET` for notify-type units.
pub fn detect_lifecycle() -> Arc<dyn Lifecycle> {
    if std::env::var_os("NOTIFY_SOCKET").is_some() {
        Arc::new(SystemdLifecycle)
    } else {
        Arc::new(ForegroundLifecycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [LifecycleEvent; 4] = [
        LifecycleEvent::Ready,
        LifecycleEvent::Reloading,
        LifecycleEvent::Reloaded,
        LifecycleEvent::Stopping,
    ];

    #[test]
    fn test_every_event_has_a_message() {
        for event in ALL {
            assert!(!event.message().is_empty());
        }
    }

    #[test]
    fn test_notify_without_systemd_socket() {
        // sd-notify does nothing when NOTIFY_SOCKET is unset.
        let lifecycles: [Arc<dyn Lifecycle>; 2] =
            [Arc::new(ForegroundLifecycle), Arc::new(SystemdLifecycle)];
        for lc in lifecycles {
            for event in ALL {
                lc.notify(event);
            }
        }
    }
}
