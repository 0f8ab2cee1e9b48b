//! The [`Listener`] trait and the dedup wrapper around it (§3, §4.3): each
//! `(old, new)` state transition is delivered at most once, and nothing
//! fires once the application has reached a terminal state.

use crate::model::{AppInfo, ApplicationState};

/// Callbacks a monitor drives as it observes an application's lifecycle.
pub trait Listener: Send + Sync {
    fn app_id_known(&self, app_id: &str);
    fn state_changed(&self, old: ApplicationState, new: ApplicationState);
    fn info_changed(&self, info: &AppInfo);
}

/// Wraps a [`Listener`], tracking the last emitted state and [`AppInfo`] so
/// repeats are suppressed and nothing is emitted after a terminal state.
pub struct DedupingListener<L: Listener> {
    inner: L,
    last_state: Option<ApplicationState>,
    last_info: Option<AppInfo>,
    terminated: bool,
}

impl<L: Listener> DedupingListener<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            last_state: Some(ApplicationState::Starting),
            last_info: None,
            terminated: false,
        }
    }

    pub fn app_id_known(&self, app_id: &str) {
        self.inner.app_id_known(app_id);
    }

    /// Emits `stateChanged` only when `new` differs from the last emitted
    /// state and the application has not already terminated.
    pub fn state_changed(&mut self, new: ApplicationState) {
        if self.terminated {
            return;
        }
        if self.last_state == Some(new) {
            return;
        }
        let old = self.last_state.unwrap_or(ApplicationState::Starting);
        self.inner.state_changed(old, new);
        self.last_state = Some(new);
        if new.is_terminal() {
            self.terminated = true;
        }
    }

    /// Emits `infoChanged` only when `info` differs from the last emitted
    /// one. The final post-termination emission bypasses the terminated
    /// guard deliberately: it is the one call a monitor makes in its
    /// cleanup block (§4.3).
    pub fn info_changed(&mut self, info: AppInfo) {
        if self.last_info.as_ref() == Some(&info) {
            return;
        }
        self.inner.info_changed(&info);
        self.last_info = Some(info);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Default)]
    struct RecordingListener {
        app_ids: RefCell<Vec<String>>,
        states: RefCell<Vec<(ApplicationState, ApplicationState)>>,
        infos: RefCell<Vec<AppInfo>>,
    }

    impl Listener for RecordingListener {
        fn app_id_known(&self, app_id: &str) {
            self.app_ids.borrow_mut().push(app_id.to_owned());
        }

        fn state_changed(&self, old: ApplicationState, new: ApplicationState) {
            self.states.borrow_mut().push((old, new));
        }

        fn info_changed(&self, info: &AppInfo) {
            self.infos.borrow_mut().push(info.clone());
        }
    }

    #[test]
    fn suppresses_repeated_state() {
        let mut listener = DedupingListener::new(RecordingListener::default());
        listener.state_changed(ApplicationState::Running);
        listener.state_changed(ApplicationState::Running);
        assert_eq!(listener.inner.states.borrow().len(), 1);
    }

    #[test]
    fn suppresses_events_after_terminal_state() {
        let mut listener = DedupingListener::new(RecordingListener::default());
        listener.state_changed(ApplicationState::Finished);
        listener.state_changed(ApplicationState::Failed);
        assert_eq!(listener.inner.states.borrow().len(), 1);
    }

    #[test]
    fn suppresses_repeated_info() {
        let mut listener = DedupingListener::new(RecordingListener::default());
        let info = AppInfo {
            tracking_url: Some("u".into()),
            ..AppInfo::default()
        };
        listener.info_changed(info.clone());
        listener.info_changed(info);
        assert_eq!(listener.inner.infos.borrow().len(), 1);
    }
}
