/// Open/closed state of a container, with whether its content was mounted.
///
/// Content stays mounted once loaded; closing keeps `content_loaded` so a
/// reopen does not refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Closed { content_loaded: bool },
    Open { content_loaded: bool },
}

/// Effect of a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Closed,
    ContentLoaded,
    Unchanged,
}

impl ContainerState {
    pub const INITIAL: Self = Self::Closed {
        content_loaded: false,
    };

    pub fn on_open(self) -> (Self, Transition) {
        match self {
            Self::Closed { content_loaded } => (Self::Open { content_loaded }, Transition::Opened),
            open @ Self::Open { .. } => (open, Transition::Unchanged),
        }
    }

    pub fn on_close(self) -> (Self, Transition) {
        match self {
            Self::Open { content_loaded } => (Self::Closed { content_loaded }, Transition::Closed),
            closed @ Self::Closed { .. } => (closed, Transition::Unchanged),
        }
    }

    pub fn on_content_loaded(self) -> (Self, Transition) {
        match self {
            Self::Open {
                content_loaded: false,
            } => (
                Self::Open {
                    content_loaded: true,
                },
                Transition::ContentLoaded,
            ),
            other => (other, Transition::Unchanged),
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::Open { .. })
    }

    pub fn content_loaded(self) -> bool {
        match self {
            Self::Closed { content_loaded } | Self::Open { content_loaded } => content_loaded,
        }
    }
}

impl Default for ContainerState {
    fn default() -> Self {
        Self::INITIAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_is_idempotent() {
        let (open, t) = ContainerState::INITIAL.on_open();
        assert_eq!(t, Transition::Opened);
        assert_eq!(open.on_open(), (open, Transition::Unchanged));
    }

    #[test]
    fn test_content_loads_only_while_open() {
        let (closed, t) = ContainerState::INITIAL.on_content_loaded();
        assert_eq!(t, Transition::Unchanged);
        assert!(!closed.content_loaded());

        let (open, _) = closed.on_open();
        let (loaded, t) = open.on_content_loaded();
        assert_eq!(t, Transition::ContentLoaded);
        assert_eq!(loaded.on_content_loaded().1, Transition::Unchanged);
    }

    #[test]
    fn test_close_and_reopen_keeps_content_loaded() {
        let (open, _) = ContainerState::INITIAL.on_open();
        let (loaded, _) = open.on_content_loaded();
        let (closed, t) = loaded.on_close();
        assert_eq!(t, Transition::Closed);
        assert_eq!(
            closed,
            ContainerState::Closed {
                content_loaded: true
            }
        );

        let (reopened, t) = closed.on_open();
        assert_eq!(t, Transition::Opened);
        assert!(reopened.content_loaded());
    }
}
