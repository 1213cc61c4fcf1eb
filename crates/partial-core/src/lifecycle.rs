use std::fmt;

/// Where a widget is in its per-request lifecycle.
///
/// `Initialized → Loaded → PreRendered → Rendered → Done`. Rendering may be
/// repeated once pre-rendered, which is how a coordinator captures a fragment
/// after the page render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initialized,
    Loaded,
    PreRendered,
    Rendered,
    Done,
}

impl Phase {
    pub fn can_pre_render(self) -> bool {
        matches!(self, Phase::Loaded | Phase::PreRendered | Phase::Rendered)
    }

    pub fn can_render(self) -> bool {
        matches!(self, Phase::PreRendered | Phase::Rendered)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initialized => "initialized",
            Phase::Loaded => "loaded",
            Phase::PreRendered => "pre-rendered",
            Phase::Rendered => "rendered",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}
