use std::fmt;

use crate::core::LifecycleEvent;

/// Fixed stages of the controller lifecycle, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    PreInit,
    Init,
    PreLoad,
    Load,
    PreRender,
    Render,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Start,
        Stage::PreInit,
        Stage::Init,
        Stage::PreLoad,
        Stage::Load,
        Stage::PreRender,
        Stage::Render,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "START",
            Stage::PreInit => "PRE_INIT",
            Stage::Init => "INIT",
            Stage::PreLoad => "PRE_LOAD",
            Stage::Load => "LOAD",
            Stage::PreRender => "PRE_RENDER",
            Stage::Render => "RENDER",
        }
    }

    /// Verb used in stage log lines
    pub(crate) fn verb(&self) -> &'static str {
        match self {
            Stage::Start => "Starting",
            Stage::PreInit => "Pre-initializing",
            Stage::Init => "Initializing",
            Stage::PreLoad => "Pre-loading",
            Stage::Load => "Loading",
            Stage::PreRender => "Pre-rendering",
            Stage::Render => "Rendering",
        }
    }

    /// Events emitted once the stage hook has returned
    pub fn events(&self) -> &'static [LifecycleEvent] {
        match self {
            Stage::Start => &[LifecycleEvent::Start],
            Stage::PreInit => &[LifecycleEvent::PreInit],
            Stage::Init => &[LifecycleEvent::Init],
            Stage::PreLoad => &[LifecycleEvent::PreLoad],
            Stage::Load => &[LifecycleEvent::Load, LifecycleEvent::DataReady],
            Stage::PreRender => &[LifecycleEvent::PreRender],
            Stage::Render => &[LifecycleEvent::Render],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
