//! The [`System`] trait: a named, stateful callback object driven by its
//! containing [`crate::group::SystemsGroup`] once per frame phase.

/// A per-frame callback object. Only one instance of a given concrete type
/// may be registered in a group at a time (see
/// [`crate::group::SystemsGroup::register_system`]).
pub trait System: 'static {
    /// Debug-only name, not used for identity (identity is the concrete type).
    fn name(&self) -> &str;

    /// Called once, right after registration, before the first `update`.
    fn initialize(&mut self) {}

    /// Called every frame, before `update`.
    fn pre_update(&mut self) {}

    /// Called every frame.
    fn update(&mut self, delta_time: f32) {
        let _ = delta_time;
    }

    /// Called every frame while ImGui is enabled.
    fn imgui(&mut self, delta_time: f32) {
        let _ = delta_time;
    }

    /// Called every frame, after `update`.
    fn post_update(&mut self) {}

    /// Called on deregistration or engine shutdown.
    fn shutdown(&mut self) {}
}

/// Which frame phase to dispatch. `update`/`imgui` carry the frame's delta
/// time, matching [`System::update`]/[`System::imgui`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    Initialize,
    PreUpdate,
    Update(f32),
    ImGui(f32),
    PostUpdate,
    Shutdown,
}

impl Phase {
    pub(crate) fn dispatch(&self, system: &mut dyn System) {
        match self {
            Phase::Initialize => system.initialize(),
            Phase::PreUpdate => system.pre_update(),
            Phase::Update(dt) => system.update(*dt),
            Phase::ImGui(dt) => system.imgui(*dt),
            Phase::PostUpdate => system.post_update(),
            Phase::Shutdown => system.shutdown(),
        }
    }
}
