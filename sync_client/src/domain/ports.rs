use sync_protocol::{ParticipantId, PositionSample};

// Port for the rendering/physics collaborator that owns every visual.
//
// The sync layer only reads local state and issues create/update/destroy calls; it never
// inspects handles beyond asking whether they are still valid.
pub trait Presentation {
    type Handle;

    fn local_velocity(&self) -> (f32, f32);
    fn local_sample(&self) -> PositionSample;

    fn create_remote_entity(&mut self, id: &ParticipantId, sample: &PositionSample)
    -> Self::Handle;
    fn update_remote_entity(&mut self, handle: &mut Self::Handle, sample: &PositionSample);
    // False when the visual's backing resource went away and must be recreated.
    fn is_handle_valid(&self, handle: &Self::Handle) -> bool;
    fn destroy_remote_entity(&mut self, handle: Self::Handle);

    // Called once when the relay connection drops.
    fn on_disconnected(&mut self) {}
}
