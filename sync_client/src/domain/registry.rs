use std::collections::HashMap;
use sync_protocol::ParticipantId;

/// Presentation handles for every remote participant currently on screen.
///
/// An entry exists exactly while the presentation layer holds a live visual for the id.
/// The local participant is never stored here.
#[derive(Debug)]
pub struct RemoteEntityRegistry<H> {
    entries: HashMap<ParticipantId, H>,
}

impl<H> Default for RemoteEntityRegistry<H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<H> RemoteEntityRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &ParticipantId) -> Option<&H> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &ParticipantId) -> Option<&mut H> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn insert(&mut self, id: ParticipantId, handle: H) -> Option<H> {
        self.entries.insert(id, handle)
    }

    pub fn remove(&mut self, id: &ParticipantId) -> Option<H> {
        self.entries.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.entries.keys()
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
