use crate::models::Sound;

pub type EndOfTrackCallback = Box<dyn FnMut(&Sound) + Send>;

/// Holds the one listener told when a non-looping sound finishes on its own.
/// Registering a new listener replaces the previous one.
#[derive(Default)]
pub struct EndOfTrackSlot {
    callback: Option<EndOfTrackCallback>,
}

impl EndOfTrackSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, callback: EndOfTrackCallback) {
        self.callback = Some(callback);
    }

    pub fn fire(&mut self, sound: &Sound) {
        if let Some(callback) = self.callback.as_mut() {
            callback(sound);
        }
    }
}
