// Recording fakes for the delivery ports. The real implementations talk to
// Discord and live in the discord layer.

pub mod recording;

pub use recording::{RecordingNotifier, RecordingPublisher, StaticSubscriptions};
