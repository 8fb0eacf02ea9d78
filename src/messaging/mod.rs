/// Sound event messaging
///
/// Game and UI code announce what happened; the sound system listens and
/// plays the matching feedback. Handlers of the publishing code are never
/// wrapped or replaced.
///
/// ## Architecture
///
/// ```text
/// ┌─────────┐   SoundEvent   ┌───────────┐   subscribe   ┌─────────────┐
/// │  Game / │ ─────────────> │ Sound Bus │ ────────────> │ SoundSystem │
/// │   UI    │                │           │               │  listener   │
/// └─────────┘                └───────────┘               └─────────────┘
/// ```
///
/// ## Usage
///
/// ```rust,ignore
/// let bus = SoundBus::new();
/// let listener = sounds.attach(&bus)?;
///
/// bus.publish(SoundEvent::Ui(UiAction::ControlInvoked("startGame".into())));
/// bus.publish(SoundEvent::Push { delta: 40.0, cursed: false });
///
/// listener.detach();
/// ```

pub mod bus;
pub mod events;

// Re-export commonly used types
pub use bus::{SoundBus, SubscriberId, Subscription};
pub use events::{GameEvent, SoundEvent, UiAction};
