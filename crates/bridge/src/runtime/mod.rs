//! The conversation run pipeline and the pieces it is built from.

pub mod append;
pub mod backoff;
pub mod channel_lock;
pub mod clock;
pub mod controller;
pub mod extract;
pub mod launch;
pub mod poller;

pub use append::MessageAppender;
pub use backoff::BackoffPolicy;
pub use channel_lock::ChannelLockMap;
pub use clock::{Clock, ManualClock, TokioClock};
pub use controller::{ConversationController, TurnReport};
pub use extract::{latest_assistant_reply, ResponseExtractor};
pub use launch::RunLauncher;
pub use poller::{PollReport, RunOutcome, RunPoller};
