pub mod clock;
pub mod controller;
pub mod events;
pub mod loop_worker;
pub mod state;

pub use clock::{Clock, SystemClock};
pub use controller::CaptureController;
pub use events::SessionEvent;
pub use loop_worker::{capture_loop, FrameSender, LoopConfig, LoopContext};
pub use state::{CaptureStatus, LoopExit, LoopReport};
