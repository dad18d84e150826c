pub mod clock;
pub mod controller;
pub mod error;
pub mod policy;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::SessionController;
pub use error::{LifecycleError, LifecycleResult};
pub use policy::LifecyclePolicy;
pub use state::Operation;
