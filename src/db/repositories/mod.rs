pub mod interruptions;
pub mod sessions;
