pub mod dispatch;
pub(crate) mod inspect;
pub(crate) mod run;

pub use dispatch::dispatch;
