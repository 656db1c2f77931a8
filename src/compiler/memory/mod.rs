/*!
Computes how every function's activation record is laid out: which slot
holds the access link, where each parameter and local variable lives,
and which slots are pointers that must be loaded before use.
*/
pub mod frame;

pub use frame::{plan_frames, Frame, VarRecord};
