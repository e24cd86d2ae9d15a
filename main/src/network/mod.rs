pub mod interfaces;
pub mod multicast;
