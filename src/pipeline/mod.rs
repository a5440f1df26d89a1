//! Classification pipeline.
//!
//! Every inbound message text flows through:
//! 1. `patterns::parse_share()`: regex extraction of category, caption, URL stem
//! 2. `probe::MediaProbe::resolve()`: trial request deciding photo / video / animation
//! 3. `DispatchUnit`: the normalized result handed to the fan-out

pub mod classifier;
pub mod patterns;
pub mod probe;
pub mod types;

pub use classifier::{Classifier, ShareClassifier};
pub use types::{Category, DispatchUnit, Media, MediaKind};
