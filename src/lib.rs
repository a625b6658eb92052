//! Agent/agency profile scrubber.
//!
//! Fetches an arbitrary profile page and derives a structured contact
//! profile from it, reconciling the agency address and brand logo against
//! third-party lookups when they are configured.

pub mod error;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod profile;
pub mod reconcile;
pub mod scrubber;
pub mod settings;

pub use error::ScrubError;
pub use profile::{ExtractedProfile, ScrubRequest};
pub use scrubber::Scrubber;
pub use settings::Settings;
