//! Third-party lookups that refine page-derived fields. Both degrade to
//! `None` on any failure and report what happened in their trace.

pub mod logo;
pub mod places;

pub use logo::{LogoLookup, LogoTrace};
pub use places::{PlacesLookup, PlacesTrace};
