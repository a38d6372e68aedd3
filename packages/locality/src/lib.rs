#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Text stages of the locality resolution pipeline.
//!
//! Museum specimen labels arrive in many shapes:
//! - Abbreviated reserves: `"Kruger Nat. Park"`, `"Tokai N.R."`
//! - Collector preambles: `"Snake collected from Muizenberg"`
//! - Embedded offsets: `"20 km SE of Muizenberg"`
//! - Farm references: `"On the farm Vrolijkheid 123, Western Cape"`
//! - Inline coordinates: `"31d38m43sS 20d24m57sE"`
//!
//! Each stage is a pure function from text to text plus whatever it
//! extracted; the resolver composes them explicitly.

pub mod degrees;
pub mod direction;
pub mod farm;
pub mod normalize;

pub use degrees::parse_degree_literal;
pub use direction::{AnchorForm, DirectionExtraction, extract_direction};
pub use farm::{FarmDetection, detect_farm, implicit_farm_name};
pub use normalize::{NormalizedLocality, normalize};
