//! The `fixtures/site` tree, embedded twice by the build script: stored as is in
//! [`plain::SITE`] and gzip-compressed in [`packed::SITE`].

include!(concat!(env!("OUT_DIR"), "/plain.rs"));
include!(concat!(env!("OUT_DIR"), "/packed.rs"));

/// Directory the embedded trees were generated from.
pub const FIXTURE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/site");
