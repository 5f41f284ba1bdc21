//! Compile-time defaults produced by build.rs

include!(concat!(env!("OUT_DIR"), "/cof_merged_config.rs"));
