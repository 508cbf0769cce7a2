pub mod app;
pub mod archive;
pub mod catalog;
pub mod concat;
pub mod config;
pub mod convert;
pub mod domain;
pub mod error;
pub mod fasta_len;
pub mod fs_util;
pub mod remote;
pub mod sniff;
pub mod stream;
pub mod workspace;
