#![allow(dead_code)]

pub mod iris;
pub mod storage_env;
