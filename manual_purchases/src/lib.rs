pub mod assembler;
pub mod error;
pub mod executable_utils;
pub mod form;
pub mod model;
pub mod money;
pub mod notices;
pub mod storage;
pub mod variations;
