#![allow(dead_code)]

pub mod traces;
