mod common;
mod navigation;
mod scoring;
