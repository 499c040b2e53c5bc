/// Tab-separated process files: parse, render, load and save reaction templates
pub mod template_io;
/// Terminal and file loggers on top of `simplelog`
pub mod logger;
