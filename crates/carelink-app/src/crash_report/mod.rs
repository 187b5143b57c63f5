mod report;
mod sanitize;

pub use report::write_crash_report;
