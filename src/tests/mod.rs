//! Binary-level tests: command line parsing and the assembled application
//! running against the console panel.
