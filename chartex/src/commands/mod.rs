/// Chart, version, values, contents and dependency commands
pub mod chart;

/// Image extraction command
pub mod images;
